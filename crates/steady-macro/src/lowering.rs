use std::path::Path;

use oxc_allocator::Allocator;
use oxc_ast::ast::{
    CallExpression, Expression, ExportAllDeclaration, ExportDefaultDeclaration,
    ExportNamedDeclaration, ImportDeclaration, ImportExpression, MetaProperty, Program,
    StaticMemberExpression,
};
use oxc_ast_visit::{walk, Visit};
use oxc_codegen::{Codegen, CodegenOptions};
use oxc_minifier::{MangleOptions, Minifier, MinifierOptions};
use oxc_parser::Parser;
use oxc_semantic::SemanticBuilder;
use oxc_span::SourceType;
use oxc_transformer::{TransformOptions, Transformer};

use crate::error::CodegenError;

/// Default syntax level snippets are lowered to.
pub const DEFAULT_TARGET: &str = "es2015";

/// Restricted compilation of generated snippet source.
///
/// Implementations turn a complete script into text that runs in a plain
/// browser `<script>` with no bundler, module system or build-time globals.
pub trait Lowering: Send + Sync {
    fn lower(&self, source: &str, minify: bool) -> Result<String, CodegenError>;
}

/// [`Lowering`] backed by oxc: parse the snippet, reject
/// build-environment constructs, transform down to `target`, print.
/// Minified output also has its local bindings mangled.
///
/// Handler text is copied verbatim from the module, so snippets from a
/// TypeScript module are parsed as TypeScript and their types stripped.
#[derive(Debug, Clone)]
pub struct OxcLowering {
    target: String,
    typescript: bool,
}

impl OxcLowering {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            typescript: false,
        }
    }

    pub fn with_typescript(mut self, typescript: bool) -> Self {
        self.typescript = typescript;
        self
    }

    fn source_type(&self) -> (SourceType, &'static Path) {
        if self.typescript {
            (SourceType::ts(), Path::new("snippet.ts"))
        } else {
            (SourceType::default(), Path::new("snippet.js"))
        }
    }
}

impl Default for OxcLowering {
    fn default() -> Self {
        Self::new(DEFAULT_TARGET)
    }
}

impl Lowering for OxcLowering {
    fn lower(&self, source: &str, minify: bool) -> Result<String, CodegenError> {
        let options = TransformOptions::from_target(&self.target).map_err(|e| CodegenError::Target {
            target: self.target.clone(),
            message: e.to_string(),
        })?;

        let (source_type, path) = self.source_type();
        let allocator = Allocator::default();
        let ret = Parser::new(&allocator, source, source_type).parse();
        if !ret.errors.is_empty() {
            return Err(CodegenError::Parse {
                message: join_diagnostics(&ret.errors),
            });
        }
        let mut program = ret.program;
        check_environment(&program)?;

        let scoping = SemanticBuilder::new().build(&program).semantic.into_scoping();
        let ret = Transformer::new(&allocator, path, &options)
            .build_with_scoping(scoping, &mut program);
        if !ret.errors.is_empty() {
            return Err(CodegenError::Lower {
                message: join_diagnostics(&ret.errors),
            });
        }
        // Lowering some syntax pulls in helper imports, which cannot load inline.
        check_environment(&program).map_err(|e| CodegenError::Lower {
            message: format!("{e} (introduced while lowering to {})", self.target),
        })?;

        if !minify {
            return Ok(Codegen::new().build(&program).code);
        }

        // Compression targets the newest syntax, so only the mangler runs.
        let minifier = MinifierOptions {
            mangle: Some(MangleOptions::default()),
            compress: None,
        };
        let ret = Minifier::new(minifier).minify(&allocator, &mut program);
        let code = Codegen::new()
            .with_options(CodegenOptions::minify())
            .with_scoping(ret.scoping)
            .build(&program)
            .code;
        let check = Allocator::default();
        let reparsed = Parser::new(&check, &code, SourceType::default()).parse();
        if !reparsed.errors.is_empty() {
            return Err(CodegenError::Minify {
                message: join_diagnostics(&reparsed.errors),
            });
        }
        Ok(code)
    }
}

fn join_diagnostics<E: std::fmt::Display>(errors: &[E]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

fn check_environment(program: &Program<'_>) -> Result<(), CodegenError> {
    let mut check = EnvironmentCheck::default();
    check.visit_program(program);
    match check.found {
        Some(construct) => Err(CodegenError::Forbidden { construct }),
        None => Ok(()),
    }
}

/// Finds the first construct that only exists at build time or under a module loader.
#[derive(Default)]
struct EnvironmentCheck {
    found: Option<String>,
}

impl EnvironmentCheck {
    fn report(&mut self, construct: &str) {
        if self.found.is_none() {
            self.found = Some(construct.to_string());
        }
    }
}

impl<'a> Visit<'a> for EnvironmentCheck {
    fn visit_import_declaration(&mut self, _it: &ImportDeclaration<'a>) {
        self.report("import");
    }

    fn visit_export_named_declaration(&mut self, _it: &ExportNamedDeclaration<'a>) {
        self.report("export");
    }

    fn visit_export_default_declaration(&mut self, _it: &ExportDefaultDeclaration<'a>) {
        self.report("export default");
    }

    fn visit_export_all_declaration(&mut self, _it: &ExportAllDeclaration<'a>) {
        self.report("export *");
    }

    fn visit_import_expression(&mut self, _it: &ImportExpression<'a>) {
        self.report("import()");
    }

    fn visit_meta_property(&mut self, it: &MetaProperty<'a>) {
        if it.meta.name == "import" {
            self.report("import.meta");
        }
    }

    fn visit_call_expression(&mut self, it: &CallExpression<'a>) {
        if let Expression::Identifier(ident) = &it.callee {
            if ident.name == "require" {
                self.report("require()");
            }
        }
        walk::walk_call_expression(self, it);
    }

    fn visit_static_member_expression(&mut self, it: &StaticMemberExpression<'a>) {
        if let Expression::Identifier(ident) = &it.object {
            if ident.name == "process" && it.property.name == "env" {
                self.report("process.env");
            }
        }
        walk::walk_static_member_expression(self, it);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lower_plain_script_roundtrips() {
        let out = OxcLowering::default()
            .lower("window.addEventListener(\"load\", function () { go(); });", false)
            .unwrap();
        assert!(out.contains("addEventListener"));
        assert!(out.contains("\"load\""));
    }

    #[test]
    fn test_lower_rewrites_newer_syntax() {
        let out = OxcLowering::default()
            .lower("el.addEventListener(\"click\", () => console.log(a ?? b));", false)
            .unwrap();
        assert!(!out.contains("??"));
    }

    #[test]
    fn test_lower_rejects_require() {
        let err = OxcLowering::default()
            .lower("el.addEventListener(\"click\", () => require(\"fs\"));", false)
            .unwrap_err();
        assert_eq!(err, CodegenError::Forbidden { construct: "require()".into() });
    }

    #[test]
    fn test_lower_rejects_process_env() {
        let err = OxcLowering::default()
            .lower("el.addEventListener(\"click\", () => log(process.env.NODE_ENV));", false)
            .unwrap_err();
        assert_eq!(err, CodegenError::Forbidden { construct: "process.env".into() });
    }

    #[test]
    fn test_lower_rejects_dynamic_import() {
        let err = OxcLowering::default()
            .lower("el.addEventListener(\"click\", () => import(\"./x.js\"));", false)
            .unwrap_err();
        assert_eq!(err, CodegenError::Forbidden { construct: "import()".into() });
    }

    #[test]
    fn test_lower_reports_parse_errors() {
        let err = OxcLowering::default().lower("el.addEventListener(\"click\", () => {", false).unwrap_err();
        assert!(matches!(err, CodegenError::Parse { .. }));
    }

    #[test]
    fn test_lower_strips_typescript_annotations() {
        let source = "el.addEventListener(\"click\", (e: MouseEvent): void => go(e as Event));";
        let out = OxcLowering::default().with_typescript(true).lower(source, false).unwrap();
        assert!(out.contains("go(e)"));
        assert!(!out.contains("MouseEvent"));
        assert!(!out.contains(" as "));

        let err = OxcLowering::default().lower(source, false).unwrap_err();
        assert!(matches!(err, CodegenError::Parse { .. }));
    }

    #[test]
    fn test_lower_rejects_unknown_target() {
        let err = OxcLowering::new("es1999").lower("f();", false).unwrap_err();
        assert!(matches!(err, CodegenError::Target { .. }));
    }

    #[test]
    fn test_minified_output_is_smaller() {
        let source = "(function () {\n  var target = document.body;\n  target.addEventListener(\"click\", function (event) {\n    console.log(event);\n  });\n})();\n";
        let pretty = OxcLowering::default().lower(source, false).unwrap();
        let minified = OxcLowering::default().lower(source, true).unwrap();
        assert!(minified.len() < pretty.len());
        assert!(!minified.contains('\n') || minified.trim_end().lines().count() == 1);
    }

    #[test]
    fn test_minify_mangles_locals_only() {
        let source = "(function () {\n  var targetElement = document.body;\n  targetElement.addEventListener(\"click\", function (clickEvent) {\n    fn(clickEvent, window);\n  });\n})();\n";
        let minified = OxcLowering::default().lower(source, true).unwrap();
        assert!(!minified.contains("targetElement"));
        assert!(!minified.contains("clickEvent"));
        assert!(minified.contains("document.body"));
        assert!(minified.contains("fn("));
        assert!(minified.contains("window"));
        assert!(minified.contains("\"click\""));

        let pretty = OxcLowering::default().lower(source, false).unwrap();
        assert!(pretty.contains("targetElement"));
    }
}
