use std::path::Path;

use oxc_allocator::Allocator;
use oxc_ast::ast::{
    IdentifierReference, ImportDeclarationSpecifier, JSXAttributeItem, JSXAttributeValue, JSXChild,
    JSXElement, JSXExpression, JSXExpressionContainer, JSXFragment, Program, Statement,
};
use oxc_ast_visit::Visit;
use oxc_parser::Parser;
use oxc_span::{GetSpan, SourceType, Span as OxcSpan};
use steady_template::{
    print_node, AttrValue, Attribute, Element, Expression, Fragment, Placeholder, PlaceholderKind,
    PlaceholderScope, Span, StringLiteral, TemplateNode, Text,
};
use tracing::debug;

use crate::error::{MacroError, UsageError, UsageErrorKind};
use crate::ident::IdentifierAllocator;
use crate::lowering::{Lowering, OxcLowering};
use crate::transform::TemplateMacroTransform;
use crate::MacroOptions;

/// Result of running the macro over one source module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleOutput {
    pub code: String,
    /// False when the module does not import the macro; `code` is then the input.
    pub changed: bool,
    pub scripts_generated: usize,
}

impl ModuleOutput {
    fn unchanged(source: &str) -> Self {
        Self {
            code: source.to_string(),
            changed: false,
            scripts_generated: 0,
        }
    }
}

/// A replacement of `start..end` in the text being rewritten.
struct Edit {
    start: u32,
    end: u32,
    text: String,
}

/// Expand the placeholders of one JS/JSX/TS module.
///
/// `path` only selects the dialect from its extension.
pub fn transform_module(
    source: &str,
    path: Option<&Path>,
    options: &MacroOptions,
) -> Result<ModuleOutput, MacroError> {
    let lowering = OxcLowering::new(options.target.clone()).with_typescript(source_type_for(path).is_typescript());
    transform_module_with(source, path, options, lowering, IdentifierAllocator::new())
}

pub fn transform_module_with<L: Lowering>(
    source: &str,
    path: Option<&Path>,
    options: &MacroOptions,
    lowering: L,
    ids: IdentifierAllocator,
) -> Result<ModuleOutput, MacroError> {
    if !source.contains(options.macro_module.as_str()) {
        return Ok(ModuleOutput::unchanged(source));
    }

    let source_type = source_type_for(path);
    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, source, source_type).parse();
    if !ret.errors.is_empty() {
        return Err(syntax_error(&ret.errors));
    }

    let Some((scope, mut edits)) = macro_imports(&ret.program, &options.macro_module)? else {
        return Ok(ModuleOutput::unchanged(source));
    };

    debug!(
        path = ?path,
        placeholders = ?scope.names().collect::<Vec<_>>(),
        "expanding macro module"
    );

    let mut rewriter = ModuleRewriter {
        scope,
        source_type,
        transform: TemplateMacroTransform::with_parts(options.mode, lowering, ids),
    };
    edits.extend(rewriter.rewrite_program(&ret.program, source, 0)?);

    let code = apply_edits(source, edits);
    debug!(
        path = ?path,
        expanded = rewriter.transform.expanded(),
        scripts = rewriter.transform.scripts_generated(),
        "macro module done"
    );
    Ok(ModuleOutput {
        code,
        changed: true,
        scripts_generated: rewriter.transform.scripts_generated(),
    })
}

fn source_type_for(path: Option<&Path>) -> SourceType {
    let Some(source_type) = path.and_then(|p| SourceType::from_path(p).ok()) else {
        return SourceType::default().with_module(true).with_jsx(true);
    };
    if source_type.is_typescript() {
        source_type
    } else {
        source_type.with_jsx(true)
    }
}

fn syntax_error<E: std::fmt::Display>(errors: &[E]) -> MacroError {
    MacroError::Syntax {
        message: errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; "),
        span: None,
    }
}

/// Bindings imported from the macro module, plus edits deleting those imports.
///
/// `None` when nothing is imported from it.
fn macro_imports(
    program: &Program<'_>,
    macro_module: &str,
) -> Result<Option<(PlaceholderScope, Vec<Edit>)>, MacroError> {
    let mut scope = PlaceholderScope::new();
    let mut edits = Vec::new();

    for stmt in &program.body {
        let Statement::ImportDeclaration(decl) = stmt else {
            continue;
        };
        if decl.source.value.as_str() != macro_module {
            continue;
        }
        for specifier in decl.specifiers.iter().flatten() {
            match specifier {
                ImportDeclarationSpecifier::ImportSpecifier(s) => {
                    let imported = s.imported.name();
                    let Some(kind) = PlaceholderKind::from_export(imported.as_str()) else {
                        return Err(unknown_macro(imported.as_str(), s.span));
                    };
                    scope.bind(s.local.name.as_str(), kind);
                }
                ImportDeclarationSpecifier::ImportDefaultSpecifier(s) => {
                    return Err(unknown_macro("default", s.span));
                }
                ImportDeclarationSpecifier::ImportNamespaceSpecifier(s) => {
                    return Err(unknown_macro("*", s.span));
                }
            }
        }
        edits.push(Edit {
            start: decl.span.start,
            end: decl.span.end,
            text: String::new(),
        });
    }

    Ok((!edits.is_empty()).then_some((scope, edits)))
}

fn unknown_macro(export: &str, span: OxcSpan) -> MacroError {
    UsageError::new(UsageErrorKind::UnknownMacro, export, to_span(span, 0))
        .with_detail(export)
        .into()
}

fn to_span(span: OxcSpan, base: u32) -> Span {
    Span::new(span.start, span.end).offset(base)
}

/// Apply non-overlapping edits back to front so earlier offsets stay valid.
fn apply_edits(source: &str, mut edits: Vec<Edit>) -> String {
    edits.sort_by(|a, b| b.start.cmp(&a.start));
    let mut out = source.to_string();
    for edit in edits {
        out.replace_range(edit.start as usize..edit.end as usize, &edit.text);
    }
    out
}

/// Per-module state shared by the outer program and every nested expression.
struct ModuleRewriter<L> {
    scope: PlaceholderScope,
    source_type: SourceType,
    transform: TemplateMacroTransform<L>,
}

impl<L: Lowering> ModuleRewriter<L> {
    /// Edits for every outermost JSX tree in `program` that mentions a placeholder.
    ///
    /// `text` is the source `program` was parsed from; `base` is where `text`
    /// starts in the file, for error positions.
    fn rewrite_program(
        &mut self,
        program: &Program<'_>,
        text: &str,
        base: u32,
    ) -> Result<Vec<Edit>, MacroError> {
        let mut visitor = TemplateVisitor {
            rewriter: self,
            text,
            base,
            edits: Vec::new(),
            error: None,
        };
        visitor.visit_program(program);
        match visitor.error {
            Some(err) => Err(err),
            None => Ok(visitor.edits),
        }
    }

    /// Rewrite an embedded expression that starts at file offset `start`.
    fn rewrite_expression(&mut self, expr: &str, start: u32) -> Result<String, MacroError> {
        if !self.scope.mentions(expr) {
            return Ok(expr.to_string());
        }
        let wrapped = format!("({expr}\n)");
        let allocator = Allocator::default();
        let ret = Parser::new(&allocator, &wrapped, self.source_type).parse();
        if !ret.errors.is_empty() {
            return Err(syntax_error(&ret.errors));
        }
        // `wrapped[1]` is `expr[0]`, which sits at `start` in the file.
        let edits = self.rewrite_program(&ret.program, &wrapped, start.saturating_sub(1))?;
        let out = apply_edits(&wrapped, edits);
        Ok(out[1..out.len() - 2].to_string())
    }
}

struct TemplateVisitor<'r, 't, L> {
    rewriter: &'r mut ModuleRewriter<L>,
    text: &'t str,
    base: u32,
    edits: Vec<Edit>,
    error: Option<MacroError>,
}

enum Root<'n, 'a> {
    Element(&'n JSXElement<'a>),
    Fragment(&'n JSXFragment<'a>),
}

impl<'r, 't, L: Lowering> TemplateVisitor<'r, 't, L> {
    fn slice(&self, span: OxcSpan) -> &'t str {
        &self.text[span.start as usize..span.end as usize]
    }

    fn span(&self, span: OxcSpan) -> Span {
        to_span(span, self.base)
    }

    fn root(&mut self, root: Root<'_, '_>) {
        if self.error.is_some() {
            return;
        }
        let span = match &root {
            Root::Element(el) => el.span,
            Root::Fragment(f) => f.span,
        };
        if !self.rewriter.scope.mentions(self.slice(span)) {
            return;
        }
        let converted = match root {
            Root::Element(el) => self.element(el),
            Root::Fragment(f) => self.fragment(f),
        };
        match converted.and_then(|node| self.rewriter.transform.transform(node)) {
            Ok(node) => self.edits.push(Edit {
                start: span.start,
                end: span.end,
                text: print_node(&node),
            }),
            Err(err) => self.error = Some(err),
        }
    }

    fn element(&mut self, el: &JSXElement<'_>) -> Result<TemplateNode, MacroError> {
        let tag = self.slice(el.opening_element.name.span());
        let mut attributes = Vec::with_capacity(el.opening_element.attributes.len());
        for item in &el.opening_element.attributes {
            attributes.push(self.attribute(item)?);
        }
        let element = Element {
            tag: tag.to_string(),
            attributes,
            children: self.children(&el.children)?,
            self_closing: el.closing_element.is_none(),
            span: self.span(el.span),
        };
        Ok(match self.rewriter.scope.kind_of(tag) {
            Some(kind) => TemplateNode::Placeholder(Placeholder {
                kind,
                name: tag.to_string(),
                element,
            }),
            None => TemplateNode::Element(element),
        })
    }

    fn fragment(&mut self, f: &JSXFragment<'_>) -> Result<TemplateNode, MacroError> {
        Ok(TemplateNode::Fragment(Fragment {
            children: self.children(&f.children)?,
            span: self.span(f.span),
        }))
    }

    fn children(&mut self, children: &[JSXChild<'_>]) -> Result<Vec<TemplateNode>, MacroError> {
        let mut out = Vec::with_capacity(children.len());
        for child in children {
            let node = match child {
                JSXChild::Text(t) => TemplateNode::Text(Text {
                    raw: self.slice(t.span).to_string(),
                    span: self.span(t.span),
                }),
                JSXChild::Element(el) => self.element(el)?,
                JSXChild::Fragment(f) => self.fragment(f)?,
                JSXChild::ExpressionContainer(c) => TemplateNode::Expression(self.container(c)?),
                JSXChild::Spread(s) => {
                    let argument = self.embedded(s.expression.span())?;
                    TemplateNode::Expression(Expression::new(format!("...{argument}"), self.span(s.span)))
                }
            };
            out.push(node);
        }
        Ok(out)
    }

    fn attribute(&mut self, item: &JSXAttributeItem<'_>) -> Result<Attribute, MacroError> {
        match item {
            JSXAttributeItem::Attribute(attr) => {
                let value = match &attr.value {
                    None => AttrValue::Bare,
                    Some(JSXAttributeValue::StringLiteral(lit)) => AttrValue::Literal(StringLiteral {
                        value: lit.value.to_string(),
                        raw: self.slice(lit.span).to_string(),
                    }),
                    Some(JSXAttributeValue::ExpressionContainer(c)) => AttrValue::Expression(self.container(c)?),
                    Some(JSXAttributeValue::Element(el)) => {
                        AttrValue::Expression(Expression::new(self.embedded(el.span)?, self.span(el.span)))
                    }
                    Some(JSXAttributeValue::Fragment(f)) => {
                        AttrValue::Expression(Expression::new(self.embedded(f.span)?, self.span(f.span)))
                    }
                };
                Ok(Attribute::Named {
                    name: self.slice(attr.name.span()).to_string(),
                    value,
                    span: self.span(attr.span),
                })
            }
            JSXAttributeItem::SpreadAttribute(spread) => Ok(Attribute::Spread {
                argument: Expression::new(self.embedded(spread.argument.span())?, self.span(spread.argument.span())),
                span: self.span(spread.span),
            }),
        }
    }

    /// The inside of `{ ... }`, with any placeholders in it expanded.
    fn container(&mut self, c: &JSXExpressionContainer<'_>) -> Result<Expression, MacroError> {
        let inner = OxcSpan::new(c.span.start + 1, c.span.end - 1);
        let source = match &c.expression {
            JSXExpression::EmptyExpression(_) => self.slice(inner).to_string(),
            _ => self.embedded(inner)?,
        };
        Ok(Expression::new(source, self.span(inner)))
    }

    fn embedded(&mut self, span: OxcSpan) -> Result<String, MacroError> {
        let text = self.slice(span);
        self.rewriter.rewrite_expression(text, span.start + self.base)
    }
}

impl<'a, L: Lowering> Visit<'a> for TemplateVisitor<'_, '_, L> {
    fn visit_jsx_element(&mut self, it: &JSXElement<'a>) {
        self.root(Root::Element(it));
    }

    fn visit_jsx_fragment(&mut self, it: &JSXFragment<'a>) {
        self.root(Root::Fragment(it));
    }

    fn visit_identifier_reference(&mut self, it: &IdentifierReference<'a>) {
        if self.error.is_some() {
            return;
        }
        let name = it.name.as_str();
        if self.rewriter.scope.kind_of(name).is_some() {
            self.error = Some(UsageError::new(UsageErrorKind::NotAnElement, name, self.span(it.span)).into());
        }
    }
}
