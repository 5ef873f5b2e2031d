//! Compile-time expansion of the `Component` and `Window` placeholders.
//!
//! Event attributes on placeholders are moved out of the markup into small
//! inline scripts that find their element at page load and attach listeners,
//! so the rendered page needs no client runtime.

mod error;
mod events;
mod ident;
mod lowering;
mod module;
mod placeholder;
mod rewrite;
mod snippet;
mod transform;

use std::fmt;
use std::str::FromStr;

pub use error::{CodegenError, MacroError, UsageError, UsageErrorKind};
pub use events::{classify_attribute, extract_event_handlers, AttributeClass, EventHandler};
pub use ident::IdentifierAllocator;
pub use lowering::{Lowering, OxcLowering, DEFAULT_TARGET};
pub use module::{transform_module, transform_module_with, ModuleOutput};
pub use placeholder::{resolve, resolve_target, Resolution, ResolvedTarget, TargetKind, TARGET_ATTRIBUTE};
pub use rewrite::FragmentRewriter;
pub use snippet::{Attachment, GeneratedScript, SnippetCompiler};
pub use transform::TemplateMacroTransform;

/// Module specifier the placeholders are imported from by default.
pub const DEFAULT_MACRO_MODULE: &str = "steady/macro";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum BuildMode {
    Development,
    #[default]
    Production,
}

impl BuildMode {
    pub fn is_production(self) -> bool {
        self == BuildMode::Production
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BuildMode::Development => "development",
            BuildMode::Production => "production",
        }
    }
}

impl fmt::Display for BuildMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BuildMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "development" | "dev" => Ok(BuildMode::Development),
            "production" | "prod" => Ok(BuildMode::Production),
            other => Err(format!("unknown build mode `{other}`, expected development or production")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacroOptions {
    pub mode: BuildMode,
    /// Syntax level generated scripts are lowered to, e.g. `es2015`.
    pub target: String,
    /// Import specifier that marks a module as using the placeholders.
    pub macro_module: String,
}

impl MacroOptions {
    pub fn new(mode: BuildMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }
}

impl Default for MacroOptions {
    fn default() -> Self {
        Self {
            mode: BuildMode::default(),
            target: DEFAULT_TARGET.to_string(),
            macro_module: DEFAULT_MACRO_MODULE.to_string(),
        }
    }
}
