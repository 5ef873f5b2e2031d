use steady_template::Span;
use thiserror::Error;

/// Ways a placeholder can be misused in a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsageErrorKind {
    MissingTarget,
    UnsupportedTarget,
    DuplicateTarget,
    NotAnElement,
    HandlerNotExpression,
    DynamicAnchorId,
    UnknownMacro,
}

/// Malformed placeholder usage found while expanding one file.
///
/// Fails that file only; `span` points into the file being transformed.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{}", self.message())]
pub struct UsageError {
    pub kind: UsageErrorKind,
    /// Local name of the placeholder involved (or the offending macro export).
    pub placeholder: String,
    pub span: Span,
    /// Kind-specific subject, e.g. the event attribute name.
    pub detail: String,
}

impl UsageError {
    pub fn new(kind: UsageErrorKind, placeholder: &str, span: Span) -> Self {
        Self {
            kind,
            placeholder: placeholder.to_string(),
            span,
            detail: String::new(),
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = detail.into();
        self
    }

    pub fn message(&self) -> String {
        let p = &self.placeholder;
        match self.kind {
            UsageErrorKind::MissingTarget => format!(
                "missing required target attribute `as` on {p}: <{p} as=\"div\" />"
            ),
            UsageErrorKind::UnsupportedTarget => format!(
                "unsupported target value: `as` should be a string or another component: \
                 <{p} as=\"div\" />, <{p} as={{MyAwesomeButton}} />"
            ),
            UsageErrorKind::DuplicateTarget => {
                format!("duplicate target attribute: <{p}> takes exactly one `as` attribute")
            }
            UsageErrorKind::NotAnElement => {
                format!("{p} must be used as an element: <{p} ... />")
            }
            UsageErrorKind::HandlerNotExpression => format!(
                "event handler `{}` on <{p}> must be an expression: {}={{event => ...}}",
                self.detail, self.detail
            ),
            UsageErrorKind::DynamicAnchorId => format!(
                "`id` on <{p}> must be a string literal when event handlers are attached"
            ),
            UsageErrorKind::UnknownMacro => format!(
                "`{}` is not exported by the macro module; expected Component or Window",
                self.detail
            ),
        }
    }
}

/// Failure turning handler source into an emitted snippet.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CodegenError {
    #[error("generated snippet does not parse: {message}")]
    Parse { message: String },

    #[error("`{construct}` is not available in an inline page script")]
    Forbidden { construct: String },

    #[error("unsupported target syntax level `{target}`: {message}")]
    Target { target: String, message: String },

    #[error("failed to lower generated snippet: {message}")]
    Lower { message: String },

    #[error("failed to minify generated snippet: {message}")]
    Minify { message: String },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum MacroError {
    #[error(transparent)]
    Usage(#[from] UsageError),

    #[error(transparent)]
    Codegen(#[from] CodegenError),

    #[error("syntax error: {message}")]
    Syntax { message: String, span: Option<Span> },
}

impl MacroError {
    /// Where in the file the error points, when known.
    pub fn span(&self) -> Option<Span> {
        match self {
            MacroError::Usage(e) => Some(e.span),
            MacroError::Codegen(_) => None,
            MacroError::Syntax { span, .. } => *span,
        }
    }
}
