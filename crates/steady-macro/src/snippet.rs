use std::sync::LazyLock;

use regex::Regex;
use steady_template::{AttrValue, Attribute, Element, Expression, Span, TemplateNode};

use crate::error::CodegenError;
use crate::events::EventHandler;
use crate::lowering::{Lowering, OxcLowering};
use crate::BuildMode;

static SCRIPT_CLOSE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)</(script)").unwrap());

/// Where a generated script attaches its listeners.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attachment {
    /// The element carrying this id, located relative to the script tag itself.
    Element(String),
    /// The page's root scope (`window`).
    Global,
}

/// An inline behavior script produced for one placeholder expansion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedScript {
    /// `None` for global scripts.
    pub anchor_id: Option<String>,
    pub source_code: String,
    pub is_minified: bool,
}

impl GeneratedScript {
    /// The `<script dangerouslySetInnerHTML={{ __html: "..." }} />` element that carries the code.
    pub fn into_node(self) -> TemplateNode {
        let html = serde_json::Value::String(self.source_code).to_string();
        let value = Expression::new(format!("{{ __html: {html} }}"), Span::default());
        TemplateNode::Element(
            Element::new("script")
                .with_attribute(Attribute::named("dangerouslySetInnerHTML", AttrValue::Expression(value))),
        )
    }
}

/// Builds self-locating listener scripts and runs them through a [`Lowering`].
pub struct SnippetCompiler<L = OxcLowering> {
    mode: BuildMode,
    lowering: L,
}

impl<L: Lowering> SnippetCompiler<L> {
    pub fn new(mode: BuildMode, lowering: L) -> Self {
        Self { mode, lowering }
    }

    pub fn mode(&self) -> BuildMode {
        self.mode
    }

    pub fn compile(
        &self,
        handlers: &[EventHandler],
        attachment: &Attachment,
    ) -> Result<GeneratedScript, CodegenError> {
        let raw = match attachment {
            Attachment::Element(id) => element_source(handlers, id),
            Attachment::Global => global_source(handlers),
        };
        let minify = self.mode.is_production();
        let lowered = self.lowering.lower(&raw, minify)?;
        let source_code = SCRIPT_CLOSE_RE.replace_all(lowered.trim_end(), r"<\/$1").into_owned();

        tracing::debug!(
            handlers = handlers.len(),
            anchor = ?attachment,
            minify,
            bytes = source_code.len(),
            "compiled event snippet"
        );

        Ok(GeneratedScript {
            anchor_id: match attachment {
                Attachment::Element(id) => Some(id.clone()),
                Attachment::Global => None,
            },
            source_code,
            is_minified: minify,
        })
    }
}

fn js_string(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}

fn listener_lines(target: &str, handlers: &[EventHandler]) -> String {
    let mut out = String::new();
    for h in handlers {
        out.push_str(&format!(
            "  {target}.addEventListener({}, ({}));\n",
            js_string(&h.event_name),
            h.handler.source
        ));
    }
    out
}

/// The script runs right after its anchor: the anchor is the previous element
/// sibling of the executing script, or a descendant of it when the script sits
/// behind a wrapping element.
fn element_source(handlers: &[EventHandler], anchor_id: &str) -> String {
    let id = js_string(anchor_id);
    let selector = js_string(&format!("#{anchor_id}"));
    format!(
        "(function () {{\n\
         \x20 var currentScript = document.currentScript || (function () {{\n\
         \x20   var scripts = document.getElementsByTagName(\"script\");\n\
         \x20   return scripts[scripts.length - 1];\n\
         \x20 }})();\n\
         \x20 var previousSibling = currentScript.previousElementSibling;\n\
         \x20 var eventTarget = previousSibling.id === {id} ? previousSibling : previousSibling.querySelector({selector});\n\
         {listeners}\
         }})();\n",
        listeners = listener_lines("eventTarget", handlers),
    )
}

fn global_source(handlers: &[EventHandler]) -> String {
    listener_lines("window", handlers)
        .lines()
        .map(str::trim_start)
        .collect::<Vec<_>>()
        .join("\n")
}
