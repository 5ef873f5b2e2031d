use std::sync::LazyLock;

use regex::Regex;
use steady_template::{AttrValue, Attribute, Element, Expression, Span};

use crate::error::{UsageError, UsageErrorKind};

static EVENT_ATTR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^on[A-Z]\w+$").unwrap());

/// How an attribute name is treated by the macro.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeClass {
    Plain,
    /// Event binding; carries the DOM event name (`onMouseOver` → `mouseover`).
    Event(String),
}

/// Classify an attribute by name alone.
pub fn classify_attribute(name: &str) -> AttributeClass {
    if EVENT_ATTR_RE.is_match(name) {
        AttributeClass::Event(name["on".len()..].to_lowercase())
    } else {
        AttributeClass::Plain
    }
}

/// One event binding lifted off an element.
#[derive(Debug, Clone, PartialEq)]
pub struct EventHandler {
    pub event_name: String,
    pub handler: Expression,
    /// The attribute as written, e.g. `onClick`.
    pub attribute_name: String,
    pub span: Span,
}

/// Remove every event attribute from `element` and return them in source order.
///
/// `placeholder` names the placeholder being expanded, for error messages.
/// An event attribute with a literal or missing value is a usage error; the
/// element is left untouched in that case.
pub fn extract_event_handlers(
    element: &mut Element,
    placeholder: &str,
) -> Result<Vec<EventHandler>, UsageError> {
    let mut handlers = Vec::new();
    let mut keep = Vec::with_capacity(element.attributes.len());

    for attr in &element.attributes {
        let Attribute::Named { name, value, span } = attr else {
            keep.push(true);
            continue;
        };
        let AttributeClass::Event(event_name) = classify_attribute(name) else {
            keep.push(true);
            continue;
        };
        let AttrValue::Expression(handler) = value else {
            return Err(
                UsageError::new(UsageErrorKind::HandlerNotExpression, placeholder, *span)
                    .with_detail(name.as_str()),
            );
        };
        handlers.push(EventHandler {
            event_name,
            handler: handler.clone(),
            attribute_name: name.clone(),
            span: *span,
        });
        keep.push(false);
    }

    let mut flags = keep.into_iter();
    element.attributes.retain(|_| flags.next().unwrap_or(true));
    Ok(handlers)
}
