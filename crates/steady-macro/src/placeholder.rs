use std::sync::LazyLock;

use regex::Regex;
use steady_template::{AttrValue, Attribute, Element, Placeholder, PlaceholderKind};

use crate::error::{UsageError, UsageErrorKind};

/// The attribute that selects what a RenderAs placeholder becomes.
pub const TARGET_ATTRIBUTE: &str = "as";

static TAG_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_.:-]*$").unwrap());

/// JSX reads a lowercase name as an intrinsic element and anything else as
/// a component reference, however the name was written in `as`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    /// Intrinsic element such as `section`.
    Tag,
    /// Component reference such as `MyButton`.
    Component,
}

impl TargetKind {
    fn of(name: &str) -> Self {
        if name.starts_with(|c: char| c.is_ascii_lowercase()) {
            TargetKind::Tag
        } else {
            TargetKind::Component
        }
    }
}

/// The concrete identifier a RenderAs placeholder is rewritten into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTarget {
    pub name: String,
    pub kind: TargetKind,
}

/// How a placeholder has to be rewritten.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    RenderAs(ResolvedTarget),
    GlobalBehavior,
}

pub fn resolve(placeholder: &Placeholder) -> Result<Resolution, UsageError> {
    match placeholder.kind {
        PlaceholderKind::RenderAs => {
            resolve_target(&placeholder.element, &placeholder.name).map(Resolution::RenderAs)
        }
        PlaceholderKind::GlobalBehavior => Ok(Resolution::GlobalBehavior),
    }
}

/// Read the single statically known `as` attribute of a RenderAs element.
///
/// Accepted values: `as="div"`, `as={"div"}`, `as={MyButton}`. Anything computed,
/// missing, or repeated is rejected.
pub fn resolve_target(element: &Element, placeholder: &str) -> Result<ResolvedTarget, UsageError> {
    let positions = element.positions_of(TARGET_ATTRIBUTE);
    let Some(&index) = positions.first() else {
        return Err(UsageError::new(UsageErrorKind::MissingTarget, placeholder, element.span));
    };
    if let Some(&extra) = positions.get(1) {
        return Err(UsageError::new(
            UsageErrorKind::DuplicateTarget,
            placeholder,
            element.attributes[extra].span(),
        ));
    }

    let attr = &element.attributes[index];
    let unsupported = || UsageError::new(UsageErrorKind::UnsupportedTarget, placeholder, attr.span());

    let name = match attr {
        Attribute::Named {
            value: AttrValue::Literal(lit),
            ..
        } => lit.value.clone(),
        Attribute::Named {
            value: AttrValue::Expression(expr),
            ..
        } => match (expr.as_string_literal(), expr.as_identifier()) {
            (Some(value), _) => value,
            (None, Some(ident)) => ident.to_string(),
            (None, None) => return Err(unsupported()),
        },
        _ => return Err(unsupported()),
    };

    if !TAG_NAME_RE.is_match(&name) {
        return Err(unsupported());
    }

    Ok(ResolvedTarget {
        kind: TargetKind::of(&name),
        name,
    })
}
