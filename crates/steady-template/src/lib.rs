mod location;
mod print;

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

pub use location::SourceLocation;
pub use print::print_node;

/// Byte range into the source file a node was read from.
///
/// Synthesized nodes carry `Span::default()`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Span {
    pub start: u32,
    pub end: u32,
}

impl Span {
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    /// Shift a span parsed from a sub-slice back into file coordinates.
    pub fn offset(self, base: u32) -> Self {
        Self {
            start: self.start + base,
            end: self.end + base,
        }
    }

    pub fn is_synthetic(&self) -> bool {
        self.start == 0 && self.end == 0
    }
}

/// The two reserved element kinds that only exist at compile time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlaceholderKind {
    /// `<Component as="div">`: stands in for an arbitrary tag or component.
    RenderAs,
    /// `<Window onLoad={...}>`: binds listeners on the page root, renders no wrapper.
    GlobalBehavior,
}

impl PlaceholderKind {
    /// Map a macro export name onto its placeholder kind.
    pub fn from_export(name: &str) -> Option<Self> {
        match name {
            "Component" => Some(Self::RenderAs),
            "Window" => Some(Self::GlobalBehavior),
            _ => None,
        }
    }
}

/// Local bindings that refer to placeholders in one source file.
///
/// Placeholders are recognized by the name they are imported under, so an
/// aliased import (`import { Component as Box }`) makes `<Box>` the placeholder.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlaceholderScope {
    bindings: BTreeMap<String, PlaceholderKind>,
}

impl PlaceholderScope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&mut self, local: &str, kind: PlaceholderKind) {
        self.bindings.insert(local.to_string(), kind);
    }

    pub fn kind_of(&self, name: &str) -> Option<PlaceholderKind> {
        self.bindings.get(name).copied()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.bindings.keys().map(|k| k.as_str())
    }

    /// Cheap textual pre-check: does `text` mention any bound name as a whole word?
    ///
    /// False positives (names inside strings or comments) are fine, callers
    /// only use this to skip work.
    pub fn mentions(&self, text: &str) -> bool {
        self.bindings.keys().any(|name| contains_word(text, name))
    }
}

fn contains_word(text: &str, word: &str) -> bool {
    let is_ident = |c: char| c.is_alphanumeric() || c == '_' || c == '$';
    text.match_indices(word).any(|(i, _)| {
        let before_ok = text[..i].chars().next_back().map_or(true, |c| !is_ident(c));
        let after_ok = text[i + word.len()..]
            .chars()
            .next()
            .map_or(true, |c| !is_ident(c));
        before_ok && after_ok
    })
}

/// An embedded source expression: the inside of `{ ... }` in a template.
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    pub source: String,
    pub span: Span,
}

static IDENTIFIER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$]*$").unwrap());

/// Identifiers that parse as names but denote literal values.
const LITERAL_KEYWORDS: &[&str] = &["true", "false", "null", "undefined", "this", "NaN", "Infinity"];

impl Expression {
    pub fn new(source: impl Into<String>, span: Span) -> Self {
        Self {
            source: source.into(),
            span,
        }
    }

    /// The identifier name if the expression is a bare identifier reference.
    pub fn as_identifier(&self) -> Option<&str> {
        let s = self.source.trim();
        if IDENTIFIER_RE.is_match(s) && !LITERAL_KEYWORDS.contains(&s) {
            Some(s)
        } else {
            None
        }
    }

    /// The literal value if the expression is a single string literal
    /// (quoted, or a template literal without substitutions).
    pub fn as_string_literal(&self) -> Option<String> {
        let s = self.source.trim();
        let quote = s.chars().next()?;
        if !matches!(quote, '"' | '\'' | '`') || s.len() < 2 || !s.ends_with(quote) {
            return None;
        }
        let inner = &s[1..s.len() - 1];
        if quote == '`' && inner.contains("${") {
            return None;
        }

        let mut value = String::with_capacity(inner.len());
        let mut chars = inner.chars();
        while let Some(ch) = chars.next() {
            match ch {
                '\\' => match chars.next()? {
                    'n' => value.push('\n'),
                    't' => value.push('\t'),
                    other => value.push(other),
                },
                // An unescaped closing quote means this is more than one literal
                c if c == quote => return None,
                '\n' if quote != '`' => return None,
                c => value.push(c),
            }
        }
        Some(value)
    }
}

/// A string literal attribute value, keeping its raw spelling for printing.
#[derive(Debug, Clone, PartialEq)]
pub struct StringLiteral {
    pub value: String,
    pub raw: String,
}

impl StringLiteral {
    /// Build a double-quoted literal. JSX attribute strings have no escapes,
    /// so `value` must not contain `"`.
    pub fn new(value: impl Into<String>) -> Self {
        let value = value.into();
        let raw = format!("\"{value}\"");
        Self { value, raw }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Literal(StringLiteral),
    Expression(Expression),
    /// Attribute written without a value: `<input disabled />`.
    Bare,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Attribute {
    Named {
        name: String,
        value: AttrValue,
        span: Span,
    },
    Spread {
        argument: Expression,
        span: Span,
    },
}

impl Attribute {
    pub fn named(name: impl Into<String>, value: AttrValue) -> Self {
        Attribute::Named {
            name: name.into(),
            value,
            span: Span::default(),
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Attribute::Named { name, .. } => Some(name),
            Attribute::Spread { .. } => None,
        }
    }

    pub fn value(&self) -> Option<&AttrValue> {
        match self {
            Attribute::Named { value, .. } => Some(value),
            Attribute::Spread { .. } => None,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            Attribute::Named { span, .. } | Attribute::Spread { span, .. } => *span,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub tag: String,
    pub attributes: Vec<Attribute>,
    pub children: Vec<TemplateNode>,
    pub self_closing: bool,
    pub span: Span,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attributes: Vec::new(),
            children: Vec::new(),
            self_closing: true,
            span: Span::default(),
        }
    }

    pub fn with_attribute(mut self, attribute: Attribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    pub fn with_child(mut self, child: TemplateNode) -> Self {
        self.children.push(child);
        self.self_closing = false;
        self
    }

    /// Index of every named attribute called `name`, in source order.
    pub fn positions_of(&self, name: &str) -> Vec<usize> {
        self.attributes
            .iter()
            .enumerate()
            .filter(|(_, a)| a.name() == Some(name))
            .map(|(i, _)| i)
            .collect()
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name() == Some(name))
    }

    /// Replace the tag identifier. Opening and closing tags are printed from
    /// the same field, so both change together.
    pub fn retarget(&mut self, tag: &str) {
        self.tag = tag.to_string();
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Placeholder {
    pub kind: PlaceholderKind,
    /// The local name the placeholder was referenced by.
    pub name: String,
    pub element: Element,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Text {
    pub raw: String,
    pub span: Span,
}

/// Tagless container grouping sibling nodes: `<>...</>`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fragment {
    pub children: Vec<TemplateNode>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TemplateNode {
    Element(Element),
    Placeholder(Placeholder),
    Text(Text),
    Expression(Expression),
    Fragment(Fragment),
}

impl TemplateNode {
    pub fn text(raw: impl Into<String>) -> Self {
        TemplateNode::Text(Text {
            raw: raw.into(),
            span: Span::default(),
        })
    }

    /// Whether any placeholder is left anywhere in this subtree.
    pub fn contains_placeholder(&self) -> bool {
        match self {
            TemplateNode::Placeholder(_) => true,
            TemplateNode::Element(e) => e.children.iter().any(|c| c.contains_placeholder()),
            TemplateNode::Fragment(f) => f.children.iter().any(|c| c.contains_placeholder()),
            TemplateNode::Text(_) | TemplateNode::Expression(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expr(src: &str) -> Expression {
        Expression::new(src, Span::default())
    }

    #[test]
    fn test_expression_as_identifier() {
        assert_eq!(expr("MyButton").as_identifier(), Some("MyButton"));
        assert_eq!(expr("  div ").as_identifier(), Some("div"));
        assert_eq!(expr("$el").as_identifier(), Some("$el"));
        assert_eq!(expr("computeTag()").as_identifier(), None);
        assert_eq!(expr("a.b").as_identifier(), None);
        assert_eq!(expr("null").as_identifier(), None);
        assert_eq!(expr("1abc").as_identifier(), None);
    }

    #[test]
    fn test_expression_as_string_literal() {
        assert_eq!(expr(r#""section""#).as_string_literal(), Some("section".into()));
        assert_eq!(expr("'span'").as_string_literal(), Some("span".into()));
        assert_eq!(expr("`nav`").as_string_literal(), Some("nav".into()));
        assert_eq!(expr(r#"'it\'s'"#).as_string_literal(), Some("it's".into()));
        assert_eq!(expr("`a${b}`").as_string_literal(), None);
        assert_eq!(expr(r#""a" + "b""#).as_string_literal(), None);
        assert_eq!(expr("tag").as_string_literal(), None);
    }

    #[test]
    fn test_scope_mentions_whole_words_only() {
        let mut scope = PlaceholderScope::new();
        scope.bind("Component", PlaceholderKind::RenderAs);
        scope.bind("Window", PlaceholderKind::GlobalBehavior);
        assert!(scope.mentions("<Component as=\"div\" />"));
        assert!(scope.mentions("x && <Window onLoad={f} />"));
        assert!(!scope.mentions("<MyComponent />"));
        assert!(!scope.mentions("<Windows />"));
    }

    #[test]
    fn test_scope_aliases() {
        let mut scope = PlaceholderScope::new();
        scope.bind("Box", PlaceholderKind::RenderAs);
        assert_eq!(scope.kind_of("Box"), Some(PlaceholderKind::RenderAs));
        assert_eq!(scope.kind_of("Component"), None);
    }

    #[test]
    fn test_from_export() {
        assert_eq!(PlaceholderKind::from_export("Component"), Some(PlaceholderKind::RenderAs));
        assert_eq!(PlaceholderKind::from_export("Window"), Some(PlaceholderKind::GlobalBehavior));
        assert_eq!(PlaceholderKind::from_export("Document"), None);
    }

    #[test]
    fn test_contains_placeholder_nested() {
        let placeholder = TemplateNode::Placeholder(Placeholder {
            kind: PlaceholderKind::RenderAs,
            name: "Component".into(),
            element: Element::new("Component"),
        });
        let tree = TemplateNode::Element(
            Element::new("div").with_child(TemplateNode::Fragment(Fragment {
                children: vec![placeholder],
                span: Span::default(),
            })),
        );
        assert!(tree.contains_placeholder());
        assert!(!TemplateNode::Element(Element::new("div")).contains_placeholder());
    }

    #[test]
    fn test_element_positions_of() {
        let el = Element::new("div")
            .with_attribute(Attribute::named("as", AttrValue::Literal(StringLiteral::new("a"))))
            .with_attribute(Attribute::named("class", AttrValue::Bare))
            .with_attribute(Attribute::named("as", AttrValue::Literal(StringLiteral::new("b"))));
        assert_eq!(el.positions_of("as"), vec![0, 2]);
        assert!(el.attribute("class").is_some());
    }
}
