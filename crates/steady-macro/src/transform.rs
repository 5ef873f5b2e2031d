use steady_template::{Placeholder, TemplateNode};
use tracing::{debug, warn};

use crate::error::MacroError;
use crate::events::extract_event_handlers;
use crate::ident::IdentifierAllocator;
use crate::lowering::{Lowering, OxcLowering};
use crate::placeholder::{resolve, Resolution, TargetKind};
use crate::rewrite::FragmentRewriter;
use crate::snippet::SnippetCompiler;
use crate::BuildMode;

/// Expands every placeholder in a template tree.
///
/// One instance per source file: the identifier allocator and the script
/// counter are local to it.
pub struct TemplateMacroTransform<L = OxcLowering> {
    rewriter: FragmentRewriter<L>,
    expanded: usize,
}

impl<L: Lowering> TemplateMacroTransform<L> {
    pub fn with_parts(mode: BuildMode, lowering: L, ids: IdentifierAllocator) -> Self {
        Self {
            rewriter: FragmentRewriter::new(SnippetCompiler::new(mode, lowering), ids),
            expanded: 0,
        }
    }

    /// Placeholders expanded so far.
    pub fn expanded(&self) -> usize {
        self.expanded
    }

    pub fn scripts_generated(&self) -> usize {
        self.rewriter.scripts_generated()
    }

    /// Rewrite `node` depth-first, children before their parent.
    ///
    /// A tree without placeholders comes back unchanged.
    pub fn transform(&mut self, node: TemplateNode) -> Result<TemplateNode, MacroError> {
        match node {
            TemplateNode::Element(mut el) => {
                el.children = self.transform_all(el.children)?;
                Ok(TemplateNode::Element(el))
            }
            TemplateNode::Fragment(mut fragment) => {
                fragment.children = self.transform_all(fragment.children)?;
                Ok(TemplateNode::Fragment(fragment))
            }
            TemplateNode::Placeholder(placeholder) => self.expand(placeholder),
            node @ (TemplateNode::Text(_) | TemplateNode::Expression(_)) => Ok(node),
        }
    }

    fn transform_all(&mut self, nodes: Vec<TemplateNode>) -> Result<Vec<TemplateNode>, MacroError> {
        nodes.into_iter().map(|n| self.transform(n)).collect()
    }

    fn expand(&mut self, mut placeholder: Placeholder) -> Result<TemplateNode, MacroError> {
        let children = std::mem::take(&mut placeholder.element.children);
        placeholder.element.children = self.transform_all(children)?;

        let resolution = resolve(&placeholder)?;
        let Placeholder { name, mut element, .. } = placeholder;

        let node = match resolution {
            Resolution::RenderAs(target) => {
                element.retarget(&target.name);
                let handlers = extract_event_handlers(&mut element, &name)?;
                debug!(
                    placeholder = %name,
                    target = %target.name,
                    kind = ?target.kind,
                    handlers = handlers.len(),
                    "expanding render-as placeholder"
                );
                if target.kind == TargetKind::Component && !handlers.is_empty() {
                    warn!(
                        placeholder = %name,
                        target = %target.name,
                        "listeners on a component target find it by `id`; the component must render that prop onto its root element"
                    );
                }
                self.rewriter.render_as(element, &handlers, &name)?
            }
            Resolution::GlobalBehavior => {
                let handlers = extract_event_handlers(&mut element, &name)?;
                if !element.attributes.is_empty() {
                    let dropped: Vec<&str> = element.attributes.iter().filter_map(|a| a.name()).collect();
                    warn!(
                        placeholder = %name,
                        ?dropped,
                        "non-event attributes on a global placeholder are dropped"
                    );
                }
                debug!(placeholder = %name, handlers = handlers.len(), "expanding global placeholder");
                self.rewriter.global(element, &handlers)?
            }
        };

        self.expanded += 1;
        Ok(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{CodegenError, UsageErrorKind};
    use steady_template::{
        print_node, AttrValue, Attribute, Element, Expression, PlaceholderKind, Span, StringLiteral,
    };

    struct Passthrough;

    impl Lowering for Passthrough {
        fn lower(&self, source: &str, _minify: bool) -> Result<String, CodegenError> {
            Ok(source.to_string())
        }
    }

    fn transformer() -> TemplateMacroTransform<Passthrough> {
        TemplateMacroTransform::with_parts(BuildMode::Development, Passthrough, IdentifierAllocator::with_seed(1))
    }

    fn lit(name: &str, value: &str) -> Attribute {
        Attribute::named(name, AttrValue::Literal(StringLiteral::new(value)))
    }

    fn expr(name: &str, src: &str) -> Attribute {
        Attribute::named(name, AttrValue::Expression(Expression::new(src, Span::new(20, 30))))
    }

    fn render_as(element: Element) -> TemplateNode {
        TemplateNode::Placeholder(Placeholder {
            kind: PlaceholderKind::RenderAs,
            name: "Component".into(),
            element,
        })
    }

    fn global(element: Element) -> TemplateNode {
        TemplateNode::Placeholder(Placeholder {
            kind: PlaceholderKind::GlobalBehavior,
            name: "Window".into(),
            element,
        })
    }

    fn count(haystack: &str, needle: &str) -> usize {
        haystack.matches(needle).count()
    }

    // ─── RenderAs ───────────────────────────────────────────────────

    #[test]
    fn test_static_target_without_events() {
        let node = render_as(
            Element::new("Component")
                .with_attribute(lit("as", "section"))
                .with_attribute(lit("class", "hero"))
                .with_child(TemplateNode::text("Hi")),
        );
        let out = transformer().transform(node).unwrap();
        let printed = print_node(&out);
        assert_eq!(printed, r#"<section class="hero">Hi</section>"#);
        assert!(!printed.contains(" as="));
        assert!(!printed.contains(" id="));
    }

    #[test]
    fn test_events_relocated_into_one_script() {
        let node = render_as(
            Element::new("Component")
                .with_attribute(lit("as", "button"))
                .with_attribute(expr("onClick", "fn"))
                .with_attribute(expr("onMouseOver", "hover"))
                .with_child(TemplateNode::text("Go")),
        );
        let mut t = transformer();
        let out = t.transform(node).unwrap();
        let TemplateNode::Fragment(fragment) = &out else { panic!("expected fragment") };
        assert_eq!(fragment.children.len(), 2);

        let TemplateNode::Element(button) = &fragment.children[0] else { panic!("expected element") };
        assert_eq!(button.tag, "button");
        assert_eq!(button.positions_of("id").len(), 1);
        assert!(button.attribute("onClick").is_none());
        assert!(button.attribute("onMouseOver").is_none());

        let script = print_node(&fragment.children[1]);
        assert!(script.starts_with("<script dangerouslySetInnerHTML="));
        assert_eq!(count(&script, "addEventListener"), 2);
        assert_eq!(t.scripts_generated(), 1);
        assert_eq!(t.expanded(), 1);
    }

    #[test]
    fn test_end_to_end_button() {
        let node = render_as(
            Element::new("Component")
                .with_attribute(lit("as", "button"))
                .with_attribute(expr("onClick", "fn"))
                .with_child(TemplateNode::text("Go")),
        );
        let out = print_node(&transformer().transform(node).unwrap());
        let id = out
            .split("id=\"")
            .nth(1)
            .and_then(|rest| rest.split('"').next())
            .unwrap()
            .to_string();
        assert!(out.starts_with(&format!("<><button id=\"{id}\">Go</button><script ")));
        assert!(out.contains(&format!("previousSibling.id === \\\"{id}\\\"")));
        assert!(out.contains("eventTarget.addEventListener(\\\"click\\\", (fn));"));
        assert!(out.ends_with(" /></>"));
    }

    #[test]
    fn test_component_target() {
        let node = render_as(
            Element::new("Component")
                .with_attribute(expr("as", "MyAwesomeButton"))
                .with_attribute(lit("label", "x")),
        );
        assert_eq!(print_node(&transformer().transform(node).unwrap()), r#"<MyAwesomeButton label="x" />"#);
    }

    #[test]
    fn test_missing_target_is_usage_error() {
        let node = render_as(Element::new("Component").with_attribute(expr("onClick", "H")));
        let err = transformer().transform(node).unwrap_err();
        assert!(err.to_string().contains("missing required target attribute"));
        let MacroError::Usage(usage) = err else { panic!("expected usage error") };
        assert_eq!(usage.kind, UsageErrorKind::MissingTarget);
    }

    #[test]
    fn test_dynamic_target_is_usage_error() {
        let node = render_as(Element::new("Component").with_attribute(expr("as", "computeTag()")));
        let err = transformer().transform(node).unwrap_err();
        assert!(err.to_string().contains("unsupported target value"));
        assert_eq!(err.span(), Some(Span::default()));
    }

    // ─── GlobalBehavior ─────────────────────────────────────────────

    #[test]
    fn test_global_registers_one_listener() {
        let node = global(
            Element::new("Window")
                .with_attribute(expr("onClick", "H"))
                .with_child(TemplateNode::text("body")),
        );
        let mut t = transformer();
        let printed = print_node(&t.transform(node).unwrap());
        assert_eq!(count(&printed, "window.addEventListener(\\\"click\\\", (H))"), 1);
        assert!(printed.starts_with("<>body<script "));
        assert!(!printed.contains("Window"));
        assert_eq!(t.scripts_generated(), 1);
    }

    #[test]
    fn test_global_without_events_adds_nothing() {
        let node = global(
            Element::new("Window")
                .with_attribute(lit("class", "ignored"))
                .with_child(TemplateNode::text("a")),
        );
        let mut t = transformer();
        assert_eq!(print_node(&t.transform(node).unwrap()), "<>a</>");
        assert_eq!(t.scripts_generated(), 0);
    }

    // ─── Traversal ──────────────────────────────────────────────────

    #[test]
    fn test_idempotent_without_placeholders() {
        let tree = TemplateNode::Element(
            Element::new("main")
                .with_attribute(lit("class", "x"))
                .with_attribute(expr("onClick", "f"))
                .with_child(TemplateNode::Expression(Expression::new("value", Span::new(1, 2)))),
        );
        let mut t = transformer();
        let once = t.transform(tree.clone()).unwrap();
        assert_eq!(once, tree);
        assert_eq!(t.transform(once).unwrap(), tree);
        assert_eq!(t.scripts_generated(), 0);
    }

    #[test]
    fn test_nested_placeholders_expand_depth_first() {
        let inner = render_as(
            Element::new("Component")
                .with_attribute(lit("as", "a"))
                .with_attribute(expr("onClick", "inner")),
        );
        let outer = render_as(
            Element::new("Component")
                .with_attribute(lit("as", "nav"))
                .with_attribute(expr("onFocus", "outer"))
                .with_child(inner),
        );
        let mut t = transformer();
        let out = t.transform(outer).unwrap();
        assert!(!out.contains_placeholder());
        let printed = print_node(&out);
        assert!(printed.starts_with("<><nav id=\""));
        assert_eq!(count(&printed, "<script "), 2);
        assert_eq!(t.expanded(), 2);
        // Inner expansion allocates first.
        assert!(printed.contains("<a id=\"s000000010\" />"));
        assert!(printed.contains("<nav id=\"s000000011\">"));
    }
}
