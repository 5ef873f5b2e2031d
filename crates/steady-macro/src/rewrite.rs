use steady_template::{AttrValue, Attribute, Element, Fragment, StringLiteral, TemplateNode};

use crate::error::{MacroError, UsageError, UsageErrorKind};
use crate::events::EventHandler;
use crate::ident::IdentifierAllocator;
use crate::lowering::{Lowering, OxcLowering};
use crate::placeholder::TARGET_ATTRIBUTE;
use crate::snippet::{Attachment, SnippetCompiler};

/// Decides the output shape of an expanded placeholder and builds it.
///
/// | placeholder  | handlers | output                                  |
/// |--------------|----------|-----------------------------------------|
/// | RenderAs     | 0        | retargeted element, `as` dropped        |
/// | RenderAs     | 1+       | `<>` element with `id`, script `</>`    |
/// | Global       | 0        | `<>` children `</>`                     |
/// | Global       | 1+       | `<>` children, script `</>`             |
pub struct FragmentRewriter<L = OxcLowering> {
    compiler: SnippetCompiler<L>,
    ids: IdentifierAllocator,
    scripts_generated: usize,
}

impl<L: Lowering> FragmentRewriter<L> {
    pub fn new(compiler: SnippetCompiler<L>, ids: IdentifierAllocator) -> Self {
        Self {
            compiler,
            ids,
            scripts_generated: 0,
        }
    }

    pub fn scripts_generated(&self) -> usize {
        self.scripts_generated
    }

    /// `element` must already be retargeted and stripped of its event attributes.
    pub fn render_as(
        &mut self,
        mut element: Element,
        handlers: &[EventHandler],
        placeholder: &str,
    ) -> Result<TemplateNode, MacroError> {
        let as_index = element.positions_of(TARGET_ATTRIBUTE).first().copied();

        if handlers.is_empty() {
            if let Some(i) = as_index {
                element.attributes.remove(i);
            }
            return Ok(TemplateNode::Element(element));
        }

        let anchor = match existing_anchor(&element, placeholder)? {
            Some(id) => {
                if let Some(i) = as_index {
                    element.attributes.remove(i);
                }
                id
            }
            None => {
                let id = self.ids.allocate();
                let id_attr = Attribute::Named {
                    name: "id".to_string(),
                    value: AttrValue::Literal(StringLiteral::new(id.as_str())),
                    span: as_index.map(|i| element.attributes[i].span()).unwrap_or_default(),
                };
                match as_index {
                    Some(i) => element.attributes[i] = id_attr,
                    None => element.attributes.push(id_attr),
                }
                id
            }
        };

        let script = self.compiler.compile(handlers, &Attachment::Element(anchor))?;
        self.scripts_generated += 1;

        let span = element.span;
        Ok(TemplateNode::Fragment(Fragment {
            children: vec![TemplateNode::Element(element), script.into_node()],
            span,
        }))
    }

    /// Children of a global placeholder, followed by its script when there is one.
    pub fn global(
        &mut self,
        element: Element,
        handlers: &[EventHandler],
    ) -> Result<TemplateNode, MacroError> {
        let mut children = element.children;
        if !handlers.is_empty() {
            let script = self.compiler.compile(handlers, &Attachment::Global)?;
            self.scripts_generated += 1;
            children.push(script.into_node());
        }
        Ok(TemplateNode::Fragment(Fragment {
            children,
            span: element.span,
        }))
    }
}

/// A statically known `id` already on the element doubles as the anchor.
fn existing_anchor(element: &Element, placeholder: &str) -> Result<Option<String>, UsageError> {
    let Some(attr) = element.attribute("id") else {
        return Ok(None);
    };
    let value = match attr.value() {
        Some(AttrValue::Literal(lit)) => Some(lit.value.clone()),
        Some(AttrValue::Expression(expr)) => expr.as_string_literal(),
        _ => None,
    };
    match value {
        Some(id) if !id.is_empty() => Ok(Some(id)),
        _ => Err(UsageError::new(UsageErrorKind::DynamicAnchorId, placeholder, attr.span())),
    }
}
