use crate::{AttrValue, Attribute, Element, TemplateNode};

/// Serialize a template tree back to JSX source.
///
/// Text, string literals and embedded expressions are written exactly as they
/// were read, so an untouched subtree prints byte-for-byte like its source
/// apart from whitespace between attributes.
pub fn print_node(node: &TemplateNode) -> String {
    let mut out = String::new();
    write_node(node, &mut out);
    out
}

fn write_node(node: &TemplateNode, out: &mut String) {
    match node {
        TemplateNode::Element(el) => write_element(el, out),
        TemplateNode::Placeholder(p) => write_element(&p.element, out),
        TemplateNode::Text(text) => out.push_str(&text.raw),
        TemplateNode::Expression(expr) => {
            out.push('{');
            out.push_str(&expr.source);
            out.push('}');
        }
        TemplateNode::Fragment(fragment) => {
            out.push_str("<>");
            for child in &fragment.children {
                write_node(child, out);
            }
            out.push_str("</>");
        }
    }
}

fn write_element(el: &Element, out: &mut String) {
    out.push('<');
    out.push_str(&el.tag);
    for attr in &el.attributes {
        out.push(' ');
        write_attribute(attr, out);
    }

    if el.self_closing && el.children.is_empty() {
        out.push_str(" />");
        return;
    }

    out.push('>');
    for child in &el.children {
        write_node(child, out);
    }
    out.push_str("</");
    out.push_str(&el.tag);
    out.push('>');
}

fn write_attribute(attr: &Attribute, out: &mut String) {
    match attr {
        Attribute::Named { name, value, .. } => {
            out.push_str(name);
            match value {
                AttrValue::Literal(lit) => {
                    out.push('=');
                    out.push_str(&lit.raw);
                }
                AttrValue::Expression(expr) => {
                    out.push_str("={");
                    out.push_str(&expr.source);
                    out.push('}');
                }
                AttrValue::Bare => {}
            }
        }
        Attribute::Spread { argument, .. } => {
            out.push_str("{...");
            out.push_str(&argument.source);
            out.push('}');
        }
    }
}
