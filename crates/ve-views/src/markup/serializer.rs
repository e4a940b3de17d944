//! Storage-format serializer.

use std::fmt::Write;
use std::sync::LazyLock;

use regex::Regex;

use super::ROOT_TAG;
use super::tree::{Closing, Element, Node};

/// Pattern matching the synthetic root's opening and closing tags.
static ROOT_WRAPPER_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"^\s*<{ROOT_TAG}[^>]*>\s*|\s*</{ROOT_TAG}>\s*$"))
        .expect("invalid root wrapper regex")
});

/// Serialize the synthetic root and strip its wrapper tags.
///
/// Whitespace adjacent to the wrapper is stripped along with it.
pub(crate) fn serialize_root(root: &Element) -> String {
    let mut out = String::with_capacity(4096);
    write_element(root, &mut out);
    ROOT_WRAPPER_PATTERN.replace_all(&out, "").into_owned()
}

/// Serialize a single element recursively.
pub(crate) fn write_element(element: &Element, out: &mut String) {
    // Writing to a String never fails
    let _ = write!(out, "<{}", element.name);
    for attr in &element.attrs {
        let quote = attr.quote();
        let delimiter = quote.as_char();
        let raw = attr.raw_value();
        let _ = write!(out, " {}={delimiter}", attr.name);
        if raw.contains(delimiter) {
            out.push_str(&raw.replace(delimiter, quote.reference()));
        } else {
            out.push_str(raw);
        }
        out.push(delimiter);
    }

    if element.children.is_empty() {
        match element.closing {
            Closing::Compact => out.push_str("/>"),
            Closing::Spaced => out.push_str(" />"),
            Closing::Explicit => {
                let _ = write!(out, "></{}>", element.name);
            }
        }
        return;
    }

    out.push('>');
    for child in &element.children {
        write_node(child, out);
    }
    let _ = write!(out, "</{}>", element.name);
}

fn write_node(node: &Node, out: &mut String) {
    match node {
        Node::Element(element) => write_element(element, out),
        Node::Text(raw) => out.push_str(raw),
        Node::CData(text) => {
            out.push_str("<![CDATA[");
            out.push_str(text);
            out.push_str("]]>");
        }
        Node::Comment(text) => {
            out.push_str("<!--");
            out.push_str(text);
            out.push_str("-->");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_write_new_element() {
        let element = Element::new("ac:parameter")
            .with_attr("ac:name", "id")
            .with_text("a<b");
        assert_eq!(
            element.to_markup(),
            r#"<ac:parameter ac:name="id">a&lt;b</ac:parameter>"#
        );
    }

    #[test]
    fn test_write_empty_new_element_is_compact() {
        assert_eq!(Element::new("svg").to_markup(), "<svg/>");
    }

    #[test]
    fn test_write_cdata_verbatim() {
        let element = Element::new("ac:plain-text-body").with_child(Node::CData("<b>&".to_owned()));
        assert_eq!(
            element.to_markup(),
            "<ac:plain-text-body><![CDATA[<b>&]]></ac:plain-text-body>"
        );
    }

    #[test]
    fn test_serialize_root_strips_wrapper() {
        let root = Element::new(ROOT_TAG)
            .with_attr("xmlns:ac", "urn:confluence-prefix:ac")
            .with_child(Element::new("p").with_text("Hi"));
        assert_eq!(serialize_root(&root), "<p>Hi</p>");
    }

    #[test]
    fn test_serialize_empty_root() {
        let root = Element::new(ROOT_TAG).with_attr("xmlns:ac", "urn:confluence-prefix:ac");
        // `<root .../>` carries no closing tag; the opening pattern still matches
        assert_eq!(serialize_root(&root), "");
    }
}
