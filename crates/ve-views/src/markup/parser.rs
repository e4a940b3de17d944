//! Storage-format parser built on `quick-xml` events.

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use super::tree::{Attribute, Closing, Element, Name, Node, Quote};
use crate::error::MarkupError;

/// Parse a wrapped document into its root element.
///
/// The input must consist of exactly one root element. Text outside of it is
/// dropped. End-tag mismatches are reported by `quick-xml`; elements left open
/// at end of input are reported as [`MarkupError::Unclosed`].
pub(crate) fn parse_root(wrapped: &str) -> Result<Element, MarkupError> {
    let mut reader = Reader::from_str(wrapped);
    reader.config_mut().trim_text(false);

    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let mut element = start_element(&reader, &e)?;
                element.closing = Closing::Explicit;
                stack.push(element);
            }
            Event::Empty(e) => {
                let mut element = start_element(&reader, &e)?;
                element.closing = if e.last().is_some_and(u8::is_ascii_whitespace) {
                    Closing::Spaced
                } else {
                    Closing::Compact
                };
                attach(&mut stack, &mut root, Node::Element(element));
            }
            Event::End(_) => {
                if let Some(element) = stack.pop() {
                    attach(&mut stack, &mut root, Node::Element(element));
                }
            }
            Event::Text(e) => {
                let text = reader.decoder().decode(&e)?;
                push_text(&mut stack, &text);
            }
            Event::GeneralRef(e) => {
                // Keep references escaped, decoding happens on access
                let entity = reader.decoder().decode(&e)?;
                push_text(&mut stack, &format!("&{entity};"));
            }
            Event::CData(e) => {
                let text = reader.decoder().decode(&e)?.into_owned();
                push_node(&mut stack, Node::CData(text));
            }
            Event::Comment(e) => {
                let text = reader.decoder().decode(&e)?.into_owned();
                push_node(&mut stack, Node::Comment(text));
            }
            Event::Decl(_) | Event::PI(_) | Event::DocType(_) => {}
            Event::Eof => break,
        }
    }

    if let Some(open) = stack.last() {
        return Err(MarkupError::Unclosed(open.name.to_string()));
    }
    root.ok_or(MarkupError::NoElement)
}

fn start_element(reader: &Reader<&[u8]>, e: &BytesStart) -> Result<Element, MarkupError> {
    let qname = e.name();
    let name = reader.decoder().decode(qname.as_ref())?;
    let mut element = Element::new(Name::parse(&name));
    let quotes = quote_styles(e.attributes_raw());
    for (index, attr) in e.attributes().enumerate() {
        let attr = attr?;
        let key = reader.decoder().decode(attr.key.as_ref())?;
        let raw = reader.decoder().decode(&attr.value)?.into_owned();
        let quote = quotes.get(index).copied().unwrap_or_default();
        element
            .attrs
            .push(Attribute::from_raw(Name::parse(&key), raw, quote));
    }
    Ok(element)
}

/// Delimiters of the attribute values in a start tag, in source order.
fn quote_styles(attributes: &[u8]) -> Vec<Quote> {
    let mut quotes = Vec::new();
    let mut open: Option<u8> = None;
    for &byte in attributes {
        match open {
            Some(delimiter) if byte == delimiter => open = None,
            Some(_) => {}
            None => {
                if let Some(quote) = Quote::from_byte(byte) {
                    quotes.push(quote);
                    open = Some(byte);
                }
            }
        }
    }
    quotes
}

/// Attach a completed node to its parent, or make it the root.
fn attach(stack: &mut [Element], root: &mut Option<Element>, node: Node) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(node),
        None => {
            if let Node::Element(element) = node
                && root.is_none()
            {
                *root = Some(element);
            }
        }
    }
}

fn push_node(stack: &mut [Element], node: Node) {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(node);
    }
}

/// Append escaped text, merging with a preceding text node.
fn push_text(stack: &mut [Element], text: &str) {
    let Some(parent) = stack.last_mut() else {
        return;
    };
    if let Some(Node::Text(last)) = parent.children.last_mut() {
        last.push_str(text);
    } else {
        parent.children.push(Node::Text(text.to_owned()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_simple_element() {
        let root = parse_root("<root><p>Hello</p></root>").unwrap();
        assert_eq!(root.children.len(), 1);
        let p = root.children[0].as_element().unwrap();
        assert!(p.is("p"));
        assert_eq!(p.text(), "Hello");
    }

    #[test]
    fn test_parse_keeps_references_escaped() {
        let root = parse_root("<root><p>a &amp; b&#160;c</p></root>").unwrap();
        let p = root.children[0].as_element().unwrap();
        assert_eq!(p.children, vec![Node::Text("a &amp; b&#160;c".to_owned())]);
        assert_eq!(p.text(), "a & b\u{00a0}c");
    }

    #[test]
    fn test_parse_prefixed_names() {
        let root = parse_root(
            r#"<root><ac:structured-macro ac:name="span"><ac:parameter ac:name="id">x</ac:parameter></ac:structured-macro></root>"#,
        )
        .unwrap();
        let span = root.children[0].as_element().unwrap();
        assert!(span.is("ac:structured-macro"));
        assert_eq!(span.attr("ac:name").as_deref(), Some("span"));
        assert_eq!(span.child("ac:parameter").unwrap().text(), "x");
    }

    #[test]
    fn test_parse_closing_forms() {
        let root = parse_root("<root><br/><br /><p></p></root>").unwrap();
        let forms: Vec<Closing> = root.elements().map(|e| e.closing).collect();
        assert_eq!(
            forms,
            vec![Closing::Compact, Closing::Spaced, Closing::Explicit]
        );
    }

    #[test]
    fn test_parse_cdata_and_comment() {
        let root = parse_root("<root><x><![CDATA[<b>]]><!-- note --></x></root>").unwrap();
        let x = root.children[0].as_element().unwrap();
        assert_eq!(
            x.children,
            vec![
                Node::CData("<b>".to_owned()),
                Node::Comment(" note ".to_owned())
            ]
        );
    }

    #[test]
    fn test_parse_records_attribute_quotes() {
        let root = parse_root(r#"<root><p a='x "y"' b="z" c='w'/></root>"#).unwrap();
        let p = root.children[0].as_element().unwrap();
        let quotes: Vec<Quote> = p.attrs.iter().map(Attribute::quote).collect();
        assert_eq!(quotes, vec![Quote::Single, Quote::Double, Quote::Single]);
        assert_eq!(p.attr("a").as_deref(), Some(r#"x "y""#));
    }

    #[test]
    fn test_quote_styles_skip_quotes_inside_values() {
        assert_eq!(
            quote_styles(br#" title="it's" alt='say "hi"'"#),
            vec![Quote::Double, Quote::Single]
        );
    }

    #[test]
    fn test_parse_mismatched_end_tag_fails() {
        assert!(parse_root("<root><p>text</div></root>").is_err());
    }

    #[test]
    fn test_parse_unclosed_fails() {
        assert!(parse_root("<root><p>text").is_err());
    }
}
