//! Tree representation of storage-format markup.
//!
//! Text and attribute values keep their escaped source form so character
//! references survive a parse/serialize cycle unchanged. Accessors decode on
//! demand.

use std::borrow::Cow;
use std::fmt;

use super::entities::{escape_attr, escape_text, unescape};

/// URN prefix under which storage-format prefixes are declared.
pub const NAMESPACE_URN_PREFIX: &str = "urn:confluence-prefix:";

/// Storage-format namespace prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Prefix {
    /// Atlassian Confluence elements (`ac:`).
    Ac,
    /// Resource identifiers (`ri:`).
    Ri,
}

impl Prefix {
    /// All prefixes declared on the synthetic root.
    pub const ALL: [Self; 2] = [Self::Ac, Self::Ri];

    /// Prefix as written in markup.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ac => "ac",
            Self::Ri => "ri",
        }
    }

    /// Namespace URN bound to this prefix.
    #[must_use]
    pub fn urn(self) -> String {
        format!("{NAMESPACE_URN_PREFIX}{}", self.as_str())
    }

    fn from_markup(prefix: &str) -> Option<Self> {
        match prefix {
            "ac" => Some(Self::Ac),
            "ri" => Some(Self::Ri),
            _ => None,
        }
    }
}

/// Element or attribute name.
///
/// Known prefixes are resolved; anything else (including `xmlns:*`) is kept
/// verbatim in `local`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Name {
    /// Resolved namespace prefix.
    pub prefix: Option<Prefix>,
    /// Local part of the name.
    pub local: String,
}

impl Name {
    /// Parse a qualified name such as `ac:parameter`.
    #[must_use]
    pub fn parse(qualified: &str) -> Self {
        if let Some((prefix, local)) = qualified.split_once(':')
            && let Some(prefix) = Prefix::from_markup(prefix)
        {
            return Self {
                prefix: Some(prefix),
                local: local.to_owned(),
            };
        }
        Self {
            prefix: None,
            local: qualified.to_owned(),
        }
    }

    /// Name in Clark notation, `{urn}local`.
    #[must_use]
    pub fn clark(&self) -> String {
        match self.prefix {
            Some(prefix) => format!("{{{}}}{}", prefix.urn(), self.local),
            None => self.local.clone(),
        }
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.prefix {
            Some(prefix) => write!(f, "{}:{}", prefix.as_str(), self.local),
            None => f.write_str(&self.local),
        }
    }
}

impl From<&str> for Name {
    fn from(qualified: &str) -> Self {
        Self::parse(qualified)
    }
}

/// Element attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Attribute name.
    pub name: Name,
    raw: String,
    quote: Quote,
}

impl Attribute {
    /// Create an attribute from an unescaped value.
    #[must_use]
    pub fn new(name: impl Into<Name>, value: &str) -> Self {
        Self {
            name: name.into(),
            raw: escape_attr(value),
            quote: Quote::Double,
        }
    }

    /// Create an attribute from a value already in escaped form.
    pub(crate) fn from_raw(name: Name, raw: String, quote: Quote) -> Self {
        Self { name, raw, quote }
    }

    /// Decoded value.
    #[must_use]
    pub fn value(&self) -> Cow<'_, str> {
        unescape(&self.raw)
    }

    /// Value as it appears in markup.
    #[must_use]
    pub fn raw_value(&self) -> &str {
        &self.raw
    }

    pub(crate) fn quote(&self) -> Quote {
        self.quote
    }
}

/// Delimiter around an attribute value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) enum Quote {
    #[default]
    Double,
    Single,
}

impl Quote {
    pub(crate) fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            b'"' => Some(Self::Double),
            b'\'' => Some(Self::Single),
            _ => None,
        }
    }

    pub(crate) fn as_char(self) -> char {
        match self {
            Self::Double => '"',
            Self::Single => '\'',
        }
    }

    /// Reference standing in for the delimiter inside a value.
    pub(crate) fn reference(self) -> &'static str {
        match self {
            Self::Double => "&quot;",
            Self::Single => "&apos;",
        }
    }
}

/// How an element without children is written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) enum Closing {
    /// `<x/>`
    #[default]
    Compact,
    /// `<x />`
    Spaced,
    /// `<x></x>`
    Explicit,
}

/// Node in the markup tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// Element node.
    Element(Element),
    /// Text in escaped form.
    Text(String),
    /// CDATA section content.
    CData(String),
    /// Comment content.
    Comment(String),
}

impl Node {
    /// Create a text node from unescaped text.
    #[must_use]
    pub fn text(text: &str) -> Self {
        Self::Text(escape_text(text))
    }

    #[must_use]
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Self::Element(element) => Some(element),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_element_mut(&mut self) -> Option<&mut Element> {
        match self {
            Self::Element(element) => Some(element),
            _ => None,
        }
    }

    fn push_text_content(&self, out: &mut String) {
        match self {
            Self::Element(element) => {
                for child in &element.children {
                    child.push_text_content(out);
                }
            }
            Self::Text(raw) => out.push_str(&unescape(raw)),
            Self::CData(text) => out.push_str(text),
            Self::Comment(_) => {}
        }
    }
}

impl From<Element> for Node {
    fn from(element: Element) -> Self {
        Self::Element(element)
    }
}

/// Element node with attributes and ordered children.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    /// Element name.
    pub name: Name,
    /// Attributes in source order.
    pub attrs: Vec<Attribute>,
    /// Child nodes in document order.
    pub children: Vec<Node>,
    pub(crate) closing: Closing,
}

impl Element {
    /// Create an empty element.
    #[must_use]
    pub fn new(name: impl Into<Name>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Add an attribute.
    #[must_use]
    pub fn with_attr(mut self, name: impl Into<Name>, value: &str) -> Self {
        self.set_attr(name, value);
        self
    }

    /// Append a text node.
    #[must_use]
    pub fn with_text(mut self, text: &str) -> Self {
        self.children.push(Node::text(text));
        self
    }

    /// Append a child node.
    #[must_use]
    pub fn with_child(mut self, child: impl Into<Node>) -> Self {
        self.children.push(child.into());
        self
    }

    /// Append child nodes.
    #[must_use]
    pub fn with_children(mut self, children: impl IntoIterator<Item = Node>) -> Self {
        self.children.extend(children);
        self
    }

    /// Check the element name.
    #[must_use]
    pub fn is(&self, name: &str) -> bool {
        self.name == Name::parse(name)
    }

    /// Look up an attribute by name.
    #[must_use]
    pub fn attribute(&self, name: &Name) -> Option<&Attribute> {
        self.attrs.iter().find(|a| &a.name == name)
    }

    /// Decoded value of an attribute.
    #[must_use]
    pub fn attr(&self, name: &str) -> Option<Cow<'_, str>> {
        self.attribute(&Name::parse(name)).map(Attribute::value)
    }

    /// Set an attribute, replacing any existing value.
    pub fn set_attr(&mut self, name: impl Into<Name>, value: &str) {
        let attribute = Attribute::new(name, value);
        match self.attrs.iter_mut().find(|a| a.name == attribute.name) {
            Some(existing) => *existing = attribute,
            None => self.attrs.push(attribute),
        }
    }

    /// Child elements in document order.
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(Node::as_element)
    }

    /// First child element with the given name.
    #[must_use]
    pub fn child(&self, name: &str) -> Option<&Element> {
        let name = Name::parse(name);
        self.elements().find(|e| e.name == name)
    }

    /// First child element with the given name, mutably.
    pub fn child_mut(&mut self, name: &str) -> Option<&mut Element> {
        let name = Name::parse(name);
        self.children
            .iter_mut()
            .filter_map(Node::as_element_mut)
            .find(|e| e.name == name)
    }

    /// Concatenated direct text (text and CDATA children), decoded.
    #[must_use]
    pub fn text(&self) -> String {
        let mut out = String::new();
        for child in &self.children {
            match child {
                Node::Text(raw) => out.push_str(&unescape(raw)),
                Node::CData(text) => out.push_str(text),
                Node::Element(_) | Node::Comment(_) => {}
            }
        }
        out
    }

    /// Concatenated text of all descendants, decoded.
    #[must_use]
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        for child in &self.children {
            child.push_text_content(&mut out);
        }
        out
    }

    /// Replace direct text with `text`, keeping child elements.
    pub fn set_text(&mut self, text: &str) {
        self.children
            .retain(|c| !matches!(c, Node::Text(_) | Node::CData(_)));
        if !text.is_empty() {
            self.children.insert(0, Node::text(text));
        }
    }

    /// Serialize this element on its own.
    #[must_use]
    pub fn to_markup(&self) -> String {
        let mut out = String::new();
        super::serializer::write_element(self, &mut out);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_name_parse_known_prefix() {
        let name = Name::parse("ac:structured-macro");
        assert_eq!(name.prefix, Some(Prefix::Ac));
        assert_eq!(name.local, "structured-macro");
        assert_eq!(name.to_string(), "ac:structured-macro");
    }

    #[test]
    fn test_name_parse_unknown_prefix_kept_verbatim() {
        let name = Name::parse("xmlns:ac");
        assert_eq!(name.prefix, None);
        assert_eq!(name.local, "xmlns:ac");
    }

    #[test]
    fn test_name_clark() {
        assert_eq!(
            Name::parse("ri:page").clark(),
            "{urn:confluence-prefix:ri}page"
        );
        assert_eq!(Name::parse("p").clark(), "p");
    }

    #[test]
    fn test_attr_roundtrip_escaping() {
        let element = Element::new("a").with_attr("title", r#"a "b" & c"#);
        assert_eq!(element.attrs[0].raw_value(), "a &quot;b&quot; &amp; c");
        assert_eq!(element.attr("title").as_deref(), Some(r#"a "b" & c"#));
    }

    #[test]
    fn test_set_attr_replaces() {
        let mut element = Element::new("p").with_attr("class", "a");
        element.set_attr("class", "b");
        assert_eq!(element.attrs.len(), 1);
        assert_eq!(element.attr("class").as_deref(), Some("b"));
    }

    #[test]
    fn test_text_vs_text_content() {
        let element = Element::new("p")
            .with_text("Hello ")
            .with_child(Element::new("b").with_text("World"))
            .with_child(Node::CData("!".to_owned()));
        assert_eq!(element.text(), "Hello !");
        assert_eq!(element.text_content(), "Hello World!");
    }

    #[test]
    fn test_set_text_keeps_elements() {
        let mut element = Element::new("p")
            .with_text("old")
            .with_child(Element::new("br"));
        element.set_text("new");
        assert_eq!(element.text(), "new");
        assert_eq!(element.elements().count(), 1);
    }

    #[test]
    fn test_child_lookup() {
        let element = Element::new("ac:link").with_child(Element::new("ri:page"));
        assert!(element.child("ri:page").is_some());
        assert!(element.child("ri:attachment").is_none());
    }
}
