//! Storage-format markup adapter.
//!
//! Confluence stores pages as an XHTML fragment using the undeclared `ac:` and
//! `ri:` prefixes. [`Document::parse`] wraps the fragment in a synthetic root
//! that declares both prefixes, and [`Document::serialize`] strips it again.
//!
//! Parsing then serializing an unmodified document reproduces the input up to
//! the `&nbsp;` rewrite and whitespace around the wrapper.

mod entities;
mod macros;
mod parser;
mod query;
mod serializer;
mod tree;

pub use entities::{decode_html, escape_attr, escape_text, replace_entities, unescape};
pub use macros::{
    LINK, OUTPUT_TYPE_BLOCK, OUTPUT_TYPE_INLINE, PARAMETER, RICH_TEXT_BODY, RI_PAGE, SpanMacro,
    STRUCTURED_MACRO, parameter,
};
pub use query::Predicate;
pub use tree::{Attribute, Element, NAMESPACE_URN_PREFIX, Name, Node, Prefix};

use crate::error::MarkupError;

/// Tag of the synthetic wrapper element.
pub const ROOT_TAG: &str = "root_c0f292f94e924a3a98af22447fd3d3a2";

/// Wrap a storage-format fragment in the synthetic root.
fn wrap(markup: &str) -> String {
    let declarations = Prefix::ALL
        .iter()
        .map(|prefix| format!(r#"xmlns:{}="{}""#, prefix.as_str(), prefix.urn()))
        .collect::<Vec<_>>()
        .join(" ");
    format!(
        "<{ROOT_TAG} {declarations}>{}</{ROOT_TAG}>",
        replace_entities(markup)
    )
}

/// Parse a fragment into top-level nodes.
///
/// # Errors
///
/// Returns an error if the fragment is not well-formed.
pub fn parse_fragment(markup: &str) -> Result<Vec<Node>, MarkupError> {
    Ok(parser::parse_root(&wrap(markup))?.children)
}

/// Position of a node, as child indices from the synthetic root.
///
/// Ordering follows document order: an ancestor sorts before its descendants
/// and earlier siblings before later ones.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodePath(Vec<usize>);

impl NodePath {
    /// Path of the synthetic root.
    #[must_use]
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Path of the `index`-th child.
    #[must_use]
    pub fn child(&self, index: usize) -> Self {
        let mut indices = self.0.clone();
        indices.push(index);
        Self(indices)
    }

    /// Path of the parent, `None` for the root.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        self.0
            .split_last()
            .map(|(_, parent)| Self(parent.to_vec()))
    }

    /// Index within the parent, `None` for the root.
    #[must_use]
    pub fn index(&self) -> Option<usize> {
        self.0.last().copied()
    }

    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether `self` is a proper ancestor of `other`.
    #[must_use]
    pub fn is_ancestor_of(&self, other: &Self) -> bool {
        other.0.len() > self.0.len() && other.0.starts_with(&self.0)
    }

    #[must_use]
    pub fn indices(&self) -> &[usize] {
        &self.0
    }
}

/// Parsed storage-format page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    root: Element,
}

impl Document {
    /// Parse a storage-format fragment.
    ///
    /// # Errors
    ///
    /// Returns an error if the markup is not well-formed once wrapped.
    pub fn parse(markup: &str) -> Result<Self, MarkupError> {
        let root = parser::parse_root(&wrap(markup))?;
        Ok(Self { root })
    }

    /// Serialize back to a storage-format fragment.
    #[must_use]
    pub fn serialize(&self) -> String {
        serializer::serialize_root(&self.root)
    }

    /// The synthetic root element.
    #[must_use]
    pub fn root(&self) -> &Element {
        &self.root
    }

    /// Element at `path`.
    #[must_use]
    pub fn get(&self, path: &NodePath) -> Option<&Element> {
        query::element_at(&self.root, path.indices())
    }

    /// Element at `path`, mutably.
    pub fn get_mut(&mut self, path: &NodePath) -> Option<&mut Element> {
        path.indices().iter().try_fold(&mut self.root, |element, &index| {
            element
                .children
                .get_mut(index)
                .and_then(Node::as_element_mut)
        })
    }

    /// Paths of all elements matching `predicate`, in document order.
    ///
    /// The synthetic root is never matched.
    #[must_use]
    pub fn find_all(&self, predicate: &Predicate) -> Vec<NodePath> {
        let mut found = Vec::new();
        let mut path = Vec::new();
        collect(&self.root, &self.root, &mut path, predicate, &mut found);
        found
    }

    /// Path of the first element matching `predicate`.
    #[must_use]
    pub fn find_first(&self, predicate: &Predicate) -> Option<NodePath> {
        self.find_all(predicate).into_iter().next()
    }

    /// Remove the node at `path`.
    ///
    /// Paths of later siblings and their descendants are invalidated. Remove
    /// several nodes by iterating their paths in reverse document order.
    pub fn remove(&mut self, path: &NodePath) -> Option<Node> {
        let (parent, index) = self.parent_mut(path)?;
        (index < parent.children.len()).then(|| parent.children.remove(index))
    }

    /// Replace the node at `path`, returning the old node.
    pub fn replace(&mut self, path: &NodePath, node: impl Into<Node>) -> Option<Node> {
        let (parent, index) = self.parent_mut(path)?;
        let slot = parent.children.get_mut(index)?;
        Some(std::mem::replace(slot, node.into()))
    }

    /// Insert `node` as the previous sibling of the node at `path`.
    ///
    /// Returns the path of the inserted node, which is `path` itself.
    pub fn insert_before(&mut self, path: &NodePath, node: impl Into<Node>) -> Option<NodePath> {
        let parent_path = path.parent()?;
        self.insert_child(&parent_path, path.index()?, node)
    }

    /// Insert `node` as the next sibling of the node at `path`.
    ///
    /// Returns the path of the inserted node.
    pub fn insert_after(&mut self, path: &NodePath, node: impl Into<Node>) -> Option<NodePath> {
        let parent_path = path.parent()?;
        let index = path.index()? + 1;
        self.insert_child(&parent_path, index, node)
    }

    /// Insert `node` as the `index`-th child of the element at `parent`.
    ///
    /// An index past the end appends.
    pub fn insert_child(
        &mut self,
        parent: &NodePath,
        index: usize,
        node: impl Into<Node>,
    ) -> Option<NodePath> {
        let element = self.get_mut(parent)?;
        let index = index.min(element.children.len());
        element.children.insert(index, node.into());
        Some(parent.child(index))
    }

    /// Append `node` as the last top-level node.
    pub fn append(&mut self, node: impl Into<Node>) -> NodePath {
        self.root.children.push(node.into());
        NodePath::root().child(self.root.children.len() - 1)
    }

    fn parent_mut(&mut self, path: &NodePath) -> Option<(&mut Element, usize)> {
        let index = path.index()?;
        let parent = self.get_mut(&path.parent()?)?;
        Some((parent, index))
    }
}

fn collect(
    root: &Element,
    element: &Element,
    path: &mut Vec<usize>,
    predicate: &Predicate,
    found: &mut Vec<NodePath>,
) {
    for (index, node) in element.children.iter().enumerate() {
        let Node::Element(child) = node else {
            continue;
        };
        path.push(index);
        if predicate.matches(root, path, child) {
            found.push(NodePath(path.clone()));
        }
        collect(root, child, path, predicate, found);
        path.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const PAGE: &str = concat!(
        r#"<p>Intro&nbsp;text &amp; more</p>"#,
        r#"<ac:structured-macro ac:name="span" ac:schema-version="1" ac:macro-id="m1">"#,
        r#"<ac:parameter ac:name="id">ve-table-directive-abc</ac:parameter>"#,
        r#"<ac:rich-text-body><p><ac:link><ri:page ri:space-key="SP" ri:content-title="Page" />"#,
        r#"<ac:plain-text-link-body><![CDATA[Link <text>]]></ac:plain-text-link-body></ac:link></p>"#,
        r#"</ac:rich-text-body></ac:structured-macro>"#,
        r#"<!-- kept --><table><tbody><tr><td></td></tr></tbody></table>"#,
    );

    #[test]
    fn test_roundtrip_preserves_markup() {
        let doc = Document::parse(PAGE).unwrap();
        assert_eq!(doc.serialize(), PAGE.replace("&nbsp;", "&#160;"));
    }

    #[test]
    fn test_roundtrip_is_stable() {
        let once = Document::parse(PAGE).unwrap().serialize();
        let twice = Document::parse(&once).unwrap().serialize();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_roundtrip_single_quoted_attributes() {
        let page = r#"<p class='a' title='say "hi"' id="x">t</p>"#;
        let doc = Document::parse(page).unwrap();
        assert_eq!(doc.serialize(), page);
        assert_eq!(
            doc.get(&NodePath::root().child(0)).unwrap().attr("title").as_deref(),
            Some(r#"say "hi""#)
        );
    }

    #[test]
    fn test_single_quoted_output_reparses() {
        let mut doc = Document::parse(r#"<p title='say "hi"'>t</p>"#).unwrap();
        let path = NodePath::root().child(0);
        doc.get_mut(&path).unwrap().set_attr("class", "it's");
        let out = doc.serialize();
        assert_eq!(out, r#"<p title='say "hi"' class="it's">t</p>"#);
        let reparsed = Document::parse(&out).unwrap();
        assert_eq!(reparsed.serialize(), out);
    }

    #[test]
    fn test_serialize_strips_surrounding_whitespace() {
        let doc = Document::parse("\n  <p>x</p>\n").unwrap();
        assert_eq!(doc.serialize(), "<p>x</p>");
    }

    #[test]
    fn test_empty_document() {
        let doc = Document::parse("").unwrap();
        assert!(doc.root().children.is_empty());
        assert_eq!(doc.serialize(), "");
    }

    #[test]
    fn test_malformed_markup_fails() {
        assert!(Document::parse("<p>unclosed").is_err());
        assert!(Document::parse("<p></div>").is_err());
    }

    #[test]
    fn test_prefixes_resolve_to_urns() {
        let doc = Document::parse(PAGE).unwrap();
        let page = doc.find_first(&Predicate::tag("ri:page")).unwrap();
        assert_eq!(
            doc.get(&page).unwrap().name.clark(),
            "{urn:confluence-prefix:ri}page"
        );
    }

    #[test]
    fn test_find_all_document_order() {
        let doc = Document::parse("<p>a</p><div><p>b</p></div><p>c</p>").unwrap();
        let texts: Vec<String> = doc
            .find_all(&Predicate::tag("p"))
            .iter()
            .map(|p| doc.get(p).unwrap().text())
            .collect();
        assert_eq!(texts, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_remove_in_reverse_order() {
        let mut doc = Document::parse("<p>a</p><p>b</p><span/><p>c</p>").unwrap();
        let paths = doc.find_all(&Predicate::tag("p"));
        for path in paths.iter().rev() {
            doc.remove(path);
        }
        assert_eq!(doc.serialize(), "<span/>");
    }

    #[test]
    fn test_insert_after_and_child() {
        let mut doc = Document::parse("<p>a</p><p>c</p>").unwrap();
        let first = doc.find_first(&Predicate::tag("p")).unwrap();
        doc.insert_after(&first, Element::new("p").with_text("b"));
        doc.insert_child(&NodePath::root(), 0, Element::new("hr"));
        let last = doc.find_all(&Predicate::tag("p")).pop().unwrap();
        doc.insert_before(&last, Element::new("br"));
        assert_eq!(doc.serialize(), "<hr/><p>a</p><p>b</p><br/><p>c</p>");
    }

    #[test]
    fn test_replace_returns_old() {
        let mut doc = Document::parse("<p>a</p>").unwrap();
        let path = doc.find_first(&Predicate::tag("p")).unwrap();
        let old = doc.replace(&path, Element::new("div")).unwrap();
        assert!(old.as_element().unwrap().is("p"));
        assert_eq!(doc.serialize(), "<div/>");
    }

    #[test]
    fn test_node_path_relations() {
        let parent = NodePath::root().child(1);
        let child = parent.child(0);
        assert!(parent.is_ancestor_of(&child));
        assert!(!child.is_ancestor_of(&parent));
        assert_eq!(child.parent(), Some(parent.clone()));
        assert!(parent < child);
        assert!(NodePath::root().parent().is_none());
    }

    #[test]
    fn test_parse_fragment() {
        let nodes = parse_fragment("<p>a</p>text").unwrap();
        assert_eq!(nodes.len(), 2);
        assert!(nodes[0].as_element().is_some());
    }
}
