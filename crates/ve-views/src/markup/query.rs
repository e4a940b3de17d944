//! Structural element predicates.
//!
//! A small composable subset of `XPath`: tag and attribute tests, direct text
//! tests, and the child, parent, ancestor and following-sibling axes.

use std::ops;

use super::tree::{Element, Name, Node};

/// Predicate over an element at a position in the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// Element has the given name.
    Tag(Name),
    /// Attribute equals the given decoded value.
    AttrEquals(Name, String),
    /// Attribute is absent.
    AttrAbsent(Name),
    /// Direct text equals the value.
    TextEquals(String),
    /// Direct text starts with the value.
    TextStartsWith(String),
    /// Some child element matches.
    Child(Box<Predicate>),
    /// The parent element matches. Never true for children of the root.
    Parent(Box<Predicate>),
    /// Some ancestor element, excluding the synthetic root, matches.
    Ancestor(Box<Predicate>),
    /// Some later sibling element matches.
    FollowingSibling(Box<Predicate>),
    /// Inner predicate does not match.
    Not(Box<Predicate>),
    /// Every predicate matches.
    All(Vec<Predicate>),
    /// At least one predicate matches.
    Any(Vec<Predicate>),
}

impl Predicate {
    #[must_use]
    pub fn tag(name: &str) -> Self {
        Self::Tag(Name::parse(name))
    }

    #[must_use]
    pub fn attr_eq(name: &str, value: &str) -> Self {
        Self::AttrEquals(Name::parse(name), value.to_owned())
    }

    #[must_use]
    pub fn attr_absent(name: &str) -> Self {
        Self::AttrAbsent(Name::parse(name))
    }

    #[must_use]
    pub fn text_eq(value: &str) -> Self {
        Self::TextEquals(value.to_owned())
    }

    #[must_use]
    pub fn text_starts_with(prefix: &str) -> Self {
        Self::TextStartsWith(prefix.to_owned())
    }

    #[must_use]
    pub fn child(inner: Self) -> Self {
        Self::Child(Box::new(inner))
    }

    #[must_use]
    pub fn parent(inner: Self) -> Self {
        Self::Parent(Box::new(inner))
    }

    #[must_use]
    pub fn ancestor(inner: Self) -> Self {
        Self::Ancestor(Box::new(inner))
    }

    #[must_use]
    pub fn following_sibling(inner: Self) -> Self {
        Self::FollowingSibling(Box::new(inner))
    }

    /// Conjunction, flattening nested `All`.
    #[must_use]
    pub fn and(self, other: Self) -> Self {
        match self {
            Self::All(mut all) => {
                all.push(other);
                Self::All(all)
            }
            first => Self::All(vec![first, other]),
        }
    }

    /// Disjunction, flattening nested `Any`.
    #[must_use]
    pub fn or(self, other: Self) -> Self {
        match self {
            Self::Any(mut any) => {
                any.push(other);
                Self::Any(any)
            }
            first => Self::Any(vec![first, other]),
        }
    }

    /// Evaluate against `element`, found at `path` under `root`.
    pub(crate) fn matches(&self, root: &Element, path: &[usize], element: &Element) -> bool {
        match self {
            Self::Tag(name) => &element.name == name,
            Self::AttrEquals(name, value) => element
                .attribute(name)
                .is_some_and(|a| a.value() == value.as_str()),
            Self::AttrAbsent(name) => element.attribute(name).is_none(),
            Self::TextEquals(value) => element.text() == *value,
            Self::TextStartsWith(prefix) => element.text().starts_with(prefix.as_str()),
            Self::Child(inner) => {
                let mut child_path = path.to_vec();
                element.children.iter().enumerate().any(|(i, node)| {
                    let Node::Element(child) = node else {
                        return false;
                    };
                    child_path.push(i);
                    let matched = inner.matches(root, &child_path, child);
                    child_path.pop();
                    matched
                })
            }
            Self::Parent(inner) => {
                let Some((_, parent_path)) = path.split_last() else {
                    return false;
                };
                !parent_path.is_empty()
                    && element_at(root, parent_path)
                        .is_some_and(|parent| inner.matches(root, parent_path, parent))
            }
            Self::Ancestor(inner) => (1..path.len()).rev().any(|depth| {
                let ancestor_path = &path[..depth];
                element_at(root, ancestor_path)
                    .is_some_and(|ancestor| inner.matches(root, ancestor_path, ancestor))
            }),
            Self::FollowingSibling(inner) => {
                let Some((&index, parent_path)) = path.split_last() else {
                    return false;
                };
                let Some(parent) = element_at(root, parent_path) else {
                    return false;
                };
                let mut sibling_path = path.to_vec();
                parent
                    .children
                    .iter()
                    .enumerate()
                    .skip(index + 1)
                    .any(|(i, node)| {
                        let Node::Element(sibling) = node else {
                            return false;
                        };
                        if let Some(last) = sibling_path.last_mut() {
                            *last = i;
                        }
                        inner.matches(root, &sibling_path, sibling)
                    })
            }
            Self::Not(inner) => !inner.matches(root, path, element),
            Self::All(all) => all.iter().all(|p| p.matches(root, path, element)),
            Self::Any(any) => any.iter().any(|p| p.matches(root, path, element)),
        }
    }
}

impl ops::Not for Predicate {
    type Output = Self;

    fn not(self) -> Self {
        Self::Not(Box::new(self))
    }
}

/// Resolve an element path under `root`.
pub(crate) fn element_at<'a>(root: &'a Element, path: &[usize]) -> Option<&'a Element> {
    path.iter().try_fold(root, |element, &index| {
        element.children.get(index).and_then(Node::as_element)
    })
}
