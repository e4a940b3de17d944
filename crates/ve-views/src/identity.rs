//! View identities and id generation.
//!
//! Every view owns two element ids of the form `ve-<kind>-<role>-<view id>`:
//! one marks the directive, one marks the rendered output. Clearing a view
//! removes exactly the elements carrying its render id.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use uuid::Uuid;

/// Namespace prefix of every view-owned element id.
pub const VIEW_NAMESPACE: &str = "ve";

/// Kind of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewKind {
    Table,
    Tooltip,
    Diagram,
}

impl ViewKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Table => "table",
            Self::Tooltip => "tooltip",
            Self::Diagram => "diagram",
        }
    }

    /// Class parameter given to promoted directive spans.
    #[must_use]
    pub fn class_tag(self) -> &'static str {
        match self {
            Self::Table => "insertTable",
            Self::Tooltip => "insertHover",
            Self::Diagram => "insertDiagram",
        }
    }
}

impl fmt::Display for ViewKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Role of an element owned by a view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Marks the directive the view was triggered by.
    Directive,
    /// Marks the view's rendered output.
    Render,
}

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Directive => "directive",
            Self::Render => "render",
        }
    }
}

/// Stable identity of a view within a page.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ViewIdentity {
    kind: ViewKind,
    view_id: String,
}

impl ViewIdentity {
    #[must_use]
    pub fn new(kind: ViewKind, view_id: impl Into<String>) -> Self {
        Self {
            kind,
            view_id: view_id.into(),
        }
    }

    /// Identity with a freshly generated view id.
    #[must_use]
    pub fn mint(kind: ViewKind, ids: &dyn IdSource) -> Self {
        Self::new(kind, ids.view_id())
    }

    /// Recover the identity from an existing directive id.
    ///
    /// An id without the expected `ve-<kind>-directive-` prefix is taken
    /// whole as the view id.
    #[must_use]
    pub fn from_directive_id(kind: ViewKind, directive_id: &str) -> Self {
        let directive_id = directive_id.trim();
        let prefix = role_prefix(kind, Role::Directive);
        let view_id = directive_id.strip_prefix(&prefix).unwrap_or(directive_id);
        Self::new(kind, view_id)
    }

    #[must_use]
    pub fn kind(&self) -> ViewKind {
        self.kind
    }

    #[must_use]
    pub fn view_id(&self) -> &str {
        &self.view_id
    }

    /// Element id for `role`.
    #[must_use]
    pub fn id_for(&self, role: Role) -> String {
        format!("{}{}", role_prefix(self.kind, role), self.view_id)
    }

    #[must_use]
    pub fn directive_id(&self) -> String {
        self.id_for(Role::Directive)
    }

    #[must_use]
    pub fn render_id(&self) -> String {
        self.id_for(Role::Render)
    }
}

/// Common prefix of element ids for `kind` and `role`, e.g. `ve-table-render-`.
#[must_use]
pub fn role_prefix(kind: ViewKind, role: Role) -> String {
    format!("{VIEW_NAMESPACE}-{kind}-{}-", role.as_str())
}

/// Source of fresh identifiers.
///
/// Injected so that rewriting is deterministic under test.
pub trait IdSource: Send + Sync {
    /// Fresh view id, used inside `ve-<kind>-<role>-<view id>`.
    fn view_id(&self) -> String;

    /// Fresh `ac:macro-id` value.
    fn macro_id(&self) -> String;
}

/// Random ids backed by UUID v4.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomIds;

impl IdSource for RandomIds {
    fn view_id(&self) -> String {
        Uuid::new_v4().simple().to_string()
    }

    fn macro_id(&self) -> String {
        Uuid::new_v4().to_string()
    }
}

/// Deterministic ids from a counter.
///
/// View ids are `v1`, `v2`, ...; macro ids are `m1`, `m2`, ... sharing one
/// counter.
#[derive(Debug, Default)]
pub struct SequentialIds {
    next: AtomicU64,
}

impl SequentialIds {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn bump(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed) + 1
    }
}

impl IdSource for SequentialIds {
    fn view_id(&self) -> String {
        format!("v{}", self.bump())
    }

    fn macro_id(&self) -> String {
        format!("m{}", self.bump())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_role_ids() {
        let identity = ViewIdentity::new(ViewKind::Table, "abc123");
        assert_eq!(identity.directive_id(), "ve-table-directive-abc123");
        assert_eq!(identity.render_id(), "ve-table-render-abc123");
    }

    #[test]
    fn test_from_directive_id_strips_prefix() {
        let identity = ViewIdentity::from_directive_id(ViewKind::Table, " ve-table-directive-abc123 ");
        assert_eq!(identity.view_id(), "abc123");
    }

    #[test]
    fn test_from_directive_id_without_prefix() {
        let identity = ViewIdentity::from_directive_id(ViewKind::Tooltip, "custom");
        assert_eq!(identity.render_id(), "ve-tooltip-render-custom");
    }

    #[test]
    fn test_kinds_never_share_ids() {
        let table = ViewIdentity::new(ViewKind::Table, "x");
        let diagram = ViewIdentity::new(ViewKind::Diagram, "x");
        assert_ne!(table.render_id(), diagram.render_id());
        assert_ne!(table.directive_id(), table.render_id());
    }

    #[test]
    fn test_random_ids_shapes() {
        let ids = RandomIds;
        let view_id = ids.view_id();
        assert_eq!(view_id.len(), 32);
        assert!(view_id.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(ids.macro_id().matches('-').count(), 4);
        assert_ne!(ids.view_id(), ids.view_id());
    }

    #[test]
    fn test_sequential_ids() {
        let ids = SequentialIds::new();
        assert_eq!(ids.view_id(), "v1");
        assert_eq!(ids.macro_id(), "m2");
        assert_eq!(ids.view_id(), "v3");
    }
}
