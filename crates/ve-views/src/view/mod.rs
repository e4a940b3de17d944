//! Views: rendered regions of a page owned by one identity.
//!
//! A view borrows the document for one directive. It first clears whatever it
//! rendered on earlier passes, then inserts fresh output, so repeated runs
//! leave exactly one rendered copy in the page.

mod diagram;
mod table;
mod tooltip;

pub use diagram::Diagram;
pub use table::{PageReference, Table};
pub use tooltip::{ArtifactInfo, ArtifactReference, ReferenceType, Tooltip};

use crate::error::ViewError;
use crate::identity::{IdSource, ViewIdentity, ViewKind};
use crate::locate::{has_id_parameter, require_macro};
use crate::markup::{Document, Element, NodePath, Predicate, parameter};

/// Capability shared by all views.
pub trait View {
    /// Data the view renders.
    type Data: ?Sized;

    fn identity(&self) -> &ViewIdentity;

    /// Remove previously rendered output. Returns the number of elements
    /// removed.
    fn clear(&mut self) -> usize;

    /// Insert freshly rendered output.
    ///
    /// # Errors
    ///
    /// Returns an error if the data cannot be turned into markup or the
    /// directive can no longer be found.
    fn render(&mut self, data: &Self::Data) -> Result<(), ViewError>;
}

/// The page a directive is being resolved on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageContext {
    pub page_id: String,
    pub space: String,
}

/// Document access and identity shared by every view.
pub struct ViewCore<'d> {
    document: &'d mut Document,
    identity: ViewIdentity,
}

impl<'d> ViewCore<'d> {
    /// Core with the given view id, or a freshly minted one.
    pub fn new(
        document: &'d mut Document,
        kind: ViewKind,
        view_id: Option<&str>,
        ids: &dyn IdSource,
    ) -> Self {
        let identity = match view_id {
            Some(view_id) => ViewIdentity::new(kind, view_id),
            None => ViewIdentity::mint(kind, ids),
        };
        Self { document, identity }
    }

    fn with_identity(document: &'d mut Document, identity: ViewIdentity) -> Self {
        Self { document, identity }
    }

    #[must_use]
    pub fn identity(&self) -> &ViewIdentity {
        &self.identity
    }

    #[must_use]
    pub fn document(&self) -> &Document {
        self.document
    }

    pub fn document_mut(&mut self) -> &mut Document {
        self.document
    }

    /// Remove every element marked with this view's render id.
    ///
    /// Idempotent: a second call removes nothing.
    pub fn clear(&mut self) -> usize {
        let render_id = self.identity.render_id();
        let rendered = self
            .document
            .find_all(&has_id_parameter(Predicate::text_eq(&render_id)));
        // Reverse document order keeps the remaining paths valid
        let removed = rendered
            .iter()
            .rev()
            .filter(|path| self.document.remove(path).is_some())
            .count();
        if removed > 0 {
            tracing::debug!(%render_id, removed, "Cleared rendered view");
        }
        removed
    }

    /// Insert `element` as the first top-level node.
    pub fn insert_top(&mut self, element: Element) {
        self.document
            .insert_child(&NodePath::root(), 0, element);
        tracing::debug!(render_id = %self.identity.render_id(), "Inserted view at top of page");
    }
}

/// A view triggered by a directive macro in the page.
///
/// The directive is re-located by macro id on every access, so paths never go
/// stale across mutations.
pub struct Directed<'d> {
    core: ViewCore<'d>,
    macro_id: String,
    directive_id: String,
}

impl<'d> Directed<'d> {
    /// Locate the directive macro and derive the view identity.
    ///
    /// An existing non-blank `id` parameter on the directive keeps the view
    /// id stable across passes. Without one, a new id is minted.
    ///
    /// # Errors
    ///
    /// Returns [`ViewError::MacroNotFound`] if the macro is not in the page.
    pub fn locate(
        document: &'d mut Document,
        kind: ViewKind,
        macro_id: &str,
        ids: &dyn IdSource,
    ) -> Result<Self, ViewError> {
        let path = require_macro(document, kind, macro_id)?;
        let existing = document
            .get(&path)
            .and_then(|directive| directive.parameter_text("id"))
            .map(|id| id.trim().to_owned())
            .filter(|id| !id.is_empty());

        let (identity, directive_id) = match existing {
            Some(directive_id) => (
                ViewIdentity::from_directive_id(kind, &directive_id),
                directive_id,
            ),
            None => {
                let identity = ViewIdentity::mint(kind, ids);
                let directive_id = identity.directive_id();
                (identity, directive_id)
            }
        };
        tracing::debug!(%macro_id, %directive_id, "Located directive");

        Ok(Self {
            core: ViewCore::with_identity(document, identity),
            macro_id: macro_id.to_owned(),
            directive_id,
        })
    }

    #[must_use]
    pub fn core(&self) -> &ViewCore<'d> {
        &self.core
    }

    pub fn core_mut(&mut self) -> &mut ViewCore<'d> {
        &mut self.core
    }

    #[must_use]
    pub fn macro_id(&self) -> &str {
        &self.macro_id
    }

    /// Id written to the directive's `id` parameter.
    #[must_use]
    pub fn directive_id(&self) -> &str {
        &self.directive_id
    }

    /// Current path of the directive macro.
    ///
    /// # Errors
    ///
    /// Returns [`ViewError::MacroNotFound`] if the macro has been removed.
    pub fn directive_path(&self) -> Result<NodePath, ViewError> {
        require_macro(
            self.core.document(),
            self.core.identity().kind(),
            &self.macro_id,
        )
    }

    /// The directive macro element.
    ///
    /// # Errors
    ///
    /// Returns [`ViewError::MacroNotFound`] if the macro has been removed.
    pub fn directive(&self) -> Result<&Element, ViewError> {
        let path = self.directive_path()?;
        self.core
            .document()
            .get(&path)
            .ok_or_else(|| self.not_found())
    }

    /// Text of the directive's body.
    ///
    /// # Errors
    ///
    /// Returns [`ViewError::MacroNotFound`] if the macro has been removed.
    pub fn directive_text(&self) -> Result<String, ViewError> {
        let directive = self.directive()?;
        Ok(directive
            .child("ac:rich-text-body")
            .or_else(|| directive.child("ac:plain-text-body"))
            .map(Element::text_content)
            .unwrap_or_default())
    }

    /// Mark the directive with its id and insert `render` right after it.
    ///
    /// When `hide_directive` is set and the directive has no `style`
    /// parameter, a `display:none;` style is added after the id parameter.
    ///
    /// # Errors
    ///
    /// Returns [`ViewError::MacroNotFound`] if the macro has been removed.
    pub fn insert_after(&mut self, render: Element, hide_directive: bool) -> Result<(), ViewError> {
        let path = self.directive_path()?;
        let not_found = self.not_found();
        let directive = self.core.document_mut().get_mut(&path).ok_or(not_found)?;

        let id_index = directive.parameter_index("id").unwrap_or_else(|| {
            directive.children.insert(0, parameter("id", "").into());
            0
        });
        if let Some(id_parameter) = directive.children[id_index].as_element_mut() {
            id_parameter.set_text(&self.directive_id);
        }
        if hide_directive && directive.parameter_index("style").is_none() {
            directive
                .children
                .insert(id_index + 1, parameter("style", "display:none;").into());
        }

        self.core.document_mut().insert_after(&path, render);
        tracing::debug!(
            macro_id = %self.macro_id,
            render_id = %self.core.identity().render_id(),
            hide_directive,
            "Inserted view after directive"
        );
        Ok(())
    }

    fn not_found(&self) -> ViewError {
        ViewError::MacroNotFound {
            view: self.core.identity().kind(),
            macro_id: self.macro_id.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::SequentialIds;
    use crate::markup::SpanMacro;
    use pretty_assertions::assert_eq;

    const DIRECTIVE: &str = concat!(
        r#"<ac:structured-macro ac:name="span" ac:schema-version="1" ac:macro-id="m-1">"#,
        r#"<ac:rich-text-body><p>Body text</p></ac:rich-text-body></ac:structured-macro>"#,
    );

    fn rendered(render_id: &str) -> Element {
        SpanMacro::new().with_id(render_id).build()
    }

    #[test]
    fn test_clear_is_idempotent() {
        let mut doc = Document::parse(&format!(
            "{}<p>keep</p>{}",
            rendered("ve-table-render-x").to_markup(),
            rendered("ve-table-render-x").to_markup()
        ))
        .unwrap();
        let mut core = ViewCore::new(&mut doc, ViewKind::Table, Some("x"), &SequentialIds::new());
        assert_eq!(core.clear(), 2);
        assert_eq!(core.clear(), 0);
        assert_eq!(doc.serialize(), "<p>keep</p>");
    }

    #[test]
    fn test_clear_only_touches_own_identity() {
        let page = format!(
            "{}{}{}",
            rendered("ve-table-render-x").to_markup(),
            rendered("ve-table-render-y").to_markup(),
            rendered("ve-diagram-render-x").to_markup()
        );
        let mut doc = Document::parse(&page).unwrap();
        let mut core = ViewCore::new(&mut doc, ViewKind::Table, Some("x"), &SequentialIds::new());
        assert_eq!(core.clear(), 1);
        assert_eq!(
            doc.serialize(),
            format!(
                "{}{}",
                rendered("ve-table-render-y").to_markup(),
                rendered("ve-diagram-render-x").to_markup()
            )
        );
    }

    #[test]
    fn test_insert_top() {
        let mut doc = Document::parse("<p>a</p>").unwrap();
        let mut core = ViewCore::new(&mut doc, ViewKind::Diagram, None, &SequentialIds::new());
        assert_eq!(core.identity().view_id(), "v1");
        core.insert_top(Element::new("hr"));
        assert_eq!(doc.serialize(), "<hr/><p>a</p>");
    }

    #[test]
    fn test_directed_mints_id_without_parameter() {
        let mut doc = Document::parse(DIRECTIVE).unwrap();
        let directed =
            Directed::locate(&mut doc, ViewKind::Table, "m-1", &SequentialIds::new()).unwrap();
        assert_eq!(directed.directive_id(), "ve-table-directive-v1");
        assert_eq!(directed.core().identity().render_id(), "ve-table-render-v1");
        assert_eq!(directed.directive_text().unwrap(), "Body text");
    }

    #[test]
    fn test_directed_reuses_existing_id() {
        let page = DIRECTIVE.replace(
            "<ac:rich-text-body>",
            r#"<ac:parameter ac:name="id"> ve-table-directive-abc123 </ac:parameter><ac:rich-text-body>"#,
        );
        let mut doc = Document::parse(&page).unwrap();
        let directed =
            Directed::locate(&mut doc, ViewKind::Table, "m-1", &SequentialIds::new()).unwrap();
        assert_eq!(directed.directive_id(), "ve-table-directive-abc123");
        assert_eq!(directed.core().identity().view_id(), "abc123");
    }

    #[test]
    fn test_directed_blank_id_is_minted() {
        let page = DIRECTIVE.replace(
            "<ac:rich-text-body>",
            r#"<ac:parameter ac:name="id">  </ac:parameter><ac:rich-text-body>"#,
        );
        let mut doc = Document::parse(&page).unwrap();
        let directed =
            Directed::locate(&mut doc, ViewKind::Table, "m-1", &SequentialIds::new()).unwrap();
        assert_eq!(directed.directive_id(), "ve-table-directive-v1");
    }

    #[test]
    fn test_insert_after_marks_and_hides_directive() {
        let mut doc = Document::parse(&format!("{DIRECTIVE}<p>after</p>")).unwrap();
        let mut directed =
            Directed::locate(&mut doc, ViewKind::Table, "m-1", &SequentialIds::new()).unwrap();
        directed
            .insert_after(rendered("ve-table-render-v1"), true)
            .unwrap();
        assert_eq!(
            doc.serialize(),
            format!(
                "{}{}<p>after</p>",
                concat!(
                    r#"<ac:structured-macro ac:name="span" ac:schema-version="1" ac:macro-id="m-1">"#,
                    r#"<ac:parameter ac:name="id">ve-table-directive-v1</ac:parameter>"#,
                    r#"<ac:parameter ac:name="style">display:none;</ac:parameter>"#,
                    r#"<ac:rich-text-body><p>Body text</p></ac:rich-text-body></ac:structured-macro>"#,
                ),
                rendered("ve-table-render-v1").to_markup()
            )
        );
    }

    #[test]
    fn test_insert_after_keeps_existing_style() {
        let page = DIRECTIVE.replace(
            "<ac:rich-text-body>",
            r#"<ac:parameter ac:name="style">color:red;</ac:parameter><ac:rich-text-body>"#,
        );
        let mut doc = Document::parse(&page).unwrap();
        let mut directed =
            Directed::locate(&mut doc, ViewKind::Table, "m-1", &SequentialIds::new()).unwrap();
        directed.insert_after(Element::new("hr"), true).unwrap();
        let path = directed.directive_path().unwrap();
        let directive = doc.get(&path).unwrap();
        assert_eq!(directive.parameter_text("style").as_deref(), Some("color:red;"));
        assert_eq!(directive.parameter_index("id"), Some(0));
    }
}
