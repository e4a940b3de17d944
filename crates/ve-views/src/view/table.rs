//! Table view: query results rendered after an `insertView` directive.

use super::{Directed, PageContext, View};
use crate::directive::{Bindings, keys};
use crate::error::{MarkupError, ViewError};
use crate::identity::{IdSource, ViewIdentity, ViewKind};
use crate::markup::{Document, LINK, Node, Predicate, RI_PAGE, parse_fragment};
use crate::results::TableMarkup;

/// Template page a table directive refers to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageReference {
    pub space: String,
    pub title: String,
    pub page_id: String,
    /// Link text of the directive.
    pub text: String,
    /// IRI of the view template definition.
    pub iri: String,
}

/// Table view bound to one directive.
pub struct Table<'d> {
    directed: Directed<'d>,
    template: PageReference,
}

impl<'d> Table<'d> {
    /// Locate the directive and read its template reference.
    ///
    /// # Errors
    ///
    /// - [`ViewError::MacroNotFound`] if the macro is not in the page
    /// - [`ViewError::DirectiveNotUnderstood`] if it holds no page link
    /// - [`ViewError::MissingBinding`] if a reference binding is absent
    /// - [`ViewError::CrossSpaceReference`] if the template lives in another
    ///   space than the page
    pub fn new(
        document: &'d mut Document,
        macro_id: &str,
        bindings: &Bindings,
        page: &PageContext,
        ids: &dyn IdSource,
    ) -> Result<Self, ViewError> {
        let directed = Directed::locate(document, ViewKind::Table, macro_id, ids)?;

        let directive_path = directed.directive_path()?;
        let linked_page = Predicate::tag(RI_PAGE).and(Predicate::parent(Predicate::tag(LINK)));
        let has_link = directed
            .core()
            .document()
            .find_all(&linked_page)
            .iter()
            .any(|path| directive_path.is_ancestor_of(path));
        if !has_link {
            return Err(ViewError::DirectiveNotUnderstood {
                view: ViewKind::Table,
                markup: directed.directive()?.to_markup(),
            });
        }

        let text = match bindings.str(keys::LINK_TEXT) {
            Some(text) => text.to_owned(),
            None => directed.directive_text()?,
        };
        let template = PageReference {
            space: bindings.require(keys::PAGE_SPACE)?.to_owned(),
            title: bindings.require(keys::PAGE_TITLE)?.to_owned(),
            page_id: bindings.require(keys::PAGE_ID)?.to_owned(),
            text,
            iri: bindings.require(keys::TEMPLATE)?.to_owned(),
        };

        if template.space != page.space {
            return Err(ViewError::CrossSpaceReference {
                page_id: page.page_id.clone(),
                expected: page.space.clone(),
                actual: template.space,
                iri: template.iri,
            });
        }

        Ok(Self { directed, template })
    }

    /// The template this table renders.
    #[must_use]
    pub fn template(&self) -> &PageReference {
        &self.template
    }
}

impl View for Table<'_> {
    type Data = dyn TableMarkup;

    fn identity(&self) -> &ViewIdentity {
        self.directed.core().identity()
    }

    fn clear(&mut self) -> usize {
        self.directed.core_mut().clear()
    }

    fn render(&mut self, results: &dyn TableMarkup) -> Result<(), ViewError> {
        let markup = results.to_storage_markup(&self.identity().render_id());
        let nodes = parse_fragment(&markup).map_err(|e| ViewError::malformed(&markup, e))?;
        let element = nodes
            .into_iter()
            .find_map(|node| match node {
                Node::Element(element) => Some(element),
                _ => None,
            })
            .ok_or_else(|| ViewError::malformed(&markup, MarkupError::NoElement))?;
        self.directed.insert_after(element, true)?;
        tracing::info!(
            template = %self.template.title,
            render_id = %self.identity().render_id(),
            "Rendered table"
        );
        Ok(())
    }
}
