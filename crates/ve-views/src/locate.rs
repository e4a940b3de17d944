//! Finding directive elements in a page.

use crate::directive::{Bindings, keys};
use crate::error::ViewError;
use crate::identity::{VIEW_NAMESPACE, ViewKind};
use crate::markup::{Document, NodePath, PARAMETER, Predicate, RI_PAGE, STRUCTURED_MACRO};

/// Page reference an inferred directive points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TitleReference {
    /// Space key of the referenced page.
    pub space: String,
    /// Title of the referenced page.
    pub title: String,
    /// Link text the reference must carry, if any.
    pub link_text: Option<String>,
}

impl TitleReference {
    /// Read the reference from directive bindings.
    ///
    /// Double quotes are stripped from the title.
    ///
    /// # Errors
    ///
    /// Returns [`ViewError::MissingBinding`] if the title or space is unbound.
    pub fn from_bindings(bindings: &Bindings) -> Result<Self, ViewError> {
        Ok(Self {
            space: bindings.require(keys::SPACE_ID)?.to_owned(),
            title: bindings.require(keys::PAGE_TITLE)?.replace('"', ""),
            link_text: bindings.str(keys::LINK_TEXT).map(str::to_owned),
        })
    }
}

/// What to look for.
#[derive(Debug, Clone, Copy)]
pub enum Target<'a> {
    /// An explicit structured macro.
    Macro { macro_id: &'a str },
    /// A link to a page by title.
    PageTitle(&'a TitleReference),
}

/// Paths of all elements matching `target`, in document order.
#[must_use]
pub fn locate(document: &Document, target: &Target<'_>) -> Vec<NodePath> {
    let predicate = match target {
        Target::Macro { macro_id } => macro_predicate(macro_id),
        Target::PageTitle(reference) => page_title_predicate(reference),
    };
    document.find_all(&predicate)
}

/// Structured macro with the given `ac:macro-id`.
#[must_use]
pub fn macro_predicate(macro_id: &str) -> Predicate {
    Predicate::tag(STRUCTURED_MACRO).and(Predicate::attr_eq("ac:macro-id", macro_id))
}

/// Element with an `id` parameter child whose text satisfies `text`.
pub(crate) fn has_id_parameter(text: Predicate) -> Predicate {
    Predicate::child(
        Predicate::tag(PARAMETER)
            .and(Predicate::attr_eq("ac:name", "id"))
            .and(text),
    )
}

/// `ri:page` reference by title that has not been promoted yet.
#[must_use]
pub fn page_title_predicate(reference: &TitleReference) -> Predicate {
    let space = Predicate::attr_absent("ri:space-key")
        .or(Predicate::attr_eq("ri:space-key", &reference.space));
    let promoted = Predicate::tag(STRUCTURED_MACRO)
        .and(Predicate::attr_eq("ac:name", "span"))
        .and(has_id_parameter(Predicate::text_starts_with(&format!(
            "{VIEW_NAMESPACE}-"
        ))));

    let mut predicate = Predicate::tag(RI_PAGE)
        .and(space)
        .and(Predicate::attr_eq("ri:content-title", &reference.title))
        .and(!Predicate::ancestor(promoted));

    if let Some(text) = &reference.link_text
        && !text.contains('"')
    {
        predicate = predicate.and(Predicate::following_sibling(
            Predicate::tag("ac:plain-text-link-body").and(Predicate::text_eq(text)),
        ));
    }
    predicate
}

/// The explicit directive macro with `macro_id`.
///
/// # Errors
///
/// Returns [`ViewError::MacroNotFound`] when the page has no such macro.
pub fn require_macro(
    document: &Document,
    view: ViewKind,
    macro_id: &str,
) -> Result<NodePath, ViewError> {
    locate(document, &Target::Macro { macro_id })
        .into_iter()
        .next()
        .ok_or_else(|| ViewError::MacroNotFound {
            view,
            macro_id: macro_id.to_owned(),
        })
}

/// All unpromoted references matching `reference`.
///
/// # Errors
///
/// Returns [`ViewError::NoMatchingReference`] when nothing matches.
pub fn require_page_title(
    document: &Document,
    reference: &TitleReference,
) -> Result<Vec<NodePath>, ViewError> {
    let found = locate(document, &Target::PageTitle(reference));
    if found.is_empty() {
        return Err(ViewError::NoMatchingReference {
            title: reference.title.clone(),
            space: reference.space.clone(),
        });
    }
    Ok(found)
}
