//! Promotion of inferred directives into explicit macros.
//!
//! An inferred directive is a plain link in the page. Promotion wraps the link
//! in a `span` macro carrying a directive id, so later passes find it by macro
//! id like any explicit directive and never infer it again.

use crate::directive::Directive;
use crate::error::ViewError;
use crate::identity::{IdSource, ViewIdentity, ViewKind};
use crate::locate::{TitleReference, require_page_title};
use crate::markup::{Document, Element, OUTPUT_TYPE_INLINE, SpanMacro};

/// Macro id returned for link-href directives, which are not promoted.
pub const UNPROMOTED_MACRO_ID: &str = "N/A";

/// Promote the first link to the page named by `reference`.
///
/// The link's parent element (the `ac:link`) is replaced by a span macro whose
/// body holds a copy of it. Returns the new macro id.
///
/// # Errors
///
/// Returns [`ViewError::NoMatchingReference`] if no unpromoted link matches,
/// or [`ViewError::DirectiveNotUnderstood`] if the reference has no parent
/// element to wrap.
pub fn promote_page_title(
    document: &mut Document,
    reference: &TitleReference,
    kind: ViewKind,
    ids: &dyn IdSource,
) -> Result<String, ViewError> {
    let found = require_page_title(document, reference)?;
    let first = &found[0];

    let not_understood = || ViewError::DirectiveNotUnderstood {
        view: kind,
        markup: document
            .get(first)
            .map(Element::to_markup)
            .unwrap_or_default(),
    };
    let link_path = first
        .parent()
        .filter(|p| !p.is_root())
        .ok_or_else(not_understood)?;
    let link = document.get(&link_path).ok_or_else(not_understood)?.clone();

    let identity = ViewIdentity::mint(kind, ids);
    let macro_id = ids.macro_id();
    let span = SpanMacro::new()
        .with_macro_id(macro_id.clone())
        .with_class(kind.class_tag())
        .with_id(identity.directive_id())
        .with_output_type(OUTPUT_TYPE_INLINE)
        .with_body([Element::new("p").with_child(link).into()])
        .build();
    document.replace(&link_path, span);

    tracing::info!(
        title = %reference.title,
        space = %reference.space,
        %macro_id,
        directive_id = %identity.directive_id(),
        matches = found.len(),
        "Promoted page reference to directive"
    );
    Ok(macro_id)
}

/// Placeholder promotion for link-href directives.
///
/// Leaves the document untouched and returns [`UNPROMOTED_MACRO_ID`].
#[must_use]
pub fn promote_link_href(directive: &Directive) -> String {
    tracing::warn!(
        page_id = %directive.source_page_id,
        trigger = %directive.trigger,
        "Link directives are not promoted"
    );
    UNPROMOTED_MACRO_ID.to_owned()
}
