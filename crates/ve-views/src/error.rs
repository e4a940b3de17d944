//! Error types for directive resolution and view rendering.

use std::str::Utf8Error;

use crate::identity::ViewKind;
use crate::source::CollaboratorError;

/// Error while parsing storage-format markup.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum MarkupError {
    /// XML parsing error.
    #[error("XML parse error")]
    XmlParse(#[from] quick_xml::Error),

    /// UTF-8 decoding error.
    #[error("UTF-8 error")]
    Utf8(#[from] Utf8Error),

    /// XML attribute error.
    #[error("XML attribute error")]
    XmlAttr(#[from] quick_xml::events::attributes::AttrError),

    /// Encoding error during XML parsing.
    #[error("encoding error")]
    Encoding(#[from] quick_xml::encoding::EncodingError),

    /// Input ended while elements were still open.
    #[error("unclosed element <{0}>")]
    Unclosed(String),

    /// Markup contained no element.
    #[error("no element found")]
    NoElement,
}

/// Error while resolving a directive or rendering its view.
///
/// Every variant aborts the directive loop of the page being processed.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ViewError {
    /// An explicit directive's macro is absent from the page.
    #[error(
        "{view} macro with the id \"{macro_id}\" was not found in the page; \
         the wiki page and the directive source are likely out of sync"
    )]
    MacroNotFound {
        /// Kind of view that was looking for its directive.
        view: ViewKind,
        /// Macro id from the directive feed.
        macro_id: String,
    },

    /// An inferred directive matched no page reference.
    #[error("could not find a reference to page \"{title}\" in space \"{space}\"")]
    NoMatchingReference {
        /// Referenced page title.
        title: String,
        /// Referenced space key.
        space: String,
    },

    /// A directive matched a pattern with no registered view.
    #[error("directive is not routable to a view: {0}")]
    UnroutableDirective(String),

    /// A table template lives in a different space than the page using it.
    #[error(
        "cross reference in page {page_id} invokes template definition in another space \
         (\"{expected}\" != \"{actual}\"): <{iri}>"
    )]
    CrossSpaceReference {
        /// Page containing the directive.
        page_id: String,
        /// Space of the page being processed.
        expected: String,
        /// Space of the template.
        actual: String,
        /// Template IRI.
        iri: String,
    },

    /// A tooltip references an unsupported artifact type.
    #[error("unknown insertHover reference type \"{0}\"")]
    UnknownReferenceType(String),

    /// The artifact lookup for a tooltip returned no rows.
    #[error("no information found for {reference_type} {reference_id}")]
    EmptyLookupResult {
        /// Reference type (e.g. `DNG`).
        reference_type: String,
        /// Artifact identifier.
        reference_id: String,
    },

    /// Markup could not be parsed.
    #[error("malformed markup: {source}")]
    MalformedMarkup {
        /// The offending fragment.
        fragment: String,
        /// Underlying parse error.
        #[source]
        source: MarkupError,
    },

    /// A directive element lacks the structure its view requires.
    #[error("{view} directive is not understood: \"{markup}\"")]
    DirectiveNotUnderstood {
        /// Kind of view.
        view: ViewKind,
        /// Serialized directive element.
        markup: String,
    },

    /// A required directive binding is absent.
    #[error("directive binding \"{0}\" is missing")]
    MissingBinding(String),

    /// A template argument is absent or has the wrong shape.
    #[error("template argument \"{key}\" {problem}")]
    TemplateArgument {
        /// Argument name.
        key: String,
        /// What is wrong with it.
        problem: &'static str,
    },

    /// A template definition does not name its template type.
    #[error(
        "the required \"templateType\" field is missing from the view template table defined at <{iri}>"
    )]
    MissingTemplateType {
        /// Template IRI.
        iri: String,
    },

    /// A template type has no registered generator.
    #[error("\"{0}\" was not found in the method registry")]
    UnknownTemplateType(String),

    /// A collaborator (page store, directive feed, query service) failed.
    #[error("{collaborator} failed")]
    Collaborator {
        /// Which collaborator.
        collaborator: &'static str,
        /// Underlying error.
        #[source]
        source: CollaboratorError,
    },

    /// Configuration is invalid.
    #[error(transparent)]
    Config(#[from] ve_config::ConfigError),
}

impl ViewError {
    /// Wrap a markup error together with the fragment that caused it.
    pub(crate) fn malformed(fragment: &str, source: MarkupError) -> Self {
        tracing::error!(%fragment, "Markup error in fragment");
        Self::MalformedMarkup {
            fragment: fragment.to_owned(),
            source,
        }
    }

    pub(crate) fn collaborator(collaborator: &'static str) -> impl FnOnce(CollaboratorError) -> Self {
        move |source| Self::Collaborator {
            collaborator,
            source,
        }
    }
}
