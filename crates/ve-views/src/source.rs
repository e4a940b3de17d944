//! Collaborator traits.
//!
//! The engine reads and writes pages, fetches directives and evaluates view
//! data through these traits. Implementations own transport, credentials and
//! retries; the engine never retries a failed call.

use crate::directive::{Bindings, Directive};
use crate::view::{ArtifactInfo, PageReference};

/// Error returned by collaborators.
pub type CollaboratorError = Box<dyn std::error::Error + Send + Sync>;

/// Wiki page storage.
pub trait PageStore: Send + Sync {
    /// Read the storage-format body of a page.
    ///
    /// # Errors
    ///
    /// Returns an error if the page cannot be read.
    fn content(&self, page_id: &str) -> Result<String, CollaboratorError>;

    /// Replace the storage-format body of a page.
    ///
    /// # Errors
    ///
    /// Returns an error if the page cannot be written.
    fn update_content(&self, page_id: &str, content: &str) -> Result<(), CollaboratorError>;
}

/// Source of directives for a space.
pub trait DirectiveFeed: Send + Sync {
    /// Directives found in `space`, in feed order.
    ///
    /// # Errors
    ///
    /// Returns an error if the feed cannot be queried.
    fn directives(&self, space: &str) -> Result<Vec<Directive>, CollaboratorError>;
}

/// Reads view template definitions.
pub trait TemplateSource: Send + Sync {
    /// Parameter rows of the template definition a table directive refers to.
    ///
    /// Each row binds `param_key` and `param_value`, plus
    /// `param_value_is_array` for list-valued parameters.
    ///
    /// # Errors
    ///
    /// Returns an error if the definition cannot be queried.
    fn parameters(&self, template: &PageReference) -> Result<Vec<Bindings>, CollaboratorError>;
}

/// Queries the artifact model.
pub trait ArtifactSource: Send + Sync {
    /// Rows describing the artifact selected by `bindings`.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup fails.
    fn artifact_info(&self, bindings: &Bindings) -> Result<Vec<ArtifactInfo>, CollaboratorError>;

    /// Artifacts matching `bindings`, one row per artifact.
    ///
    /// Rows bind `artifactId`, `identifier`, `artifactName`, `artifactURL`,
    /// `primaryText` and `maturity` where known.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    fn artifacts(&self, bindings: &Bindings) -> Result<Vec<Bindings>, CollaboratorError>;

    /// Values of a string-array attribute of an artifact.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    fn attribute_values(
        &self,
        artifact_id: &str,
        attribute_key: &str,
    ) -> Result<Vec<String>, CollaboratorError>;

    /// Names of an artifact's children.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    fn children(&self, artifact_id: &str) -> Result<Vec<String>, CollaboratorError>;
}
