//! In-memory collaborators for testing.
//!
//! Provides [`MockPages`], [`MockFeed`], [`MockTemplates`] and [`MockArtifacts`]
//! for exercising the orchestrator without a wiki or query service.
//!
//! # Example
//!
//! ```ignore
//! use ve_views::mock::MockPages;
//! use ve_views::source::PageStore;
//!
//! let pages = MockPages::new().with_page("100", "<p>Hello</p>");
//! assert_eq!(pages.content("100").unwrap(), "<p>Hello</p>");
//! ```

use std::collections::HashMap;
use std::sync::RwLock;

use crate::directive::{Bindings, Directive};
use crate::source::{ArtifactSource, CollaboratorError, DirectiveFeed, PageStore, TemplateSource};
use crate::view::{ArtifactInfo, PageReference};

/// Page store backed by a map.
///
/// Every successful write is recorded in order.
#[derive(Debug, Default)]
pub struct MockPages {
    pages: RwLock<HashMap<String, String>>,
    writes: RwLock<Vec<(String, String)>>,
}

impl MockPages {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a page.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn with_page(self, page_id: &str, content: &str) -> Self {
        self.pages
            .write()
            .unwrap()
            .insert(page_id.to_owned(), content.to_owned());
        self
    }

    /// Current content of a page.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn page(&self, page_id: &str) -> Option<String> {
        self.pages.read().unwrap().get(page_id).cloned()
    }

    /// Writes made so far, as `(page_id, content)`.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn writes(&self) -> Vec<(String, String)> {
        self.writes.read().unwrap().clone()
    }
}

impl PageStore for MockPages {
    fn content(&self, page_id: &str) -> Result<String, CollaboratorError> {
        self.page(page_id)
            .ok_or_else(|| format!("page {page_id} not found").into())
    }

    fn update_content(&self, page_id: &str, content: &str) -> Result<(), CollaboratorError> {
        let mut pages = self.pages.write().unwrap();
        if !pages.contains_key(page_id) {
            return Err(format!("page {page_id} not found").into());
        }
        pages.insert(page_id.to_owned(), content.to_owned());
        self.writes
            .write()
            .unwrap()
            .push((page_id.to_owned(), content.to_owned()));
        Ok(())
    }
}

/// Directive feed returning a fixed list per space.
#[derive(Debug, Default)]
pub struct MockFeed {
    directives: HashMap<String, Vec<Directive>>,
}

impl MockFeed {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_directive(mut self, space: &str, directive: Directive) -> Self {
        self.directives
            .entry(space.to_owned())
            .or_default()
            .push(directive);
        self
    }
}

impl DirectiveFeed for MockFeed {
    fn directives(&self, space: &str) -> Result<Vec<Directive>, CollaboratorError> {
        Ok(self.directives.get(space).cloned().unwrap_or_default())
    }
}

/// Template definitions keyed by template IRI.
#[derive(Debug, Default)]
pub struct MockTemplates {
    templates: HashMap<String, Vec<Bindings>>,
}

impl MockTemplates {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a single-valued parameter to a template.
    #[must_use]
    pub fn with_parameter(self, iri: &str, key: &str, value: &str) -> Self {
        self.with_row(
            iri,
            Bindings::new()
                .with("param_key", key)
                .with("param_value", value),
        )
    }

    /// Add one value of a list parameter to a template.
    #[must_use]
    pub fn with_list_parameter(self, iri: &str, key: &str, value: &str) -> Self {
        self.with_row(
            iri,
            Bindings::new()
                .with("param_key", key)
                .with("param_value", value)
                .with("param_value_is_array", "true"),
        )
    }

    #[must_use]
    pub fn with_row(mut self, iri: &str, row: Bindings) -> Self {
        self.templates.entry(iri.to_owned()).or_default().push(row);
        self
    }
}

impl TemplateSource for MockTemplates {
    fn parameters(&self, template: &PageReference) -> Result<Vec<Bindings>, CollaboratorError> {
        self.templates
            .get(&template.iri)
            .cloned()
            .ok_or_else(|| format!("no template defined at <{}>", template.iri).into())
    }
}

/// Artifact model held in memory.
///
/// [`ArtifactSource::artifacts`] returns the rows that agree with every query
/// binding they carry.
#[derive(Debug, Default)]
pub struct MockArtifacts {
    info: HashMap<String, Vec<ArtifactInfo>>,
    rows: Vec<Bindings>,
    attributes: HashMap<(String, String), Vec<String>>,
    children: HashMap<String, Vec<String>>,
}

impl MockArtifacts {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add tooltip details for an identifier.
    #[must_use]
    pub fn with_artifact(mut self, identifier: &str, info: ArtifactInfo) -> Self {
        self.info.entry(identifier.to_owned()).or_default().push(info);
        self
    }

    /// Add an artifact row.
    #[must_use]
    pub fn with_row(mut self, row: Bindings) -> Self {
        self.rows.push(row);
        self
    }

    #[must_use]
    pub fn with_attribute(mut self, artifact_id: &str, key: &str, values: &[&str]) -> Self {
        self.attributes.insert(
            (artifact_id.to_owned(), key.to_owned()),
            values.iter().map(|&value| value.to_owned()).collect(),
        );
        self
    }

    #[must_use]
    pub fn with_children(mut self, artifact_id: &str, names: &[&str]) -> Self {
        self.children.insert(
            artifact_id.to_owned(),
            names.iter().map(|&name| name.to_owned()).collect(),
        );
        self
    }
}

impl ArtifactSource for MockArtifacts {
    fn artifact_info(&self, bindings: &Bindings) -> Result<Vec<ArtifactInfo>, CollaboratorError> {
        Ok(bindings
            .str("identifier")
            .and_then(|id| self.info.get(id))
            .cloned()
            .unwrap_or_default())
    }

    fn artifacts(&self, bindings: &Bindings) -> Result<Vec<Bindings>, CollaboratorError> {
        Ok(self
            .rows
            .iter()
            .filter(|row| {
                bindings
                    .iter()
                    .all(|(key, value)| row.get(key).is_none_or(|bound| bound == value))
            })
            .cloned()
            .collect())
    }

    fn attribute_values(
        &self,
        artifact_id: &str,
        attribute_key: &str,
    ) -> Result<Vec<String>, CollaboratorError> {
        Ok(self
            .attributes
            .get(&(artifact_id.to_owned(), attribute_key.to_owned()))
            .cloned()
            .unwrap_or_default())
    }

    fn children(&self, artifact_id: &str) -> Result<Vec<String>, CollaboratorError> {
        Ok(self.children.get(artifact_id).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directive::Trigger;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_pages_read_write() {
        let pages = MockPages::new().with_page("100", "<p>a</p>");
        assert_eq!(pages.content("100").unwrap(), "<p>a</p>");
        pages.update_content("100", "<p>b</p>").unwrap();
        assert_eq!(pages.page("100").as_deref(), Some("<p>b</p>"));
        assert_eq!(pages.writes().len(), 1);
    }

    #[test]
    fn test_pages_missing() {
        let pages = MockPages::new();
        assert!(pages.content("404").is_err());
        assert!(pages.update_content("404", "").is_err());
        assert!(pages.writes().is_empty());
    }

    #[test]
    fn test_feed_per_space() {
        let directive = Directive::new("100", Trigger::Command("insertView".to_owned()), Bindings::new());
        let feed = MockFeed::new().with_directive("SP", directive.clone());
        assert_eq!(feed.directives("SP").unwrap(), vec![directive]);
        assert!(feed.directives("OTHER").unwrap().is_empty());
    }

    #[test]
    fn test_artifacts_by_identifier() {
        let info = ArtifactInfo {
            name: "Thrust".to_owned(),
            ..ArtifactInfo::default()
        };
        let artifacts = MockArtifacts::new().with_artifact("1234", info.clone());
        let bindings = Bindings::new().with("identifier", "1234");
        assert_eq!(artifacts.artifact_info(&bindings).unwrap(), vec![info]);
        assert!(artifacts.artifact_info(&Bindings::new()).unwrap().is_empty());
    }

    #[test]
    fn test_artifacts_filtered_by_bound_keys() {
        let artifacts = MockArtifacts::new()
            .with_row(Bindings::new().with("identifier", "1").with("level", "L3"))
            .with_row(Bindings::new().with("identifier", "2").with("level", "L4"));
        let query = Bindings::new()
            .with("level", "L3")
            .with("artifactShapeName", "Requirement");
        let found = artifacts.artifacts(&query).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].str("identifier"), Some("1"));
    }

    #[test]
    fn test_template_parameters() {
        let templates = MockTemplates::new()
            .with_parameter("https://x/t", "templateType", "T")
            .with_list_parameter("https://x/t", "maturity", "draft");
        let reference = PageReference {
            iri: "https://x/t".to_owned(),
            ..PageReference::default()
        };
        let rows = templates.parameters(&reference).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].str("param_value_is_array"), Some("true"));
    }
}
