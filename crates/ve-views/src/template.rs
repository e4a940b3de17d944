//! View templates: table generators selected by a template's `templateType`.
//!
//! A table directive points at a template definition page. The definition's
//! parameter rows become [`TemplateArgs`]; `templateType` names the generator
//! in a [`TemplateRegistry`], which queries artifacts and builds the table.

use std::collections::HashMap;

use crate::directive::{BindingValue, Bindings};
use crate::error::ViewError;
use crate::results::{Cell, ResultsTable, Row, TableMarkup, TemplateArgs, html_macro, link_cell};
use crate::source::ArtifactSource;

/// Template type of the flight system requirements appendix.
pub const SYSTEM_REQUIREMENTS: &str = "Appendix Flight System Requirements";
/// Template type of the subsystem requirements appendix.
pub const SUBSYSTEM_REQUIREMENTS: &str = "Appendix Subsystem Requirements";

const KEY_DRIVER_ATTRIBUTE: &str = "Key/Driver [S]";
const SYSTEMS_ATTRIBUTE: &str = "Specified Element";
const AREA_ATTRIBUTE: &str = "System VAC";

/// Builds a table from template arguments.
pub trait TableTemplate: Send + Sync {
    /// Evaluate the template.
    ///
    /// # Errors
    ///
    /// Returns an error if an argument is missing or malformed, or if an
    /// artifact query fails.
    fn generate(
        &self,
        args: &TemplateArgs,
        artifacts: &dyn ArtifactSource,
    ) -> Result<Box<dyn TableMarkup>, ViewError>;
}

/// Generators keyed by template type.
#[derive(Default)]
pub struct TemplateRegistry {
    templates: HashMap<String, Box<dyn TableTemplate>>,
}

impl TemplateRegistry {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the requirements appendix templates.
    #[must_use]
    pub fn builtin() -> Self {
        Self::new()
            .with_template(
                SYSTEM_REQUIREMENTS,
                Requirements {
                    include_children: true,
                },
            )
            .with_template(
                SUBSYSTEM_REQUIREMENTS,
                Requirements {
                    include_children: false,
                },
            )
    }

    #[must_use]
    pub fn with_template(mut self, name: &str, template: impl TableTemplate + 'static) -> Self {
        self.templates.insert(name.to_owned(), Box::new(template));
        self
    }

    /// Evaluate the template defined at `iri`.
    ///
    /// # Errors
    ///
    /// - [`ViewError::MissingTemplateType`] if `templateType` is absent or a list
    /// - [`ViewError::UnknownTemplateType`] if no generator is registered for it
    /// - any error raised by the generator
    pub fn evaluate(
        &self,
        iri: &str,
        args: &TemplateArgs,
        artifacts: &dyn ArtifactSource,
    ) -> Result<Box<dyn TableMarkup>, ViewError> {
        let name = args
            .template_type()
            .map_err(|_| ViewError::MissingTemplateType {
                iri: iri.to_owned(),
            })?;
        let template = self
            .templates
            .get(name)
            .ok_or_else(|| ViewError::UnknownTemplateType(name.to_owned()))?;
        tracing::debug!(template = name, %iri, "Evaluating view template");
        template.generate(args, artifacts)
    }
}

/// Requirements at one level for a functional area.
///
/// Arguments: `level`, `functionalArea` and an optional `maturity`.
#[derive(Debug, Clone, Copy)]
pub struct Requirements {
    /// Add a column listing child requirements.
    pub include_children: bool,
}

impl Requirements {
    fn bindings(args: &TemplateArgs) -> Result<Bindings, ViewError> {
        let mut bindings = Bindings::new()
            .with("level", args.str("level")?)
            .with("artifactShapeName", "Requirement")
            .with("attributeKey", AREA_ATTRIBUTE)
            .with("attributeValue", args.str("functionalArea")?);
        match args.get("maturity") {
            Some(BindingValue::Single(maturity)) if !maturity.is_empty() => {
                bindings.insert("maturity", maturity);
            }
            Some(BindingValue::Many(maturities)) => match maturities.as_slice() {
                [] => {}
                [maturity] => bindings.insert("maturity", maturity),
                _ => {
                    return Err(ViewError::TemplateArgument {
                        key: "maturity".to_owned(),
                        problem: "lists several values, which cannot be queried together",
                    });
                }
            },
            _ => {}
        }
        Ok(bindings)
    }

    fn row(&self, artifact: &Bindings, artifacts: &dyn ArtifactSource) -> Result<Row, ViewError> {
        let mut row = Row::new();
        for key in ["identifier", "maturity"] {
            if let Some(value) = artifact.str(key) {
                row.insert(key.to_owned(), Cell::from(value));
            }
        }
        if let Some(name) = artifact.str("artifactName") {
            let url = artifact.str("artifactURL").unwrap_or_default();
            row.insert("artifactName".to_owned(), link_cell(url, name));
        }
        if let Some(text) = artifact.str("primaryText") {
            row.insert("primaryText".to_owned(), Cell::Markup(html_macro(text)));
        }

        let Some(artifact_id) = artifact.str("artifactId") else {
            return Ok(row);
        };
        for (key, attribute) in [
            ("keyDrivers", KEY_DRIVER_ATTRIBUTE),
            ("systems", SYSTEMS_ATTRIBUTE),
        ] {
            let values = artifacts
                .attribute_values(artifact_id, attribute)
                .map_err(ViewError::collaborator("artifact source"))?;
            row.insert(key.to_owned(), Cell::List(values));
        }
        if self.include_children {
            let children = artifacts
                .children(artifact_id)
                .map_err(ViewError::collaborator("artifact source"))?;
            row.insert("children".to_owned(), Cell::List(children));
        }
        Ok(row)
    }
}

impl TableTemplate for Requirements {
    fn generate(
        &self,
        args: &TemplateArgs,
        artifacts: &dyn ArtifactSource,
    ) -> Result<Box<dyn TableMarkup>, ViewError> {
        let bindings = Self::bindings(args)?;
        let found = artifacts
            .artifacts(&bindings)
            .map_err(ViewError::collaborator("artifact source"))?;

        let mut table = ResultsTable::artifacts();
        if self.include_children {
            table = table.with_column("children", "Child Requirements");
        }
        for artifact in &found {
            table.push_row(self.row(artifact, artifacts)?);
        }
        tracing::debug!(rows = found.len(), "Built requirements table");
        Ok(Box::new(table))
    }
}
