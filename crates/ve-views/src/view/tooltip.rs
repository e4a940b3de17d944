//! Tooltip view: hover text for `insertHover` directives.

use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use super::{Directed, View};
use crate::directive::{Bindings, keys};
use crate::error::ViewError;
use crate::identity::{IdSource, VIEW_NAMESPACE, ViewIdentity, ViewKind};
use crate::locate::has_id_parameter;
use crate::markup::{
    Document, Element, Predicate, RICH_TEXT_BODY, STRUCTURED_MACRO, decode_html, parameter,
};

/// Class prefix of hover directives.
const CLASS_PREFIX: &str = "insertHover-";

/// Comments, CDATA markers and tags, with `>` allowed inside quoted values.
static TAG_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<!--[\s\S]*?-->|<!\[CDATA\[|\]\]>|<(?:[^>"']|"[^"]*"|'[^']*')*>"#)
        .expect("invalid tag regex")
});

/// Kind of artifact a tooltip describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceType {
    /// DOORS Next Generation requirement.
    Dng,
}

impl ReferenceType {
    /// Parse the type segment of a hover class.
    ///
    /// # Errors
    ///
    /// Returns [`ViewError::UnknownReferenceType`] for unsupported types.
    pub fn parse(value: &str) -> Result<Self, ViewError> {
        match value {
            "dng" => Ok(Self::Dng),
            _ => Err(ViewError::UnknownReferenceType(value.to_owned())),
        }
    }

    /// Label shown in tooltip text.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Dng => "DNG",
        }
    }

    /// Artifact shape name used for lookups.
    #[must_use]
    pub fn shape_name(self) -> &'static str {
        match self {
            Self::Dng => "Requirement",
        }
    }
}

/// Artifact a hover directive refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactReference {
    pub kind: ReferenceType,
    pub id: String,
}

impl ArtifactReference {
    /// Parse a hover class of the form `insertHover-<type>.<id>`.
    ///
    /// # Errors
    ///
    /// Returns [`ViewError::UnknownReferenceType`] if the type is unsupported
    /// or the class has no `.` separator.
    pub fn parse_class(class: &str) -> Result<Self, ViewError> {
        let class = class.trim();
        let reference = class.strip_prefix(CLASS_PREFIX).unwrap_or(class);
        let (kind, id) = reference
            .split_once('.')
            .ok_or_else(|| ViewError::UnknownReferenceType(reference.to_owned()))?;
        Ok(Self {
            kind: ReferenceType::parse(kind)?,
            id: id.to_owned(),
        })
    }

    /// Bindings for the artifact lookup.
    #[must_use]
    pub fn lookup_bindings(&self) -> Bindings {
        Bindings::new()
            .with("identifier", &self.id)
            .with("artifactShapeName", self.kind.shape_name())
    }
}

/// Artifact details returned by the lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ArtifactInfo {
    #[serde(rename = "artifactName")]
    pub name: String,
    #[serde(rename = "artifactURL", default)]
    pub url: String,
    #[serde(rename = "primaryText", default)]
    pub primary_text: String,
}

/// Tooltip view bound to one hover directive.
pub struct Tooltip<'d> {
    directed: Directed<'d>,
    reference: ArtifactReference,
    ids: &'d dyn IdSource,
}

impl<'d> Tooltip<'d> {
    /// Locate the directive and parse its artifact reference.
    ///
    /// The hover class comes from the `directive_macro_class` binding, or from
    /// the directive's `class` parameter when unbound.
    ///
    /// # Errors
    ///
    /// - [`ViewError::MacroNotFound`] if the macro is not in the page
    /// - [`ViewError::MissingBinding`] if no hover class is available
    /// - [`ViewError::UnknownReferenceType`] for unsupported artifact types
    pub fn new(
        document: &'d mut Document,
        macro_id: &str,
        bindings: &Bindings,
        ids: &'d dyn IdSource,
    ) -> Result<Self, ViewError> {
        let directed = Directed::locate(document, ViewKind::Tooltip, macro_id, ids)?;
        let class = match bindings.str(keys::MACRO_CLASS) {
            Some(class) => class.to_owned(),
            None => directed
                .directive()?
                .parameter_text("class")
                .ok_or_else(|| ViewError::MissingBinding(keys::MACRO_CLASS.to_owned()))?,
        };
        let reference = ArtifactReference::parse_class(&class)?;
        Ok(Self {
            directed,
            reference,
            ids,
        })
    }

    #[must_use]
    pub fn reference(&self) -> &ArtifactReference {
        &self.reference
    }

    /// Id of the companion tooltip macro.
    #[must_use]
    pub fn hover_id(&self) -> String {
        format!("{VIEW_NAMESPACE}-hover-{}", self.directed.macro_id())
    }

    /// Turn the directive body into a link to `url`.
    fn link_body(&mut self, url: &str) -> Result<(), ViewError> {
        let path = self.directed.directive_path()?;
        let document = self.directed.core_mut().document_mut();
        if let Some(body) = document
            .get_mut(&path)
            .and_then(|directive| directive.child_mut(RICH_TEXT_BODY))
        {
            let text = body.text_content();
            body.children = vec![Element::new("a").with_attr("href", url).with_text(&text).into()];
        }
        Ok(())
    }

    /// Set the text of the companion tooltip macro, creating it if needed.
    fn write_companion(&mut self, text: &str) {
        let hover_id = self.hover_id();
        let companion = Predicate::tag(STRUCTURED_MACRO)
            .and(Predicate::attr_eq("ac:name", "tooltip"))
            .and(has_id_parameter(Predicate::text_eq(&hover_id)));
        let document = self.directed.core_mut().document_mut();

        let path = match document.find_first(&companion) {
            Some(path) => path,
            None => document.append(
                Element::new(STRUCTURED_MACRO)
                    .with_attr("ac:name", "tooltip")
                    .with_attr("ac:schema-version", "1")
                    .with_attr("ac:macro-id", &self.ids.macro_id())
                    .with_child(parameter("id", &hover_id)),
            ),
        };
        if let Some(tooltip) = document.get_mut(&path) {
            if tooltip.parameter_index("text").is_none() {
                tooltip.children.push(parameter("text", "").into());
            }
            if let Some(existing) = tooltip.parameter_mut("text") {
                existing.set_text(text);
            }
        }
    }
}

impl View for Tooltip<'_> {
    type Data = [ArtifactInfo];

    fn identity(&self) -> &ViewIdentity {
        self.directed.core().identity()
    }

    fn clear(&mut self) -> usize {
        self.directed.core_mut().clear()
    }

    fn render(&mut self, rows: &[ArtifactInfo]) -> Result<(), ViewError> {
        let label = self.reference.kind.label();
        let info = rows.first().ok_or_else(|| ViewError::EmptyLookupResult {
            reference_type: label.to_owned(),
            reference_id: self.reference.id.clone(),
        })?;

        if !info.url.is_empty() {
            self.link_body(&info.url)?;
        }
        let text = format!(
            "{label}, {}, {}: {}",
            self.reference.id,
            info.name,
            strip_markup(&info.primary_text)
        );
        self.write_companion(&text);
        tracing::info!(
            reference = %self.reference.id,
            hover_id = %self.hover_id(),
            "Rendered tooltip"
        );
        Ok(())
    }
}

/// Plain text of an HTML snippet.
fn strip_markup(html: &str) -> String {
    decode_html(&TAG_PATTERN.replace_all(html, ""))
        .trim()
        .to_owned()
}
