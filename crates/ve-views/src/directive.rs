//! Directives, their bindings, and routing to views.
//!
//! A directive is one row from the directive feed: the page it lives on, the
//! pattern that triggered it, and the variable bindings the query produced.

use std::collections::HashMap;
use std::fmt;

use serde::Deserialize;

use crate::error::ViewError;
use crate::identity::ViewKind;

/// Binding keys understood by the engine.
pub mod keys {
    pub const SOURCE_PAGE_ID: &str = "source_page_id";
    pub const COMMAND: &str = "directive_command";
    pub const PAGE_TITLE_PREFIX: &str = "directive_page_title_prefix";
    pub const LINK_HREF_PREFIX: &str = "directive_link_href_prefix";
    pub const MACRO_ID: &str = "directive_macro_id";
    pub const MACRO_CLASS: &str = "directive_macro_class";
    pub const PAGE_SPACE: &str = "directive_page_space";
    pub const PAGE_TITLE: &str = "directive_page_title";
    pub const PAGE_ID: &str = "directive_page_id";
    pub const LINK_TEXT: &str = "directive_link_text";
    pub const SPACE_ID: &str = "space_id";
    pub const TEMPLATE: &str = "view_template_def";
}

/// Value bound to a query variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindingValue {
    Single(String),
    Many(Vec<String>),
}

impl BindingValue {
    /// The single value, or the first of many.
    #[must_use]
    pub fn first(&self) -> Option<&str> {
        match self {
            Self::Single(value) => Some(value),
            Self::Many(values) => values.first().map(String::as_str),
        }
    }
}

/// Variable bindings of one directive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bindings(HashMap<String, BindingValue>);

impl Bindings {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style single-value insert.
    #[must_use]
    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.insert(key, value);
        self
    }

    /// Bind `key` to a single value, replacing any previous value.
    pub fn insert(&mut self, key: &str, value: &str) {
        self.0
            .insert(key.to_owned(), BindingValue::Single(value.to_owned()));
    }

    /// Bind `key` to a list of values.
    pub fn insert_many(&mut self, key: &str, values: Vec<String>) {
        self.0.insert(key.to_owned(), BindingValue::Many(values));
    }

    /// Append a value, turning the binding into a list.
    pub fn push(&mut self, key: &str, value: &str) {
        let entry = self
            .0
            .entry(key.to_owned())
            .or_insert_with(|| BindingValue::Many(Vec::new()));
        if let BindingValue::Single(existing) = entry {
            let first = std::mem::take(existing);
            *entry = BindingValue::Many(vec![first]);
        }
        if let BindingValue::Many(values) = entry {
            values.push(value.to_owned());
        }
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&BindingValue> {
        self.0.get(key)
    }

    /// Single value of `key`, or the first of a list.
    #[must_use]
    pub fn str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(BindingValue::first)
    }

    /// Single value of `key`.
    ///
    /// # Errors
    ///
    /// Returns [`ViewError::MissingBinding`] when the key is unbound.
    pub fn require(&self, key: &str) -> Result<&str, ViewError> {
        self.str(key)
            .ok_or_else(|| ViewError::MissingBinding(key.to_owned()))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &BindingValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Read rows from a SPARQL 1.1 JSON result document.
    ///
    /// Each solution becomes one `Bindings` of single values. Unbound
    /// variables are absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is not valid SPARQL JSON results.
    pub fn from_sparql_json(json: &str) -> Result<Vec<Self>, serde_json::Error> {
        let results: SparqlResults = serde_json::from_str(json)?;
        Ok(results
            .results
            .bindings
            .into_iter()
            .map(|row| {
                Self(
                    row.into_iter()
                        .map(|(var, term)| (var, BindingValue::Single(term.value)))
                        .collect(),
                )
            })
            .collect())
    }
}

#[derive(Deserialize)]
struct SparqlResults {
    results: SparqlSolutions,
}

#[derive(Deserialize)]
struct SparqlSolutions {
    bindings: Vec<HashMap<String, SparqlTerm>>,
}

#[derive(Deserialize)]
struct SparqlTerm {
    value: String,
}

/// How a directive is expressed in the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DirectiveKind {
    /// An explicit macro placed by the author.
    ExplicitCommand,
    /// A link to a page whose title carries a known prefix.
    InferredPageTitle,
    /// A link whose href carries a known prefix.
    InferredLinkHref,
}

impl fmt::Display for DirectiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::ExplicitCommand => "explicit-command",
            Self::InferredPageTitle => "inferred-page-title",
            Self::InferredLinkHref => "inferred-link-href",
        })
    }
}

/// Pattern that matched a directive.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Trigger {
    /// Command name, e.g. `insertView`.
    Command(String),
    /// Page title prefix, e.g. `_View:`.
    PageTitlePrefix(String),
    /// Link href prefix.
    LinkHrefPrefix(String),
}

impl Trigger {
    #[must_use]
    pub fn kind(&self) -> DirectiveKind {
        match self {
            Self::Command(_) => DirectiveKind::ExplicitCommand,
            Self::PageTitlePrefix(_) => DirectiveKind::InferredPageTitle,
            Self::LinkHrefPrefix(_) => DirectiveKind::InferredLinkHref,
        }
    }

    /// The matched command or prefix.
    #[must_use]
    pub fn pattern(&self) -> &str {
        match self {
            Self::Command(p) | Self::PageTitlePrefix(p) | Self::LinkHrefPrefix(p) => p,
        }
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} \"{}\"", self.kind(), self.pattern())
    }
}

/// One directive to resolve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    pub source_page_id: String,
    pub trigger: Trigger,
    pub bindings: Bindings,
}

impl Directive {
    #[must_use]
    pub fn new(source_page_id: impl Into<String>, trigger: Trigger, bindings: Bindings) -> Self {
        Self {
            source_page_id: source_page_id.into(),
            trigger,
            bindings,
        }
    }

    /// Build a directive from a raw feed row.
    ///
    /// # Errors
    ///
    /// Returns [`ViewError::MissingBinding`] without a source page id and
    /// [`ViewError::UnroutableDirective`] when no trigger key is bound.
    pub fn from_bindings(bindings: Bindings) -> Result<Self, ViewError> {
        let source_page_id = bindings.require(keys::SOURCE_PAGE_ID)?.to_owned();
        let trigger = if let Some(command) = bindings.str(keys::COMMAND) {
            Trigger::Command(command.to_owned())
        } else if let Some(prefix) = bindings.str(keys::PAGE_TITLE_PREFIX) {
            Trigger::PageTitlePrefix(prefix.to_owned())
        } else if let Some(prefix) = bindings.str(keys::LINK_HREF_PREFIX) {
            Trigger::LinkHrefPrefix(prefix.to_owned())
        } else {
            return Err(ViewError::UnroutableDirective(format!(
                "no directive pattern bound for page {source_page_id}"
            )));
        };
        Ok(Self {
            source_page_id,
            trigger,
            bindings,
        })
    }

    #[must_use]
    pub fn kind(&self) -> DirectiveKind {
        self.trigger.kind()
    }
}

/// Maps directive patterns to view kinds.
#[derive(Debug, Clone, Default)]
pub struct Router {
    commands: HashMap<String, ViewKind>,
    page_title_prefixes: HashMap<String, ViewKind>,
    link_href_prefixes: HashMap<String, ViewKind>,
}

impl Router {
    /// Router with the standard patterns.
    ///
    /// Links into the wiki itself (`confluence_server`) become tooltips.
    #[must_use]
    pub fn new(confluence_server: &str) -> Self {
        Self::default()
            .with_command("insertView", ViewKind::Table)
            .with_command("insertHover", ViewKind::Tooltip)
            .with_page_title_prefix("_View:", ViewKind::Table)
            .with_link_href_prefix(confluence_server, ViewKind::Tooltip)
    }

    #[must_use]
    pub fn with_command(mut self, command: &str, kind: ViewKind) -> Self {
        self.commands.insert(command.to_owned(), kind);
        self
    }

    #[must_use]
    pub fn with_page_title_prefix(mut self, prefix: &str, kind: ViewKind) -> Self {
        self.page_title_prefixes.insert(prefix.to_owned(), kind);
        self
    }

    #[must_use]
    pub fn with_link_href_prefix(mut self, prefix: &str, kind: ViewKind) -> Self {
        self.link_href_prefixes.insert(prefix.to_owned(), kind);
        self
    }

    /// View kind for a trigger.
    ///
    /// # Errors
    ///
    /// Returns [`ViewError::UnroutableDirective`] for unknown patterns.
    pub fn route(&self, trigger: &Trigger) -> Result<ViewKind, ViewError> {
        let table = match trigger {
            Trigger::Command(_) => &self.commands,
            Trigger::PageTitlePrefix(_) => &self.page_title_prefixes,
            Trigger::LinkHrefPrefix(_) => &self.link_href_prefixes,
        };
        table
            .get(trigger.pattern())
            .copied()
            .ok_or_else(|| ViewError::UnroutableDirective(trigger.to_string()))
    }
}
