//! Directive-driven rewriting of Confluence storage-format pages.
//!
//! Authors mark places in a wiki page where generated content should appear.
//! This crate finds those directives, renders the requested view (a results
//! table, a hover tooltip or a diagram placeholder) next to them, and writes the
//! page back. Rewriting is idempotent: each view owns its output through a
//! stable `ve-<kind>-<role>-<id>` identity and clears it before rendering again.
//!
//! # Architecture
//!
//! - [`markup`]: storage-format parse/serialize and structural queries
//! - [`directive`]: directives, bindings and routing to view kinds
//! - [`locate`] and [`promote`]: finding directives, and turning inferred
//!   links into explicit macros
//! - [`view`]: the [`View`](view::View) trait and its `Table`, `Tooltip` and
//!   `Diagram` implementations
//! - [`results`]: table markup produced from query results
//! - [`template`]: table generators selected by a template's `templateType`
//! - [`source`]: collaborator traits for pages, directives and query data
//! - [`orchestrator`]: per-page processing of a whole space
//! - [`mock`]: in-memory collaborators (behind the `mock` feature)
//!
//! # Example
//!
//! ```ignore
//! use ve_config::Config;
//! use ve_views::identity::RandomIds;
//! use ve_views::orchestrator::{Collaborators, Orchestrator};
//!
//! let config = Config::load(None, None)?;
//! let collaborators = Collaborators { pages, feed, templates, artifacts };
//! let report = Orchestrator::new(&config, collaborators, &RandomIds)?.run()?;
//! for failure in &report.failed {
//!     eprintln!("{}: {}", failure.page_id, failure.error);
//! }
//! ```

pub mod directive;
mod error;
pub mod identity;
pub mod locate;
pub mod markup;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod orchestrator;
pub mod promote;
pub mod results;
pub mod source;
pub mod template;
pub mod view;

pub use directive::{Bindings, Directive, DirectiveKind, Router, Trigger};
pub use error::{MarkupError, ViewError};
pub use identity::{IdSource, RandomIds, ViewIdentity, ViewKind};
pub use markup::Document;
pub use orchestrator::{Collaborators, Orchestrator, RunReport};
pub use template::{TableTemplate, TemplateRegistry};
