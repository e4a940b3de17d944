//! Directive resolution across the pages of a space.
//!
//! Directives are grouped by the page they live on. Each page is read, parsed
//! once, rewritten by every directive in feed order, serialized once and
//! written back. A failing directive aborts its page, which is then left
//! untouched; the remaining pages are still processed.

use ve_config::Config;

use crate::directive::{Directive, Router, Trigger, keys};
use crate::error::ViewError;
use crate::identity::{IdSource, ViewKind};
use crate::locate::TitleReference;
use crate::markup::Document;
use crate::promote::{promote_link_href, promote_page_title};
use crate::results::TemplateArgs;
use crate::source::{ArtifactSource, DirectiveFeed, PageStore, TemplateSource};
use crate::template::TemplateRegistry;
use crate::view::{PageContext, Table, Tooltip, View};

/// External services the orchestrator talks to.
#[derive(Clone, Copy)]
pub struct Collaborators<'a> {
    pub pages: &'a dyn PageStore,
    pub feed: &'a dyn DirectiveFeed,
    pub templates: &'a dyn TemplateSource,
    pub artifacts: &'a dyn ArtifactSource,
}

/// A page whose rewrite failed.
#[derive(Debug)]
pub struct PageFailure {
    pub page_id: String,
    pub error: ViewError,
}

/// Outcome of a run.
#[derive(Debug, Default)]
pub struct RunReport {
    /// Pages written back, in processing order.
    pub updated: Vec<String>,
    /// Pages left untouched because a directive failed.
    pub failed: Vec<PageFailure>,
}

impl RunReport {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Resolves the directives of one space.
pub struct Orchestrator<'a> {
    space: String,
    pages: Vec<String>,
    router: Router,
    registry: TemplateRegistry,
    collaborators: Collaborators<'a>,
    ids: &'a dyn IdSource,
}

impl<'a> Orchestrator<'a> {
    /// Create an orchestrator for the configured space.
    ///
    /// # Errors
    ///
    /// Returns [`ViewError::Config`] if the configuration is invalid.
    pub fn new(
        config: &Config,
        collaborators: Collaborators<'a>,
        ids: &'a dyn IdSource,
    ) -> Result<Self, ViewError> {
        config.validate()?;
        Ok(Self {
            space: config.confluence.space.clone(),
            pages: config.confluence.pages.clone(),
            router: Router::new(&config.confluence.server),
            registry: TemplateRegistry::builtin(),
            collaborators,
            ids,
        })
    }

    /// Replace the routing table.
    #[must_use]
    pub fn with_router(mut self, router: Router) -> Self {
        self.router = router;
        self
    }

    /// Replace the table template registry.
    #[must_use]
    pub fn with_templates(mut self, registry: TemplateRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Resolve every directive in the space.
    ///
    /// # Errors
    ///
    /// Returns an error only if the directive feed fails. Page failures are
    /// collected in the report.
    pub fn run(&self) -> Result<RunReport, ViewError> {
        let directives = self
            .collaborators
            .feed
            .directives(&self.space)
            .map_err(ViewError::collaborator("directive feed"))?;
        let groups = self.group_by_page(directives);
        tracing::info!(space = %self.space, pages = groups.len(), "Resolving directives");

        let mut report = RunReport::default();
        for (page_id, directives) in groups {
            match self.render_page(&page_id, &directives) {
                Ok(()) => report.updated.push(page_id),
                Err(error) => {
                    tracing::error!(%page_id, %error, "Page left unchanged");
                    report.failed.push(PageFailure { page_id, error });
                }
            }
        }
        tracing::info!(
            updated = report.updated.len(),
            failed = report.failed.len(),
            "Run complete"
        );
        Ok(report)
    }

    /// Group directives by source page in first-seen order, keeping only
    /// configured pages when a page list is set.
    fn group_by_page(&self, directives: Vec<Directive>) -> Vec<(String, Vec<Directive>)> {
        let mut groups: Vec<(String, Vec<Directive>)> = Vec::new();
        for directive in directives {
            if !self.pages.is_empty() && !self.pages.contains(&directive.source_page_id) {
                continue;
            }
            match groups
                .iter_mut()
                .find(|(page_id, _)| *page_id == directive.source_page_id)
            {
                Some((_, group)) => group.push(directive),
                None => groups.push((directive.source_page_id.clone(), vec![directive])),
            }
        }
        groups
    }

    /// Read, rewrite and write back one page.
    ///
    /// # Errors
    ///
    /// Returns the first error; nothing is written in that case.
    pub fn render_page(&self, page_id: &str, directives: &[Directive]) -> Result<(), ViewError> {
        let content = self
            .collaborators
            .pages
            .content(page_id)
            .map_err(ViewError::collaborator("page store"))?;
        let rewritten = self.rewrite(page_id, &content, directives)?;
        self.collaborators
            .pages
            .update_content(page_id, &rewritten)
            .map_err(ViewError::collaborator("page store"))?;
        tracing::info!(%page_id, directives = directives.len(), "Updated page");
        Ok(())
    }

    /// Apply `directives` to page content and return the new content.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by any directive.
    pub fn rewrite(
        &self,
        page_id: &str,
        content: &str,
        directives: &[Directive],
    ) -> Result<String, ViewError> {
        let mut document =
            Document::parse(content).map_err(|e| ViewError::malformed(content, e))?;
        let page = PageContext {
            page_id: page_id.to_owned(),
            space: self.space.clone(),
        };
        for directive in directives {
            self.apply(&mut document, &page, directive)?;
        }
        Ok(document.serialize())
    }

    fn apply(
        &self,
        document: &mut Document,
        page: &PageContext,
        directive: &Directive,
    ) -> Result<(), ViewError> {
        let kind = self.router.route(&directive.trigger)?;
        tracing::debug!(
            page_id = %page.page_id,
            trigger = %directive.trigger,
            view = %kind,
            "Routing directive"
        );

        let macro_id = match &directive.trigger {
            Trigger::Command(_) => directive.bindings.require(keys::MACRO_ID)?.to_owned(),
            Trigger::PageTitlePrefix(_) => {
                let reference = TitleReference::from_bindings(&directive.bindings)?;
                promote_page_title(document, &reference, kind, self.ids)?
            }
            Trigger::LinkHrefPrefix(_) => promote_link_href(directive),
        };

        match kind {
            ViewKind::Table => {
                let mut view =
                    Table::new(document, &macro_id, &directive.bindings, page, self.ids)?;
                view.clear();
                let parameters = self
                    .collaborators
                    .templates
                    .parameters(view.template())
                    .map_err(ViewError::collaborator("template source"))?;
                let args = TemplateArgs::from_parameter_rows(&parameters)?;
                let results = self.registry.evaluate(
                    &view.template().iri,
                    &args,
                    self.collaborators.artifacts,
                )?;
                view.render(&*results)
            }
            ViewKind::Tooltip => {
                let mut view = Tooltip::new(document, &macro_id, &directive.bindings, self.ids)?;
                view.clear();
                let rows = self
                    .collaborators
                    .artifacts
                    .artifact_info(&view.reference().lookup_bindings())
                    .map_err(ViewError::collaborator("artifact source"))?;
                view.render(&rows)
            }
            ViewKind::Diagram => Err(ViewError::UnroutableDirective(format!(
                "{} routes to a diagram, which is not directive-driven",
                directive.trigger
            ))),
        }
    }
}
