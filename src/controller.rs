//! The workbox session: current workflow, state, filters, sort and page, plus
//! the selection and the command dialog, driven by explicit operator actions.
//!
//! All mutation goes through `&mut self`, so selection changes, refreshes and
//! command completion take turns on one owner.

use crate::catalog::{WorkflowCatalog, WorkflowCommand, WorkflowState};
use crate::config::WorkboxConfig;
use crate::criteria::{FilterCriteria, QueryCriteriaBuilder, SortDirection, SortSpec};
use crate::domain::{CommandId, ItemUri, StateId, WorkboxError, WorkboxItem, WorkflowId};
use crate::executor::{BatchOutcome, BulkCommandExecutor, ExecutionPhase};
use crate::graphql::QueryClient;
use crate::results::{PageQuery, RefreshOutcome, ResultPage};
use crate::selection::SelectionSet;
use crate::storage::KeyValueStore;
use crate::structured_logger::StructuredLogger;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::watch;

/// External capabilities the controller runs against.
#[derive(Clone)]
pub struct WorkboxDeps {
    pub client: Arc<dyn QueryClient>,
    pub store: Arc<dyn KeyValueStore>,
    pub logger: Option<Arc<StructuredLogger>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkboxSettings {
    pub index: String,
    /// Database name, used as the host of item uris and in command mutations.
    pub host: String,
    pub default_page_size: u32,
    pub page_size_options: Vec<u32>,
}

impl Default for WorkboxSettings {
    fn default() -> Self {
        Self {
            index: "sitecore_master_index".to_string(),
            host: "master".to_string(),
            default_page_size: 10,
            page_size_options: vec![10, 25, 50],
        }
    }
}

impl From<&WorkboxConfig> for WorkboxSettings {
    fn from(config: &WorkboxConfig) -> Self {
        Self {
            index: config.search.index.clone(),
            host: config.search.database.clone(),
            default_page_size: config.paging.default_page_size,
            page_size_options: config.paging.page_size_options.clone(),
        }
    }
}

/// The view state reflected into the host's address bar.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewQuery {
    pub state: Option<StateId>,
    /// Zero-based.
    pub page_index: Option<u32>,
    pub page_size: Option<u32>,
    #[serde(default)]
    pub filters: FilterCriteria,
    #[serde(default)]
    pub sort: Option<SortSpec>,
}

impl ViewQuery {
    /// Non-empty values as `(name, value)` pairs. Encoding is up to the host.
    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        let mut push = |key: &str, value: Option<String>| {
            if let Some(value) = value.filter(|v| !v.trim().is_empty()) {
                pairs.push((key.to_string(), value));
            }
        };

        push("state", self.state.map(|s| s.to_string()));
        push("pageIndex", self.page_index.map(|p| p.to_string()));
        push("pageSize", self.page_size.map(|p| p.to_string()));
        push("path", self.filters.path.clone());
        push("name", self.filters.name.clone());
        push("version", self.filters.version.clone());
        push("language", self.filters.language.clone());
        push("templateName", self.filters.template_name.clone());
        push("updatedBy", self.filters.updated_by.clone());
        push("updatedFrom", self.filters.updated_from.map(|d| d.to_rfc3339()));
        push("updatedTo", self.filters.updated_to.map(|d| d.to_rfc3339()));
        push("sortField", self.sort.as_ref().map(|s| s.field.clone()));
        push(
            "sortDirection",
            self.sort
                .as_ref()
                .and_then(|s| s.direction)
                .map(|d| d.wire_name().to_ascii_lowercase()),
        );
        pairs
    }

    /// Reads what [`ViewQuery::to_query_pairs`] wrote. Unknown names and
    /// unparsable values are ignored.
    pub fn from_query_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut query = Self::default();
        let mut sort_field = None;
        let mut sort_direction = None;
        for (key, value) in pairs {
            let value = value.as_ref().trim();
            if value.is_empty() {
                continue;
            }
            let text = Some(value.to_string());
            match key.as_ref() {
                "state" => query.state = StateId::parse(value).ok(),
                "pageIndex" => query.page_index = value.parse().ok(),
                "pageSize" => query.page_size = value.parse().ok(),
                "path" => query.filters.path = text,
                "name" => query.filters.name = text,
                "version" => query.filters.version = text,
                "language" => query.filters.language = text,
                "templateName" => query.filters.template_name = text,
                "updatedBy" => query.filters.updated_by = text,
                "updatedFrom" => query.filters.updated_from = parse_instant(value),
                "updatedTo" => query.filters.updated_to = parse_instant(value),
                "sortField" => sort_field = text,
                "sortDirection" => sort_direction = parse_direction(value),
                other => tracing::debug!(key = other, "ignoring unknown view parameter"),
            }
        }
        query.sort = sort_field.map(|field| SortSpec {
            field,
            direction: sort_direction,
        });
        query
    }
}

fn parse_direction(value: &str) -> Option<SortDirection> {
    [SortDirection::Ascending, SortDirection::Descending]
        .into_iter()
        .find(|d| d.wire_name().eq_ignore_ascii_case(value))
}

fn parse_instant(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|d| d.with_timezone(&Utc))
}

pub struct WorkboxController {
    deps: WorkboxDeps,
    settings: WorkboxSettings,
    builder: QueryCriteriaBuilder,
    catalog: WorkflowCatalog,
    workflow_id: WorkflowId,
    state_id: StateId,
    page_index: u32,
    page_size: u32,
    filters: FilterCriteria,
    sort: SortSpec,
    show_only_selected: bool,
    page: ResultPage,
    selection: SelectionSet,
    pending: Option<BulkCommandExecutor>,
    last_refresh_error: Option<WorkboxError>,
    last_selection_error: Option<WorkboxError>,
}

impl WorkboxController {
    /// Loads the catalog and the saved selection, applies `initial` and shows
    /// the first page.
    ///
    /// A catalog or storage failure is fatal. A failed first refresh is not:
    /// the controller starts with an empty page and reports the error through
    /// [`WorkboxController::last_refresh_error`].
    pub async fn initialize(
        deps: WorkboxDeps,
        settings: WorkboxSettings,
        workflow_ids: &[WorkflowId],
        initial: ViewQuery,
    ) -> Result<Self, WorkboxError> {
        if let Some(logger) = &deps.logger {
            logger.begin_run();
        }

        let catalog = match WorkflowCatalog::load(deps.client.as_ref(), workflow_ids).await {
            Ok(catalog) => catalog,
            Err(err) => {
                if let (Some(logger), WorkboxError::CatalogLoadFailed { failures }) =
                    (&deps.logger, &err)
                {
                    logger.log_catalog_failed(failures);
                }
                return Err(err);
            }
        };
        if let Some(logger) = &deps.logger {
            let states = catalog.workflows().iter().map(|w| w.states.len()).sum();
            logger.log_catalog_loaded(catalog.workflows().len(), states);
        }

        let (workflow_id, state_id) =
            catalog
                .initial_selection(initial.state)
                .ok_or_else(|| WorkboxError::CatalogLoadFailed {
                    failures: vec!["no workflow state to open".to_string()],
                })?;

        let selection = SelectionSet::restore(deps.store.clone())?;
        let page_size = initial
            .page_size
            .filter(|size| settings.page_size_options.contains(size))
            .unwrap_or(settings.default_page_size);

        let mut controller = Self {
            builder: QueryCriteriaBuilder::new(settings.index.clone()),
            page: ResultPage::new(settings.host.clone()),
            deps,
            settings,
            catalog,
            workflow_id,
            state_id,
            page_index: initial.page_index.unwrap_or(0),
            page_size,
            filters: initial.filters,
            sort: initial.sort.unwrap_or_default(),
            show_only_selected: false,
            selection,
            pending: None,
            last_refresh_error: None,
            last_selection_error: None,
        };

        if let Err(err) = controller.refresh().await {
            tracing::warn!(error = %err, "initial refresh failed");
        }
        Ok(controller)
    }

    // ---- read side ----

    pub fn catalog(&self) -> &WorkflowCatalog {
        &self.catalog
    }

    pub fn workflow_id(&self) -> WorkflowId {
        self.workflow_id
    }

    pub fn state_id(&self) -> StateId {
        self.state_id
    }

    pub fn states(&self) -> &[WorkflowState] {
        self.catalog.states_for(self.workflow_id).unwrap_or_default()
    }

    pub fn state_display_name(&self) -> Option<&str> {
        self.catalog
            .state(self.state_id)
            .map(|s| s.display_name.as_str())
    }

    /// Commands the operator may run in the current state.
    pub fn commands(&self) -> &[WorkflowCommand] {
        self.catalog.commands_for(self.state_id).unwrap_or_default()
    }

    pub fn page_index(&self) -> u32 {
        self.page_index
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn page_size_options(&self) -> &[u32] {
        &self.settings.page_size_options
    }

    pub fn filters(&self) -> &FilterCriteria {
        &self.filters
    }

    pub fn sort(&self) -> &SortSpec {
        &self.sort
    }

    pub fn show_only_selected(&self) -> bool {
        self.show_only_selected
    }

    pub fn result_page(&self) -> &ResultPage {
        &self.page
    }

    pub fn selection(&self) -> &SelectionSet {
        &self.selection
    }

    pub fn last_refresh_error(&self) -> Option<&WorkboxError> {
        self.last_refresh_error.as_ref()
    }

    /// Why the last batch could not be dropped from the saved selection.
    pub fn last_selection_error(&self) -> Option<&WorkboxError> {
        self.last_selection_error.as_ref()
    }

    /// The rows on screen: the current page, or in "show only selected" mode
    /// the selection in the current state.
    ///
    /// `is_current_for_selected_state` is taken against the browsed state, so
    /// rows left over from another state after a failed refresh do not count.
    pub fn visible_items(&self) -> Vec<WorkboxItem> {
        if self.show_only_selected {
            return self.selection.items_for_state(self.state_id);
        }
        self.page
            .items()
            .iter()
            .map(|item| WorkboxItem {
                is_current_for_selected_state: item.workflow_state_id == self.state_id,
                ..item.clone()
            })
            .collect()
    }

    pub fn total_count(&self) -> u64 {
        if self.show_only_selected {
            self.selected_count() as u64
        } else {
            self.page.total_count()
        }
    }

    /// Selected items in the current state (the count badge).
    pub fn selected_count(&self) -> usize {
        self.selection.count_for_state(self.state_id)
    }

    pub fn view_query(&self) -> ViewQuery {
        ViewQuery {
            state: Some(self.state_id),
            page_index: Some(self.page_index),
            page_size: Some(self.page_size),
            filters: self.filters.clone(),
            sort: (self.sort != SortSpec::default()).then(|| self.sort.clone()),
        }
    }

    pub fn page_query(&self) -> PageQuery {
        PageQuery {
            state_id: self.state_id,
            page_index: self.page_index,
            page_size: self.page_size,
            filters: self.filters.clone(),
            sort: self.sort.clone(),
        }
    }

    // ---- navigation ----

    /// Re-runs the current search. Does nothing in "show only selected" mode.
    pub async fn refresh(&mut self) -> Result<RefreshOutcome, WorkboxError> {
        if self.show_only_selected {
            return Ok(RefreshOutcome::Unchanged);
        }

        let query = self.page_query();
        let result = self
            .page
            .refresh(self.deps.client.as_ref(), &self.builder, &query)
            .await;

        match &result {
            Ok(outcome) => {
                self.last_refresh_error = None;
                if let Some(logger) = &self.deps.logger {
                    logger.log_refresh(
                        query.state_id,
                        query.page_index,
                        &format!("{:?}", outcome),
                        self.page.total_count(),
                    );
                }
            }
            Err(err) => {
                self.last_refresh_error = Some(err.clone());
                if let Some(logger) = &self.deps.logger {
                    logger.log_refresh(query.state_id, query.page_index, "Failed", 0);
                }
            }
        }
        result
    }

    /// Switches workflow and opens its first state.
    pub async fn select_workflow(&mut self, workflow_id: WorkflowId) -> Result<(), WorkboxError> {
        let workflow = self
            .catalog
            .workflow(workflow_id)
            .ok_or_else(|| WorkboxError::UnknownWorkflow {
                id: workflow_id.to_string(),
            })?;
        let first_state = workflow
            .states
            .first()
            .map(|s| s.id)
            .ok_or_else(|| WorkboxError::UnknownState {
                id: format!("first state of workflow {}", workflow_id),
            })?;

        self.select_state(first_state).await
    }

    /// Opens `state_id` on the first page. The state may belong to any loaded workflow.
    pub async fn select_state(&mut self, state_id: StateId) -> Result<(), WorkboxError> {
        let workflow_id = self
            .catalog
            .workflow_for_state(state_id)
            .map(|w| w.id)
            .ok_or_else(|| WorkboxError::UnknownState {
                id: state_id.to_string(),
            })?;

        self.workflow_id = workflow_id;
        self.state_id = state_id;
        self.page_index = 0;
        self.pending = None;
        tracing::debug!(%state_id, "browsing state");
        self.refresh_logged().await;
        Ok(())
    }

    /// Replaces all filters and returns to the first page.
    pub async fn set_filters(&mut self, filters: FilterCriteria) {
        self.filters = filters;
        self.page_index = 0;
        self.refresh_logged().await;
    }

    /// Changes the sort and reloads the current page.
    pub async fn set_sort(&mut self, sort: SortSpec) {
        self.sort = sort;
        self.refresh_logged().await;
    }

    pub async fn go_to_page(&mut self, page_index: u32) {
        self.page_index = page_index;
        self.refresh_logged().await;
    }

    pub async fn set_page_size(&mut self, page_size: u32) -> Result<(), WorkboxError> {
        if !self.settings.page_size_options.contains(&page_size) {
            return Err(WorkboxError::InvalidTransition {
                message: format!(
                    "page size {} is not one of {:?}",
                    page_size, self.settings.page_size_options
                ),
            });
        }
        self.page_size = page_size;
        self.refresh_logged().await;
        Ok(())
    }

    /// Leaving the mode goes back to the first page of search results.
    pub async fn set_show_only_selected(&mut self, show_only_selected: bool) {
        if self.show_only_selected == show_only_selected {
            return;
        }
        self.show_only_selected = show_only_selected;
        if !show_only_selected {
            self.page_index = 0;
            self.refresh_logged().await;
        }
    }

    async fn refresh_logged(&mut self) {
        if let Err(err) = self.refresh().await {
            tracing::warn!(error = %err, "refresh failed, keeping previous page");
        }
    }

    // ---- selection ----

    /// Selects or deselects one visible item.
    pub fn set_item_selected(&mut self, uri: &ItemUri, selected: bool) -> Result<bool, WorkboxError> {
        let changed = if selected {
            let item = self
                .visible_items()
                .into_iter()
                .find(|i| &i.uri == uri)
                .ok_or_else(|| WorkboxError::InvalidTransition {
                    message: format!("item {} is not visible", uri),
                })?;
            self.selection.add(item)?
        } else {
            self.selection.remove(uri)?
        };
        self.log_selection(if selected { "select" } else { "deselect" });
        Ok(changed)
    }

    pub fn select_all_visible(&mut self) -> Result<bool, WorkboxError> {
        let visible = self.visible_items();
        let changed = self.selection.select_all_visible(&visible)?;
        self.log_selection("select_all_visible");
        Ok(changed)
    }

    pub fn deselect_all_visible(&mut self) -> Result<bool, WorkboxError> {
        let visible = self.visible_items();
        let changed = self.selection.deselect_all_visible(&visible)?;
        self.log_selection("deselect_all_visible");
        Ok(changed)
    }

    fn log_selection(&self, action: &str) {
        if let Some(logger) = &self.deps.logger {
            logger.log_selection_changed(action, self.selection.len(), self.selected_count());
        }
    }

    // ---- commands ----

    /// Opens the command dialog for the selected items in the current state,
    /// sorted by path. Returns the phase receiver for progress display.
    pub fn prepare_command(
        &mut self,
        command_id: CommandId,
    ) -> Result<watch::Receiver<ExecutionPhase>, WorkboxError> {
        if !self.commands().iter().any(|c| c.id == command_id) {
            return Err(WorkboxError::UnknownCommand {
                id: command_id.to_string(),
            });
        }

        let items = self.selection.items_for_state(self.state_id);
        if items.is_empty() {
            return Err(WorkboxError::InvalidTransition {
                message: "no selected items in the current state".to_string(),
            });
        }

        let (executor, phase_rx) = BulkCommandExecutor::new(command_id, self.state_id, items);
        self.pending = Some(executor.with_logger(self.deps.logger.clone()));
        Ok(phase_rx)
    }

    /// The prepared command, if the dialog is open.
    pub fn pending_command(&self) -> Option<&BulkCommandExecutor> {
        self.pending.as_ref()
    }

    /// Runs the prepared command with the operator's comments.
    pub async fn submit_command(&mut self, comments: &str) -> Result<BatchOutcome, WorkboxError> {
        let executor = self
            .pending
            .as_mut()
            .ok_or_else(|| WorkboxError::InvalidTransition {
                message: "no command prepared".to_string(),
            })?;
        executor.set_comments(comments);
        executor.execute(self.deps.client.as_ref()).await
    }

    /// Closes the dialog without sending anything.
    pub fn cancel_command(&mut self) -> Result<(), WorkboxError> {
        let executor = self
            .pending
            .as_mut()
            .ok_or_else(|| WorkboxError::InvalidTransition {
                message: "no command prepared".to_string(),
            })?;
        executor.cancel()?;
        self.pending = None;
        Ok(())
    }

    /// Closes the dialog after a batch: drops the successful items from the
    /// selection and reloads the page. Failed items stay selected.
    ///
    /// The dialog is closed and the page reloaded even when the selection
    /// cannot be saved. That error is returned and kept in
    /// [`WorkboxController::last_selection_error`].
    pub async fn complete_command(&mut self, outcome: &BatchOutcome) -> Result<(), WorkboxError> {
        self.pending = None;
        let succeeded = outcome.successful_uris();
        let pruned = self.selection.remove_all(succeeded.iter());
        self.last_selection_error = pruned.as_ref().err().cloned();
        if let Err(err) = &pruned {
            tracing::warn!(error = %err, "could not drop completed items from the selection");
        }
        self.log_selection("command_completed");
        self.refresh_logged().await;
        pruned.map(|_| ())
    }

    /// Prepares, submits and completes `command_id` in one go. Once the batch
    /// ran its outcome is returned, whether or not the selection could be
    /// updated afterwards.
    pub async fn execute_command(
        &mut self,
        command_id: CommandId,
        comments: &str,
    ) -> Result<BatchOutcome, WorkboxError> {
        self.prepare_command(command_id)?;
        let outcome = self.submit_command(comments).await?;
        let _ = self.complete_command(&outcome).await;
        Ok(outcome)
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
