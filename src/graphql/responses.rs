//! Typed `data` payloads of the authoring API operations.

use crate::domain::{CommandId, StateId, WorkflowId};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct WorkflowStatesResponse {
    pub workflow: Option<WorkflowStates>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowStates {
    pub workflow_id: WorkflowId,
    pub display_name: String,
    pub states: Nodes<StateNode>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateNode {
    pub state_id: StateId,
    pub display_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WorkflowCommandsResponse {
    pub workflow: Option<WorkflowCommands>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WorkflowCommands {
    pub commands: Nodes<CommandNode>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandNode {
    pub command_id: CommandId,
    pub display_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Nodes<T> {
    #[serde(default = "Vec::new")]
    pub nodes: Vec<T>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WorkboxItemsResponse {
    pub search: SearchResults,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResults {
    pub total_count: u64,
    #[serde(default)]
    pub results: Vec<SearchResult>,
    #[serde(default)]
    pub facets: Vec<Facet>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub path: String,
    pub name: String,
    pub item_id: String,
    pub updated_date: Option<String>,
    #[serde(default)]
    pub updated_by: String,
    pub language: Language,
    pub version: u32,
    #[serde(default)]
    pub template_name: String,
    pub inner_item: Option<InnerItem>,
}

impl SearchResult {
    /// The state the item is in right now, if it is still in a workflow.
    pub fn workflow_state_id(&self) -> Option<StateId> {
        self.inner_item
            .as_ref()?
            .workflow
            .as_ref()?
            .workflow_state
            .as_ref()
            .map(|s| s.state_id)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Language {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InnerItem {
    pub workflow: Option<ItemWorkflow>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemWorkflow {
    pub workflow_state: Option<ItemWorkflowState>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemWorkflowState {
    pub state_id: StateId,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Facet {
    pub name: String,
    #[serde(default)]
    pub facets: Vec<FacetBucket>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FacetBucket {
    pub name: String,
    #[serde(default)]
    pub count: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteWorkflowCommandResponse {
    pub execute_workflow_command: ExecuteWorkflowCommandResult,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExecuteWorkflowCommandResult {
    pub successful: bool,
    pub error: Option<String>,
}
