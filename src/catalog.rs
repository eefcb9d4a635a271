//! Workflow catalog: workflows, their states, and the commands valid in each state.
//!
//! Loaded once per session in two parallel phases (states per workflow, then
//! commands per state). Any failed lookup fails the whole load.

use crate::domain::{CommandId, StateId, WorkboxError, WorkflowId};
use crate::graphql::requests;
use crate::graphql::responses::{WorkflowCommandsResponse, WorkflowStatesResponse};
use crate::graphql::{send_query, QueryClient};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Display-name prefix marking system commands hidden from operators.
pub const RESERVED_COMMAND_PREFIX: &str = "_";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workflow {
    pub id: WorkflowId,
    pub display_name: String,
    pub states: Vec<WorkflowState>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowState {
    pub id: StateId,
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowCommand {
    pub id: CommandId,
    pub display_name: String,
}

impl WorkflowCommand {
    pub fn is_reserved(display_name: &str) -> bool {
        display_name.starts_with(RESERVED_COMMAND_PREFIX)
    }
}

/// Immutable for the session once loaded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkflowCatalog {
    workflows: Vec<Workflow>,
    commands_by_state: HashMap<StateId, Vec<WorkflowCommand>>,
    workflow_by_state: HashMap<StateId, WorkflowId>,
}

impl WorkflowCatalog {
    /// Loads every workflow in `workflow_ids`, keeping their order.
    pub async fn load(
        client: &dyn QueryClient,
        workflow_ids: &[WorkflowId],
    ) -> Result<Self, WorkboxError> {
        if workflow_ids.is_empty() {
            return Err(WorkboxError::CatalogLoadFailed {
                failures: vec!["no workflows configured".to_string()],
            });
        }

        let state_lookups = workflow_ids.iter().map(|id| load_workflow(client, *id));
        let (workflows, failures): (Vec<_>, Vec<_>) =
            join_all(state_lookups).await.into_iter().partition(Result::is_ok);
        if !failures.is_empty() {
            return Err(catalog_failure(failures));
        }
        let workflows: Vec<Workflow> = workflows.into_iter().filter_map(Result::ok).collect();

        let command_lookups = workflows.iter().flat_map(|workflow| {
            workflow
                .states
                .iter()
                .map(move |state| load_commands(client, workflow.id, state.id))
        });
        let (commands, failures): (Vec<_>, Vec<_>) =
            join_all(command_lookups).await.into_iter().partition(Result::is_ok);
        if !failures.is_empty() {
            return Err(catalog_failure(failures));
        }

        let commands_by_state: HashMap<StateId, Vec<WorkflowCommand>> =
            commands.into_iter().filter_map(Result::ok).collect();
        let workflow_by_state = workflows
            .iter()
            .flat_map(|w| w.states.iter().map(move |s| (s.id, w.id)))
            .collect();

        tracing::info!(
            workflows = workflows.len(),
            states = commands_by_state.len(),
            "workflow catalog loaded"
        );

        Ok(Self {
            workflows,
            commands_by_state,
            workflow_by_state,
        })
    }

    pub fn workflows(&self) -> &[Workflow] {
        &self.workflows
    }

    pub fn workflow(&self, id: WorkflowId) -> Option<&Workflow> {
        self.workflows.iter().find(|w| w.id == id)
    }

    pub fn states_for(&self, workflow_id: WorkflowId) -> Option<&[WorkflowState]> {
        self.workflow(workflow_id).map(|w| w.states.as_slice())
    }

    /// Operator-facing commands for a state, reserved commands already removed.
    pub fn commands_for(&self, state_id: StateId) -> Option<&[WorkflowCommand]> {
        self.commands_by_state.get(&state_id).map(Vec::as_slice)
    }

    pub fn workflow_for_state(&self, state_id: StateId) -> Option<&Workflow> {
        self.workflow_by_state
            .get(&state_id)
            .and_then(|id| self.workflow(*id))
    }

    pub fn state(&self, state_id: StateId) -> Option<&WorkflowState> {
        self.workflow_for_state(state_id)?
            .states
            .iter()
            .find(|s| s.id == state_id)
    }

    /// The workflow and state to open first.
    ///
    /// A remembered state wins if it belongs to a loaded workflow; otherwise the
    /// first workflow's first state. `None` if that workflow has no states.
    pub fn initial_selection(&self, remembered: Option<StateId>) -> Option<(WorkflowId, StateId)> {
        if let Some(state_id) = remembered {
            if let Some(workflow) = self.workflow_for_state(state_id) {
                return Some((workflow.id, state_id));
            }
            tracing::debug!(%state_id, "remembered state not in catalog");
        }

        let workflow = self.workflows.first()?;
        let state = workflow.states.first()?;
        Some((workflow.id, state.id))
    }

    #[cfg(test)]
    pub fn from_parts(workflows: Vec<Workflow>, commands: Vec<(StateId, Vec<WorkflowCommand>)>) -> Self {
        let workflow_by_state = workflows
            .iter()
            .flat_map(|w| w.states.iter().map(move |s| (s.id, w.id)))
            .collect();
        Self {
            workflows,
            commands_by_state: commands.into_iter().collect(),
            workflow_by_state,
        }
    }
}

async fn load_workflow(client: &dyn QueryClient, workflow_id: WorkflowId) -> Result<Workflow, String> {
    let request = requests::workflow_states(workflow_id);
    let response: Option<WorkflowStatesResponse> = send_query(client, &request)
        .await
        .map_err(|e| format!("states of workflow {}: {}", workflow_id, e))?;

    let workflow = response
        .and_then(|r| r.workflow)
        .ok_or_else(|| format!("states of workflow {}: no data returned", workflow_id))?;

    Ok(Workflow {
        id: workflow.workflow_id,
        display_name: workflow.display_name,
        states: workflow
            .states
            .nodes
            .into_iter()
            .map(|s| WorkflowState {
                id: s.state_id,
                display_name: s.display_name,
            })
            .collect(),
    })
}

async fn load_commands(
    client: &dyn QueryClient,
    workflow_id: WorkflowId,
    state_id: StateId,
) -> Result<(StateId, Vec<WorkflowCommand>), String> {
    let request = requests::workflow_commands(workflow_id, state_id);
    let response: Option<WorkflowCommandsResponse> = send_query(client, &request)
        .await
        .map_err(|e| format!("commands of state {}: {}", state_id, e))?;

    let workflow = response
        .and_then(|r| r.workflow)
        .ok_or_else(|| format!("commands of state {}: no data returned", state_id))?;

    let commands = workflow
        .commands
        .nodes
        .into_iter()
        .filter(|c| !WorkflowCommand::is_reserved(&c.display_name))
        .map(|c| WorkflowCommand {
            id: c.command_id,
            display_name: c.display_name,
        })
        .collect();

    Ok((state_id, commands))
}

fn catalog_failure<T>(failures: Vec<Result<T, String>>) -> WorkboxError {
    let failures: Vec<String> = failures.into_iter().filter_map(Result::err).collect();
    tracing::warn!(count = failures.len(), "workflow catalog load failed");
    WorkboxError::CatalogLoadFailed { failures }
}

#[cfg(test)]
#[path = "tests/catalog_tests.rs"]
mod tests;
