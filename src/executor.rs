//! Bulk execution of one workflow command over a list of selected items.
//!
//! Items are processed strictly one after another in the order given. A failed
//! item never stops the batch. Phase changes are broadcast on a watch channel
//! so a host can render progress while the batch runs.

use crate::domain::{CommandId, ItemUri, StateId, WorkboxError, WorkboxItem};
use crate::graphql::requests;
use crate::graphql::responses::ExecuteWorkflowCommandResponse;
use crate::graphql::{send_query, QueryClient};
use crate::structured_logger::StructuredLogger;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum ExecutionPhase {
    Ready,
    Submitting { processed: usize, total: usize },
    Submitted,
    Cancelled,
}

impl ExecutionPhase {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Ready => "ready",
            Self::Submitting { .. } => "submitting",
            Self::Submitted => "submitted",
            Self::Cancelled => "cancelled",
        }
    }
}

/// Result of running the command against one item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemOutcome {
    pub uri: ItemUri,
    pub path: String,
    pub successful: bool,
    pub error: Option<String>,
}

impl ItemOutcome {
    /// The failure as an error value, `None` for a successful item.
    pub fn to_error(&self) -> Option<WorkboxError> {
        if self.successful {
            return None;
        }
        Some(WorkboxError::CommandExecutionFailed {
            uri: self.uri.to_string(),
            reason: self
                .error
                .clone()
                .unwrap_or_else(|| "unknown error".to_string()),
        })
    }
}

/// Per-item outcomes of one batch, in input order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchOutcome {
    outcomes: Vec<ItemOutcome>,
    processed: Vec<WorkboxItem>,
}

impl BatchOutcome {
    pub fn outcomes(&self) -> &[ItemOutcome] {
        &self.outcomes
    }

    pub fn get(&self, uri: &ItemUri) -> Option<&ItemOutcome> {
        self.outcomes.iter().find(|o| &o.uri == uri)
    }

    pub fn successful_uris(&self) -> Vec<ItemUri> {
        self.outcomes
            .iter()
            .filter(|o| o.successful)
            .map(|o| o.uri.clone())
            .collect()
    }

    pub fn failed(&self) -> Vec<&ItemOutcome> {
        self.outcomes.iter().filter(|o| !o.successful).collect()
    }

    /// Items that transitioned, in input order.
    pub fn processed_items(&self) -> &[WorkboxItem] {
        &self.processed
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }
}

pub struct BulkCommandExecutor {
    command_id: CommandId,
    state_id: StateId,
    items: Vec<WorkboxItem>,
    comments: String,
    phase_tx: watch::Sender<ExecutionPhase>,
    logger: Option<Arc<StructuredLogger>>,
}

impl BulkCommandExecutor {
    /// Prepares a batch in the `Ready` phase. `items` are processed in the order given.
    pub fn new(
        command_id: CommandId,
        state_id: StateId,
        items: Vec<WorkboxItem>,
    ) -> (Self, watch::Receiver<ExecutionPhase>) {
        let (phase_tx, phase_rx) = watch::channel(ExecutionPhase::Ready);
        let executor = Self {
            command_id,
            state_id,
            items,
            comments: String::new(),
            phase_tx,
            logger: None,
        };
        (executor, phase_rx)
    }

    pub fn with_logger(mut self, logger: Option<Arc<StructuredLogger>>) -> Self {
        self.logger = logger;
        self
    }

    /// Free-text comments sent with every command invocation.
    pub fn set_comments(&mut self, comments: impl Into<String>) {
        self.comments = comments.into();
    }

    pub fn comments(&self) -> &str {
        &self.comments
    }

    pub fn command_id(&self) -> CommandId {
        self.command_id
    }

    pub fn state_id(&self) -> StateId {
        self.state_id
    }

    pub fn items(&self) -> &[WorkboxItem] {
        &self.items
    }

    pub fn phase(&self) -> ExecutionPhase {
        *self.phase_tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<ExecutionPhase> {
        self.phase_tx.subscribe()
    }

    /// Abandons the batch before anything was sent.
    pub fn cancel(&mut self) -> Result<(), WorkboxError> {
        self.require_ready("cancel")?;
        self.phase_tx.send_replace(ExecutionPhase::Cancelled);
        tracing::debug!(command_id = %self.command_id, "command batch cancelled");
        Ok(())
    }

    /// Runs the command against every item exactly once, in order.
    pub async fn execute(&mut self, client: &dyn QueryClient) -> Result<BatchOutcome, WorkboxError> {
        self.require_ready("execute")?;

        let total = self.items.len();
        self.phase_tx
            .send_replace(ExecutionPhase::Submitting { processed: 0, total });
        if let Some(logger) = &self.logger {
            logger.log_command_started(self.command_id, self.state_id, total);
        }

        let mut batch = BatchOutcome::default();
        for (index, item) in self.items.iter().enumerate() {
            let outcome = self.run_one(client, item).await;
            if let Some(logger) = &self.logger {
                logger.log_item_outcome(&outcome);
            }
            if outcome.successful {
                batch.processed.push(item.clone());
            } else {
                tracing::warn!(
                    uri = %outcome.uri,
                    error = outcome.error.as_deref().unwrap_or_default(),
                    "workflow command failed for item"
                );
            }
            batch.outcomes.push(outcome);
            self.phase_tx.send_replace(ExecutionPhase::Submitting {
                processed: index + 1,
                total,
            });
        }

        let failed = batch.failed().len();
        tracing::info!(
            command_id = %self.command_id,
            succeeded = total - failed,
            failed,
            "workflow command batch finished"
        );
        if let Some(logger) = &self.logger {
            logger.log_command_finished(total - failed, failed);
        }
        self.phase_tx.send_replace(ExecutionPhase::Submitted);
        Ok(batch)
    }

    async fn run_one(&self, client: &dyn QueryClient, item: &WorkboxItem) -> ItemOutcome {
        let failure = |reason: String| ItemOutcome {
            uri: item.uri.clone(),
            path: item.path.clone(),
            successful: false,
            error: Some(reason),
        };

        let locator = match item.uri.decompose() {
            Ok(locator) => locator,
            Err(e) => return failure(e.to_string()),
        };

        let request = requests::execute_workflow_command(self.command_id, &locator, &self.comments);
        match send_query::<ExecuteWorkflowCommandResponse>(client, &request).await {
            Ok(Some(response)) if response.execute_workflow_command.successful => ItemOutcome {
                uri: item.uri.clone(),
                path: item.path.clone(),
                successful: true,
                error: None,
            },
            Ok(Some(response)) => failure(
                response
                    .execute_workflow_command
                    .error
                    .unwrap_or_else(|| "command was not successful".to_string()),
            ),
            Ok(None) => failure(WorkboxError::EmptyResponse.to_string()),
            Err(e) => failure(e.to_string()),
        }
    }

    fn require_ready(&self, action: &str) -> Result<(), WorkboxError> {
        let phase = self.phase();
        if phase != ExecutionPhase::Ready {
            return Err(WorkboxError::InvalidTransition {
                message: format!("cannot {} a batch that is {}", action, phase.name()),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/executor_tests.rs"]
mod tests;
