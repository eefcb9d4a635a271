//! Error types for the workbox core.

use std::fmt::{Display, Formatter};

/// Errors surfaced by the catalog loader, result refresh, selection and command executor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkboxError {
    /// One or more workflow/state/command lookups failed; no partial catalog is kept.
    CatalogLoadFailed { failures: Vec<String> },
    /// A query returned neither data nor errors.
    EmptyResponse,
    /// The query capability reported an error or returned undecodable data.
    QueryFailed { message: String },
    /// A single item's remote command reported failure.
    CommandExecutionFailed { uri: String, reason: String },
    /// An item uri could not be split into id, version, language and host.
    MalformedIdentifier { uri: String, reason: String },
    /// The workflow id is not part of the loaded catalog.
    UnknownWorkflow { id: String },
    /// The state id is not part of the loaded catalog.
    UnknownState { id: String },
    /// The command is not offered in the current state.
    UnknownCommand { id: String },
    /// Operation is not legal in the current phase.
    InvalidTransition { message: String },
    /// Durable storage could not be read or written.
    StorageFailure { message: String },
}

impl WorkboxError {
    pub fn query_failed(message: impl Into<String>) -> Self {
        Self::QueryFailed {
            message: message.into(),
        }
    }

    pub fn storage(err: &anyhow::Error) -> Self {
        Self::StorageFailure {
            message: format!("{:#}", err),
        }
    }
}

impl Display for WorkboxError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CatalogLoadFailed { failures } => {
                write!(f, "workflow catalog load failed: {}", failures.join("; "))
            }
            Self::EmptyResponse => write!(f, "query returned no data"),
            Self::QueryFailed { message } => write!(f, "query failed: {}", message),
            Self::CommandExecutionFailed { uri, reason } => {
                write!(f, "command failed for {}: {}", uri, reason)
            }
            Self::MalformedIdentifier { uri, reason } => {
                write!(f, "malformed item uri '{}': {}", uri, reason)
            }
            Self::UnknownWorkflow { id } => write!(f, "unknown workflow: {}", id),
            Self::UnknownState { id } => write!(f, "unknown workflow state: {}", id),
            Self::UnknownCommand { id } => write!(f, "command not available: {}", id),
            Self::InvalidTransition { message } => write!(f, "invalid transition: {}", message),
            Self::StorageFailure { message } => write!(f, "storage failure: {}", message),
        }
    }
}

impl std::error::Error for WorkboxError {}
