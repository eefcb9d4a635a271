//! Workflow inbox state engine: the catalog of workflows, states and commands,
//! paged search of items awaiting action, a persistent cross-page selection and
//! sequential bulk execution of workflow commands.

pub mod catalog;
pub mod config;
pub mod controller;
pub mod criteria;
pub mod domain;
pub mod executor;
pub mod graphql;
pub mod paths;
pub mod results;
pub mod selection;
pub mod storage;
pub mod structured_logger;

pub use catalog::{Workflow, WorkflowCatalog, WorkflowCommand, WorkflowState};
pub use config::WorkboxConfig;
pub use controller::{ViewQuery, WorkboxController, WorkboxDeps, WorkboxSettings};
pub use criteria::{FilterCriteria, QueryCriteriaBuilder, SortDirection, SortField, SortSpec};
pub use domain::{CommandId, ItemUri, StateId, WorkboxError, WorkboxItem, WorkflowId};
pub use executor::{BatchOutcome, BulkCommandExecutor, ExecutionPhase, ItemOutcome};
pub use results::{RefreshOutcome, ResultPage};
pub use selection::SelectionSet;
