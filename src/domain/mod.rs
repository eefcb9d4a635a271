//! Domain model shared by every workbox component.
//!
//! - **Identifiers** (`types.rs`): GUID newtypes for workflows, states and commands
//! - **Items** (`item.rs`): result rows and their stable `ItemUri`
//! - **Errors** (`errors.rs`): the core error taxonomy

pub mod errors;
pub mod item;
pub mod types;

pub use errors::WorkboxError;
pub use item::{ItemLocator, ItemUri, WorkboxItem, ITEM_URI_SCHEME};
pub use types::{CommandId, StateId, WorkflowId};
