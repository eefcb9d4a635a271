//! Strongly typed identifiers for the workflow catalog.
//!
//! Workflows, states and commands are identified by GUIDs on the remote side.
//! The remote API is not consistent about how it spells them (braced, hyphenated
//! or the 32-digit "simple" form used by the search index), so every identifier is
//! parsed into a `Uuid` and compared by value.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

macro_rules! guid_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Parses any GUID spelling accepted by the remote API.
            pub fn parse(s: &str) -> Result<Self, uuid::Error> {
                Uuid::parse_str(s.trim()).map(Self)
            }

            /// The 32 lowercase hex digit form stored in the search index.
            pub fn simple(&self) -> String {
                self.0.simple().to_string()
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

guid_newtype!(
    /// Identifier of a workflow definition item.
    WorkflowId
);

guid_newtype!(
    /// Identifier of a workflow state. Items report the state they are actually in.
    StateId
);

guid_newtype!(
    /// Identifier of a workflow command (a state transition).
    CommandId
);
