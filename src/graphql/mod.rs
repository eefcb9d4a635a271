//! Query capability used by every remote-facing component.
//!
//! The core only depends on [`QueryClient`]: a named query plus variables in,
//! `{ data }` or `{ errors }` out. [`http::HttpQueryClient`] is the production
//! transport; tests script responses in memory.

pub mod http;
pub mod requests;
pub mod responses;

use crate::domain::WorkboxError;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use http::HttpQueryClient;

/// A named GraphQL operation with typed variables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphQlRequest {
    pub query: String,
    pub operation_name: String,
    pub variables: Value,
}

/// One entry of a GraphQL `errors` array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphQlError {
    pub message: String,
}

/// A GraphQL response envelope.
///
/// `data` may be absent or null on responses that are not errors; callers treat
/// that as "nothing to update".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphQlResponse<T> {
    #[serde(default = "none")]
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Option<Vec<GraphQlError>>,
}

fn none<T>() -> Option<T> {
    None
}

impl<T> GraphQlResponse<T> {
    pub fn with_data(data: T) -> Self {
        Self {
            data: Some(data),
            errors: None,
        }
    }

    pub fn with_errors(messages: &[&str]) -> Self {
        Self {
            data: None,
            errors: Some(
                messages
                    .iter()
                    .map(|m| GraphQlError {
                        message: m.to_string(),
                    })
                    .collect(),
            ),
        }
    }

    pub fn empty() -> Self {
        Self {
            data: None,
            errors: None,
        }
    }
}

/// Executes named queries against the remote authoring API.
#[async_trait]
pub trait QueryClient: Send + Sync {
    async fn execute(&self, request: &GraphQlRequest)
        -> Result<GraphQlResponse<Value>, WorkboxError>;
}

/// Sends `request` and decodes its data as `T`.
///
/// Returns `Ok(None)` when the response carries no data and no errors.
pub async fn send_query<T: DeserializeOwned>(
    client: &dyn QueryClient,
    request: &GraphQlRequest,
) -> Result<Option<T>, WorkboxError> {
    let response = client.execute(request).await?;

    if let Some(errors) = response.errors.filter(|e| !e.is_empty()) {
        let messages: Vec<&str> = errors.iter().map(|e| e.message.as_str()).collect();
        return Err(WorkboxError::query_failed(format!(
            "{}: {}",
            request.operation_name,
            messages.join("; ")
        )));
    }

    match response.data {
        None | Some(Value::Null) => Ok(None),
        Some(data) => serde_json::from_value(data).map(Some).map_err(|e| {
            WorkboxError::query_failed(format!(
                "{}: response could not be decoded: {}",
                request.operation_name, e
            ))
        }),
    }
}

#[cfg(test)]
pub mod testing;
