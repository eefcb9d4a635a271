//! GraphQL-over-HTTP transport for the authoring API.

use super::{GraphQlRequest, GraphQlResponse, QueryClient};
use crate::domain::WorkboxError;
use anyhow::Context;
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

/// Posts GraphQL requests to one endpoint with an optional bearer token.
///
/// `ureq` is blocking, so each call runs on tokio's blocking pool.
#[derive(Clone)]
pub struct HttpQueryClient {
    agent: ureq::Agent,
    endpoint: String,
    access_token: Option<String>,
}

impl HttpQueryClient {
    pub fn new(endpoint: String, access_token: Option<String>, timeout: Duration) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build();
        let agent: ureq::Agent = config.into();

        Self {
            agent,
            endpoint,
            access_token,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn post(&self, body: String) -> anyhow::Result<GraphQlResponse<Value>> {
        let mut request = self
            .agent
            .post(self.endpoint.as_str())
            .header(
                "User-Agent",
                format!("workbox/{}", env!("CARGO_PKG_VERSION")),
            )
            .header("Content-Type", "application/json")
            .header("Accept", "application/json");

        if let Some(token) = &self.access_token {
            request = request.header("Authorization", format!("Bearer {}", token));
        }

        let text = request
            .send(body)
            .with_context(|| format!("Failed to reach {}", self.endpoint))?
            .body_mut()
            .read_to_string()
            .context("Failed to read response body")?;

        serde_json::from_str(&text).context("Failed to parse GraphQL response")
    }
}

#[async_trait]
impl QueryClient for HttpQueryClient {
    async fn execute(
        &self,
        request: &GraphQlRequest,
    ) -> Result<GraphQlResponse<Value>, WorkboxError> {
        let body = serde_json::to_string(request).map_err(|e| {
            WorkboxError::query_failed(format!("{}: {}", request.operation_name, e))
        })?;
        tracing::debug!(operation = %request.operation_name, "sending query");

        let client = self.clone();
        let operation = request.operation_name.clone();
        tokio::task::spawn_blocking(move || client.post(body))
            .await
            .map_err(|e| WorkboxError::query_failed(format!("{}: {}", operation, e)))?
            .map_err(|e| WorkboxError::query_failed(format!("{}: {:#}", operation, e)))
    }
}
