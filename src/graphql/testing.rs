//! In-memory query client for tests.

use super::{GraphQlRequest, GraphQlResponse, QueryClient};
use crate::domain::WorkboxError;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Mutex;

type Responder =
    dyn Fn(&GraphQlRequest) -> Result<GraphQlResponse<Value>, WorkboxError> + Send + Sync;

/// Answers every request through a closure and records what was sent.
pub struct ScriptedQueryClient {
    responder: Box<Responder>,
    sent: Mutex<Vec<GraphQlRequest>>,
}

impl ScriptedQueryClient {
    pub fn new(
        responder: impl Fn(&GraphQlRequest) -> Result<GraphQlResponse<Value>, WorkboxError>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        Self {
            responder: Box::new(responder),
            sent: Mutex::new(Vec::new()),
        }
    }

    /// Requests received so far, in arrival order.
    pub fn sent(&self) -> Vec<GraphQlRequest> {
        self.sent.lock().unwrap().clone()
    }

    /// Requests received for one operation name.
    pub fn sent_for(&self, operation_name: &str) -> Vec<GraphQlRequest> {
        self.sent()
            .into_iter()
            .filter(|r| r.operation_name == operation_name)
            .collect()
    }
}

#[async_trait]
impl QueryClient for ScriptedQueryClient {
    async fn execute(
        &self,
        request: &GraphQlRequest,
    ) -> Result<GraphQlResponse<Value>, WorkboxError> {
        self.sent.lock().unwrap().push(request.clone());
        // Yield so concurrently issued requests actually interleave.
        tokio::task::yield_now().await;
        (self.responder)(request)
    }
}
