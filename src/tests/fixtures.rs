//! Shared test data: the sample workflow and canned authoring API responses.

use crate::catalog::{Workflow, WorkflowCatalog, WorkflowCommand, WorkflowState};
use crate::domain::{CommandId, ItemUri, StateId, WorkboxError, WorkboxItem, WorkflowId};
use crate::graphql::requests::{
    EXECUTE_WORKFLOW_COMMAND_OPERATION, WORKBOX_ITEMS_OPERATION, WORKFLOW_COMMANDS_OPERATION,
    WORKFLOW_STATES_OPERATION,
};
use crate::graphql::{GraphQlRequest, GraphQlResponse};
use crate::storage::{KeyValueStore, MemoryKeyValueStore};
use chrono::{TimeZone, Utc};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};

pub const SAMPLE_WORKFLOW: &str = "a5bc37e7-ed96-4c1e-8590-a26e64db55ea";
pub const DRAFT: &str = "190b1c84-f1be-47ed-aa41-f42193d9c8fc";
pub const AWAITING_APPROVAL: &str = "46da5376-10dc-4b66-b464-afdaa29de84f";
pub const APPROVED: &str = "fca998c5-0cc3-4f91-b1d6-6f8a4f1b8e6e";

pub const SUBMIT: &str = "8e5f5e3c-2d6c-4a3e-9f0a-0a1b2c3d4e01";
pub const APPROVE: &str = "fcd1f29b-4a1c-4b8e-8d5c-0a1b2c3d4e02";
pub const REJECT: &str = "ac3b1e4f-7c2d-4f6a-9b1e-0a1b2c3d4e03";
pub const SYSTEM_LOCK: &str = "0d2e6a7b-5f3c-4d1e-8a9b-0a1b2c3d4e04";

pub const HOST: &str = "master";

pub fn workflow_id() -> WorkflowId {
    WorkflowId::parse(SAMPLE_WORKFLOW).unwrap()
}

pub fn state(id: &str) -> StateId {
    StateId::parse(id).unwrap()
}

pub fn command(id: &str) -> CommandId {
    CommandId::parse(id).unwrap()
}

/// Answers the two catalog queries for the sample workflow.
pub fn catalog_response(request: &GraphQlRequest) -> Option<GraphQlResponse<Value>> {
    match request.operation_name.as_str() {
        WORKFLOW_STATES_OPERATION => {
            if request.variables["workflowId"] != SAMPLE_WORKFLOW {
                return Some(GraphQlResponse::with_errors(&["workflow not found"]));
            }
            Some(GraphQlResponse::with_data(json!({
                "workflow": {
                    "workflowId": format!("{{{}}}", SAMPLE_WORKFLOW.to_uppercase()),
                    "displayName": "Sample Workflow",
                    "states": { "nodes": [
                        { "stateId": DRAFT, "displayName": "Draft" },
                        { "stateId": AWAITING_APPROVAL, "displayName": "Awaiting Approval" },
                        { "stateId": APPROVED, "displayName": "Approved" },
                    ]}
                }
            })))
        }
        WORKFLOW_COMMANDS_OPERATION => {
            let state_id = StateId::parse(request.variables["stateId"].as_str()?).ok()?;
            let nodes = if state_id == state(DRAFT) {
                json!([{ "commandId": SUBMIT, "displayName": "Submit" }])
            } else if state_id == state(AWAITING_APPROVAL) {
                json!([
                    { "commandId": APPROVE, "displayName": "Approve" },
                    { "commandId": REJECT, "displayName": "Reject" },
                    { "commandId": SYSTEM_LOCK, "displayName": "_SystemLock" },
                ])
            } else {
                json!([])
            };
            Some(GraphQlResponse::with_data(
                json!({ "workflow": { "commands": { "nodes": nodes } } }),
            ))
        }
        _ => None,
    }
}

/// Catalog responder that fails everything else.
pub fn catalog_only(request: &GraphQlRequest) -> Result<GraphQlResponse<Value>, WorkboxError> {
    catalog_response(request).ok_or_else(|| WorkboxError::query_failed("unexpected operation"))
}

pub fn sample_catalog() -> WorkflowCatalog {
    let states = vec![
        WorkflowState {
            id: state(DRAFT),
            display_name: "Draft".to_string(),
        },
        WorkflowState {
            id: state(AWAITING_APPROVAL),
            display_name: "Awaiting Approval".to_string(),
        },
        WorkflowState {
            id: state(APPROVED),
            display_name: "Approved".to_string(),
        },
    ];
    let workflow = Workflow {
        id: workflow_id(),
        display_name: "Sample Workflow".to_string(),
        states,
    };
    let submit = WorkflowCommand {
        id: command(SUBMIT),
        display_name: "Submit".to_string(),
    };
    let approve = WorkflowCommand {
        id: command(APPROVE),
        display_name: "Approve".to_string(),
    };
    let reject = WorkflowCommand {
        id: command(REJECT),
        display_name: "Reject".to_string(),
    };
    WorkflowCatalog::from_parts(
        vec![workflow],
        vec![
            (state(DRAFT), vec![submit]),
            (state(AWAITING_APPROVAL), vec![approve, reject]),
            (state(APPROVED), vec![]),
        ],
    )
}

pub fn item_id(n: usize) -> String {
    format!("{{00000000-0000-4000-8000-{:012}}}", n)
}

/// A selected-looking item `n` sitting in `state_id`.
pub fn item(n: usize, state_id: StateId) -> WorkboxItem {
    WorkboxItem {
        path: format!("/sitecore/content/home/item-{:03}", n),
        name: format!("item-{:03}", n),
        language: "en".to_string(),
        version: 1,
        template_name: "Sample Item".to_string(),
        updated_by: "sitecore/admin".to_string(),
        updated_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        workflow_state_id: state_id,
        uri: ItemUri::compose(HOST, &item_id(n), 1, "en"),
        is_current_for_selected_state: true,
    }
}

/// One search result row as returned by the index.
pub fn search_row(n: usize, state_id: &str) -> Value {
    json!({
        "path": format!("/sitecore/content/home/item-{:03}", n),
        "name": format!("item-{:03}", n),
        "itemId": item_id(n),
        "createdDate": "2024-04-01T09:00:00Z",
        "updatedDate": "2024-05-01T12:00:00Z",
        "updatedBy": "sitecoreadmin",
        "language": { "name": "en" },
        "version": 1,
        "templateName": "Sample Item",
        "innerItem": { "workflow": { "workflowState": { "stateId": state_id } } }
    })
}

pub fn search_data(total: u64, rows: Vec<Value>) -> Value {
    json!({
        "search": {
            "totalCount": total,
            "results": rows,
            "facets": [
                { "name": "_templatename", "facets": [
                    { "name": "Sample Item", "count": 7 },
                    { "name": "Article", "count": 2 },
                ]},
                { "name": "parsedupdatedby", "facets": [
                    { "name": "sitecoreeditor", "count": 3 },
                    { "name": "sitecoreadmin", "count": 6 },
                ]},
                { "name": "_language", "facets": [
                    { "name": "en", "count": 8 },
                    { "name": "da", "count": 1 },
                ]},
            ]
        }
    })
}

/// Answers catalog queries and returns `rows` for every search.
pub fn workbox_responder(
    rows: Vec<Value>,
) -> impl Fn(&GraphQlRequest) -> Result<GraphQlResponse<Value>, WorkboxError> + Send + Sync {
    move |request: &GraphQlRequest| {
        if let Some(response) = catalog_response(request) {
            return Ok(response);
        }
        match request.operation_name.as_str() {
            WORKBOX_ITEMS_OPERATION => Ok(GraphQlResponse::with_data(search_data(
                rows.len() as u64,
                rows.clone(),
            ))),
            EXECUTE_WORKFLOW_COMMAND_OPERATION => Ok(command_result(true, None)),
            other => Err(WorkboxError::query_failed(format!("unexpected {}", other))),
        }
    }
}

pub fn command_result(successful: bool, error: Option<&str>) -> GraphQlResponse<Value> {
    GraphQlResponse::with_data(json!({
        "executeWorkflowCommand": { "successful": successful, "error": error }
    }))
}

/// In-memory store whose writes can be switched to fail.
#[derive(Default)]
pub struct FlakyStore {
    inner: MemoryKeyValueStore,
    fail_writes: AtomicBool,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

impl KeyValueStore for FlakyStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<Value>> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &Value) -> anyhow::Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            anyhow::bail!("disk full");
        }
        self.inner.set(key, value)
    }
}
