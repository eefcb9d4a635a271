//! Request builders for the authoring API operations used by the workbox.

use super::GraphQlRequest;
use crate::criteria::SearchRequest;
use crate::domain::{CommandId, ItemLocator, StateId, WorkflowId};
use serde_json::json;

pub const WORKFLOW_STATES_OPERATION: &str = "WorkflowStates";
pub const WORKFLOW_COMMANDS_OPERATION: &str = "WorkflowCommands";
pub const WORKBOX_ITEMS_OPERATION: &str = "WorkboxItems";
pub const EXECUTE_WORKFLOW_COMMAND_OPERATION: &str = "ExecuteWorkflowCommand";

const WORKFLOW_STATES_QUERY: &str = r#"
query WorkflowStates($workflowId: String!) {
  workflow(where: { item: { itemId: $workflowId } }) {
    workflowId
    displayName
    states {
      nodes {
        stateId
        displayName
      }
    }
  }
}
"#;

const WORKFLOW_COMMANDS_QUERY: &str = r#"
query WorkflowCommands($workflowId: String!, $stateId: String!) {
  workflow(where: { item: { itemId: $workflowId } }) {
    commands(query: { stateId: $stateId }) {
      nodes {
        displayName
        commandId
      }
    }
  }
}
"#;

const WORKBOX_ITEMS_QUERY: &str = r#"
query WorkboxItems(
  $index: String!
  $pageSize: Int!
  $pageIndex: Int!
  $criteria: [SearchCriteriaInput]
  $sort: SearchSortInput
  $facetOnFields: [String]
) {
  search(
    query: {
      index: $index
      latestVersionOnly: false
      paging: { pageSize: $pageSize, pageIndex: $pageIndex }
      filterStatement: { criteria: $criteria }
      sort: $sort
      facetOnFields: $facetOnFields
    }
  ) {
    totalCount
    results {
      path
      name
      itemId
      createdDate
      updatedDate
      updatedBy
      language {
        name
      }
      version
      templateName
      innerItem {
        workflow {
          workflowState {
            stateId
          }
        }
      }
    }
    facets {
      name
      facets {
        name
        count
      }
    }
  }
}
"#;

const EXECUTE_WORKFLOW_COMMAND_MUTATION: &str = r#"
mutation ExecuteWorkflowCommand(
  $commandId: String!
  $itemId: String!
  $version: Int
  $language: String
  $database: String
  $comments: String
) {
  executeWorkflowCommand(
    input: {
      comments: $comments
      commandId: $commandId
      item: {
        database: $database
        version: $version
        language: $language
        itemId: $itemId
      }
    }
  ) {
    successful
    error
  }
}
"#;

/// Workflow display name and its ordered states.
pub fn workflow_states(workflow_id: WorkflowId) -> GraphQlRequest {
    GraphQlRequest {
        query: WORKFLOW_STATES_QUERY.to_string(),
        operation_name: WORKFLOW_STATES_OPERATION.to_string(),
        variables: json!({ "workflowId": workflow_id.to_string() }),
    }
}

/// Commands valid while an item is in `state_id`.
pub fn workflow_commands(workflow_id: WorkflowId, state_id: StateId) -> GraphQlRequest {
    GraphQlRequest {
        query: WORKFLOW_COMMANDS_QUERY.to_string(),
        operation_name: WORKFLOW_COMMANDS_OPERATION.to_string(),
        variables: json!({
            "workflowId": workflow_id.to_string(),
            "stateId": state_id.to_string(),
        }),
    }
}

/// One page of items plus facets for a built search request.
pub fn workbox_items(search: &SearchRequest) -> GraphQlRequest {
    GraphQlRequest {
        query: WORKBOX_ITEMS_QUERY.to_string(),
        operation_name: WORKBOX_ITEMS_OPERATION.to_string(),
        variables: json!({
            "index": search.index,
            "pageSize": search.page_size,
            "pageIndex": search.page_index,
            "criteria": search.criteria,
            "sort": search.sort,
            "facetOnFields": search.facet_on_fields,
        }),
    }
}

/// Runs `command_id` against one item version.
pub fn execute_workflow_command(
    command_id: CommandId,
    item: &ItemLocator,
    comments: &str,
) -> GraphQlRequest {
    GraphQlRequest {
        query: EXECUTE_WORKFLOW_COMMAND_MUTATION.to_string(),
        operation_name: EXECUTE_WORKFLOW_COMMAND_OPERATION.to_string(),
        variables: json!({
            "commandId": command_id.to_string(),
            "itemId": item.item_id,
            "version": item.version,
            "language": item.language,
            "database": item.host,
            "comments": comments,
        }),
    }
}
