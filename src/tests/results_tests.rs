use super::*;
use crate::graphql::testing::ScriptedQueryClient;
use crate::graphql::GraphQlResponse;
use crate::tests::fixtures::*;
use serde_json::json;

fn query(state_id: StateId) -> PageQuery {
    PageQuery {
        state_id,
        page_index: 0,
        page_size: 10,
        filters: FilterCriteria::default(),
        sort: SortSpec::default(),
    }
}

fn builder() -> QueryCriteriaBuilder {
    QueryCriteriaBuilder::new("sitecore_master_index")
}

fn decoded(data: serde_json::Value) -> Option<WorkboxItemsResponse> {
    Some(serde_json::from_value(data).unwrap())
}

#[tokio::test]
async fn test_refresh_maps_results_into_items() {
    let rows = vec![search_row(1, AWAITING_APPROVAL), search_row(2, APPROVED)];
    let client = ScriptedQueryClient::new(workbox_responder(rows));
    let mut page = ResultPage::new(HOST);

    let outcome = page
        .refresh(&client, &builder(), &query(state(AWAITING_APPROVAL)))
        .await
        .unwrap();

    assert_eq!(outcome, RefreshOutcome::Applied);
    assert_eq!(page.total_count(), 2);
    assert_eq!(page.items().len(), 2);

    let first = &page.items()[0];
    assert_eq!(first.path, "/sitecore/content/home/item-001");
    assert_eq!(first.language, "en");
    assert_eq!(first.version, 1);
    assert_eq!(first.template_name, "Sample Item");
    assert_eq!(first.workflow_state_id, state(AWAITING_APPROVAL));
    assert!(first.is_current_for_selected_state);
    assert_eq!(first.uri, ItemUri::compose(HOST, &item_id(1), 1, "en"));

    // The second item moved on to Approved since the index was built.
    assert!(!page.items()[1].is_current_for_selected_state);
}

#[tokio::test]
async fn test_refresh_sorts_each_facet_by_value() {
    let client = ScriptedQueryClient::new(workbox_responder(vec![]));
    let mut page = ResultPage::new(HOST);
    page.refresh(&client, &builder(), &query(state(DRAFT))).await.unwrap();

    let templates: Vec<&str> = page.template_names().iter().map(|f| f.value.as_str()).collect();
    assert_eq!(templates, vec!["Article", "Sample Item"]);

    let languages: Vec<&str> = page.languages().iter().map(|f| f.value.as_str()).collect();
    assert_eq!(languages, vec!["da", "en"]);

    let updated_by: Vec<(&str, &str)> = page
        .updated_by()
        .iter()
        .map(|f| (f.value.as_str(), f.label.as_str()))
        .collect();
    assert_eq!(
        updated_by,
        vec![
            ("sitecoreadmin", "sitecore/admin"),
            ("sitecoreeditor", "sitecore/editor")
        ]
    );
}

#[tokio::test]
async fn test_updated_by_filter_is_sent_untransformed() {
    let client = ScriptedQueryClient::new(workbox_responder(vec![]));
    let mut page = ResultPage::new(HOST);
    let mut q = query(state(DRAFT));
    q.filters.updated_by = Some("sitecoreadmin".to_string());

    page.refresh(&client, &builder(), &q).await.unwrap();

    let sent = client.sent_for("WorkboxItems");
    let criteria = sent[0].variables["criteria"].as_array().unwrap();
    let updated_by = criteria
        .iter()
        .find(|c| c["field"] == "parsedupdatedby")
        .unwrap();
    assert_eq!(updated_by["value"], "sitecoreadmin");
    assert_eq!(updated_by["criteriaType"], "WILDCARD");
}

#[tokio::test]
async fn test_empty_response_keeps_previous_page() {
    let client = ScriptedQueryClient::new(workbox_responder(vec![search_row(1, DRAFT)]));
    let mut page = ResultPage::new(HOST);
    page.refresh(&client, &builder(), &query(state(DRAFT))).await.unwrap();

    let empty = ScriptedQueryClient::new(|_| Ok(GraphQlResponse::with_data(serde_json::Value::Null)));
    let outcome = page.refresh(&empty, &builder(), &query(state(DRAFT))).await.unwrap();

    assert_eq!(outcome, RefreshOutcome::Unchanged);
    assert_eq!(page.items().len(), 1);
    assert_eq!(page.total_count(), 1);
}

#[tokio::test]
async fn test_failed_refresh_keeps_previous_page() {
    let client = ScriptedQueryClient::new(workbox_responder(vec![search_row(1, DRAFT)]));
    let mut page = ResultPage::new(HOST);
    page.refresh(&client, &builder(), &query(state(DRAFT))).await.unwrap();

    let failing = ScriptedQueryClient::new(|_| Ok(GraphQlResponse::with_errors(&["index offline"])));
    let err = page
        .refresh(&failing, &builder(), &query(state(DRAFT)))
        .await
        .unwrap_err();

    assert!(matches!(err, WorkboxError::QueryFailed { .. }));
    assert_eq!(page.items().len(), 1);
}

#[test]
fn test_stale_response_is_dropped() {
    let mut page = ResultPage::new(HOST);
    let older = page.issue_token();
    let newer = page.issue_token();

    let outcome = page.apply(newer, state(DRAFT), decoded(search_data(1, vec![search_row(1, DRAFT)])));
    assert_eq!(outcome, RefreshOutcome::Applied);

    let outcome = page.apply(
        older,
        state(DRAFT),
        decoded(search_data(2, vec![search_row(2, DRAFT), search_row(3, DRAFT)])),
    );
    assert_eq!(outcome, RefreshOutcome::Stale);
    assert_eq!(page.total_count(), 1);
    assert_eq!(page.items()[0].name, "item-001");
}

#[test]
fn test_rows_without_workflow_state_or_date_are_skipped() {
    let mut page = ResultPage::new(HOST);
    let token = page.issue_token();

    let mut no_state = search_row(1, DRAFT);
    no_state["innerItem"] = json!({ "workflow": null });
    let mut bad_date = search_row(2, DRAFT);
    bad_date["updatedDate"] = json!("yesterday");
    let good = search_row(3, DRAFT);

    page.apply(token, state(DRAFT), decoded(search_data(3, vec![no_state, bad_date, good])));

    assert_eq!(page.items().len(), 1);
    assert_eq!(page.items()[0].name, "item-003");
    assert_eq!(page.total_count(), 3);
}

#[test]
fn test_compact_index_dates_are_parsed() {
    let parsed = parse_updated("20240501T120000Z").unwrap();
    assert_eq!(parsed.to_rfc3339(), "2024-05-01T12:00:00+00:00");

    let parsed = parse_updated("2024-05-01T14:00:00+02:00").unwrap();
    assert_eq!(parsed.to_rfc3339(), "2024-05-01T12:00:00+00:00");
}

#[test]
fn test_display_updated_by() {
    assert_eq!(display_updated_by("sitecoreadmin"), "sitecore/admin");
    assert_eq!(display_updated_by("sitecore/admin"), "sitecore/admin");
    assert_eq!(display_updated_by("sitecore\\admin"), "sitecore\\admin");
    assert_eq!(display_updated_by("sitecore"), "sitecore");
    assert_eq!(display_updated_by("extranetanonymous"), "extranetanonymous");
}
