//! The currently displayed page of workbox items and its facet summaries.
//!
//! Refreshes are sequenced with monotonically increasing tokens: a response is
//! only applied if no newer refresh has been issued since it was requested, so a
//! slow response can never overwrite a newer page.

use crate::criteria::{
    FilterCriteria, QueryCriteriaBuilder, SearchRequest, SortSpec, LANGUAGE_FIELD,
    TEMPLATE_NAME_FIELD, UPDATED_BY_FIELD,
};
use crate::domain::{ItemUri, StateId, WorkboxError, WorkboxItem};
use crate::graphql::responses::{Facet, SearchResult, WorkboxItemsResponse};
use crate::graphql::{requests, send_query, QueryClient};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Account domain prefixed to updated-by values in the index.
pub const UPDATED_BY_DOMAIN: &str = "sitecore";

const COMPACT_DATE_FORMATS: [&str; 4] = [
    "%Y%m%dT%H%M%SZ",
    "%Y%m%dT%H%M%S",
    "%Y-%m-%dT%H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
];

/// Inserts the separator the index strips from account names
/// (`sitecoreadmin` is shown as `sitecore/admin`). Display only.
pub fn display_updated_by(value: &str) -> String {
    match value.strip_prefix(UPDATED_BY_DOMAIN) {
        Some(rest) if !rest.is_empty() && !rest.starts_with('/') && !rest.starts_with('\\') => {
            format!("{}/{}", UPDATED_BY_DOMAIN, rest)
        }
        _ => value.to_string(),
    }
}

/// Everything that selects one page of results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageQuery {
    pub state_id: StateId,
    pub page_index: u32,
    pub page_size: u32,
    pub filters: FilterCriteria,
    pub sort: SortSpec,
}

impl PageQuery {
    pub fn to_search(&self, builder: &QueryCriteriaBuilder) -> SearchRequest {
        builder.build(
            self.state_id,
            self.page_index,
            self.page_size,
            &self.filters,
            &self.sort,
        )
    }
}

/// One facet bucket. `value` is what filters must send back; `label` is for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacetValue {
    pub value: String,
    pub label: String,
    pub count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RefreshToken(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The page was replaced.
    Applied,
    /// The response had no data; the previous page stays displayed.
    Unchanged,
    /// A newer refresh was issued meanwhile; the response was dropped.
    Stale,
}

#[derive(Debug, Clone, Default)]
pub struct ResultPage {
    host: String,
    items: Vec<WorkboxItem>,
    total_count: u64,
    template_names: Vec<FacetValue>,
    updated_by: Vec<FacetValue>,
    languages: Vec<FacetValue>,
    latest_token: u64,
}

impl ResultPage {
    /// `host` is the database name composed into item uris.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ..Default::default()
        }
    }

    pub fn items(&self) -> &[WorkboxItem] {
        &self.items
    }

    pub fn total_count(&self) -> u64 {
        self.total_count
    }

    pub fn template_names(&self) -> &[FacetValue] {
        &self.template_names
    }

    pub fn updated_by(&self) -> &[FacetValue] {
        &self.updated_by
    }

    pub fn languages(&self) -> &[FacetValue] {
        &self.languages
    }

    /// Builds, executes and applies one search.
    pub async fn refresh(
        &mut self,
        client: &dyn QueryClient,
        builder: &QueryCriteriaBuilder,
        query: &PageQuery,
    ) -> Result<RefreshOutcome, WorkboxError> {
        let token = self.issue_token();
        let response = Self::fetch(client, &query.to_search(builder)).await?;
        Ok(self.apply(token, query.state_id, response))
    }

    /// Reserves the token for a refresh about to be issued.
    pub fn issue_token(&mut self) -> RefreshToken {
        self.latest_token += 1;
        RefreshToken(self.latest_token)
    }

    pub async fn fetch(
        client: &dyn QueryClient,
        search: &SearchRequest,
    ) -> Result<Option<WorkboxItemsResponse>, WorkboxError> {
        send_query(client, &requests::workbox_items(search)).await
    }

    /// Applies a fetched response if `token` is still the newest one.
    pub fn apply(
        &mut self,
        token: RefreshToken,
        browsed_state: StateId,
        response: Option<WorkboxItemsResponse>,
    ) -> RefreshOutcome {
        if token.0 != self.latest_token {
            tracing::debug!(token = token.0, latest = self.latest_token, "dropping stale page");
            return RefreshOutcome::Stale;
        }

        let Some(response) = response else {
            tracing::debug!("search returned no data, keeping current page");
            return RefreshOutcome::Unchanged;
        };

        let search = response.search;
        self.items = search
            .results
            .into_iter()
            .filter_map(|row| {
                let path = row.path.clone();
                to_item(row, browsed_state, &self.host)
                    .map_err(|reason| tracing::warn!(%path, %reason, "skipping search result"))
                    .ok()
            })
            .collect();
        self.total_count = search.total_count;
        self.template_names = facet_values(&search.facets, TEMPLATE_NAME_FIELD, str::to_string);
        self.updated_by = facet_values(&search.facets, UPDATED_BY_FIELD, display_updated_by);
        self.languages = facet_values(&search.facets, LANGUAGE_FIELD, str::to_string);

        RefreshOutcome::Applied
    }
}

fn to_item(row: SearchResult, browsed_state: StateId, host: &str) -> Result<WorkboxItem, String> {
    let workflow_state_id = row
        .workflow_state_id()
        .ok_or_else(|| "item is not in a workflow".to_string())?;
    let updated_at = row
        .updated_date
        .as_deref()
        .and_then(parse_updated)
        .ok_or_else(|| format!("unparsable updated date {:?}", row.updated_date))?;
    if row.version == 0 {
        return Err("version 0".to_string());
    }

    Ok(WorkboxItem {
        uri: ItemUri::compose(host, &row.item_id, row.version, &row.language.name),
        path: row.path,
        name: row.name,
        language: row.language.name,
        version: row.version,
        template_name: row.template_name,
        updated_by: display_updated_by(&row.updated_by),
        updated_at,
        workflow_state_id,
        is_current_for_selected_state: workflow_state_id == browsed_state,
    })
}

fn parse_updated(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc));
    }
    COMPACT_DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .map(|naive| naive.and_utc())
}

fn facet_values(facets: &[Facet], name: &str, label: fn(&str) -> String) -> Vec<FacetValue> {
    let mut values: Vec<FacetValue> = facets
        .iter()
        .find(|f| f.name == name)
        .map(|f| {
            f.facets
                .iter()
                .map(|bucket| FacetValue {
                    value: bucket.name.clone(),
                    label: label(&bucket.name),
                    count: bucket.count,
                })
                .collect()
        })
        .unwrap_or_default();
    values.sort_by(|a, b| a.value.cmp(&b.value));
    values
}

#[cfg(test)]
#[path = "tests/results_tests.rs"]
mod tests;
