//! Translates filter, sort and paging state into a search request.
//!
//! The builder is total: every input produces a request, and unset or blank
//! filters degrade to a match-anything wildcard instead of an empty exact match.

use crate::domain::StateId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const WORKFLOW_STATE_FIELD: &str = "__workflow_state";
pub const PATH_FIELD: &str = "_fullpath";
pub const NAME_FIELD: &str = "_name";
pub const VERSION_FIELD: &str = "_version";
pub const LANGUAGE_FIELD: &str = "_language";
pub const TEMPLATE_NAME_FIELD: &str = "_templatename";
pub const UPDATED_BY_FIELD: &str = "parsedupdatedby";
pub const UPDATED_FIELD: &str = "__smallupdateddate";

/// Facet breakdowns requested with every search, in response order.
pub const FACET_FIELDS: [&str; 3] = [TEMPLATE_NAME_FIELD, UPDATED_BY_FIELD, LANGUAGE_FIELD];

pub const MATCH_ANYTHING: &str = "*";

/// Lower and upper bound of the index's date range.
pub const MIN_INSTANT: &str = "0001-01-01T00:00:00Z";
pub const MAX_INSTANT: &str = "9999-12-31T23:59:59Z";
const INSTANT_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Operator-entered filter values. `None` and blank strings mean "match all".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterCriteria {
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub template_name: Option<String>,
    /// Raw index value (never the display form).
    #[serde(default)]
    pub updated_by: Option<String>,
    #[serde(default)]
    pub updated_from: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_to: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn wire_name(&self) -> &'static str {
        match self {
            SortDirection::Ascending => "ASCENDING",
            SortDirection::Descending => "DESCENDING",
        }
    }
}

/// Sortable columns and their index fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortField {
    Path,
    Name,
    TemplateName,
    Updated,
    UpdatedBy,
    Version,
}

impl SortField {
    /// Column name to field; case, `_` and `-` are ignored.
    pub fn parse(name: &str) -> Option<Self> {
        let normalized: String = name
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .flat_map(char::to_lowercase)
            .collect();

        match normalized.as_str() {
            "path" => Some(SortField::Path),
            "name" => Some(SortField::Name),
            "templatename" => Some(SortField::TemplateName),
            "updated" => Some(SortField::Updated),
            "updatedby" => Some(SortField::UpdatedBy),
            "version" => Some(SortField::Version),
            _ => None,
        }
    }

    pub fn index_field(&self) -> &'static str {
        match self {
            SortField::Path => PATH_FIELD,
            SortField::Name => NAME_FIELD,
            SortField::TemplateName => TEMPLATE_NAME_FIELD,
            SortField::Updated => UPDATED_FIELD,
            SortField::UpdatedBy => UPDATED_BY_FIELD,
            SortField::Version => VERSION_FIELD,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SortField::Path => "Path",
            SortField::Name => "Name",
            SortField::TemplateName => "TemplateName",
            SortField::Updated => "Updated",
            SortField::UpdatedBy => "UpdatedBy",
            SortField::Version => "Version",
        }
    }
}

/// Sort column as chosen in the UI. The field is kept as free text so that an
/// unknown column name degrades instead of failing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub field: String,
    #[serde(default)]
    pub direction: Option<SortDirection>,
}

impl SortSpec {
    pub fn new(field: SortField, direction: SortDirection) -> Self {
        Self {
            field: field.name().to_string(),
            direction: Some(direction),
        }
    }
}

impl Default for SortSpec {
    /// Last updated, newest first.
    fn default() -> Self {
        Self::new(SortField::Updated, SortDirection::Descending)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CriteriaType {
    Search,
    Wildcard,
    Range,
}

/// One AND-composed filter clause.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Criterion {
    pub criteria_type: CriteriaType,
    pub field: String,
    pub value: String,
}

impl Criterion {
    fn new(criteria_type: CriteriaType, field: &str, value: String) -> Self {
        Self {
            criteria_type,
            field: field.to_string(),
            value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortClause {
    pub field: String,
    pub direction: String,
}

/// A fully resolved search request. Contains no hash maps, so its serialized
/// form is identical for identical inputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    pub index: String,
    pub page_index: u32,
    pub page_size: u32,
    pub criteria: Vec<Criterion>,
    pub sort: SortClause,
    pub facet_on_fields: Vec<String>,
}

impl SearchRequest {
    pub fn criterion(&self, field: &str) -> Option<&Criterion> {
        self.criteria.iter().find(|c| c.field == field)
    }
}

/// Builds search requests against one index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryCriteriaBuilder {
    index: String,
}

impl QueryCriteriaBuilder {
    pub fn new(index: impl Into<String>) -> Self {
        Self {
            index: index.into(),
        }
    }

    pub fn build(
        &self,
        state_id: StateId,
        page_index: u32,
        page_size: u32,
        filters: &FilterCriteria,
        sort: &SortSpec,
    ) -> SearchRequest {
        let criteria = vec![
            Criterion::new(CriteriaType::Search, WORKFLOW_STATE_FIELD, state_id.simple()),
            Criterion::new(
                CriteriaType::Wildcard,
                PATH_FIELD,
                substring_match(filters.path.as_deref()),
            ),
            Criterion::new(CriteriaType::Wildcard, NAME_FIELD, wildcard(filters.name.as_deref())),
            Criterion::new(
                CriteriaType::Wildcard,
                VERSION_FIELD,
                wildcard(filters.version.as_deref()),
            ),
            Criterion::new(
                CriteriaType::Wildcard,
                LANGUAGE_FIELD,
                wildcard(filters.language.as_deref()),
            ),
            Criterion::new(
                CriteriaType::Wildcard,
                TEMPLATE_NAME_FIELD,
                wildcard(filters.template_name.as_deref()),
            ),
            Criterion::new(
                CriteriaType::Wildcard,
                UPDATED_BY_FIELD,
                wildcard(filters.updated_by.as_deref()),
            ),
            Criterion::new(
                CriteriaType::Range,
                UPDATED_FIELD,
                date_range(filters.updated_from, filters.updated_to),
            ),
        ];

        SearchRequest {
            index: self.index.clone(),
            page_index,
            page_size,
            criteria,
            sort: sort_clause(sort),
            facet_on_fields: FACET_FIELDS.iter().map(|f| f.to_string()).collect(),
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn wildcard(value: Option<&str>) -> String {
    non_blank(value).unwrap_or(MATCH_ANYTHING).to_string()
}

fn substring_match(value: Option<&str>) -> String {
    match non_blank(value).map(|v| v.trim_matches('*')) {
        Some(v) if !v.is_empty() => format!("*{}*", v),
        _ => MATCH_ANYTHING.to_string(),
    }
}

fn date_range(from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> String {
    let from = from.map_or_else(
        || MIN_INSTANT.to_string(),
        |d| d.format(INSTANT_FORMAT).to_string(),
    );
    let to = to.map_or_else(
        || MAX_INSTANT.to_string(),
        |d| d.format(INSTANT_FORMAT).to_string(),
    );
    format!("[{} TO {}]", from, to)
}

fn sort_clause(sort: &SortSpec) -> SortClause {
    let field = SortField::parse(&sort.field).unwrap_or(SortField::UpdatedBy);
    let direction = sort.direction.unwrap_or_default();

    SortClause {
        field: field.index_field().to_string(),
        direction: direction.wire_name().to_string(),
    }
}

#[cfg(test)]
#[path = "tests/criteria_tests.rs"]
mod tests;
