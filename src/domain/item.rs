//! Workbox items and their stable identifier.

use crate::domain::errors::WorkboxError;
use crate::domain::types::StateId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Scheme used when composing item uris.
pub const ITEM_URI_SCHEME: &str = "sitecore";

/// Stable identifier of one item version in one language on one host.
///
/// Shape: `sitecore://<host>/<item-id>?lang=<language>&ver=<version>`.
/// Selection membership and deduplication are keyed by this value only.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemUri(pub String);

/// The parts of an [`ItemUri`] needed to address the item in a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemLocator {
    pub item_id: String,
    pub version: u32,
    pub language: String,
    pub host: String,
}

impl ItemUri {
    pub fn compose(host: &str, item_id: &str, version: u32, language: &str) -> Self {
        Self(format!(
            "{}://{}/{}?lang={}&ver={}",
            ITEM_URI_SCHEME, host, item_id, language, version
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Splits the uri back into item id, version, language and host.
    pub fn decompose(&self) -> Result<ItemLocator, WorkboxError> {
        let malformed = |reason: &str| WorkboxError::MalformedIdentifier {
            uri: self.0.clone(),
            reason: reason.to_string(),
        };

        let (_, rest) = self
            .0
            .split_once("://")
            .ok_or_else(|| malformed("missing scheme"))?;
        let (location, query) = rest
            .split_once('?')
            .ok_or_else(|| malformed("missing query string"))?;
        let (host, path) = location
            .split_once('/')
            .ok_or_else(|| malformed("missing item path"))?;

        if host.is_empty() {
            return Err(malformed("missing host"));
        }

        let item_id = path.trim_matches('/');
        if item_id.is_empty() {
            return Err(malformed("missing item id"));
        }

        let mut language = None;
        let mut version = None;
        for pair in query.split('&') {
            match pair.split_once('=') {
                Some(("lang", value)) if !value.is_empty() => language = Some(value),
                Some(("ver", value)) => version = Some(value),
                _ => {}
            }
        }

        let language = language.ok_or_else(|| malformed("missing lang parameter"))?;
        let version = version
            .ok_or_else(|| malformed("missing ver parameter"))?
            .parse::<u32>()
            .ok()
            .filter(|v| *v >= 1)
            .ok_or_else(|| malformed("ver is not a positive integer"))?;

        Ok(ItemLocator {
            item_id: item_id.to_string(),
            version,
            language: language.to_string(),
            host: host.to_string(),
        })
    }
}

impl From<&str> for ItemUri {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ItemUri {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl std::fmt::Display for ItemUri {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One workflow-bound content item as shown in the workbox.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkboxItem {
    pub path: String,
    pub name: String,
    pub language: String,
    pub version: u32,
    pub template_name: String,
    /// Display form (see `results::display_updated_by`).
    pub updated_by: String,
    pub updated_at: DateTime<Utc>,
    /// The state the item is actually in on the remote side.
    pub workflow_state_id: StateId,
    pub uri: ItemUri,
    /// True iff `workflow_state_id` equals the state being browsed when the item was loaded.
    pub is_current_for_selected_state: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compose_then_decompose() {
        let uri = ItemUri::compose("master", "{6F3C2B1A-0000-4000-8000-000000000001}", 3, "en-US");
        assert_eq!(
            uri.as_str(),
            "sitecore://master/{6F3C2B1A-0000-4000-8000-000000000001}?lang=en-US&ver=3"
        );

        let locator = uri.decompose().unwrap();
        assert_eq!(locator.host, "master");
        assert_eq!(locator.item_id, "{6F3C2B1A-0000-4000-8000-000000000001}");
        assert_eq!(locator.version, 3);
        assert_eq!(locator.language, "en-US");
    }

    #[test]
    fn test_decompose_ignores_parameter_order() {
        let uri = ItemUri::from("sitecore://web/abc?ver=2&lang=da");
        let locator = uri.decompose().unwrap();
        assert_eq!(locator.version, 2);
        assert_eq!(locator.language, "da");
        assert_eq!(locator.host, "web");
    }

    #[test]
    fn test_decompose_reports_malformed_parts() {
        let cases = [
            "master/abc?lang=en&ver=1",
            "sitecore://master/abc",
            "sitecore://master?lang=en&ver=1",
            "sitecore:///abc?lang=en&ver=1",
            "sitecore://master/?lang=en&ver=1",
            "sitecore://master/abc?ver=1",
            "sitecore://master/abc?lang=en",
            "sitecore://master/abc?lang=en&ver=0",
            "sitecore://master/abc?lang=en&ver=x",
        ];

        for case in cases {
            let err = ItemUri::from(case).decompose().unwrap_err();
            assert!(
                matches!(err, WorkboxError::MalformedIdentifier { ref uri, .. } if uri == case),
                "expected malformed identifier for {}",
                case
            );
        }
    }
}
