use crate::domain::WorkflowId;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Environment variable that overrides `instance.access_token`.
pub const ACCESS_TOKEN_ENV: &str = "WORKBOX_ACCESS_TOKEN";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WorkboxConfig {
    pub instance: InstanceConfig,
    #[serde(default)]
    pub search: SearchConfig,
    /// Workflows offered in the workbox, in display order.
    pub workflows: Vec<WorkflowId>,
    #[serde(default)]
    pub paging: PagingConfig,
}

/// The content management instance hosting the authoring API.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InstanceConfig {
    pub base_url: String,
    #[serde(default = "default_graphql_path")]
    pub graphql_path: String,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SearchConfig {
    #[serde(default = "default_index")]
    pub index: String,
    /// Database name; also the host part of item uris.
    #[serde(default = "default_database")]
    pub database: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            index: default_index(),
            database: default_database(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PagingConfig {
    #[serde(default = "default_page_size")]
    pub default_page_size: u32,
    #[serde(default = "default_page_size_options")]
    pub page_size_options: Vec<u32>,
}

impl Default for PagingConfig {
    fn default() -> Self {
        Self {
            default_page_size: default_page_size(),
            page_size_options: default_page_size_options(),
        }
    }
}

fn default_graphql_path() -> String {
    "/sitecore/api/authoring/graphql/v1".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_index() -> String {
    "sitecore_master_index".to_string()
}

fn default_database() -> String {
    "master".to_string()
}

fn default_page_size() -> u32 {
    10
}

fn default_page_size_options() -> Vec<u32> {
    vec![10, 25, 50]
}

impl WorkboxConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config = Self::from_yaml(&content)
            .with_context(|| format!("Invalid config file: {}", path.display()))?;
        Ok(config)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Self =
            serde_yaml::from_str(content).context("Failed to parse config file as YAML")?;
        config.validate()?;
        Ok(config)
    }

    /// The configuration embedded in the binary.
    pub fn default_config() -> Result<Self> {
        const DEFAULT_WORKBOX_YAML: &str = include_str!("../workbox.yaml");

        Self::from_yaml(DEFAULT_WORKBOX_YAML).context("Embedded workbox.yaml is invalid")
    }

    pub fn validate(&self) -> Result<()> {
        let base_url = self.instance.base_url.trim();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            anyhow::bail!(
                "instance.base_url must be an http(s) URL, got '{}'",
                self.instance.base_url
            );
        }

        if !self.instance.graphql_path.starts_with('/') {
            anyhow::bail!(
                "instance.graphql_path must start with '/', got '{}'",
                self.instance.graphql_path
            );
        }

        if self.instance.request_timeout_secs == 0 {
            anyhow::bail!("instance.request_timeout_secs must be greater than 0");
        }

        if self.workflows.is_empty() {
            anyhow::bail!("At least one workflow must be configured");
        }

        if self.search.index.trim().is_empty() {
            anyhow::bail!("search.index must not be empty");
        }

        if self.search.database.trim().is_empty() {
            anyhow::bail!("search.database must not be empty");
        }

        if self.paging.page_size_options.iter().any(|size| *size == 0) {
            anyhow::bail!("paging.page_size_options must not contain 0");
        }

        if !self
            .paging
            .page_size_options
            .contains(&self.paging.default_page_size)
        {
            anyhow::bail!(
                "paging.default_page_size {} is not one of {:?}",
                self.paging.default_page_size,
                self.paging.page_size_options
            );
        }

        Ok(())
    }

    /// GraphQL endpoint: base URL plus API path.
    pub fn endpoint(&self) -> String {
        format!(
            "{}{}",
            self.instance.base_url.trim().trim_end_matches('/'),
            self.instance.graphql_path
        )
    }

    /// Token from the environment if set, otherwise from the file.
    pub fn access_token(&self) -> Option<String> {
        self.access_token_with(std::env::var(ACCESS_TOKEN_ENV).ok())
    }

    fn access_token_with(&self, from_env: Option<String>) -> Option<String> {
        from_env
            .filter(|t| !t.trim().is_empty())
            .or_else(|| self.instance.access_token.clone())
            .filter(|t| !t.trim().is_empty())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.instance.request_timeout_secs)
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
