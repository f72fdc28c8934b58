//! Client configuration.
//!
//! Everything the client needs to know about its environment is injected
//! through [`ClientConfig`]; nothing below this module reads the environment
//! or hard-codes an endpoint.

use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub const DEFAULT_API_URL: &str = "http://localhost:80/api";

pub const ENV_API_URL: &str = "CATALOG_API_URL";
pub const ENV_STORAGE_PATH: &str = "CATALOG_STORAGE_PATH";
pub const ENV_DELETE_POLICY: &str = "CATALOG_DELETE_POLICY";

/// How a batch deletion commits when only some of its requests succeed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CommitPolicy {
    /// Commit only if every delete succeeded; otherwise change nothing locally.
    ///
    /// Ids the server did delete stay visible until the next successful batch
    /// that includes them.
    #[default]
    AllOrNothing,
    /// Tombstone and remove every id whose delete succeeded, even if others failed.
    PerItem,
}

impl CommitPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommitPolicy::AllOrNothing => "all-or-nothing",
            CommitPolicy::PerItem => "per-item",
        }
    }
}

impl FromStr for CommitPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all-or-nothing" => Ok(CommitPolicy::AllOrNothing),
            "per-item" => Ok(CommitPolicy::PerItem),
            other => Err(format!(
                "unknown delete policy '{other}' (expected 'all-or-nothing' or 'per-item')"
            )),
        }
    }
}

/// Configuration for a catalog client instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    api_base_url: String,
    pub storage_path: Option<PathBuf>,
    pub commit_policy: CommitPolicy,
}

impl ClientConfig {
    pub fn new(api_base_url: impl Into<String>) -> Self {
        Self {
            api_base_url: normalize_base_url(api_base_url.into()),
            storage_path: None,
            commit_policy: CommitPolicy::default(),
        }
    }

    /// Build a configuration from `CATALOG_*` environment variables.
    ///
    /// Unset variables fall back to defaults; an unparseable delete policy is
    /// logged and ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let api_url = lookup(ENV_API_URL).unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let mut config = Self::new(api_url);

        config.storage_path = lookup(ENV_STORAGE_PATH)
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from);

        if let Some(raw) = lookup(ENV_DELETE_POLICY) {
            match raw.parse() {
                Ok(policy) => config.commit_policy = policy,
                Err(err) => tracing::warn!("ignoring {ENV_DELETE_POLICY}: {err}"),
            }
        }

        config
    }

    pub fn with_storage_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.storage_path = Some(path.into());
        self
    }

    pub fn with_commit_policy(mut self, policy: CommitPolicy) -> Self {
        self.commit_policy = policy;
        self
    }

    /// Base URL of the product service, without a trailing slash.
    pub fn api_base_url(&self) -> &str {
        &self.api_base_url
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_API_URL)
    }
}

fn normalize_base_url(url: String) -> String {
    let trimmed = url.trim().trim_end_matches('/');
    trimmed.to_string()
}
