//! Optional TOML configuration file.
//!
//! Every key mirrors a CLI flag in kebab-case. Values from the file are only
//! used for flags that were not passed on the command line.

use crate::config::ConfigError;
use serde::Deserialize;
use std::path::Path;
use tracing::debug;

/// Parsed contents of a `git-fleet.toml` file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileConfig {
    pub branch_name: Option<String>,
    pub base_branch_name: Option<String>,
    pub commit_message: Option<String>,
    pub pull_request_title: Option<String>,
    pub pull_request_description: Option<String>,
    pub dry_run: Option<bool>,
    pub skip_pull_requests: Option<bool>,
    pub draft: Option<bool>,
    pub skip_archived_repos: Option<bool>,
    pub max_concurrent_repos: Option<usize>,
    pub max_concurrent_clones: Option<usize>,
    pub seconds_between_prs: Option<u64>,
    pub max_pr_retries: Option<u32>,
    pub seconds_to_wait_when_rate_limited: Option<u64>,

    #[serde(default)]
    pub reviewers: Vec<String>,

    #[serde(default)]
    pub team_reviewers: Vec<String>,

    #[serde(default)]
    pub assignees: Vec<String>,
}

impl FileConfig {
    /// Loads and parses a config file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file is missing, unreadable or not valid TOML.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        debug!(path = %path.display(), "Loading config file");

        if !path.exists() {
            return Err(ConfigError::MissingFile {
                path: path.display().to_string(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::IoError {
            path: path.display().to_string(),
            source: e,
        })?;

        Self::parse(&content, path)
    }

    /// Parses config file contents.
    pub(crate) fn parse(content: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::TomlError {
            path: path.display().to_string(),
            source: e,
        })
    }
}
