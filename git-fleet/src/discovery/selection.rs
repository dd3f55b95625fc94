//! How the operator chose which repositories to process.

use crate::config::ValidationError;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// Source of the repository list for a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepoSelection {
    /// Every repository of an organization.
    Organization { org: String },

    /// Repository or code search results, optionally limited to one organization.
    Search { query: String, org: Option<String> },

    /// `org/name` lines from a file.
    ReposFile { path: PathBuf },

    /// `org/name` entries from `--repo` flags.
    Explicit { repos: Vec<String> },

    /// `org/name` entries piped on stdin.
    Stdin { repos: Vec<String> },
}

impl RepoSelection {
    /// Picks a selection from the supplied inputs.
    ///
    /// Precedence: search (scoped by org if given), org, repos file, `--repo`
    /// flags, stdin.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::NoSelection`] if every input is empty.
    pub fn from_inputs(
        github_org: Option<String>,
        github_search: Option<String>,
        repos_file: Option<PathBuf>,
        repo_flags: Vec<String>,
        stdin_repos: Vec<String>,
    ) -> Result<Self, ValidationError> {
        let github_org = github_org.filter(|org| !org.trim().is_empty());

        if let Some(query) = github_search.filter(|query| !query.trim().is_empty()) {
            return Ok(Self::Search {
                query,
                org: github_org,
            });
        }
        if let Some(org) = github_org {
            return Ok(Self::Organization { org });
        }
        if let Some(path) = repos_file {
            return Ok(Self::ReposFile { path });
        }
        if !repo_flags.is_empty() {
            return Ok(Self::Explicit { repos: repo_flags });
        }
        if !stdin_repos.is_empty() {
            return Ok(Self::Stdin { repos: stdin_repos });
        }
        Err(ValidationError::NoSelection)
    }

    #[must_use]
    pub fn mode(&self) -> SelectionMode {
        match self {
            Self::Organization { .. } => SelectionMode::GithubOrg,
            Self::Search { .. } => SelectionMode::GithubSearch,
            Self::ReposFile { .. } => SelectionMode::ReposFile,
            Self::Explicit { .. } => SelectionMode::RepoFlag,
            Self::Stdin { .. } => SelectionMode::RepoStdin,
        }
    }
}

/// Label for the selection method, shown in reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SelectionMode {
    GithubOrg,
    ReposFile,
    RepoFlag,
    RepoStdin,
    GithubSearch,
}

impl SelectionMode {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GithubOrg => "github-org",
            Self::ReposFile => "repos-file",
            Self::RepoFlag => "repo-flag",
            Self::RepoStdin => "repo-stdin",
            Self::GithubSearch => "github-search",
        }
    }
}

impl fmt::Display for SelectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
