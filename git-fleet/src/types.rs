//! Core types shared across the fleet engine.
//!
//! - [`RepositoryDescriptor`] - A remote repository selected for a run
//! - [`AllowedRepo`] - An `org/name` pair supplied by the operator before it is looked up

use serde::{Deserialize, Serialize};
use std::fmt;

/// A remote repository targeted by a run.
///
/// Descriptors are immutable once fetched. The runner owns them and every
/// pipeline stage borrows them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryDescriptor {
    /// Repository owner (user or organization login).
    pub owner: String,

    /// Repository name.
    pub name: String,

    /// Default branch name (e.g., "main").
    pub default_branch: String,

    /// Whether the repository is archived (read-only).
    #[serde(default)]
    pub archived: bool,

    /// HTTPS clone URL.
    pub clone_url: String,

    /// Browser URL of the repository.
    #[serde(default)]
    pub html_url: String,
}

impl RepositoryDescriptor {
    /// Creates a descriptor for an existing repository.
    pub fn new(
        owner: impl Into<String>,
        name: impl Into<String>,
        default_branch: impl Into<String>,
        clone_url: impl Into<String>,
    ) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
            default_branch: default_branch.into(),
            archived: false,
            clone_url: clone_url.into(),
            html_url: String::new(),
        }
    }

    /// Creates a descriptor for input that never resolved to a real repository.
    ///
    /// Used so malformed or missing inputs still show up in the run report.
    pub fn placeholder(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
            default_branch: String::new(),
            archived: false,
            clone_url: String::new(),
            html_url: String::new(),
        }
    }

    /// Marks the descriptor as archived.
    #[must_use]
    pub fn with_archived(mut self, archived: bool) -> Self {
        self.archived = archived;
        self
    }

    /// Returns `owner/name`, or just the name when there is no owner.
    pub fn full_name(&self) -> String {
        if self.owner.is_empty() {
            self.name.clone()
        } else {
            format!("{}/{}", self.owner, self.name)
        }
    }
}

impl fmt::Display for RepositoryDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_name())
    }
}

/// A repository named by the operator as `org/name`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AllowedRepo {
    /// Organization or user login.
    pub organization: String,

    /// Repository name.
    pub name: String,
}

impl AllowedRepo {
    /// Parses a single `org/name` entry.
    ///
    /// Stray quotes, commas and exclamation marks are stripped and surrounding
    /// whitespace is ignored. Returns `None` when either part is missing.
    pub fn parse(input: &str) -> Option<Self> {
        let cleaned: String = input
            .trim()
            .chars()
            .filter(|c| !matches!(c, '\'' | '"' | ',' | '!'))
            .collect();

        let mut parts = cleaned.split('/');
        let organization = parts.next()?.trim();
        let name = parts.next()?.trim();

        if organization.is_empty() || name.is_empty() {
            return None;
        }

        Some(Self {
            organization: organization.to_string(),
            name: name.to_string(),
        })
    }
}

impl fmt::Display for AllowedRepo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.organization, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_name_joins_owner_and_name() {
        let repo = RepositoryDescriptor::new(
            "gruntwork-io",
            "fetch",
            "master",
            "https://github.com/gruntwork-io/fetch.git",
        );
        assert_eq!(repo.full_name(), "gruntwork-io/fetch");
        assert_eq!(repo.to_string(), "gruntwork-io/fetch");
    }

    #[test]
    fn placeholder_without_owner_uses_raw_name() {
        let repo = RepositoryDescriptor::placeholder("", "bad-line-no-slash");
        assert_eq!(repo.full_name(), "bad-line-no-slash");
    }

    #[test]
    fn parses_clean_entry() {
        let repo = AllowedRepo::parse("gruntwork-io/cloud-nuke").unwrap();
        assert_eq!(repo.organization, "gruntwork-io");
        assert_eq!(repo.name, "cloud-nuke");
    }

    #[test]
    fn strips_quotes_and_commas() {
        let repo = AllowedRepo::parse("  \"gruntwork-io/terragrunt\",  ").unwrap();
        assert_eq!(repo.to_string(), "gruntwork-io/terragrunt");

        let repo = AllowedRepo::parse("'gruntwork-io/fetch'!").unwrap();
        assert_eq!(repo.to_string(), "gruntwork-io/fetch");
    }

    #[test]
    fn rejects_entries_without_both_parts() {
        assert!(AllowedRepo::parse("bad-line-no-slash").is_none());
        assert!(AllowedRepo::parse("/cloud-nuke").is_none());
        assert!(AllowedRepo::parse("gruntwork-io/").is_none());
        assert!(AllowedRepo::parse("").is_none());
    }
}
