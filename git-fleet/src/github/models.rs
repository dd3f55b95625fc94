//! GitHub REST payloads (subset of fields we care about).

use crate::types::{AllowedRepo, RepositoryDescriptor};
use serde::{Deserialize, Serialize};

/// Repository owner.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiOwner {
    pub login: String,
}

/// A repository as returned by the repos, orgs and search endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiRepository {
    pub name: String,
    pub full_name: Option<String>,
    pub owner: Option<ApiOwner>,
    pub default_branch: Option<String>,
    #[serde(default)]
    pub archived: bool,
    pub clone_url: Option<String>,
    pub html_url: Option<String>,
}

impl ApiRepository {
    /// Returns the owner login, from the owner object or the full name.
    fn owner_login(&self) -> String {
        if let Some(owner) = &self.owner {
            return owner.login.clone();
        }
        self.full_name
            .as_deref()
            .and_then(|full_name| full_name.split_once('/'))
            .map(|(owner, _)| owner.to_string())
            .unwrap_or_default()
    }

    /// Converts the payload into a descriptor, filling gaps with GitHub conventions.
    pub fn into_descriptor(self) -> RepositoryDescriptor {
        let owner = self.owner_login();
        let clone_url = self
            .clone_url
            .unwrap_or_else(|| format!("https://github.com/{}/{}.git", owner, self.name));
        RepositoryDescriptor {
            default_branch: self.default_branch.unwrap_or_else(|| "main".to_string()),
            archived: self.archived,
            html_url: self.html_url.unwrap_or_default(),
            clone_url,
            name: self.name,
            owner,
        }
    }
}

/// Repository search response.
#[derive(Debug, Clone, Deserialize)]
pub struct RepositorySearchResults {
    #[serde(default)]
    pub items: Vec<ApiRepository>,
}

/// Code search response.
#[derive(Debug, Clone, Deserialize)]
pub struct CodeSearchResults {
    #[serde(default)]
    pub items: Vec<CodeSearchItem>,
}

/// A single code search hit.
#[derive(Debug, Clone, Deserialize)]
pub struct CodeSearchItem {
    pub repository: ApiRepository,
}

impl CodeSearchItem {
    /// Returns the repository the hit belongs to.
    pub fn allowed_repo(&self) -> AllowedRepo {
        AllowedRepo {
            organization: self.repository.owner_login(),
            name: self.repository.name.clone(),
        }
    }
}

/// A pull request.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    pub html_url: String,
    #[serde(default)]
    pub draft: bool,
}

/// Body of a pull request creation call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewPullRequest {
    pub title: String,
    pub head: String,
    pub base: String,
    pub body: String,
    pub maintainer_can_modify: bool,
    pub draft: bool,
}

/// Body of a review request call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReviewersRequest {
    pub reviewers: Vec<String>,
    pub team_reviewers: Vec<String>,
}

/// Error payload returned with non-success statuses.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub message: String,
    pub documentation_url: Option<String>,
    #[serde(default)]
    pub errors: Vec<ErrorDetail>,
}

impl ErrorBody {
    /// Parses an error body, returning `None` for non-JSON payloads.
    pub fn from_bytes(body: &[u8]) -> Option<Self> {
        serde_json::from_slice(body).ok()
    }
}

/// A single validation failure inside an [`ErrorBody`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ErrorDetail {
    pub resource: Option<String>,
    pub field: Option<String>,
    pub code: Option<String>,
    pub message: Option<String>,
}
