//! GitHub API access.
//!
//! The rest of the crate talks to GitHub through three capability traits,
//! [`RepositoriesApi`], [`PullRequestsApi`] and [`IssuesApi`], bundled as
//! [`GitHubApi`]. [`GitHubClient`] implements all three over REST; tests
//! substitute fakes.

mod client;
mod error;
pub mod http;
pub mod models;

pub use client::GitHubClient;
pub use error::ApiError;
pub use http::{HttpRequest, HttpResponse, HttpTransport, ReqwestTransport, TransportError};
pub use models::{NewPullRequest, PullRequest, ReviewersRequest};

use crate::types::{AllowedRepo, RepositoryDescriptor};
use async_trait::async_trait;

/// REST API root for github.com.
pub const DEFAULT_API_BASE: &str = "https://api.github.com";

/// Page size used for every paginated listing.
pub const PER_PAGE: usize = 100;

/// Repository lookup, listing and search.
#[async_trait]
pub trait RepositoriesApi: Send + Sync {
    /// Fetches a single repository.
    async fn get_repository(&self, owner: &str, name: &str)
        -> Result<RepositoryDescriptor, ApiError>;

    /// Fetches one page (1-based) of an organization's repositories.
    async fn list_org_repositories(
        &self,
        org: &str,
        page: u32,
    ) -> Result<Vec<RepositoryDescriptor>, ApiError>;

    /// Fetches one page (1-based) of a repository search.
    async fn search_repositories(
        &self,
        query: &str,
        page: u32,
    ) -> Result<Vec<RepositoryDescriptor>, ApiError>;

    /// Fetches one page (1-based) of a code search, returning the repository of each hit.
    async fn search_code(&self, query: &str, page: u32) -> Result<Vec<AllowedRepo>, ApiError>;
}

/// Pull request listing, creation and review requests.
#[async_trait]
pub trait PullRequestsApi: Send + Sync {
    /// Lists open pull requests from `head` into `base`.
    async fn list_pull_requests(
        &self,
        owner: &str,
        name: &str,
        head: &str,
        base: &str,
    ) -> Result<Vec<PullRequest>, ApiError>;

    async fn create_pull_request(
        &self,
        owner: &str,
        name: &str,
        pull_request: &NewPullRequest,
    ) -> Result<PullRequest, ApiError>;

    async fn request_reviewers(
        &self,
        owner: &str,
        name: &str,
        number: u64,
        request: &ReviewersRequest,
    ) -> Result<(), ApiError>;
}

/// Issue (and pull request) assignment.
#[async_trait]
pub trait IssuesApi: Send + Sync {
    async fn add_assignees(
        &self,
        owner: &str,
        name: &str,
        number: u64,
        assignees: &[String],
    ) -> Result<(), ApiError>;
}

/// Every GitHub capability the fleet run needs.
pub trait GitHubApi: RepositoriesApi + PullRequestsApi + IssuesApi {}

impl<T: RepositoriesApi + PullRequestsApi + IssuesApi> GitHubApi for T {}
