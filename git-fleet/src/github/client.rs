//! REST client for the endpoints the fleet run uses.

use crate::github::error::ApiError;
use crate::github::http::{HttpRequest, HttpResponse, HttpTransport, ReqwestTransport};
use crate::github::models::{
    ApiRepository, CodeSearchResults, NewPullRequest, PullRequest, RepositorySearchResults,
    ReviewersRequest,
};
use crate::github::{IssuesApi, PullRequestsApi, RepositoriesApi, PER_PAGE};
use crate::rate_limit::RateLimitedTransport;
use crate::types::{AllowedRepo, RepositoryDescriptor};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, instrument};
use url::Url;

/// GitHub API client over any [`HttpTransport`].
#[derive(Clone)]
pub struct GitHubClient {
    transport: Arc<dyn HttpTransport>,
    base_url: Url,
}

impl GitHubClient {
    /// Creates a client sending requests to `base_url` through `transport`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidUrl`] if `base_url` is not an absolute http(s) URL.
    pub fn new(transport: Arc<dyn HttpTransport>, base_url: &str) -> Result<Self, ApiError> {
        let base_url = Url::parse(base_url)
            .ok()
            .filter(|url| !url.cannot_be_a_base())
            .ok_or_else(|| ApiError::InvalidUrl {
                url: base_url.to_string(),
            })?;
        Ok(Self {
            transport,
            base_url,
        })
    }

    /// Creates the production client: reqwest behind the rate-limited transport.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] if the HTTP client cannot be built or the URL is invalid.
    pub fn with_token(token: &str, base_url: &str) -> Result<Self, ApiError> {
        let transport = RateLimitedTransport::new(ReqwestTransport::new(token)?);
        Self::new(Arc::new(transport), base_url)
    }

    /// Builds an endpoint URL from escaped path segments and query pairs.
    fn url(&self, segments: &[&str], query: &[(&str, &str)]) -> Result<String, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ApiError::InvalidUrl {
                url: self.base_url.to_string(),
            })?
            .pop_if_empty()
            .extend(segments);
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url.into())
    }

    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        debug!(method = %request.method, url = %request.url, "GitHub API request");
        let response = self.transport.send(&request).await?;
        if !response.status.is_success() {
            return Err(ApiError::from_response(&response));
        }
        Ok(response)
    }

    fn decode<T: DeserializeOwned>(url: &str, response: &HttpResponse) -> Result<T, ApiError> {
        serde_json::from_slice(&response.body).map_err(|source| ApiError::Decode {
            url: url.to_string(),
            source,
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, url: String) -> Result<T, ApiError> {
        let response = self.execute(HttpRequest::get(url.clone())).await?;
        Self::decode(&url, &response)
    }

    async fn post_json<B: Serialize + Sync>(
        &self,
        url: String,
        body: &B,
    ) -> Result<HttpResponse, ApiError> {
        let body = serde_json::to_value(body).map_err(|source| ApiError::Decode {
            url: url.clone(),
            source,
        })?;
        self.execute(HttpRequest::post(url, body)).await
    }
}

#[async_trait]
impl RepositoriesApi for GitHubClient {
    #[instrument(skip(self), level = "debug")]
    async fn get_repository(
        &self,
        owner: &str,
        name: &str,
    ) -> Result<RepositoryDescriptor, ApiError> {
        let url = self.url(&["repos", owner, name], &[])?;
        let repo: ApiRepository = self.get_json(url).await?;
        Ok(repo.into_descriptor())
    }

    #[instrument(skip(self), level = "debug")]
    async fn list_org_repositories(
        &self,
        org: &str,
        page: u32,
    ) -> Result<Vec<RepositoryDescriptor>, ApiError> {
        let page = page.to_string();
        let per_page = PER_PAGE.to_string();
        let url = self.url(
            &["orgs", org, "repos"],
            &[("per_page", &per_page), ("page", &page)],
        )?;
        let repos: Vec<ApiRepository> = self.get_json(url).await?;
        Ok(repos.into_iter().map(ApiRepository::into_descriptor).collect())
    }

    #[instrument(skip(self), level = "debug")]
    async fn search_repositories(
        &self,
        query: &str,
        page: u32,
    ) -> Result<Vec<RepositoryDescriptor>, ApiError> {
        let page = page.to_string();
        let per_page = PER_PAGE.to_string();
        let url = self.url(
            &["search", "repositories"],
            &[("q", query), ("per_page", &per_page), ("page", &page)],
        )?;
        let results: RepositorySearchResults = self.get_json(url).await?;
        Ok(results
            .items
            .into_iter()
            .map(ApiRepository::into_descriptor)
            .collect())
    }

    #[instrument(skip(self), level = "debug")]
    async fn search_code(&self, query: &str, page: u32) -> Result<Vec<AllowedRepo>, ApiError> {
        let page = page.to_string();
        let per_page = PER_PAGE.to_string();
        let url = self.url(
            &["search", "code"],
            &[("q", query), ("per_page", &per_page), ("page", &page)],
        )?;
        let results: CodeSearchResults = self.get_json(url).await?;
        Ok(results.items.iter().map(|item| item.allowed_repo()).collect())
    }
}

#[async_trait]
impl PullRequestsApi for GitHubClient {
    #[instrument(skip(self), level = "debug")]
    async fn list_pull_requests(
        &self,
        owner: &str,
        name: &str,
        head: &str,
        base: &str,
    ) -> Result<Vec<PullRequest>, ApiError> {
        let head = format!("{owner}:{head}");
        let url = self.url(
            &["repos", owner, name, "pulls"],
            &[("head", &head), ("base", base), ("state", "open")],
        )?;
        self.get_json(url).await
    }

    #[instrument(skip(self, pull_request), fields(head = %pull_request.head), level = "debug")]
    async fn create_pull_request(
        &self,
        owner: &str,
        name: &str,
        pull_request: &NewPullRequest,
    ) -> Result<PullRequest, ApiError> {
        let url = self.url(&["repos", owner, name, "pulls"], &[])?;
        let response = self.post_json(url.clone(), pull_request).await?;
        Self::decode(&url, &response)
    }

    #[instrument(skip(self, request), level = "debug")]
    async fn request_reviewers(
        &self,
        owner: &str,
        name: &str,
        number: u64,
        request: &ReviewersRequest,
    ) -> Result<(), ApiError> {
        let number = number.to_string();
        let url = self.url(
            &["repos", owner, name, "pulls", &number, "requested_reviewers"],
            &[],
        )?;
        self.post_json(url, request).await.map(|_| ())
    }
}

#[async_trait]
impl IssuesApi for GitHubClient {
    #[instrument(skip(self), level = "debug")]
    async fn add_assignees(
        &self,
        owner: &str,
        name: &str,
        number: u64,
        assignees: &[String],
    ) -> Result<(), ApiError> {
        let number = number.to_string();
        let url = self.url(&["repos", owner, name, "issues", &number, "assignees"], &[])?;
        let body = serde_json::json!({ "assignees": assignees });
        self.post_json(url, &body).await.map(|_| ())
    }
}
