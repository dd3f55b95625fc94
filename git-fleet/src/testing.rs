//! In-memory fakes for the GitHub and git capabilities.

use crate::git::{GitError, GitProvider, PullOutcome, StatusEntry, WorktreeStatus};
use crate::github::models::ErrorDetail;
use crate::github::{
    ApiError, IssuesApi, NewPullRequest, PullRequest, PullRequestsApi, RepositoriesApi,
    ReviewersRequest, PER_PAGE,
};
use crate::rate_limit::RateLimitSignal;
use crate::types::{AllowedRepo, RepositoryDescriptor};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Builds a descriptor with github.com URLs.
pub(crate) fn repo(owner: &str, name: &str) -> RepositoryDescriptor {
    let mut repo = RepositoryDescriptor::new(
        owner,
        name,
        "main",
        format!("https://github.com/{owner}/{name}.git"),
    );
    repo.html_url = format!("https://github.com/{owner}/{name}");
    repo
}

/// A GitHub error response carrying a rate-limit signal.
pub(crate) fn rate_limited(signal: RateLimitSignal) -> ApiError {
    ApiError::Status {
        status: 403,
        message: "API rate limit exceeded".to_string(),
        documentation_url: None,
        errors: Vec::new(),
        rate_limit: Some(signal),
    }
}

/// A 422 response with one validation detail.
pub(crate) fn validation_failed(detail: ErrorDetail) -> ApiError {
    ApiError::Status {
        status: 422,
        message: "Validation Failed".to_string(),
        documentation_url: None,
        errors: vec![detail],
        rate_limit: None,
    }
}

fn not_found() -> ApiError {
    ApiError::Status {
        status: 404,
        message: "Not Found".to_string(),
        documentation_url: None,
        errors: Vec::new(),
        rate_limit: None,
    }
}

/// Canned GitHub API.
///
/// Pull request creation succeeds with increasing numbers unless results
/// were scripted with [`FakeGitHub::with_create_results`].
#[derive(Default)]
pub(crate) struct FakeGitHub {
    repositories: HashMap<String, RepositoryDescriptor>,
    orgs: HashMap<String, Vec<RepositoryDescriptor>>,
    search_results: Vec<RepositoryDescriptor>,
    code_hits: Vec<AllowedRepo>,
    open_pull_requests: HashSet<String>,
    fail_listing: bool,
    fail_reviewers: bool,
    fail_assignees: bool,
    create_results: Mutex<VecDeque<Result<PullRequest, ApiError>>>,
    created: Mutex<Vec<(String, NewPullRequest)>>,
    calls: Mutex<Vec<String>>,
}

impl FakeGitHub {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_repository(mut self, repo: RepositoryDescriptor) -> Self {
        self.repositories.insert(repo.full_name(), repo);
        self
    }

    pub(crate) fn with_org(mut self, org: &str, repos: Vec<RepositoryDescriptor>) -> Self {
        self.orgs.insert(org.to_string(), repos);
        self
    }

    pub(crate) fn with_search_results(mut self, repos: Vec<RepositoryDescriptor>) -> Self {
        self.search_results = repos;
        self
    }

    pub(crate) fn with_code_hits(mut self, hits: Vec<AllowedRepo>) -> Self {
        self.code_hits = hits;
        self
    }

    /// Marks `owner/name` as already having an open pull request.
    pub(crate) fn with_open_pull_request(mut self, full_name: &str) -> Self {
        self.open_pull_requests.insert(full_name.to_string());
        self
    }

    pub(crate) fn with_create_results(self, results: Vec<Result<PullRequest, ApiError>>) -> Self {
        *self.create_results.lock().unwrap() = results.into();
        self
    }

    pub(crate) fn failing_listing(mut self) -> Self {
        self.fail_listing = true;
        self
    }

    pub(crate) fn failing_reviewers(mut self) -> Self {
        self.fail_reviewers = true;
        self
    }

    pub(crate) fn failing_assignees(mut self) -> Self {
        self.fail_assignees = true;
        self
    }

    /// Pull requests created so far, with the repository they were opened in.
    pub(crate) fn created_pull_requests(&self) -> Vec<(String, NewPullRequest)> {
        self.created.lock().unwrap().clone()
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Counts recorded calls starting with `prefix`.
    pub(crate) fn calls_matching(&self, prefix: &str) -> usize {
        self.calls()
            .iter()
            .filter(|call| call.starts_with(prefix))
            .count()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn page<T: Clone>(items: &[T], page: u32) -> Vec<T> {
        let start = (page.saturating_sub(1) as usize) * PER_PAGE;
        items.iter().skip(start).take(PER_PAGE).cloned().collect()
    }
}

#[async_trait]
impl RepositoriesApi for FakeGitHub {
    async fn get_repository(
        &self,
        owner: &str,
        name: &str,
    ) -> Result<RepositoryDescriptor, ApiError> {
        self.record(format!("get_repository {owner}/{name}"));
        self.repositories
            .get(&format!("{owner}/{name}"))
            .cloned()
            .ok_or_else(not_found)
    }

    async fn list_org_repositories(
        &self,
        org: &str,
        page: u32,
    ) -> Result<Vec<RepositoryDescriptor>, ApiError> {
        self.record(format!("list_org_repositories {org} {page}"));
        let repos = self.orgs.get(org).ok_or_else(not_found)?;
        Ok(Self::page(repos, page))
    }

    async fn search_repositories(
        &self,
        query: &str,
        page: u32,
    ) -> Result<Vec<RepositoryDescriptor>, ApiError> {
        self.record(format!("search_repositories {query}"));
        Ok(Self::page(&self.search_results, page))
    }

    async fn search_code(&self, query: &str, page: u32) -> Result<Vec<AllowedRepo>, ApiError> {
        self.record(format!("search_code {query}"));
        Ok(Self::page(&self.code_hits, page))
    }
}

#[async_trait]
impl PullRequestsApi for FakeGitHub {
    async fn list_pull_requests(
        &self,
        owner: &str,
        name: &str,
        head: &str,
        base: &str,
    ) -> Result<Vec<PullRequest>, ApiError> {
        self.record(format!("list_pull_requests {owner}/{name} {head} {base}"));
        if self.fail_listing {
            return Err(not_found());
        }
        if self.open_pull_requests.contains(&format!("{owner}/{name}")) {
            return Ok(vec![PullRequest {
                number: 1,
                html_url: format!("https://github.com/{owner}/{name}/pull/1"),
                draft: false,
            }]);
        }
        Ok(Vec::new())
    }

    async fn create_pull_request(
        &self,
        owner: &str,
        name: &str,
        pull_request: &NewPullRequest,
    ) -> Result<PullRequest, ApiError> {
        self.record(format!("create_pull_request {owner}/{name}"));
        if let Some(result) = self.create_results.lock().unwrap().pop_front() {
            if result.is_ok() {
                self.created
                    .lock()
                    .unwrap()
                    .push((format!("{owner}/{name}"), pull_request.clone()));
            }
            return result;
        }

        let mut created = self.created.lock().unwrap();
        created.push((format!("{owner}/{name}"), pull_request.clone()));
        let number = created.len() as u64 + 100;
        Ok(PullRequest {
            number,
            html_url: format!("https://github.com/{owner}/{name}/pull/{number}"),
            draft: pull_request.draft,
        })
    }

    async fn request_reviewers(
        &self,
        owner: &str,
        name: &str,
        number: u64,
        _request: &ReviewersRequest,
    ) -> Result<(), ApiError> {
        self.record(format!("request_reviewers {owner}/{name} {number}"));
        if self.fail_reviewers {
            return Err(not_found());
        }
        Ok(())
    }
}

#[async_trait]
impl IssuesApi for FakeGitHub {
    async fn add_assignees(
        &self,
        owner: &str,
        name: &str,
        number: u64,
        _assignees: &[String],
    ) -> Result<(), ApiError> {
        self.record(format!("add_assignees {owner}/{name} {number}"));
        if self.fail_assignees {
            return Err(not_found());
        }
        Ok(())
    }
}

/// Git operations a [`FakeGit`] can be told to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum GitOp {
    Clone,
    Head,
    CreateBranch,
    Pull,
    Status,
    Add,
    Commit,
    Push,
}

#[derive(Default)]
struct FakeGitState {
    clones: HashMap<PathBuf, String>,
    calls: Vec<(GitOp, String)>,
}

/// Git provider that never touches a remote.
///
/// Behaviour is keyed by clone URL. A clone leaves the directory empty, so
/// the worktree is dirty exactly when the command created files in it.
#[derive(Default)]
pub(crate) struct FakeGit {
    failures: HashSet<(String, GitOp)>,
    existing_branches: HashSet<String>,
    missing_remote_branches: HashSet<String>,
    clone_delay: Option<Duration>,
    active_clones: AtomicUsize,
    peak_clones: AtomicUsize,
    state: Mutex<FakeGitState>,
}

impl FakeGit {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Makes `op` fail for the repository cloned from `url`.
    pub(crate) fn failing(mut self, url: &str, op: GitOp) -> Self {
        self.failures.insert((url.to_string(), op));
        self
    }

    /// Makes branch creation report that the branch already exists.
    pub(crate) fn with_existing_branch(mut self, url: &str) -> Self {
        self.existing_branches.insert(url.to_string());
        self
    }

    /// Makes the pull report that the branch is not on the remote.
    pub(crate) fn with_missing_remote_branch(mut self, url: &str) -> Self {
        self.missing_remote_branches.insert(url.to_string());
        self
    }

    /// Makes every clone take `delay`, so overlapping clones can be observed.
    pub(crate) fn with_clone_delay(mut self, delay: Duration) -> Self {
        self.clone_delay = Some(delay);
        self
    }

    /// Directories clones were made into, in no particular order.
    pub(crate) fn clone_dirs(&self) -> Vec<PathBuf> {
        self.state.lock().unwrap().clones.keys().cloned().collect()
    }

    /// Highest number of clones that were in flight at once.
    pub(crate) fn peak_clones(&self) -> usize {
        self.peak_clones.load(Ordering::SeqCst)
    }

    /// Counts calls of `op` across all repositories.
    pub(crate) fn count(&self, op: GitOp) -> usize {
        self.state
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|(called, _)| *called == op)
            .count()
    }

    /// Clone URLs `op` was called for, in call order.
    pub(crate) fn urls_for(&self, op: GitOp) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|(called, _)| *called == op)
            .map(|(_, url)| url.clone())
            .collect()
    }

    fn enter(&self, op: GitOp, dir: &Path) -> Result<String, GitError> {
        let mut state = self.state.lock().unwrap();
        let url = state.clones.get(dir).cloned().unwrap_or_default();
        state.calls.push((op, url.clone()));
        if self.failures.contains(&(url.clone(), op)) {
            return Err(GitError::CommandFailed {
                command: format!("{op:?}"),
                stderr: "simulated failure".to_string(),
            });
        }
        Ok(url)
    }
}

#[async_trait]
impl GitProvider for FakeGit {
    async fn clone_repository(&self, url: &str, dir: &Path) -> Result<(), GitError> {
        self.state
            .lock()
            .unwrap()
            .clones
            .insert(dir.to_path_buf(), url.to_string());
        if let Some(delay) = self.clone_delay {
            let active = self.active_clones.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak_clones.fetch_max(active, Ordering::SeqCst);
            tokio::time::sleep(delay).await;
            self.active_clones.fetch_sub(1, Ordering::SeqCst);
        }
        self.enter(GitOp::Clone, dir).map(|_| ())
    }

    async fn head(&self, dir: &Path) -> Result<String, GitError> {
        self.enter(GitOp::Head, dir)?;
        Ok("0123456789abcdef0123456789abcdef01234567".to_string())
    }

    async fn create_branch(
        &self,
        dir: &Path,
        branch: &str,
        _start_point: &str,
    ) -> Result<(), GitError> {
        let url = self.enter(GitOp::CreateBranch, dir)?;
        if self.existing_branches.contains(&url) {
            return Err(GitError::BranchAlreadyExists {
                branch: branch.to_string(),
            });
        }
        Ok(())
    }

    async fn pull_branch(&self, dir: &Path, _branch: &str) -> Result<PullOutcome, GitError> {
        let url = self.enter(GitOp::Pull, dir)?;
        if self.missing_remote_branches.contains(&url) {
            return Ok(PullOutcome::RemoteBranchMissing);
        }
        Ok(PullOutcome::AlreadyUpToDate)
    }

    async fn status(&self, dir: &Path) -> Result<WorktreeStatus, GitError> {
        self.enter(GitOp::Status, dir)?;
        let entries = std::fs::read_dir(dir)
            .map_err(|e| GitError::Spawn {
                command: "status".to_string(),
                source: e,
            })?
            .filter_map(Result::ok)
            .map(|entry| StatusEntry {
                path: entry.file_name().to_string_lossy().into_owned(),
                untracked: true,
            })
            .collect();
        Ok(WorktreeStatus { entries })
    }

    async fn add(&self, dir: &Path, _path: &str) -> Result<(), GitError> {
        self.enter(GitOp::Add, dir).map(|_| ())
    }

    async fn commit_all(&self, dir: &Path, _message: &str) -> Result<(), GitError> {
        self.enter(GitOp::Commit, dir).map(|_| ())
    }

    async fn push_branch(&self, dir: &Path, _branch: &str) -> Result<(), GitError> {
        self.enter(GitOp::Push, dir).map(|_| ())
    }
}
