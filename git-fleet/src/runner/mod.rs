//! Orchestrates a fleet run.

mod error;

pub use error::RunnerError;

use crate::config::RunConfig;
use crate::discovery::{select_repositories, RepoSelection, SelectionMode};
use crate::git::{GitCli, GitProvider};
use crate::github::{GitHubApi, GitHubClient};
use crate::pipeline::{process_repository, PipelineContext, PipelineOutcome};
use crate::pull_requests::{DispatchSettings, PullRequestDispatcher};
use crate::summary::{OutcomeEvent, OutcomeTracker, RunReport};
use crate::types::RepositoryDescriptor;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Runs the pipeline over every selected repository.
pub struct Runner {
    config: Arc<RunConfig>,
    api: Arc<dyn GitHubApi>,
    git: Arc<dyn GitProvider>,
}

impl Runner {
    pub fn new(config: RunConfig, api: Arc<dyn GitHubApi>, git: Arc<dyn GitProvider>) -> Self {
        Self {
            config: Arc::new(config),
            api,
            git,
        }
    }

    /// Builds a runner against the real GitHub API and the `git` binary.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::Client`] if the HTTP client cannot be built.
    pub fn from_token(config: RunConfig, token: &str, api_base: &str) -> Result<Self, RunnerError> {
        let api = GitHubClient::with_token(token, api_base)?;
        let git = GitCli::new().with_token(token);
        Ok(Self::new(config, Arc::new(api), Arc::new(git)))
    }

    /// Selects repositories and runs the fleet over them.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::Discovery`] if selection fails. Failures of
    /// individual repositories only show up in the report.
    pub async fn execute(&self, selection: &RepoSelection) -> Result<RunReport, RunnerError> {
        let tracker = Arc::new(OutcomeTracker::new());
        let repos = select_repositories(
            self.api.as_ref(),
            selection,
            self.config.skip_archived_repos(),
            &tracker,
        )
        .await?;
        Ok(self.run_with(tracker, repos, Some(selection.mode())).await)
    }

    /// Runs the fleet over already selected repositories.
    pub async fn run(
        &self,
        repos: Vec<Arc<RepositoryDescriptor>>,
        selection_mode: Option<SelectionMode>,
    ) -> RunReport {
        self.run_with(Arc::new(OutcomeTracker::new()), repos, selection_mode)
            .await
    }

    async fn run_with(
        &self,
        tracker: Arc<OutcomeTracker>,
        repos: Vec<Arc<RepositoryDescriptor>>,
        selection_mode: Option<SelectionMode>,
    ) -> RunReport {
        tracker.record_all(OutcomeEvent::ReposSelected, &repos);

        let dispatcher = PullRequestDispatcher::new(
            Arc::clone(&self.api),
            DispatchSettings::from_config(&self.config),
            Arc::clone(&tracker),
        );
        let ctx = PipelineContext::new(
            Arc::clone(&self.config),
            Arc::clone(&self.git),
            Arc::clone(&tracker),
            dispatcher,
        );

        let limit = self
            .config
            .max_concurrent_repos()
            .unwrap_or(repos.len())
            .max(1);
        info!(
            count = repos.len(),
            concurrency = limit,
            dry_run = self.config.dry_run(),
            "Processing repositories"
        );

        let outcomes: Vec<Option<PipelineOutcome>> = stream::iter(repos)
            .map(|repo| {
                let ctx = &ctx;
                async move {
                    match process_repository(ctx, &repo).await {
                        Ok(outcome) => {
                            debug!(repo = %repo, ?outcome, "Repository finished");
                            Some(outcome)
                        }
                        Err(e) => {
                            warn!(repo = %repo, stage = %e.stage(), error = %e, "Repository failed");
                            None
                        }
                    }
                }
            })
            .buffer_unordered(limit)
            .collect()
            .await;

        let failed = outcomes.iter().filter(|outcome| outcome.is_none()).count();
        info!(
            finished = outcomes.len() - failed,
            failed, "Fleet run complete"
        );

        tracker.report(
            self.config.command(),
            selection_mode,
            self.config.skip_pull_requests(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rate_limit::{unix_now, RateLimitSignal};
    use crate::testing::{rate_limited, repo, FakeGit, FakeGitHub, GitOp};
    use std::time::Duration;

    fn touching() -> RunConfig {
        RunConfig::new(
            "fleet/add-changelog",
            vec!["touch".to_string(), "CHANGELOG.md".to_string()],
        )
    }

    fn repos(names: &[&str]) -> Vec<Arc<RepositoryDescriptor>> {
        names.iter().map(|name| Arc::new(repo("acme", name))).collect()
    }

    #[tokio::test]
    async fn failing_repository_does_not_stop_others() {
        let selected = repos(&["one", "two", "three"]);
        let git = FakeGit::new().failing(&selected[1].clone_url, GitOp::Clone);
        let api = Arc::new(FakeGitHub::new());
        let runner = Runner::new(touching(), api.clone(), Arc::new(git));

        let report = runner.run(selected, Some(SelectionMode::RepoFlag)).await;

        assert_eq!(report.count(OutcomeEvent::ReposSelected), 3);
        assert_eq!(report.count(OutcomeEvent::CloneFailed), 1);
        assert_eq!(report.count(OutcomeEvent::PullRequestOpened), 2);
        assert_eq!(report.pull_requests.len(), 2);
        assert!(report.has_failures());
        assert_eq!(api.created_pull_requests().len(), 2);
    }

    #[tokio::test]
    async fn dry_run_never_pushes_or_calls_api() {
        let api = Arc::new(FakeGitHub::new());
        let git = Arc::new(FakeGit::new());
        let runner = Runner::new(touching().with_dry_run(true), api.clone(), git.clone());

        let report = runner.run(repos(&["one", "two"]), None).await;

        assert_eq!(git.count(GitOp::Push), 0);
        assert!(api.calls().is_empty());
        assert_eq!(report.count(OutcomeEvent::PushSkippedDryRun), 2);
        assert!(report.pull_requests.is_empty());
    }

    #[tokio::test]
    async fn clean_worktrees_open_nothing() {
        let api = Arc::new(FakeGitHub::new());
        let git = Arc::new(FakeGit::new());
        let config = RunConfig::new("fleet/noop", vec!["true".to_string()]);
        let runner = Runner::new(config, api.clone(), git.clone());

        let report = runner.run(repos(&["one", "two"]), None).await;

        assert_eq!(report.count(OutcomeEvent::WorktreeClean), 2);
        assert_eq!(git.count(GitOp::Commit), 0);
        assert!(api.calls().is_empty());
        assert!(report.all_success());
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limited_pull_request_is_requeued() {
        let reset = unix_now() + 120;
        let api = Arc::new(FakeGitHub::new().with_create_results(vec![Err(rate_limited(
            RateLimitSignal::Primary { reset },
        ))]));
        let runner = Runner::new(touching(), api.clone(), Arc::new(FakeGit::new()));
        let started = tokio::time::Instant::now();

        let report = runner.run(repos(&["one"]), None).await;

        assert!(started.elapsed() >= Duration::from_secs(118));
        assert_eq!(report.count(OutcomeEvent::RateLimitedRetry), 1);
        assert_eq!(report.count(OutcomeEvent::PullRequestOpened), 1);
        assert_eq!(report.pull_requests.len(), 1);
        assert_eq!(api.calls_matching("create_pull_request"), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn clone_limit_bounds_concurrent_clones() {
        let git = Arc::new(FakeGit::new().with_clone_delay(Duration::from_secs(5)));
        let config = touching().with_dry_run(true).with_max_concurrent_clones(2);
        let runner = Runner::new(config, Arc::new(FakeGitHub::new()), git.clone());

        let report = runner
            .run(repos(&["one", "two", "three", "four", "five"]), None)
            .await;

        assert_eq!(git.peak_clones(), 2);
        assert_eq!(git.count(GitOp::Clone), 5);
        assert_eq!(report.count(OutcomeEvent::PushSkippedDryRun), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn repo_limit_bounds_concurrent_pipelines() {
        let git = Arc::new(FakeGit::new().with_clone_delay(Duration::from_secs(5)));
        let config = touching().with_dry_run(true).with_max_concurrent_repos(2);
        let runner = Runner::new(config, Arc::new(FakeGitHub::new()), git.clone());

        let report = runner
            .run(repos(&["one", "two", "three", "four", "five"]), None)
            .await;

        assert_eq!(git.peak_clones(), 2);
        assert_eq!(report.count(OutcomeEvent::PushSkippedDryRun), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_limits_are_unbounded() {
        let git = Arc::new(FakeGit::new().with_clone_delay(Duration::from_secs(5)));
        let config = touching()
            .with_dry_run(true)
            .with_max_concurrent_repos(0)
            .with_max_concurrent_clones(0);
        let runner = Runner::new(config, Arc::new(FakeGitHub::new()), git.clone());

        runner
            .run(repos(&["one", "two", "three", "four", "five"]), None)
            .await;

        assert_eq!(git.peak_clones(), 5);
    }

    #[tokio::test]
    async fn execute_selects_then_runs() {
        let api = Arc::new(
            FakeGitHub::new()
                .with_repository(repo("acme", "one"))
                .with_repository(repo("acme", "two")),
        );
        let runner = Runner::new(
            touching().with_dry_run(true),
            api.clone(),
            Arc::new(FakeGit::new()),
        );
        let selection = RepoSelection::Explicit {
            repos: vec![
                "acme/one".to_string(),
                "acme/two".to_string(),
                "acme/missing".to_string(),
                "not-a-repo".to_string(),
            ],
        };

        let report = runner.execute(&selection).await.unwrap();

        assert_eq!(report.selection_mode, Some(SelectionMode::RepoFlag));
        assert_eq!(report.count(OutcomeEvent::ReposSelected), 2);
        assert_eq!(report.count(OutcomeEvent::RepoNotFound), 1);
        assert_eq!(report.count(OutcomeEvent::MalformedInput), 1);
        assert_eq!(report.count(OutcomeEvent::PushSkippedDryRun), 2);
    }

    #[tokio::test]
    async fn execute_fails_when_nothing_resolves() {
        let runner = Runner::new(
            touching(),
            Arc::new(FakeGitHub::new()),
            Arc::new(FakeGit::new()),
        );
        let selection = RepoSelection::Explicit {
            repos: vec!["acme/missing".to_string()],
        };

        let err = runner.execute(&selection).await.unwrap_err();

        assert!(matches!(
            err,
            RunnerError::Discovery(crate::discovery::DiscoveryError::NoValidRepos)
        ));
    }
}
