//! Pull request dispatch.
//!
//! Every pipeline that pushed a branch hands it to one shared
//! [`PullRequestDispatcher`]. The dispatcher spaces out creation calls with a
//! pacing interval, skips branches that already have an open pull request,
//! and re-queues attempts that hit a rate limit until the retry ceiling.

mod request;
mod status;

pub use request::PendingReviewRequest;
pub use status::DispatchOutcome;

use crate::config::RunConfig;
use crate::github::{ApiError, GitHubApi, NewPullRequest, PullRequest, ReviewersRequest};
use crate::rate_limit::RateLimitSignal;
use crate::summary::{OutcomeEvent, OutcomeTracker};
use crate::types::RepositoryDescriptor;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{Interval, MissedTickBehavior};
use tracing::{debug, error, info, info_span, warn, Instrument};

/// Message GitHub returns when a repository cannot host draft pull requests.
const DRAFT_UNSUPPORTED: &str = "Draft pull requests are not supported";

/// Pull request settings taken from the run configuration.
#[derive(Debug, Clone)]
pub struct DispatchSettings {
    title: String,
    description: String,
    base_branch: Option<String>,
    draft: bool,
    dry_run: bool,
    skip_pull_requests: bool,
    reviewers: Vec<String>,
    team_reviewers: Vec<String>,
    assignees: Vec<String>,
    max_retries: u32,
    rate_limit_fallback: Duration,
    interval: Duration,
}

impl DispatchSettings {
    pub fn from_config(config: &RunConfig) -> Self {
        Self {
            title: config.pull_request_title().to_string(),
            description: config.pull_request_description().to_string(),
            base_branch: config.base_branch_name().map(str::to_string),
            draft: config.draft(),
            dry_run: config.dry_run(),
            skip_pull_requests: config.skip_pull_requests(),
            reviewers: config.reviewers().to_vec(),
            team_reviewers: config.team_reviewers().to_vec(),
            assignees: config.assignees().to_vec(),
            max_retries: config.max_pr_retries(),
            rate_limit_fallback: config.rate_limit_fallback(),
            interval: config.pr_interval(),
        }
    }
}

/// Serializes, paces and retries pull request creation across the fleet.
pub struct PullRequestDispatcher {
    api: Arc<dyn GitHubApi>,
    tracker: Arc<OutcomeTracker>,
    settings: DispatchSettings,
    pacing: Mutex<Interval>,
}

impl PullRequestDispatcher {
    /// Creates a dispatcher. Must be called inside a tokio runtime.
    pub fn new(
        api: Arc<dyn GitHubApi>,
        settings: DispatchSettings,
        tracker: Arc<OutcomeTracker>,
    ) -> Self {
        let period = settings.interval.max(Duration::from_millis(1));
        let mut pacing = tokio::time::interval(period);
        pacing.set_missed_tick_behavior(MissedTickBehavior::Delay);

        Self {
            api,
            tracker,
            settings,
            pacing: Mutex::new(pacing),
        }
    }

    /// Opens a pull request from `branch` for `repo`.
    ///
    /// Every outcome is recorded in the tracker; nothing is returned as an error.
    pub async fn dispatch(&self, repo: &Arc<RepositoryDescriptor>, branch: &str) -> DispatchOutcome {
        let span = info_span!("dispatch_pull_request", repo = %repo, branch);

        async {
            let mut request = PendingReviewRequest::new(Arc::clone(repo), branch);

            loop {
                if request.retries() > self.settings.max_retries {
                    error!(
                        retries = request.retries(),
                        max_retries = self.settings.max_retries,
                        "Pull request still rate limited after maximum retries"
                    );
                    self.tracker.record(OutcomeEvent::RetriesExhausted, repo);
                    return DispatchOutcome::RetriesExhausted {
                        retries: request.retries(),
                    };
                }

                if self.settings.dry_run || self.settings.skip_pull_requests {
                    debug!("Pull request creation disabled, skipping");
                    return DispatchOutcome::Skipped;
                }

                self.pacing.lock().await.tick().await;
                if !request.delay().is_zero() {
                    debug!(delay_secs = request.delay().as_secs(), "Waiting before retry");
                    tokio::time::sleep(request.delay()).await;
                }

                match self.attempt(&request).await {
                    Ok(outcome) => return outcome,
                    Err(delay) => {
                        self.tracker.record(OutcomeEvent::RateLimitedRetry, repo);
                        request = request.retry(delay);
                    }
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Makes one attempt. `Err` carries the delay before the next one.
    async fn attempt(&self, request: &PendingReviewRequest) -> Result<DispatchOutcome, Duration> {
        let repo = request.repository();
        let branch = request.branch();
        let base = self
            .settings
            .base_branch
            .clone()
            .unwrap_or_else(|| repo.default_branch.clone());

        match self
            .api
            .list_pull_requests(&repo.owner, &repo.name, branch, &base)
            .await
        {
            Err(e) => {
                error!(error = %e, "Failed to check for existing pull requests");
                self.tracker.record(OutcomeEvent::PullRequestFailed, repo);
                return Ok(DispatchOutcome::Failed {
                    error: e.to_string(),
                });
            }
            Ok(existing) if !existing.is_empty() => {
                info!(url = %existing[0].html_url, "Pull request already open, skipping");
                self.tracker
                    .record(OutcomeEvent::PullRequestAlreadyExists, repo);
                return Ok(DispatchOutcome::AlreadyExists {
                    url: existing[0].html_url.clone(),
                });
            }
            Ok(_) => {}
        }

        let pull_request = NewPullRequest {
            title: self.settings.title.clone(),
            head: branch.to_string(),
            base,
            body: self.settings.description.clone(),
            maintainer_can_modify: true,
            draft: self.settings.draft,
        };

        match self
            .api
            .create_pull_request(&repo.owner, &repo.name, &pull_request)
            .await
        {
            Ok(created) => Ok(self.finish(repo, created, request.retries()).await),
            Err(e) => {
                if let Some(signal) = e.rate_limit() {
                    let delay = self.retry_delay(signal);
                    warn!(
                        kind = signal.as_str(),
                        retries = request.retries(),
                        delay_secs = delay.as_secs(),
                        "Pull request rate limited, re-queueing"
                    );
                    return Err(delay);
                }
                Ok(self.record_create_failure(repo, &e))
            }
        }
    }

    /// How long to wait before retrying after `signal`.
    fn retry_delay(&self, signal: RateLimitSignal) -> Duration {
        signal
            .suggested_delay()
            .filter(|delay| !delay.is_zero())
            .unwrap_or(self.settings.rate_limit_fallback)
    }

    fn record_create_failure(
        &self,
        repo: &Arc<RepositoryDescriptor>,
        e: &ApiError,
    ) -> DispatchOutcome {
        if e.status() == Some(422) {
            if e.mentions(DRAFT_UNSUPPORTED) {
                error!(error = %e, "Repository does not support draft pull requests");
                self.tracker.record(OutcomeEvent::DraftUnsupported, repo);
            }
            if e.has_field_error("base", "invalid") {
                error!(error = %e, "Base branch does not exist");
                self.tracker.record(OutcomeEvent::BaseBranchInvalid, repo);
            }
        }
        error!(error = %e, "Failed to open pull request");
        self.tracker.record(OutcomeEvent::PullRequestFailed, repo);
        DispatchOutcome::Failed {
            error: e.to_string(),
        }
    }

    /// Requests reviewers and assignees, then records the opened pull request.
    async fn finish(
        &self,
        repo: &Arc<RepositoryDescriptor>,
        created: PullRequest,
        retries: u32,
    ) -> DispatchOutcome {
        if !self.settings.reviewers.is_empty() || !self.settings.team_reviewers.is_empty() {
            let request = ReviewersRequest {
                reviewers: self.settings.reviewers.clone(),
                team_reviewers: self.settings.team_reviewers.clone(),
            };
            if let Err(e) = self
                .api
                .request_reviewers(&repo.owner, &repo.name, created.number, &request)
                .await
            {
                warn!(error = %e, "Failed to request reviewers");
                self.tracker
                    .record(OutcomeEvent::RequestReviewersFailed, repo);
            }
        }

        if !self.settings.assignees.is_empty() {
            if let Err(e) = self
                .api
                .add_assignees(&repo.owner, &repo.name, created.number, &self.settings.assignees)
                .await
            {
                warn!(error = %e, "Failed to add assignees");
                self.tracker.record(OutcomeEvent::AddAssigneesFailed, repo);
            }
        }

        let full_name = repo.full_name();
        if self.settings.draft {
            self.tracker
                .record_draft_pull_request(&full_name, &created.html_url);
        } else {
            self.tracker.record_pull_request(&full_name, &created.html_url);
        }
        self.tracker.record(OutcomeEvent::PullRequestOpened, repo);
        info!(pr_number = created.number, url = %created.html_url, "Pull request opened");

        DispatchOutcome::Opened {
            number: created.number,
            url: created.html_url,
            draft: self.settings.draft,
            retries,
        }
    }
}
