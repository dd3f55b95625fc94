//! Outcome event catalogue.

use serde::Serialize;
use std::fmt;

/// Something that happened to a repository during a run.
///
/// Variants are declared in report order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutcomeEvent {
    FetchedViaApi,
    ReposSelected,
    ArchivedSkipped,
    RepoNotFound,
    MalformedInput,
    Cloned,
    CloneFailed,
    HeadRefFailed,
    BranchCheckoutFailed,
    RemoteBranchMissing,
    RemotePullFailed,
    CommandFailed,
    WorktreeStatusFailed,
    WorktreeClean,
    WorktreeDirty,
    StageFileFailed,
    CommitFailed,
    CommitsMadeDirectlyToBranch,
    PushFailed,
    PushSkippedDryRun,
    DirectPushToBranch,
    PullRequestOpened,
    PullRequestAlreadyExists,
    PullRequestFailed,
    DraftUnsupported,
    BaseBranchInvalid,
    RateLimitedRetry,
    RetriesExhausted,
    RequestReviewersFailed,
    AddAssigneesFailed,
}

impl OutcomeEvent {
    /// Every event, in report order.
    pub const ALL: [Self; 30] = [
        Self::FetchedViaApi,
        Self::ReposSelected,
        Self::ArchivedSkipped,
        Self::RepoNotFound,
        Self::MalformedInput,
        Self::Cloned,
        Self::CloneFailed,
        Self::HeadRefFailed,
        Self::BranchCheckoutFailed,
        Self::RemoteBranchMissing,
        Self::RemotePullFailed,
        Self::CommandFailed,
        Self::WorktreeStatusFailed,
        Self::WorktreeClean,
        Self::WorktreeDirty,
        Self::StageFileFailed,
        Self::CommitFailed,
        Self::CommitsMadeDirectlyToBranch,
        Self::PushFailed,
        Self::PushSkippedDryRun,
        Self::DirectPushToBranch,
        Self::PullRequestOpened,
        Self::PullRequestAlreadyExists,
        Self::PullRequestFailed,
        Self::DraftUnsupported,
        Self::BaseBranchInvalid,
        Self::RateLimitedRetry,
        Self::RetriesExhausted,
        Self::RequestReviewersFailed,
        Self::AddAssigneesFailed,
    ];

    /// Stable kebab-case identifier.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FetchedViaApi => "fetched-via-api",
            Self::ReposSelected => "repos-selected",
            Self::ArchivedSkipped => "archived-skipped",
            Self::RepoNotFound => "repo-not-found",
            Self::MalformedInput => "malformed-input",
            Self::Cloned => "cloned",
            Self::CloneFailed => "clone-failed",
            Self::HeadRefFailed => "head-ref-failed",
            Self::BranchCheckoutFailed => "branch-checkout-failed",
            Self::RemoteBranchMissing => "remote-branch-missing",
            Self::RemotePullFailed => "remote-pull-failed",
            Self::CommandFailed => "command-failed",
            Self::WorktreeStatusFailed => "worktree-status-failed",
            Self::WorktreeClean => "worktree-clean",
            Self::WorktreeDirty => "worktree-dirty",
            Self::StageFileFailed => "stage-file-failed",
            Self::CommitFailed => "commit-failed",
            Self::CommitsMadeDirectlyToBranch => "commits-made-directly-to-branch",
            Self::PushFailed => "push-failed",
            Self::PushSkippedDryRun => "push-skipped-dry-run",
            Self::DirectPushToBranch => "direct-push-to-branch",
            Self::PullRequestOpened => "pull-request-opened",
            Self::PullRequestAlreadyExists => "pull-request-already-exists",
            Self::PullRequestFailed => "pull-request-failed",
            Self::DraftUnsupported => "draft-unsupported",
            Self::BaseBranchInvalid => "base-branch-invalid",
            Self::RateLimitedRetry => "rate-limited-retry",
            Self::RetriesExhausted => "retries-exhausted",
            Self::RequestReviewersFailed => "request-reviewers-failed",
            Self::AddAssigneesFailed => "add-assignees-failed",
        }
    }

    /// Human-readable heading for reports.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::FetchedViaApi => "Repos successfully fetched via the GitHub API",
            Self::ReposSelected => "Repos targeted for processing after filtering missing or malformed repos",
            Self::ArchivedSkipped => "Repos filtered out by --skip-archived-repos",
            Self::RepoNotFound => "Repos that were supplied but don't exist (404) on GitHub",
            Self::MalformedInput => "Repo entries that were malformed (missing their org prefix?) and could not be processed",
            Self::Cloned => "Repos successfully cloned to the local filesystem",
            Self::CloneFailed => "Repos that could not be cloned to the local filesystem",
            Self::HeadRefFailed => "Repos whose HEAD reference could not be resolved",
            Self::BranchCheckoutFailed => "Repos where checking out the target branch failed",
            Self::RemoteBranchMissing => "Repos whose branch did not exist on the remote yet and was created locally",
            Self::RemotePullFailed => "Repos whose remote branch could not be pulled",
            Self::CommandFailed => "Repos where the supplied command failed",
            Self::WorktreeStatusFailed => "Repos where git status failed after the command ran",
            Self::WorktreeClean => "Repos with NO file changes after the command ran",
            Self::WorktreeDirty => "Repos with file changes after the command ran",
            Self::StageFileFailed => "Repos where at least one changed file could not be staged",
            Self::CommitFailed => "Repos whose changes could not be committed",
            Self::CommitsMadeDirectlyToBranch => "Repos whose changes were committed directly to the branch because --skip-pull-requests was passed",
            Self::PushFailed => "Repos whose branch could not be pushed to origin",
            Self::PushSkippedDryRun => "Repos whose branch was not pushed because --dry-run was set",
            Self::DirectPushToBranch => "Repos whose changes were pushed directly to the remote branch because --skip-pull-requests was passed",
            Self::PullRequestOpened => "Repos with a newly opened pull request",
            Self::PullRequestAlreadyExists => "Repos skipped because a pull request was already open for the branch",
            Self::PullRequestFailed => "Repos where the pull request could not be opened",
            Self::DraftUnsupported => "Repos that do not support draft pull requests (--draft was passed)",
            Self::BaseBranchInvalid => "Repos without the branch given by --base-branch-name",
            Self::RateLimitedRetry => "Repos whose pull request was retried after GitHub rate limiting",
            Self::RetriesExhausted => "Repos whose pull request failed after the maximum number of retries",
            Self::RequestReviewersFailed => "Repos where reviewers could not be requested",
            Self::AddAssigneesFailed => "Repos where assignees could not be added",
        }
    }

    /// Returns true for events that mean a repository did not get its change.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Self::RepoNotFound
                | Self::MalformedInput
                | Self::CloneFailed
                | Self::HeadRefFailed
                | Self::BranchCheckoutFailed
                | Self::RemotePullFailed
                | Self::CommandFailed
                | Self::WorktreeStatusFailed
                | Self::StageFileFailed
                | Self::CommitFailed
                | Self::PushFailed
                | Self::PullRequestFailed
                | Self::RetriesExhausted
        )
    }
}

impl fmt::Display for OutcomeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
