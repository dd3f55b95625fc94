//! Per-repository mutation pipeline.
//!
//! [`process_repository`] clones one repository into a scratch directory,
//! prepares the fleet branch, runs the user command and, when the command
//! changed anything, commits, pushes and hands the branch to the pull request
//! dispatcher. Each stage records its outcome in the tracker; the first
//! failing stage ends the pipeline for that repository only.

mod command;
mod error;

pub use command::{run_command, CommandOutput};
pub use error::{CommandError, Stage, StageError};

use crate::config::RunConfig;
use crate::git::{GitError, GitProvider, PullOutcome};
use crate::pull_requests::{DispatchOutcome, PullRequestDispatcher};
use crate::summary::{OutcomeEvent, OutcomeTracker};
use crate::types::RepositoryDescriptor;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::sync::{Semaphore, SemaphorePermit};
use tracing::{debug, error, info, info_span, warn, Instrument};

/// Set to `true` or `false` for the command depending on dry-run mode.
pub const DRY_RUN_ENV_VAR: &str = "GIT_FLEET_DRY_RUN";
/// Name of the repository the command runs in.
pub const REPO_NAME_ENV_VAR: &str = "GIT_FLEET_REPO_NAME";
/// Owner of the repository the command runs in.
pub const REPO_OWNER_ENV_VAR: &str = "GIT_FLEET_REPO_OWNER";

/// How a repository pipeline finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineOutcome {
    /// The command left the worktree clean.
    NoChanges,
    /// Changes were committed but dry-run mode kept them local.
    PushSkipped,
    /// Changes were pushed straight to the branch.
    PushedDirectly,
    /// The branch was pushed and handed to the pull request dispatcher.
    Dispatched(DispatchOutcome),
}

/// Shared state every pipeline runs against.
pub struct PipelineContext {
    config: Arc<RunConfig>,
    git: Arc<dyn GitProvider>,
    tracker: Arc<OutcomeTracker>,
    dispatcher: PullRequestDispatcher,
    clone_permits: Option<Semaphore>,
}

impl PipelineContext {
    pub fn new(
        config: Arc<RunConfig>,
        git: Arc<dyn GitProvider>,
        tracker: Arc<OutcomeTracker>,
        dispatcher: PullRequestDispatcher,
    ) -> Self {
        let clone_permits = config.max_concurrent_clones().map(Semaphore::new);
        Self {
            config,
            git,
            tracker,
            dispatcher,
            clone_permits,
        }
    }

    pub fn tracker(&self) -> &Arc<OutcomeTracker> {
        &self.tracker
    }

    /// Waits for a clone slot. `None` when clones are unbounded.
    async fn clone_permit(&self) -> Option<SemaphorePermit<'_>> {
        match &self.clone_permits {
            Some(permits) => permits.acquire().await.ok(),
            None => None,
        }
    }

    /// Records the failure event for `stage` and wraps the git error.
    fn git_failure(
        &self,
        repo: &Arc<RepositoryDescriptor>,
        stage: Stage,
        source: GitError,
    ) -> StageError {
        error!(%stage, error = %source, "Git operation failed");
        self.tracker.record(failure_event(stage), repo);
        StageError::Git { stage, source }
    }
}

/// Event recorded when `stage` fails.
fn failure_event(stage: Stage) -> OutcomeEvent {
    match stage {
        Stage::Workspace | Stage::Clone => OutcomeEvent::CloneFailed,
        Stage::ResolveHead => OutcomeEvent::HeadRefFailed,
        Stage::CheckoutBranch => OutcomeEvent::BranchCheckoutFailed,
        Stage::PullBranch => OutcomeEvent::RemotePullFailed,
        Stage::Command => OutcomeEvent::CommandFailed,
        Stage::Status => OutcomeEvent::WorktreeStatusFailed,
        Stage::StageFile => OutcomeEvent::StageFileFailed,
        Stage::Commit => OutcomeEvent::CommitFailed,
        Stage::Push => OutcomeEvent::PushFailed,
    }
}

/// Runs the full pipeline for one repository.
///
/// The clone lives in a temporary directory removed on a blocking thread
/// before this returns.
///
/// # Errors
///
/// Returns the first [`StageError`]; its event is already recorded.
pub async fn process_repository(
    ctx: &PipelineContext,
    repo: &Arc<RepositoryDescriptor>,
) -> Result<PipelineOutcome, StageError> {
    let span = info_span!("repository", repo = %repo);

    async {
        info!("Processing repository");
        let workdir = tempfile::Builder::new()
            .prefix(&format!("git-fleet-{}", repo.name))
            .tempdir()
            .map_err(|source| {
                error!(error = %source, "Failed to create working directory");
                ctx.tracker.record(failure_event(Stage::Workspace), repo);
                StageError::Workspace { source }
            })?;

        let result = run_stages(ctx, repo, workdir.path()).await;
        remove_workdir(workdir).await;
        result
    }
    .instrument(span)
    .await
}

async fn run_stages(
    ctx: &PipelineContext,
    repo: &Arc<RepositoryDescriptor>,
    dir: &Path,
) -> Result<PipelineOutcome, StageError> {
    clone_into(ctx, repo, dir).await?;
    prepare_branch(ctx, repo, dir).await?;
    execute_command(ctx, repo, dir).await?;

    if !commit_changes(ctx, repo, dir).await? {
        return Ok(PipelineOutcome::NoChanges);
    }

    push_and_dispatch(ctx, repo, dir).await
}

/// Deletes the scratch clone off the async workers.
async fn remove_workdir(workdir: TempDir) {
    let dir = workdir.path().to_path_buf();
    match tokio::task::spawn_blocking(move || workdir.close()).await {
        Ok(Ok(())) => debug!(dir = %dir.display(), "Removed working directory"),
        Ok(Err(e)) => warn!(dir = %dir.display(), error = %e, "Failed to remove working directory"),
        Err(e) => warn!(dir = %dir.display(), error = %e, "Cleanup task did not finish"),
    }
}

async fn clone_into(
    ctx: &PipelineContext,
    repo: &Arc<RepositoryDescriptor>,
    dir: &Path,
) -> Result<(), StageError> {
    let _permit = ctx.clone_permit().await;
    ctx.git
        .clone_repository(&repo.clone_url, dir)
        .await
        .map_err(|e| ctx.git_failure(repo, Stage::Clone, e))?;
    debug!(dir = %dir.display(), "Cloned repository");
    ctx.tracker.record(OutcomeEvent::Cloned, repo);
    Ok(())
}

/// Creates the fleet branch at `HEAD` and pulls any remote copy of it.
async fn prepare_branch(
    ctx: &PipelineContext,
    repo: &Arc<RepositoryDescriptor>,
    dir: &Path,
) -> Result<(), StageError> {
    let branch = ctx.config.branch_name();
    let head = ctx
        .git
        .head(dir)
        .await
        .map_err(|e| ctx.git_failure(repo, Stage::ResolveHead, e))?;

    match ctx.git.create_branch(dir, branch, &head).await {
        Ok(()) => debug!(branch, head = %head, "Created branch"),
        Err(GitError::BranchAlreadyExists { .. })
            if ctx.config.skip_pull_requests() && branch == repo.default_branch =>
        {
            debug!(branch, "Committing directly to the default branch");
        }
        Err(e) => return Err(ctx.git_failure(repo, Stage::CheckoutBranch, e)),
    }

    match ctx.git.pull_branch(dir, branch).await {
        Ok(PullOutcome::RemoteBranchMissing) => {
            debug!(branch, "Branch does not exist on the remote yet");
            ctx.tracker.record(OutcomeEvent::RemoteBranchMissing, repo);
            Ok(())
        }
        Ok(outcome) => {
            debug!(branch, ?outcome, "Pulled remote branch");
            Ok(())
        }
        Err(e) => Err(ctx.git_failure(repo, Stage::PullBranch, e)),
    }
}

async fn execute_command(
    ctx: &PipelineContext,
    repo: &Arc<RepositoryDescriptor>,
    dir: &Path,
) -> Result<(), StageError> {
    let env = [
        (DRY_RUN_ENV_VAR, ctx.config.dry_run().to_string()),
        (REPO_NAME_ENV_VAR, repo.name.clone()),
        (REPO_OWNER_ENV_VAR, repo.owner.clone()),
    ];

    match run_command(ctx.config.command(), dir, &env).await {
        Ok(output) => {
            debug!(elapsed_ms = output.elapsed.as_millis() as u64, "Command succeeded");
            Ok(())
        }
        Err(e) => {
            if let CommandError::Failed { stdout, stderr, .. } = &e {
                debug!(stdout = %stdout.trim_end(), stderr = %stderr.trim_end(), "Command output");
            }
            error!(error = %e, "Command failed");
            ctx.tracker.record(OutcomeEvent::CommandFailed, repo);
            Err(e.into())
        }
    }
}

/// Stages and commits whatever the command changed. Returns false for a clean worktree.
async fn commit_changes(
    ctx: &PipelineContext,
    repo: &Arc<RepositoryDescriptor>,
    dir: &Path,
) -> Result<bool, StageError> {
    let status = ctx
        .git
        .status(dir)
        .await
        .map_err(|e| ctx.git_failure(repo, Stage::Status, e))?;

    if status.is_clean() {
        info!("Command made no changes");
        ctx.tracker.record(OutcomeEvent::WorktreeClean, repo);
        return Ok(false);
    }

    debug!(changed = status.entries.len(), "Worktree has changes");
    ctx.tracker.record(OutcomeEvent::WorktreeDirty, repo);

    for path in status.untracked() {
        ctx.git
            .add(dir, path)
            .await
            .map_err(|e| ctx.git_failure(repo, Stage::StageFile, e))?;
    }

    ctx.git
        .commit_all(dir, ctx.config.commit_message())
        .await
        .map_err(|e| ctx.git_failure(repo, Stage::Commit, e))?;

    if ctx.config.skip_pull_requests() {
        ctx.tracker
            .record(OutcomeEvent::CommitsMadeDirectlyToBranch, repo);
    }
    Ok(true)
}

async fn push_and_dispatch(
    ctx: &PipelineContext,
    repo: &Arc<RepositoryDescriptor>,
    dir: &Path,
) -> Result<PipelineOutcome, StageError> {
    let branch = ctx.config.branch_name();

    if ctx.config.dry_run() {
        info!(branch, "Dry run, not pushing");
        ctx.tracker.record(OutcomeEvent::PushSkippedDryRun, repo);
        return Ok(PipelineOutcome::PushSkipped);
    }

    ctx.git
        .push_branch(dir, branch)
        .await
        .map_err(|e| ctx.git_failure(repo, Stage::Push, e))?;

    if ctx.config.skip_pull_requests() {
        info!(branch, "Pushed directly to branch");
        ctx.tracker.record(OutcomeEvent::DirectPushToBranch, repo);
        return Ok(PipelineOutcome::PushedDirectly);
    }

    let outcome = ctx.dispatcher.dispatch(repo, branch).await;
    if let DispatchOutcome::Failed { error } = &outcome {
        warn!(%error, "Pull request was not opened");
    }
    Ok(PipelineOutcome::Dispatched(outcome))
}
