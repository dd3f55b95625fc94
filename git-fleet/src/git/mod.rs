//! Local git operations on cloned repositories.
//!
//! Pipeline stages depend on the [`GitProvider`] trait; [`GitCli`] drives
//! the `git` binary.

mod cli;
mod error;
mod status;

pub use cli::{authenticated_url, GitCli};
pub use error::GitError;
pub use status::{StatusEntry, WorktreeStatus};

use async_trait::async_trait;
use std::path::Path;

/// Outcome of pulling a branch from the remote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PullOutcome {
    /// New commits were fast-forwarded into the branch.
    Updated,
    /// The branch already matched the remote.
    AlreadyUpToDate,
    /// The remote has no branch of that name.
    RemoteBranchMissing,
}

/// Git operations used by the repository pipeline.
#[async_trait]
pub trait GitProvider: Send + Sync {
    /// Clones `url` into the empty directory `dir`.
    async fn clone_repository(&self, url: &str, dir: &Path) -> Result<(), GitError>;

    /// Returns the commit id of `HEAD`.
    async fn head(&self, dir: &Path) -> Result<String, GitError>;

    /// Creates `branch` at `start_point` and checks it out.
    ///
    /// Returns [`GitError::BranchAlreadyExists`] if the branch is already there.
    async fn create_branch(
        &self,
        dir: &Path,
        branch: &str,
        start_point: &str,
    ) -> Result<(), GitError>;

    /// Fast-forwards the checked out branch from `origin/<branch>`.
    async fn pull_branch(&self, dir: &Path, branch: &str) -> Result<PullOutcome, GitError>;

    /// Reports changed and untracked paths.
    async fn status(&self, dir: &Path) -> Result<WorktreeStatus, GitError>;

    /// Stages a single path.
    async fn add(&self, dir: &Path, path: &str) -> Result<(), GitError>;

    /// Commits every staged and tracked change.
    async fn commit_all(&self, dir: &Path, message: &str) -> Result<(), GitError>;

    /// Pushes `branch` to `origin`.
    async fn push_branch(&self, dir: &Path, branch: &str) -> Result<(), GitError>;
}
