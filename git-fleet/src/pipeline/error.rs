//! Pipeline error types.

use crate::git::GitError;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// A step of the per-repository pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Workspace,
    Clone,
    ResolveHead,
    CheckoutBranch,
    PullBranch,
    Command,
    Status,
    StageFile,
    Commit,
    Push,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Workspace => "workspace",
            Self::Clone => "clone",
            Self::ResolveHead => "resolve-head",
            Self::CheckoutBranch => "checkout-branch",
            Self::PullBranch => "pull-branch",
            Self::Command => "command",
            Self::Status => "status",
            Self::StageFile => "stage-file",
            Self::Commit => "commit",
            Self::Push => "push",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors from running the user command inside a clone.
#[derive(Debug, Error)]
pub enum CommandError {
    /// No program was given.
    #[error("No command to run")]
    Empty,

    /// The program could not be started.
    #[error("Failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The program exited unsuccessfully.
    #[error("'{program}' exited with {}", describe_exit(.code))]
    Failed {
        program: String,
        code: Option<i32>,
        stdout: String,
        stderr: String,
        elapsed: Duration,
    },
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {code}"),
        None => "no status (killed by signal)".to_string(),
    }
}

/// A stage failure that ended processing of one repository.
#[derive(Debug, Error)]
pub enum StageError {
    /// The scratch directory for the clone could not be created.
    #[error("Failed to create working directory: {source}")]
    Workspace {
        #[source]
        source: std::io::Error,
    },

    /// A git operation failed.
    #[error("{stage} failed: {source}")]
    Git {
        stage: Stage,
        #[source]
        source: GitError,
    },

    /// The user command failed.
    #[error("command failed: {0}")]
    Command(#[from] CommandError),
}

impl StageError {
    /// The stage that failed.
    pub fn stage(&self) -> Stage {
        match self {
            Self::Workspace { .. } => Stage::Workspace,
            Self::Git { stage, .. } => *stage,
            Self::Command(_) => Stage::Command,
        }
    }
}
