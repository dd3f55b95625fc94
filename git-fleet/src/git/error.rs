//! Git error types.

use thiserror::Error;

/// Errors that can occur while running git.
#[derive(Debug, Error)]
pub enum GitError {
    /// The git binary could not be started.
    #[error("Failed to execute git {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// git exited with a failure status.
    #[error("git {command} failed: {stderr}")]
    CommandFailed { command: String, stderr: String },

    /// The branch to create is already present locally.
    #[error("A branch named '{branch}' already exists")]
    BranchAlreadyExists { branch: String },

    /// A clone URL could not be parsed for credential injection.
    #[error("Invalid clone URL '{url}'")]
    InvalidUrl { url: String },
}
