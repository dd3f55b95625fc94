//! Repository discovery error types.

use crate::github::ApiError;
use thiserror::Error;

/// Errors that can occur while selecting repositories.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// GitHub API error.
    #[error("GitHub API error: {0}")]
    GitHubError(#[from] ApiError),

    /// The allow-list file could not be read.
    #[error("Failed to read repos file '{path}': {source}")]
    IoError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The organization has no repositories to process.
    #[error("No repositories found for organization '{org}'")]
    NoReposFound { org: String },

    /// Selection finished with nothing to process.
    #[error("None of the supplied repositories could be resolved")]
    NoValidRepos,
}
