//! Runner error types.

use crate::discovery::DiscoveryError;
use crate::github::ApiError;

/// Errors that stop a fleet run before any repository is processed.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// The GitHub client could not be built.
    #[error("Failed to create GitHub client: {0}")]
    Client(#[from] ApiError),

    /// Repository selection failed.
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),
}
