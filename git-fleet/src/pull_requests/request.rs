//! Pending pull request state threaded through dispatch retries.

use crate::types::RepositoryDescriptor;
use std::sync::Arc;
use std::time::Duration;

/// A pull request waiting to be opened.
#[derive(Debug, Clone)]
pub struct PendingReviewRequest {
    repository: Arc<RepositoryDescriptor>,
    branch: String,
    retries: u32,
    delay: Duration,
}

impl PendingReviewRequest {
    /// First attempt: no retries, no delay.
    pub fn new(repository: Arc<RepositoryDescriptor>, branch: impl Into<String>) -> Self {
        Self {
            repository,
            branch: branch.into(),
            retries: 0,
            delay: Duration::ZERO,
        }
    }

    /// Next attempt after a rate limit, waiting `delay` first.
    #[must_use]
    pub fn retry(&self, delay: Duration) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
            branch: self.branch.clone(),
            retries: self.retries + 1,
            delay,
        }
    }

    pub fn repository(&self) -> &Arc<RepositoryDescriptor> {
        &self.repository
    }

    pub fn branch(&self) -> &str {
        &self.branch
    }

    pub fn retries(&self) -> u32 {
        self.retries
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}
