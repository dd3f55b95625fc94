//! Pull request dispatch outcomes.

use serde::Serialize;

/// Result of dispatching a pull request for one repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DispatchOutcome {
    /// A pull request was opened.
    Opened {
        /// GitHub PR number.
        number: u64,
        /// GitHub PR URL.
        url: String,
        /// Whether it was opened as a draft.
        draft: bool,
        /// Rate-limit retries it took.
        retries: u32,
    },

    /// An open pull request for the branch already existed.
    AlreadyExists {
        /// URL of the existing PR.
        url: String,
    },

    /// Dry run or direct push; nothing was sent.
    Skipped,

    /// GitHub rejected the request.
    Failed {
        /// Error message.
        error: String,
    },

    /// Still rate limited after the maximum number of retries.
    RetriesExhausted {
        /// Retries performed.
        retries: u32,
    },
}

impl DispatchOutcome {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Opened { .. } => "opened",
            Self::AlreadyExists { .. } => "already_exists",
            Self::Skipped => "skipped",
            Self::Failed { .. } | Self::RetriesExhausted { .. } => "failed",
        }
    }

    /// Returns the PR URL if one exists.
    #[must_use]
    pub fn url(&self) -> Option<&str> {
        match self {
            Self::Opened { url, .. } | Self::AlreadyExists { url } => Some(url),
            _ => None,
        }
    }
}
