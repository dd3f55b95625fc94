//! Rate limit information.

use reqwest::header::HeaderMap;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Header carrying the remaining request budget.
pub const REMAINING_HEADER: &str = "x-ratelimit-remaining";

/// Header carrying the Unix timestamp at which the budget resets.
pub const RESET_HEADER: &str = "x-ratelimit-reset";

/// Header carrying the total budget per window.
pub const LIMIT_HEADER: &str = "x-ratelimit-limit";

/// Rate limit information for a specific resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitInfo {
    /// Requests remaining in the current window.
    pub remaining: u32,

    /// Unix timestamp when the rate limit resets.
    pub reset: u64,

    /// Total requests allowed per window.
    pub limit: u32,
}

impl RateLimitInfo {
    /// Reads the rate limit headers of a response.
    ///
    /// Returns `None` unless both the remaining budget and the reset time are present.
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let remaining = header_number(headers, REMAINING_HEADER)?;
        let reset = header_number(headers, RESET_HEADER)?;
        let limit = header_number(headers, LIMIT_HEADER).unwrap_or(remaining);

        Some(Self {
            remaining: u32::try_from(remaining).unwrap_or(u32::MAX),
            reset,
            limit: u32::try_from(limit).unwrap_or(u32::MAX),
        })
    }

    /// Returns true once the window has no requests left.
    pub fn is_exhausted(&self) -> bool {
        self.remaining == 0
    }
}

fn header_number(headers: &HeaderMap, name: &str) -> Option<u64> {
    headers.get(name)?.to_str().ok()?.trim().parse().ok()
}

/// Returns the current Unix time in seconds.
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Returns how long until the given Unix timestamp, zero if it already passed.
pub fn duration_until(reset: u64) -> Duration {
    Duration::from_secs(reset.saturating_sub(unix_now()))
}
