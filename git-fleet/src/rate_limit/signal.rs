//! Classification of rate-limited API responses.

use crate::github::http::HttpResponse;
use crate::github::models::ErrorBody;
use crate::rate_limit::info::{duration_until, RateLimitInfo};
use rand::Rng;
use reqwest::StatusCode;
use std::time::Duration;

/// Documentation anchors GitHub attaches to secondary (abuse) limit responses.
const SECONDARY_LIMIT_MARKERS: [&str; 2] = ["secondary-rate-limits", "abuse-rate-limits"];

/// Bounds in seconds for the randomized wait on an unannotated secondary limit.
const SECONDARY_WAIT_MIN_SECS: u64 = 3;
const SECONDARY_WAIT_MAX_SECS: u64 = 10;

/// Why GitHub refused a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitSignal {
    /// Secondary limit with an explicit `Retry-After`.
    Abuse { retry_after: Duration },

    /// Primary budget exhausted until the given Unix timestamp.
    Primary { reset: u64 },

    /// Secondary limit, optionally with a `Retry-After`.
    Secondary { retry_after: Option<Duration> },
}

impl RateLimitSignal {
    /// Classifies a response. Returns `None` when the response is not rate limited.
    ///
    /// Checks run in order: abuse with `Retry-After`, exhausted primary budget,
    /// then any remaining secondary-limit documentation marker.
    pub fn detect(response: &HttpResponse) -> Option<Self> {
        if response.status.is_success() {
            return None;
        }

        let documentation_url = ErrorBody::from_bytes(&response.body)
            .and_then(|body| body.documentation_url)
            .unwrap_or_default();
        let secondary_marker = SECONDARY_LIMIT_MARKERS
            .iter()
            .any(|marker| documentation_url.contains(marker));
        let limited_status = matches!(
            response.status,
            StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS
        );
        let retry_after = response
            .header("retry-after")
            .and_then(|value| value.trim().parse::<u64>().ok())
            .map(Duration::from_secs);

        if limited_status && secondary_marker {
            if let Some(retry_after) = retry_after {
                return Some(Self::Abuse { retry_after });
            }
        }

        if limited_status {
            if let Some(info) = RateLimitInfo::from_headers(&response.headers) {
                if info.is_exhausted() {
                    return Some(Self::Primary { reset: info.reset });
                }
            }
        }

        secondary_marker.then_some(Self::Secondary { retry_after })
    }

    /// Returns the wait GitHub asked for, if it gave one.
    pub fn suggested_delay(&self) -> Option<Duration> {
        match self {
            Self::Abuse { retry_after } => Some(*retry_after),
            Self::Primary { reset } => Some(duration_until(*reset)),
            Self::Secondary { retry_after } => *retry_after,
        }
    }

    /// Returns how long the transport sleeps before retrying.
    ///
    /// Unannotated secondary limits wait a few random seconds.
    pub fn transport_wait(&self) -> Duration {
        self.suggested_delay().unwrap_or_else(random_secondary_wait)
    }

    /// Short name used in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Abuse { .. } => "abuse",
            Self::Primary { .. } => "primary",
            Self::Secondary { .. } => "secondary",
        }
    }
}

fn random_secondary_wait() -> Duration {
    let secs = rand::thread_rng().gen_range(SECONDARY_WAIT_MIN_SECS..=SECONDARY_WAIT_MAX_SECS);
    Duration::from_secs(secs)
}
