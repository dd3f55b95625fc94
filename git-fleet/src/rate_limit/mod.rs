//! Rate limiting for GitHub API traffic.
//!
//! [`RateLimitedTransport`] wraps another [`HttpTransport`] and is the only
//! path API calls take. It serializes requests, spaces out writes, and
//! sleeps through rate-limit responses before retrying them, so callers only
//! ever see the final response.

mod info;
mod signal;

pub use info::{duration_until, unix_now, RateLimitInfo};
pub use signal::RateLimitSignal;

use crate::github::http::{HttpRequest, HttpResponse, HttpTransport, TransportError};
use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, trace, warn};

/// Maximum time to wait for a single rate limit (1 hour).
const MAX_WAIT_SECS: u64 = 3600;

/// Minimum remaining requests before proactively waiting.
const MIN_REMAINING_THRESHOLD: u32 = 5;

/// Default pause before the request that follows a write.
pub const DEFAULT_WRITE_DELAY: Duration = Duration::from_secs(2);

/// Transport that serializes API calls and absorbs rate limiting.
///
/// All requests share one lock. The request after a write (POST, PATCH,
/// PUT, DELETE) waits [`DEFAULT_WRITE_DELAY`] first. The lock is released
/// between rate-limit retries so other callers can interleave.
pub struct RateLimitedTransport<T> {
    inner: T,
    write_delay: Duration,
    delay_next_request: Mutex<bool>,
}

impl<T: HttpTransport> RateLimitedTransport<T> {
    /// Wraps `inner` with the default write delay.
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            write_delay: DEFAULT_WRITE_DELAY,
            delay_next_request: Mutex::new(false),
        }
    }

    /// Overrides the pause inserted after writes.
    #[must_use]
    pub fn with_write_delay(mut self, write_delay: Duration) -> Self {
        self.write_delay = write_delay;
        self
    }
}

#[async_trait]
impl<T: HttpTransport> HttpTransport for RateLimitedTransport<T> {
    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            let mut delay_next_request = self.delay_next_request.lock().await;

            if *delay_next_request {
                trace!(delay_ms = self.write_delay.as_millis() as u64, "Pausing after write");
                tokio::time::sleep(self.write_delay).await;
            }
            *delay_next_request = request.is_write();

            let response = self.inner.send(request).await?;

            let Some(signal) = RateLimitSignal::detect(&response) else {
                if let Some(info) = RateLimitInfo::from_headers(&response.headers) {
                    wait_if_needed(&info).await;
                }
                return Ok(response);
            };

            *delay_next_request = false;
            let wait = signal.transport_wait();
            warn!(
                method = %request.method,
                url = %request.url,
                kind = signal.as_str(),
                attempt,
                wait_secs = wait.as_secs(),
                "Rate limited by GitHub, retrying"
            );
            wait_for(wait).await;
            drop(delay_next_request);
        }
    }
}

/// Waits if the remaining budget is low, returning true if we waited.
pub async fn wait_if_needed(info: &RateLimitInfo) -> bool {
    if info.remaining >= MIN_REMAINING_THRESHOLD {
        return false;
    }

    let wait = duration_until(info.reset);
    if wait.is_zero() {
        return false;
    }

    info!(
        remaining = info.remaining,
        limit = info.limit,
        wait_secs = wait.as_secs(),
        "Rate limit low, waiting for reset"
    );
    wait_for(wait).await;
    true
}

/// Sleeps for `wait`, capped at one hour.
pub async fn wait_for(wait: Duration) {
    let cap = Duration::from_secs(MAX_WAIT_SECS);
    if wait > cap {
        warn!(
            wait_secs = wait.as_secs(),
            max_wait = MAX_WAIT_SECS,
            "Rate limit reset too far in future, capping wait time"
        );
    }
    let actual = wait.min(cap);
    debug!(wait_secs = actual.as_secs(), "Sleeping for rate limit");
    tokio::time::sleep(actual).await;
}
