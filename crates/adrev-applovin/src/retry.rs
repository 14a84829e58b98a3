//! Fixed-delay retry for MAX reporting calls.
//!
//! The reporting API asks for long, flat waits rather than exponential
//! back-off: a 429 means "come back in a minute", a 5xx is usually a report
//! still being generated. [`RetryPolicy`] carries the schedule as plain data
//! so callers (and tests) can inject their own delays.

use std::future::Future;
use std::time::Duration;

use crate::error::FetchError;

/// Per-error retry schedule for upstream calls.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Additional attempts after the first failure. `0` disables retries.
    pub max_retries: u32,
    /// Wait after an HTTP 429.
    pub rate_limit_delay: Duration,
    /// Wait after an HTTP 5xx or a transport-level failure.
    pub server_error_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 1,
            rate_limit_delay: Duration::from_secs(60),
            server_error_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Returns the wait before retrying `err`, or `None` when the error is
    /// not retriable.
    ///
    /// **Retriable:** 429 (rate-limit delay), 5xx, timeouts and connection
    /// failures (server-error delay).
    ///
    /// **Not retriable:** auth rejections, other 4xx, malformed bodies.
    /// Retrying those just repeats the same failure against a daily quota.
    #[must_use]
    pub fn delay_for(&self, err: &FetchError) -> Option<Duration> {
        match err {
            FetchError::RateLimited { .. } => Some(self.rate_limit_delay),
            FetchError::Server { .. } => Some(self.server_error_delay),
            FetchError::Http(e) if e.is_timeout() || e.is_connect() => {
                Some(self.server_error_delay)
            }
            _ => None,
        }
    }
}

/// Runs `operation` with up to `policy.max_retries` additional attempts,
/// sleeping the policy's per-error delay between attempts.
///
/// Non-retriable errors are returned immediately.
pub(crate) async fn with_policy<T, F, Fut>(
    policy: RetryPolicy,
    mut operation: F,
) -> Result<T, FetchError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, FetchError>>,
{
    let mut attempt = 0u32;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                let Some(delay) = policy.delay_for(&err) else {
                    return Err(err);
                };
                if attempt >= policy.max_retries {
                    return Err(err);
                }
                attempt += 1;
                tracing::warn!(
                    attempt,
                    max_retries = policy.max_retries,
                    delay_secs = delay.as_secs(),
                    error = %err,
                    "transient reporting error, retrying after fixed delay"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}
