//! Shared plumbing for calls to remote services.
//!
//! Every call is bounded by a per-attempt timeout and retried at most
//! `max_attempts - 1` times with exponential backoff. Only transient failures
//! are retried.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::time::{sleep, timeout};
use tracing::{debug, warn};

/// Failures from a remote moderation or rewrite service.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// Transport failure or 5xx/429 answer.
    #[error("upstream unavailable: {0}")]
    Unavailable(String),

    /// The attempt did not finish within the per-call timeout.
    #[error("upstream timed out after {0:?}")]
    Timeout(Duration),

    /// The answer did not contain the expected fields.
    #[error("malformed upstream response: {0}")]
    Malformed(String),

    /// The service refused the request (4xx other than 429).
    #[error("upstream rejected request with status {status}: {message}")]
    Rejected { status: u16, message: String },

    /// HTTP client error.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}

impl UpstreamError {
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Unavailable(_) | Self::Timeout(_) => true,
            Self::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Self::Malformed(_) | Self::Rejected { .. } => false,
        }
    }

    /// Classifies a non-success HTTP status.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        if status == 429 || status >= 500 {
            Self::Unavailable(format!("status {}: {}", status, message))
        } else {
            Self::Rejected { status, message }
        }
    }
}

/// Timeout and retry policy for remote calls.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Attempts including the first one.
    pub max_attempts: u32,
    /// Per-attempt timeout.
    pub attempt_timeout: Duration,
    /// Delay before the first retry.
    pub initial_backoff: Duration,
    /// Multiplier applied to the delay after each retry.
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            attempt_timeout: Duration::from_millis(8_000),
            initial_backoff: Duration::from_millis(250),
            backoff_multiplier: 2.0,
        }
    }
}

/// Upper bound for a single retry delay.
pub const MAX_BACKOFF: Duration = Duration::from_secs(30);

impl RetryConfig {
    /// Delay before retry number `attempt` (1-based), capped at [`MAX_BACKOFF`].
    fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let secs = self.initial_backoff.as_secs_f64() * self.backoff_multiplier.powi(exponent);
        Duration::try_from_secs_f64(secs)
            .unwrap_or(MAX_BACKOFF)
            .min(MAX_BACKOFF)
    }

    /// Longest time one [`with_retry`] call can take: every attempt times
    /// out and every backoff is slept.
    pub fn worst_case(&self) -> Duration {
        let attempts = self.max_attempts.max(1);
        (1..attempts).fold(self.attempt_timeout.saturating_mul(attempts), |total, retry| {
            total.saturating_add(self.backoff(retry))
        })
    }
}

/// Runs `operation` under the timeout and retry policy.
pub async fn with_retry<T, F, Fut>(
    config: &RetryConfig,
    service: &'static str,
    mut operation: F,
) -> Result<T, UpstreamError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, UpstreamError>>,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        let result = match timeout(config.attempt_timeout, operation()).await {
            Ok(result) => result,
            Err(_) => Err(UpstreamError::Timeout(config.attempt_timeout)),
        };

        match result {
            Ok(value) => {
                if attempt > 1 {
                    debug!(service, attempt, "Upstream call succeeded after retry");
                }
                return Ok(value);
            }
            Err(err) if !err.is_retryable() || attempt >= max_attempts => {
                warn!(service, attempt, error = %err, "Upstream call failed");
                return Err(err);
            }
            Err(err) => {
                let delay = config.backoff(attempt);
                warn!(
                    service,
                    attempt,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "Upstream call failed, retrying"
                );
                sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
