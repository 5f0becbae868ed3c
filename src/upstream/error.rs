use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
/// Errors returned by upstream completion calls.
pub enum UpstreamError {
    /// Transport failure, rate limiting or 5xx that survived every retry.
    #[error("upstream unavailable after {attempts} attempt(s): {message}")]
    Unavailable {
        /// Total attempts made (first call plus retries).
        attempts: u32,
        /// Last failure observed.
        message: String,
    },

    /// The provider refused an echo request for this model.
    #[error("echo scoring not supported for model '{model}': {message}")]
    EchoUnsupported {
        /// Model that rejected echo mode.
        model: String,
        /// Provider message.
        message: String,
    },

    /// Non-retryable client error (bad model name, auth, quota).
    #[error("upstream rejected request with status {status}: {message}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Provider message.
        message: String,
    },

    /// Provider answered 2xx with a body that is not JSON.
    #[error("upstream returned invalid JSON: {0}")]
    InvalidJson(String),

    /// Endpoint path did not start with `/`.
    #[error("invalid upstream path '{0}': must start with '/'")]
    InvalidPath(String),
}

impl UpstreamError {
    /// Returns `true` for the provider's "echo is not available" signal.
    pub fn is_echo_unsupported(&self) -> bool {
        matches!(self, UpstreamError::EchoUnsupported { .. })
    }
}

/// Bounded exponential backoff for retryable upstream failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Upper bound for any single delay.
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
            max_delay,
        }
    }

    /// No retries; useful in tests.
    pub fn none() -> Self {
        Self::new(0, Duration::ZERO, Duration::ZERO)
    }

    /// Delay before retry number `retry` (0-based): `base * 2^retry`, capped.
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 1u32.checked_shl(retry).unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// Total attempts allowed (first call plus retries).
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}
