//! Retry and backoff policy shared by the document fetcher and the extraction client
//!
//! Transient failures (429, 500, 502, 503, 504, timeouts and connection errors)
//! are retried with exponential backoff: `base * 2^(attempt - 1)` with ±20%
//! jitter, capped at `max_delay`. A `Retry-After` header on a 429 raises the
//! delay to at least the server's request.

use rand::{Rng, thread_rng};
use reqwest::StatusCode;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use std::time::Duration;

/// Status codes worth retrying
pub const TRANSIENT_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

/// Bounded exponential backoff
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,

    /// Delay before the first retry
    pub base_delay: Duration,

    /// Upper bound for any single delay
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    /// Policy that never retries
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Delay before retry number `attempt` (1-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exp = 2u32.saturating_pow(attempt.saturating_sub(1));
        let mut delay = self.base_delay.saturating_mul(exp);

        if delay > Duration::from_millis(1) {
            let jitter = thread_rng().gen_range(0.8..1.2);
            delay = delay.mul_f64(jitter);
        }

        delay.min(self.max_delay)
    }

    /// Delay honouring a `Retry-After` header (seconds form) when present
    pub fn delay_with_headers(&self, attempt: u32, headers: &HeaderMap) -> Duration {
        let computed = self.delay_for(attempt);
        match retry_after(headers) {
            Some(requested) => computed.max(requested).min(self.max_delay),
            None => computed,
        }
    }
}

/// Whether a status should be retried
pub fn is_transient(status: StatusCode) -> bool {
    TRANSIENT_STATUSES.contains(&status.as_u16())
}

/// Whether a transport error should be retried
pub fn is_transient_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect()
}

/// Parse a `Retry-After: <seconds>` header
pub fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}
