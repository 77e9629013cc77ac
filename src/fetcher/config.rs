//! # Fetcher Configuration Module
//!
//! Network behaviour of the listing and document fetcher: timeouts, retry
//! budget, politeness rate and identification. Uses the builder pattern.
//!
//! ## Key Components
//!
//! - `FetcherConfig`: timeout, retry and rate settings
//! - `FetcherConfigBuilder`: builder for `FetcherConfig`

use crate::http::RetryPolicy;
use std::time::Duration;

/// Configuration for the fetcher
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    /// Per-request timeout
    pub timeout: Duration,

    /// Retries after the first attempt for transient failures
    pub max_retries: u32,

    /// Delay before the first retry, doubled on each further retry
    pub backoff_base: Duration,

    /// Upper bound for a single backoff delay
    pub max_backoff: Duration,

    /// Requests per second across every caller sharing the fetcher
    pub requests_per_second: f64,

    /// User agent to send
    pub user_agent: String,

    /// Issue a HEAD request per document link to learn its content type
    pub probe_content_type: bool,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_retries: 3,
            backoff_base: Duration::from_secs(2),
            max_backoff: Duration::from_secs(60),
            requests_per_second: 1.0,
            user_agent: format!("docket/{}", env!("CARGO_PKG_VERSION")),
            probe_content_type: true,
        }
    }
}

/// Builder for FetcherConfig
#[derive(Debug, Default)]
pub struct FetcherConfigBuilder {
    config: FetcherConfig,
}

impl FetcherConfigBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            config: FetcherConfig::default(),
        }
    }

    /// Set the per-request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set the retry budget for transient failures
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.config.max_retries = max_retries;
        self
    }

    /// Set the first backoff delay
    pub fn backoff_base(mut self, backoff_base: Duration) -> Self {
        self.config.backoff_base = backoff_base;
        self
    }

    /// Set the backoff cap
    pub fn max_backoff(mut self, max_backoff: Duration) -> Self {
        self.config.max_backoff = max_backoff;
        self
    }

    /// Set the process-wide request rate
    pub fn requests_per_second(mut self, requests_per_second: f64) -> Self {
        self.config.requests_per_second = requests_per_second;
        self
    }

    /// Set the user agent
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Enable or disable HEAD probes for content types
    pub fn probe_content_type(mut self, probe: bool) -> Self {
        self.config.probe_content_type = probe;
        self
    }

    /// Build the configuration
    pub fn build(self) -> FetcherConfig {
        self.config
    }
}

impl FetcherConfig {
    /// Create a new builder
    pub fn builder() -> FetcherConfigBuilder {
        FetcherConfigBuilder::new()
    }

    /// Retry policy derived from the backoff settings
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            base_delay: self.backoff_base,
            max_delay: self.max_backoff,
        }
    }

    /// Minimum interval between two requests
    pub fn min_interval(&self) -> Duration {
        if self.requests_per_second <= 0.0 || !self.requests_per_second.is_finite() {
            return Duration::from_secs(1);
        }
        Duration::from_secs_f64(1.0 / self.requests_per_second)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = FetcherConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.min_interval(), Duration::from_secs(1));
        assert!(config.user_agent.starts_with("docket/"));
    }

    #[test]
    fn test_builder() {
        let config = FetcherConfig::builder()
            .max_retries(1)
            .requests_per_second(4.0)
            .probe_content_type(false)
            .build();
        assert_eq!(config.max_retries, 1);
        assert_eq!(config.min_interval(), Duration::from_millis(250));
        assert!(!config.probe_content_type);
        assert_eq!(config.retry_policy().max_retries, 1);
    }

    #[test]
    fn test_invalid_rate_falls_back_to_one_per_second() {
        let config = FetcherConfig::builder().requests_per_second(0.0).build();
        assert_eq!(config.min_interval(), Duration::from_secs(1));
    }
}
