//! Rate-limited HTTP client with retry for the fetcher
//!
//! Every request waits on one shared limiter (burst of one, period of
//! `1 / requests_per_second`), so sequential callers and pooled workers are
//! throttled together. Transient failures are retried per `RetryPolicy`.

use crate::fetcher::config::FetcherConfig;
use crate::fetcher::error::FetchError;
use crate::http::{RetryPolicy, is_transient, is_transient_error};
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use reqwest::{Client as ReqwestClient, Method, Response};
use std::sync::Arc;
use tracing::{Instrument, debug, debug_span, instrument, warn};

/// HTTP client shared by listing and document fetches
#[derive(Clone)]
pub struct HttpClient {
    /// The underlying reqwest client
    client: ReqwestClient,

    /// Process-wide limiter, shared across clones
    limiter: Arc<DefaultDirectRateLimiter>,

    /// Retry policy for transient failures
    retry: RetryPolicy,
}

impl HttpClient {
    /// Create a client from fetcher configuration
    pub fn new(config: &FetcherConfig) -> Result<Self, FetchError> {
        let client = ReqwestClient::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.as_str())
            .build()?;

        let quota = Quota::with_period(config.min_interval()).ok_or_else(|| {
            FetchError::Other("request interval must be greater than zero".to_string())
        })?;

        Ok(Self {
            client,
            limiter: Arc::new(RateLimiter::direct(quota)),
            retry: config.retry_policy(),
        })
    }

    async fn throttle(&self) {
        self.limiter
            .until_ready()
            .instrument(debug_span!("limiter"))
            .await;
    }

    /// GET with retry on transient failures
    #[instrument(skip(self))]
    pub async fn get(&self, url: &str) -> Result<Response, FetchError> {
        self.send_with_retry(Method::GET, url).await
    }

    /// Single HEAD attempt; any non-success status is an error
    #[instrument(skip(self))]
    pub async fn head(&self, url: &str) -> Result<Response, FetchError> {
        self.throttle().await;
        let response = self.client.head(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response)
    }

    async fn send_with_retry(&self, method: Method, url: &str) -> Result<Response, FetchError> {
        let mut attempts = 0;

        loop {
            attempts += 1;
            self.throttle().await;

            match self.client.request(method.clone(), url).send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        debug!("{} {} -> {}", method, url, status);
                        return Ok(response);
                    }

                    if !is_transient(status) {
                        return Err(FetchError::Status {
                            url: url.to_string(),
                            status: status.as_u16(),
                        });
                    }

                    if attempts > self.retry.max_retries {
                        return Err(FetchError::RetriesExhausted {
                            url: url.to_string(),
                            attempts,
                            last_status: status.to_string(),
                        });
                    }

                    let delay = self.retry.delay_with_headers(attempts, response.headers());
                    warn!(
                        "{} returned {}; retrying in {:?} (attempt {}/{})",
                        url, status, delay, attempts, self.retry.max_retries
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) if is_transient_error(&e) => {
                    if attempts > self.retry.max_retries {
                        return Err(FetchError::RetriesExhausted {
                            url: url.to_string(),
                            attempts,
                            last_status: e.to_string(),
                        });
                    }

                    let delay = self.retry.delay_for(attempts);
                    warn!(
                        "{} failed: {}; retrying in {:?} (attempt {}/{})",
                        url, e, delay, attempts, self.retry.max_retries
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(FetchError::Http(e)),
            }
        }
    }
}
