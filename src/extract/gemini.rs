//! Gemini-backed extractor
//!
//! Calls `models/{model}:generateContent` on the Generative Language API.
//! The first pass sends the PDF inline (base64) with the markdown prompt;
//! the second pass sends the markdown and asks for `application/json`.
//! Requests are throttled by a per-minute limiter and retried on 429/5xx.

use crate::extract::error::ExtractError;
use crate::extract::{Extractor, json_prompt, markdown_prompt};
use crate::http::{RetryPolicy, is_transient, retry_after};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use reqwest::{Client as ReqwestClient, StatusCode};
use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tracing::{Instrument, debug, debug_span, error, instrument, warn};

/// Default API host
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Default model
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Environment variable holding the API key
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Configuration for the Gemini extractor
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// API key
    pub api_key: String,

    /// Model name
    pub model: String,

    /// API host, overridable for tests
    pub base_url: String,

    /// Per-call timeout
    pub timeout: Duration,

    /// Sampling temperature
    pub temperature: f32,

    /// Output token cap per call
    pub max_output_tokens: u32,

    /// Client-side request budget
    pub requests_per_minute: u32,

    /// Retry policy for 429 and 5xx responses
    pub retry: RetryPolicy,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(120),
            temperature: 0.0,
            max_output_tokens: 8192,
            requests_per_minute: 30,
            retry: RetryPolicy {
                max_retries: 2,
                base_delay: Duration::from_secs(5),
                max_delay: Duration::from_secs(60),
            },
        }
    }
}

/// Builder for GeminiConfig
#[derive(Debug, Default)]
pub struct GeminiConfigBuilder {
    config: GeminiConfig,
}

impl GeminiConfigBuilder {
    /// Set the API key
    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.config.api_key = api_key.into();
        self
    }

    /// Set the model
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    /// Set the API host
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.config.base_url = base_url.into();
        self
    }

    /// Set the per-call timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set the output token cap
    pub fn max_output_tokens(mut self, max_output_tokens: u32) -> Self {
        self.config.max_output_tokens = max_output_tokens;
        self
    }

    /// Set the client-side request budget
    pub fn requests_per_minute(mut self, requests_per_minute: u32) -> Self {
        self.config.requests_per_minute = requests_per_minute;
        self
    }

    /// Set the retry policy
    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.config.retry = retry;
        self
    }

    /// Build the configuration
    pub fn build(self) -> GeminiConfig {
        self.config
    }
}

impl GeminiConfig {
    /// Create a new builder
    pub fn builder() -> GeminiConfigBuilder {
        GeminiConfigBuilder::default()
    }

    /// Defaults with the API key taken from `GEMINI_API_KEY`
    pub fn from_env() -> Result<Self, ExtractError> {
        let api_key = std::env::var(API_KEY_ENV)
            .map_err(|_| ExtractError::Config(format!("{} must be set", API_KEY_ENV)))?;
        Ok(Self::builder().api_key(api_key).build())
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    inline_data: Option<Blob>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Blob {
    mime_type: String,
    data: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
    response_mime_type: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

impl GenerateContentResponse {
    /// Concatenated text parts of the first candidate
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default()
    }

    fn empty_reason(&self) -> String {
        if let Some(reason) = self
            .prompt_feedback
            .as_ref()
            .and_then(|f| f.block_reason.clone())
        {
            return format!("prompt blocked: {}", reason);
        }
        match self.candidates.first().and_then(|c| c.finish_reason.clone()) {
            Some(reason) => format!("no text (finish reason {})", reason),
            None => "no candidates".to_string(),
        }
    }
}

/// Extractor backed by Gemini
#[derive(Clone)]
pub struct GeminiExtractor {
    client: ReqwestClient,
    config: GeminiConfig,
    limiter: Arc<DefaultDirectRateLimiter>,
}

impl GeminiExtractor {
    /// Create an extractor; fails without an API key
    pub fn new(config: GeminiConfig) -> Result<Self, ExtractError> {
        if config.api_key.trim().is_empty() {
            return Err(ExtractError::Config(format!(
                "an API key is required (set {})",
                API_KEY_ENV
            )));
        }

        let client = ReqwestClient::builder().timeout(config.timeout).build()?;
        let per_minute = NonZeroU32::new(config.requests_per_minute).ok_or_else(|| {
            ExtractError::Config("requests_per_minute must be greater than zero".to_string())
        })?;
        let limiter = RateLimiter::direct(Quota::per_minute(per_minute));

        Ok(Self {
            client,
            config,
            limiter: Arc::new(limiter),
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }

    fn request(&self, parts: Vec<Part>, response_mime_type: &str) -> GenerateContentRequest {
        GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts,
            }],
            generation_config: GenerationConfig {
                temperature: self.config.temperature,
                max_output_tokens: self.config.max_output_tokens,
                response_mime_type: response_mime_type.to_string(),
            },
        }
    }

    #[instrument(skip(self, request), fields(model = %self.config.model))]
    async fn generate(&self, request: &GenerateContentRequest) -> Result<String, ExtractError> {
        let url = self.endpoint();
        let retry = self.config.retry;
        let mut attempts = 0;

        loop {
            attempts += 1;
            self.limiter
                .until_ready()
                .instrument(debug_span!("limiter"))
                .await;

            let response = self
                .client
                .post(&url)
                .query(&[("key", self.config.api_key.as_str())])
                .json(request)
                .send()
                .await
                .map_err(|e| {
                    if e.is_timeout() {
                        ExtractError::Timeout
                    } else {
                        ExtractError::Http(e)
                    }
                })?;

            let status = response.status();
            if status.is_success() {
                let body = response.text().await?;
                let parsed: GenerateContentResponse = serde_json::from_str(&body).map_err(|e| {
                    error!("Failed to parse response: {}", e);
                    ExtractError::Other(format!("Failed to parse response: {}", e))
                })?;

                let text = parsed.text();
                if text.trim().is_empty() {
                    return Err(ExtractError::EmptyResponse(parsed.empty_reason()));
                }
                debug!("Received {} characters", text.len());
                return Ok(text);
            }

            let wait = retry_after(response.headers());
            let message = response.text().await.unwrap_or_default();

            if is_transient(status) && attempts <= retry.max_retries {
                let delay = match wait {
                    Some(requested) => retry.delay_for(attempts).max(requested).min(retry.max_delay),
                    None => retry.delay_for(attempts),
                };
                warn!(
                    "Extraction call returned {}; retrying in {:?} (attempt {}/{})",
                    status, delay, attempts, retry.max_retries
                );
                tokio::time::sleep(delay).await;
                continue;
            }

            error!("API error: {} - {}", status, message);
            return Err(if status == StatusCode::TOO_MANY_REQUESTS {
                ExtractError::Quota {
                    retry_after_secs: wait.map(|d| d.as_secs()).unwrap_or(60),
                }
            } else {
                ExtractError::Api {
                    status_code: status.as_u16(),
                    message,
                }
            });
        }
    }
}

impl Extractor for GeminiExtractor {
    async fn document_to_markdown(
        &self,
        document: &[u8],
        mime_type: &str,
    ) -> Result<String, ExtractError> {
        let parts = vec![
            Part {
                text: Some(markdown_prompt().to_string()),
                inline_data: None,
            },
            Part {
                text: None,
                inline_data: Some(Blob {
                    mime_type: mime_type.to_string(),
                    data: STANDARD.encode(document),
                }),
            },
        ];
        let request = self.request(parts, "text/plain");
        self.generate(&request).await
    }

    async fn markdown_to_json(
        &self,
        markdown: &str,
        court_name: &str,
    ) -> Result<String, ExtractError> {
        let parts = vec![Part {
            text: Some(json_prompt(court_name, markdown)),
            inline_data: None,
        }];
        let request = self.request(parts, "application/json");
        self.generate(&request).await
    }
}
