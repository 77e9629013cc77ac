//! Error types for the docket crate

use thiserror::Error;

/// Result type for docket operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for docket operations
#[derive(Debug, Error)]
pub enum Error {
    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Filesystem error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Remote API returned an error response
    #[error("API error: {status_code} - {message}")]
    Api {
        /// HTTP status code
        status_code: u16,
        /// Error message
        message: String,
    },

    /// Rate limit exceeded
    #[error("Rate limit exceeded. Please retry after {retry_after_secs} seconds")]
    RateLimit {
        /// Seconds to wait before retrying
        retry_after_secs: u64,
    },

    /// Listing or document fetch error
    #[error("Fetch error: {0}")]
    Fetch(String),

    /// External extraction error
    #[error("Extract error: {0}")]
    Extract(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// Invalid configuration
    #[error("Config error: {0}")]
    Config(String),
}
