//! Error types for the extraction capability

use crate::error::Error as CrateError;
use thiserror::Error;

/// Error type for extraction calls
#[derive(Debug, Error)]
pub enum ExtractError {
    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with an error status
    #[error("API error: {status_code} - {message}")]
    Api {
        /// HTTP status code
        status_code: u16,
        /// Error message
        message: String,
    },

    /// Quota or rate limit exhausted after retries
    #[error("Quota exceeded. Please retry after {retry_after_secs} seconds")]
    Quota {
        /// Seconds the service asked us to wait
        retry_after_secs: u64,
    },

    /// The call exceeded its timeout
    #[error("Extraction timed out")]
    Timeout,

    /// The service returned no usable text
    #[error("Empty response: {0}")]
    EmptyResponse(String),

    /// Filesystem error reading the document
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Missing or invalid configuration
    #[error("Config error: {0}")]
    Config(String),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl From<ExtractError> for CrateError {
    fn from(err: ExtractError) -> Self {
        match err {
            ExtractError::Http(e) => CrateError::Http(e),
            ExtractError::Api {
                status_code,
                message,
            } => CrateError::Api {
                status_code,
                message,
            },
            ExtractError::Quota { retry_after_secs } => CrateError::RateLimit { retry_after_secs },
            ExtractError::Config(msg) => CrateError::Config(msg),
            _ => CrateError::Extract(err.to_string()),
        }
    }
}
