//! Error types for the fetcher module

use crate::error::Error as CrateError;
use thiserror::Error;

/// Error type for listing and document fetches
#[derive(Debug, Error)]
pub enum FetchError {
    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-retryable status code
    #[error("{url} returned status {status}")]
    Status {
        /// Requested URL
        url: String,
        /// HTTP status code
        status: u16,
    },

    /// Transient failures persisted past the retry budget
    #[error("{url} failed after {attempts} attempts (last status: {last_status})")]
    RetriesExhausted {
        /// Requested URL
        url: String,
        /// Attempts made, including the first
        attempts: u32,
        /// Last status code or transport error seen
        last_status: String,
    },

    /// Listing page did not return HTML
    #[error("{url} is not an HTML page (content type: {content_type})")]
    NotHtml {
        /// Requested URL
        url: String,
        /// Content type returned
        content_type: String,
    },

    /// URL parsing error
    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// Filesystem error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl From<FetchError> for CrateError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::Http(e) => CrateError::Http(e),
            FetchError::Io(e) => CrateError::Io(e),
            _ => CrateError::Fetch(err.to_string()),
        }
    }
}
