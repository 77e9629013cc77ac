//! Deterministic extractor for tests and offline runs
//!
//! By default the markdown pass echoes the document bytes as text and the
//! JSON pass returns an empty object. Either pass can be replaced by a
//! closure. Call counts are shared between clones.

use crate::extract::error::ExtractError;
use crate::extract::Extractor;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

type Responder = Arc<dyn Fn(&str) -> Result<String, ExtractError> + Send + Sync>;

/// Mock extractor with scripted responses
#[derive(Clone)]
pub struct MockExtractor {
    markdown: Responder,
    json: Responder,
    markdown_calls: Arc<AtomicUsize>,
    json_calls: Arc<AtomicUsize>,
}

impl Default for MockExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl MockExtractor {
    /// Echo markdown pass and empty-object JSON pass
    pub fn new() -> Self {
        Self {
            markdown: Arc::new(|text| Ok(text.to_string())),
            json: Arc::new(|_| Ok("{}".to_string())),
            markdown_calls: Arc::new(AtomicUsize::new(0)),
            json_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Replace the markdown pass; the closure receives the document as lossy UTF-8
    pub fn with_markdown<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) -> Result<String, ExtractError> + Send + Sync + 'static,
    {
        self.markdown = Arc::new(f);
        self
    }

    /// Replace the JSON pass; the closure receives the markdown
    pub fn with_json<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) -> Result<String, ExtractError> + Send + Sync + 'static,
    {
        self.json = Arc::new(f);
        self
    }

    /// Always answer the JSON pass with `response`
    pub fn with_json_response(self, response: impl Into<String>) -> Self {
        let response = response.into();
        self.with_json(move |_| Ok(response.clone()))
    }

    /// Number of markdown calls made
    pub fn markdown_calls(&self) -> usize {
        self.markdown_calls.load(Ordering::SeqCst)
    }

    /// Number of JSON calls made
    pub fn json_calls(&self) -> usize {
        self.json_calls.load(Ordering::SeqCst)
    }
}

impl Extractor for MockExtractor {
    async fn document_to_markdown(
        &self,
        document: &[u8],
        _mime_type: &str,
    ) -> Result<String, ExtractError> {
        self.markdown_calls.fetch_add(1, Ordering::SeqCst);
        (self.markdown)(&String::from_utf8_lossy(document))
    }

    async fn markdown_to_json(
        &self,
        markdown: &str,
        _court_name: &str,
    ) -> Result<String, ExtractError> {
        self.json_calls.fetch_add(1, Ordering::SeqCst);
        (self.json)(markdown)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_default_echoes_document() {
        let mock = MockExtractor::new();
        let markdown = mock
            .document_to_markdown(b"COURT NO. 4", "application/pdf")
            .await
            .unwrap();
        assert_eq!(markdown, "COURT NO. 4");
        assert_eq!(mock.markdown_to_json(&markdown, "Court").await.unwrap(), "{}");
        assert_eq!(mock.markdown_calls(), 1);
        assert_eq!(mock.json_calls(), 1);
    }

    #[tokio::test]
    async fn test_scripted_failure() {
        let mock = MockExtractor::new().with_json(|_| Err(ExtractError::Timeout));
        let clone = mock.clone();
        assert!(matches!(
            clone.markdown_to_json("x", "Court").await,
            Err(ExtractError::Timeout)
        ));
        assert_eq!(mock.json_calls(), 1);
    }
}
