//! # Link Classifier Module
//!
//! Decides whether a hyperlink found on a listing page points at a cause list.
//! Classification is an ordered decision list rather than a weighted score:
//! the first rule that fires determines the verdict, its confidence and a
//! human readable reason.
//!
//! ## Key Components
//!
//! - `LinkClassifier`: keyword and pattern rules built from a `CourtProfile`
//! - `Classification`: the `(is_target, confidence, reason)` verdict
//! - `Rule`: which rule produced a verdict
//!
//! ## Rule order
//!
//! 1. negative keyword in anchor text (0.9), then in the URL path (0.8)
//! 2. positive keyword in anchor text (0.9), then in the URL path (0.8)
//! 3. extension not an accepted document type (0.7)
//! 4. supplied content type outside the expected MIME family (0.8)
//! 5. date-shaped substring in URL path or anchor text (0.7)
//! 6. filename containing 8+ digits (0.6 when purely numeric, else 0.5)
//! 7. no clear indicators (0.3)

use crate::profile::CourtProfile;
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;
use tracing::debug;

static DATE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\d{1,2}[-_.]\d{1,2}[-_.]\d{2,4}|\d{2,4}[-_.]\d{1,2}[-_.]\d{1,2}").unwrap()
});

static LONG_NUMBER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d{8,}").unwrap());

/// Rule of the decision list that produced a verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Rule {
    NegativeText,
    NegativePath,
    PositiveText,
    PositivePath,
    Extension,
    ContentType,
    DatePattern,
    NumericFilename,
    NoIndicators,
}

/// Verdict for a single link
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Classification {
    pub is_target: bool,
    pub confidence: f64,
    pub reason: String,
    pub rule: Rule,
}

impl Classification {
    fn accept(confidence: f64, rule: Rule, reason: impl Into<String>) -> Self {
        Self {
            is_target: true,
            confidence,
            reason: reason.into(),
            rule,
        }
    }

    fn reject(confidence: f64, rule: Rule, reason: impl Into<String>) -> Self {
        Self {
            is_target: false,
            confidence,
            reason: reason.into(),
            rule,
        }
    }

    /// Accepted with at least the given confidence
    pub fn passes(&self, threshold: f64) -> bool {
        self.is_target && self.confidence >= threshold
    }
}

/// Heuristic cause-list link classifier
#[derive(Debug, Clone)]
pub struct LinkClassifier {
    positive: Vec<String>,
    negative: Vec<String>,
    extensions: Vec<String>,
    expected_mime: String,
}

impl LinkClassifier {
    /// Build a classifier from a court profile's keyword lists
    pub fn new(profile: &CourtProfile) -> Self {
        Self {
            positive: lowercase_all(&profile.positive_keywords),
            negative: lowercase_all(&profile.negative_keywords),
            extensions: lowercase_all(&profile.document_extensions),
            expected_mime: profile.expected_mime.to_lowercase(),
        }
    }

    /// Classify a link by URL, anchor text and optional content type.
    ///
    /// Pure: identical inputs always give identical verdicts.
    pub fn classify(&self, url: &str, text: &str, content_type: Option<&str>) -> Classification {
        let verdict = self.decide(url, text, content_type);
        debug!(
            url,
            is_target = verdict.is_target,
            confidence = verdict.confidence,
            "{}",
            verdict.reason
        );
        verdict
    }

    fn decide(&self, url: &str, text: &str, content_type: Option<&str>) -> Classification {
        let text = text.to_lowercase();
        let (path, query) = split_url(url);
        let path_lower = path.to_lowercase();

        if let Some(keyword) = find_keyword(&self.negative, &text) {
            return Classification::reject(
                0.9,
                Rule::NegativeText,
                format!("Title contains non-cause list keyword: {}", keyword),
            );
        }
        if let Some(keyword) = find_keyword(&self.negative, &path_lower) {
            return Classification::reject(
                0.8,
                Rule::NegativePath,
                format!("URL path contains non-cause list keyword: {}", keyword),
            );
        }

        if let Some(keyword) = find_keyword(&self.positive, &text) {
            return Classification::accept(
                0.9,
                Rule::PositiveText,
                format!("Title contains cause list keyword: {}", keyword),
            );
        }
        if let Some(keyword) = find_keyword(&self.positive, &path_lower) {
            return Classification::accept(
                0.8,
                Rule::PositivePath,
                format!("URL path contains cause list keyword: {}", keyword),
            );
        }

        let filename = path.rsplit('/').next().unwrap_or_default();
        let (stem, extension) = split_extension(filename);
        let extension = extension.to_lowercase();
        if !self.extensions.iter().any(|e| *e == extension) {
            let shown = if extension.is_empty() { "(none)" } else { extension.as_str() };
            return Classification::reject(
                0.7,
                Rule::Extension,
                format!("Not an accepted document type: {}", shown),
            );
        }

        if let Some(content_type) = content_type.filter(|c| !c.trim().is_empty()) {
            if !content_type.to_lowercase().contains(&self.expected_mime) {
                return Classification::reject(
                    0.8,
                    Rule::ContentType,
                    format!("Unexpected content type: {}", content_type),
                );
            }
        }

        if DATE_PATTERN.is_match(path) || DATE_PATTERN.is_match(query) || DATE_PATTERN.is_match(&text) {
            return Classification::accept(0.7, Rule::DatePattern, "Contains date pattern");
        }

        if LONG_NUMBER.is_match(filename) {
            if !stem.is_empty() && stem.chars().all(|c| c.is_ascii_digit()) {
                return Classification::accept(
                    0.6,
                    Rule::NumericFilename,
                    "Document with numeric-only filename",
                );
            }
            return Classification::accept(
                0.5,
                Rule::NumericFilename,
                "Document with numeric ID in filename",
            );
        }

        Classification::reject(0.3, Rule::NoIndicators, "No clear indicators")
    }
}

fn lowercase_all(values: &[String]) -> Vec<String> {
    values.iter().map(|v| v.trim().to_lowercase()).filter(|v| !v.is_empty()).collect()
}

fn find_keyword<'a>(keywords: &'a [String], haystack: &str) -> Option<&'a str> {
    keywords
        .iter()
        .find(|k| haystack.contains(k.as_str()))
        .map(String::as_str)
}

/// Split a URL into its path and query, ignoring scheme and host.
/// Relative URLs are treated as a bare path.
fn split_url(url: &str) -> (&str, &str) {
    let without_fragment = url.split('#').next().unwrap_or_default();
    let (before_query, query) = match without_fragment.split_once('?') {
        Some((before, query)) => (before, query),
        None => (without_fragment, ""),
    };
    let path = match before_query.split_once("://") {
        Some((_, rest)) => rest.find('/').map(|i| &rest[i..]).unwrap_or(""),
        None => before_query,
    };
    (path, query)
}

/// Split a filename into stem and extension (with leading dot)
fn split_extension(filename: &str) -> (&str, &str) {
    match filename.rfind('.') {
        Some(i) if i > 0 => (&filename[..i], &filename[i..]),
        _ => (filename, ""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> LinkClassifier {
        LinkClassifier::new(&CourtProfile::default())
    }

    #[test]
    fn test_positive_keyword_in_text() {
        let result = classifier().classify(
            "https://delhihighcourt.nic.in/files/CL_12062024.pdf",
            "Cause List 12.06.2024.pdf",
            None,
        );
        assert!(result.is_target);
        assert_eq!(result.confidence, 0.9);
        assert_eq!(result.rule, Rule::PositiveText);
    }

    #[test]
    fn test_negative_keyword_in_text() {
        let result = classifier().classify(
            "https://delhihighcourt.nic.in/files/vc.pdf",
            "Video Conferencing SOP.pdf",
            None,
        );
        assert!(!result.is_target);
        assert_eq!(result.confidence, 0.9);
        assert_eq!(result.rule, Rule::NegativeText);
    }

    #[test]
    fn test_negative_beats_positive_in_text() {
        let result = classifier().classify(
            "https://delhihighcourt.nic.in/files/a.pdf",
            "Notice regarding cause list",
            None,
        );
        assert!(!result.is_target);
        assert_eq!(result.rule, Rule::NegativeText);
    }

    #[test]
    fn test_negative_keyword_in_path_only() {
        let result = classifier().classify(
            "https://delhihighcourt.nic.in/circular/2024/a.pdf",
            "Download",
            None,
        );
        assert!(!result.is_target);
        assert_eq!(result.confidence, 0.8);
        assert_eq!(result.rule, Rule::NegativePath);
    }

    #[test]
    fn test_host_is_not_part_of_path() {
        // "portal" only appears in the host
        let result = classifier().classify("https://portal.court.example/12345678.pdf", "", None);
        assert_eq!(result.rule, Rule::NumericFilename);
    }

    #[test]
    fn test_positive_keyword_in_path() {
        let result = classifier().classify(
            "https://delhihighcourt.nic.in/causelist/court1.pdf",
            "Court 1",
            None,
        );
        assert!(result.is_target);
        assert_eq!(result.confidence, 0.8);
    }

    #[test]
    fn test_non_document_extension() {
        let result = classifier().classify("https://delhihighcourt.nic.in/page.html", "Home", None);
        assert!(!result.is_target);
        assert_eq!(result.confidence, 0.7);
        assert_eq!(result.rule, Rule::Extension);
    }

    #[test]
    fn test_content_type_mismatch() {
        let result = classifier().classify(
            "https://delhihighcourt.nic.in/files/12.06.2024.pdf",
            "Download",
            Some("text/html; charset=utf-8"),
        );
        assert!(!result.is_target);
        assert_eq!(result.confidence, 0.8);
        assert_eq!(result.rule, Rule::ContentType);
    }

    #[test]
    fn test_date_pattern() {
        let result = classifier().classify(
            "https://delhihighcourt.nic.in/files/12.06.2024.pdf",
            "Download",
            Some("application/pdf"),
        );
        assert!(result.is_target);
        assert_eq!(result.confidence, 0.7);
        assert_eq!(result.rule, Rule::DatePattern);
    }

    #[test]
    fn test_numeric_filenames() {
        let c = classifier();
        let numeric = c.classify("http://127.0.0.1:8080/files/2024061200.pdf", "", None);
        assert!(numeric.is_target);
        assert_eq!(numeric.confidence, 0.6);

        let mixed = c.classify("http://127.0.0.1:8080/files/doc2024061200x.pdf", "", None);
        assert!(mixed.is_target);
        assert_eq!(mixed.confidence, 0.5);
    }

    #[test]
    fn test_no_indicators() {
        let result = classifier().classify("https://delhihighcourt.nic.in/files/x.pdf", "Download", None);
        assert!(!result.is_target);
        assert_eq!(result.confidence, 0.3);
        assert_eq!(result.reason, "No clear indicators");
    }

    #[test]
    fn test_classification_is_deterministic() {
        let c = classifier();
        let inputs = [
            ("https://a.example/files/12.06.2024.pdf", "Daily List", None),
            ("https://a.example/help.pdf", "Help", None),
            ("/relative/123456789.pdf", "", Some("application/pdf")),
        ];
        for (url, text, ct) in inputs {
            assert_eq!(c.classify(url, text, ct), c.classify(url, text, ct));
        }
    }

    #[test]
    fn test_thresholds() {
        let verdict = classifier().classify("https://a.example/files/abc12345678.pdf", "", None);
        assert!(verdict.passes(0.5));
        assert!(!verdict.passes(0.7));
    }

    #[test]
    fn test_split_url() {
        assert_eq!(split_url("https://a.example/x/y.pdf?d=1#top"), ("/x/y.pdf", "d=1"));
        assert_eq!(split_url("https://a.example"), ("", ""));
        assert_eq!(split_url("files/y.pdf"), ("files/y.pdf", ""));
    }
}
