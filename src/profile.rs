//! # Court Profile Module
//!
//! A court profile carries everything that differs between courts: where the
//! listing page lives, which keywords mark a cause list, and which document
//! types are accepted. The pipeline is generic and takes a profile instead of
//! being specialised per court.
//!
//! ## Key Components
//!
//! - `CourtProfile`: serde-loadable court configuration with a Delhi High Court default

use crate::error::{Error, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Placeholder substituted with the target date in `listing_url`
pub const DATE_PLACEHOLDER: &str = "{date}";

/// Court-specific configuration consumed by the classifier, fetcher and structurer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CourtProfile {
    /// Human readable court name
    pub name: String,

    /// Short court code, also the top-level data directory name
    pub code: String,

    /// Public website of the court
    pub website: String,

    /// Listing page URL, optionally containing `{date}`
    pub listing_url: String,

    /// chrono format used for `{date}` substitution
    pub date_format: String,

    /// Keywords that mark a link as a cause list
    pub positive_keywords: Vec<String>,

    /// Keywords that mark a link as administrative or navigation
    pub negative_keywords: Vec<String>,

    /// Accepted document extensions, lowercase with leading dot
    pub document_extensions: Vec<String>,

    /// Expected MIME type of target documents
    pub expected_mime: String,

    /// List type used when the document does not name one
    pub default_list_type: String,
}

impl Default for CourtProfile {
    fn default() -> Self {
        Self::delhi_high_court()
    }
}

impl CourtProfile {
    /// Delhi High Court daily cause lists
    pub fn delhi_high_court() -> Self {
        Self {
            name: "Delhi High Court".to_string(),
            code: "delhi_hc".to_string(),
            website: "https://delhihighcourt.nic.in".to_string(),
            listing_url: "https://delhihighcourt.nic.in/reports/cause_list/current".to_string(),
            date_format: "%d.%m.%Y".to_string(),
            positive_keywords: to_strings(&[
                "cause list",
                "causelist",
                "cause-list",
                "daily list",
                "daily-list",
                "dailylist",
                "court no",
                "court-no",
                "courtno",
                "court-wise",
                "courtwise",
                "daily cause list",
                "advance cause list",
                "supplementary cause list",
                "supplementary list",
                "case wise",
                "case-wise",
                "fir no wise",
                "fir-no-wise",
                "impugned order wise",
            ]),
            negative_keywords: to_strings(&[
                "help",
                "manual",
                "guide",
                "instruction",
                "rule",
                "notification",
                "circular",
                "notice",
                "vc rule",
                "video conferencing",
                "sop",
                "procedure",
                "portal",
                "login",
                "register",
                "sign in",
                "sign up",
                "feedback",
                "contact",
                "about",
                "faq",
                "disclaimer",
                "privacy",
                "terms",
                "conditions",
                "copyright",
            ]),
            document_extensions: vec![".pdf".to_string()],
            expected_mime: "application/pdf".to_string(),
            default_list_type: "Daily List".to_string(),
        }
    }

    /// Load a profile from a JSON file; absent fields take the Delhi defaults
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let profile: CourtProfile = serde_json::from_str(&raw)?;
        profile.validate()?;
        Ok(profile)
    }

    /// Check the fields the pipeline cannot run without
    pub fn validate(&self) -> Result<()> {
        if self.code.trim().is_empty() {
            return Err(Error::Config("court code must not be empty".to_string()));
        }
        if self.code.contains(['/', '\\']) || self.code.contains("..") {
            return Err(Error::Config(format!(
                "court code '{}' is not a valid directory name",
                self.code
            )));
        }
        url::Url::parse(&self.listing_url.replace(DATE_PLACEHOLDER, "01.01.2024")).map_err(|e| {
            Error::Config(format!("invalid listing_url '{}': {}", self.listing_url, e))
        })?;
        if self.document_extensions.is_empty() {
            return Err(Error::Config(
                "at least one document extension is required".to_string(),
            ));
        }
        Ok(())
    }

    /// Listing URL for a target date
    pub fn listing_url_for(&self, date: NaiveDate) -> String {
        if self.listing_url.contains(DATE_PLACEHOLDER) {
            self.listing_url
                .replace(DATE_PLACEHOLDER, &date.format(&self.date_format).to_string())
        } else {
            self.listing_url.clone()
        }
    }

    /// Whether the listing URL changes with the date
    pub fn is_dated_listing(&self) -> bool {
        self.listing_url.contains(DATE_PLACEHOLDER)
    }
}

fn to_strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}
