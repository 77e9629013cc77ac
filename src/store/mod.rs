//! # Repository Module
//!
//! Idempotent persistence of structured cause lists into a libsql database
//! with the normalized schema court → bench → cause list → case → tags.
//!
//! ## Key Components
//!
//! - `Repository`: natural-key upserts and read views
//! - `NewCase`: the insert shape of a case
//! - `CauseListView` / `CaseView`: read views serialized with camelCase keys
//! - `DbError`: repository failures
//!
//! ## Features
//!
//! - Every write is a single parameterized upsert keyed by the schema's
//!   uniqueness constraints, so re-ingesting a document creates no new rows
//! - Cause-list URL and path are coalesced, never overwritten with null
//! - Case rows are first-write-wins; tags attach only on first insert and
//!   per-tag failures are logged and skipped

mod database;
pub mod error;
mod schema;

pub use database::Repository;
pub use error::DbError;

use crate::structurer::ExtractedCase;
use serde::Serialize;

/// A case to insert under a cause list
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewCase {
    pub case_number: String,
    pub title: Option<String>,
    pub item_number: Option<String>,
    pub file_number: Option<String>,
    pub petitioner_adv: Option<String>,
    pub respondent_adv: Option<String>,
    pub tags: Vec<String>,
}

impl NewCase {
    /// A case with only its number set
    pub fn new(case_number: impl Into<String>) -> Self {
        Self {
            case_number: case_number.into(),
            ..Default::default()
        }
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }
}

impl From<&ExtractedCase> for NewCase {
    fn from(case: &ExtractedCase) -> Self {
        Self {
            case_number: case.case_number.clone(),
            title: case.title.clone(),
            item_number: case.item_number.clone(),
            file_number: case.file_number.clone(),
            petitioner_adv: case.petitioner_adv.clone(),
            respondent_adv: case.respondent_adv.clone(),
            tags: case.tags.clone(),
        }
    }
}

/// A cause list with its bench and cases
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CauseListView {
    pub id: i64,
    #[serde(rename = "courtNo")]
    pub bench_label: String,
    pub judges: Option<String>,
    pub list_date: String,
    pub list_type: String,
    pub pdf_url: Option<String>,
    pub pdf_path: Option<String>,
    pub cases: Vec<CaseView>,
}

/// A case with its sorted tag names
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseView {
    pub id: i64,
    pub case_number: String,
    pub title: Option<String>,
    pub item_number: Option<String>,
    pub file_number: Option<String>,
    pub petitioner_adv: Option<String>,
    pub respondent_adv: Option<String>,
    pub tags: Vec<String>,
}

/// Tag name with the number of cases carrying it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagCount {
    pub name: String,
    pub count: i64,
}

/// Row counts per table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableCounts {
    pub courts: i64,
    pub benches: i64,
    pub cause_lists: i64,
    pub cases: i64,
    pub tags: i64,
    pub case_tags: i64,
}

/// Case fields read by the auto-tagger
#[derive(Debug, Clone, PartialEq)]
pub struct TaggableCase {
    pub id: i64,
    pub case_number: String,
    pub title: Option<String>,
}

/// Trim, collapse whitespace and uppercase a bench label
pub fn normalize_bench_label(label: &str) -> String {
    collapse_whitespace(label).to_uppercase()
}

/// Trim, collapse whitespace and lowercase a tag name
pub fn normalize_tag(name: &str) -> String {
    collapse_whitespace(name).to_lowercase()
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalization() {
        assert_eq!(normalize_bench_label("  court  no. 4 "), "COURT NO. 4");
        assert_eq!(normalize_tag(" Writ   Petition "), "writ petition");
        assert_eq!(normalize_tag("   "), "");
    }

    #[test]
    fn test_new_case_from_extracted() {
        let extracted = ExtractedCase {
            case_number: "FAO 1/2024".to_string(),
            title: Some("A Vs. B".to_string()),
            tags: vec!["appeal".to_string()],
            petitioner: Some("A".to_string()),
            ..Default::default()
        };
        let case = NewCase::from(&extracted);
        assert_eq!(case.case_number, "FAO 1/2024");
        assert_eq!(case.title.as_deref(), Some("A Vs. B"));
        assert_eq!(case.tags, vec!["appeal"]);
    }
}
