//! Run reports and per-date metadata
//!
//! Each target date produces a `DateReport` holding the state the date ended
//! in, the per-stage counts and one `DocumentOutcome` per selected link. The
//! report is written as `metadata.json` into the date directory.

use crate::classifier::Classification;
use crate::fetcher::layout::METADATA_FILE;
use crate::fetcher::{DownloadRecord, ListingLink};
use crate::tagging::TaggingSummary;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// States of the per-date state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Stage {
    Discover,
    Filter,
    Download,
    Structure,
    Store,
    Done,
    Failed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Discover => "DISCOVER",
            Stage::Filter => "FILTER",
            Stage::Download => "DOWNLOAD",
            Stage::Structure => "STRUCTURE",
            Stage::Store => "STORE",
            Stage::Done => "DONE",
            Stage::Failed => "FAILED",
        };
        f.write_str(name)
    }
}

/// What happened to one document
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DocumentOutcome {
    pub url: Option<String>,
    pub link_text: Option<String>,
    pub confidence: Option<f64>,
    pub reason: Option<String>,
    pub filename: Option<String>,
    pub path: Option<PathBuf>,
    pub sha256: Option<String>,
    pub content_type: Option<String>,
    pub content_length: Option<u64>,
    pub last_modified: Option<String>,
    pub downloaded_at: Option<DateTime<Utc>>,
    pub reused: bool,
    /// Last stage this document entered
    pub stage: Option<Stage>,
    /// Why the document was not processed further, when not an error
    pub skipped: Option<String>,
    pub error: Option<String>,
    pub list_date: Option<NaiveDate>,
    pub bench: Option<String>,
    pub cases_extracted: usize,
    pub cases_stored: usize,
}

impl DocumentOutcome {
    /// A selected link with its classification
    pub fn selected(link: &ListingLink, verdict: &Classification) -> Self {
        Self {
            url: Some(link.url.clone()),
            link_text: Some(link.text.clone()),
            confidence: Some(verdict.confidence),
            reason: Some(verdict.reason.clone()),
            content_type: link.content_type.clone(),
            stage: Some(Stage::Download),
            ..Default::default()
        }
    }

    /// A document already on disk
    pub fn existing(path: &Path) -> Self {
        Self {
            filename: path.file_name().map(|n| n.to_string_lossy().into_owned()),
            path: Some(path.to_path_buf()),
            reused: true,
            stage: Some(Stage::Download),
            ..Default::default()
        }
    }

    /// Fill in the download record
    pub fn with_record(mut self, record: &DownloadRecord) -> Self {
        self.url = Some(record.url.clone());
        self.filename = Some(record.filename.clone());
        self.path = Some(record.path.clone());
        self.sha256 = Some(record.sha256.clone());
        if record.content_type.is_some() {
            self.content_type = record.content_type.clone();
        }
        self.content_length = record.content_length;
        self.last_modified = record.last_modified.clone();
        self.downloaded_at = Some(record.downloaded_at);
        self.reused = record.reused;
        self
    }

    /// Mark as not processed further
    pub fn skip(mut self, reason: impl Into<String>) -> Self {
        self.skipped = Some(reason.into());
        self
    }

    /// Record a failure at `stage`
    pub fn fail(&mut self, stage: Stage, error: impl Into<String>) {
        self.stage = Some(stage);
        self.error = Some(error.into());
    }

    /// Has a local file and no failure or skip so far
    pub fn is_usable(&self) -> bool {
        self.path.is_some() && self.error.is_none() && self.skipped.is_none()
    }
}

/// Per-stage document counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StageCounts {
    /// Links found on the listing page
    pub discovered: usize,
    /// Links selected by the classifier
    pub candidates: usize,
    /// Documents on disk after the download stage, new or reused
    pub downloaded: usize,
    /// Links skipped as already seen or duplicate content
    pub duplicates: usize,
    pub structured: usize,
    pub persisted: usize,
    pub failures: usize,
    pub persist_attempts: usize,
    pub persist_failures: usize,
}

impl StageCounts {
    fn add(&mut self, other: &StageCounts) {
        self.discovered += other.discovered;
        self.candidates += other.candidates;
        self.downloaded += other.downloaded;
        self.duplicates += other.duplicates;
        self.structured += other.structured;
        self.persisted += other.persisted;
        self.failures += other.failures;
        self.persist_attempts += other.persist_attempts;
        self.persist_failures += other.persist_failures;
    }
}

/// Report for one target date
#[derive(Debug, Clone, Serialize)]
pub struct DateReport {
    pub date: NaiveDate,
    pub court: String,
    pub listing_url: Option<String>,
    pub stage: Stage,
    pub error: Option<String>,
    pub counts: StageCounts,
    pub documents: Vec<DocumentOutcome>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl DateReport {
    pub fn new(date: NaiveDate, court: impl Into<String>) -> Self {
        Self {
            date,
            court: court.into(),
            listing_url: None,
            stage: Stage::Discover,
            error: None,
            counts: StageCounts::default(),
            documents: Vec::new(),
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    /// Move to the next state
    pub fn advance(&mut self, stage: Stage) {
        info!("{} {}: {} -> {}", self.court, self.date, self.stage, stage);
        self.stage = stage;
    }

    /// Terminate in `FAILED`
    pub fn fail(&mut self, error: impl Into<String>) {
        let error = error.into();
        error!("{} {} failed in {}: {}", self.court, self.date, self.stage, error);
        self.stage = Stage::Failed;
        self.error = Some(error);
        self.finished_at = Some(Utc::now());
    }

    /// Terminate in `DONE`
    pub fn finish(&mut self) {
        self.advance(Stage::Done);
        self.finished_at = Some(Utc::now());
    }

    /// Recount download-stage totals from the document outcomes
    pub fn count_downloads(&mut self) {
        self.counts.downloaded = self.documents.iter().filter(|d| d.is_usable()).count();
        self.counts.duplicates = self
            .documents
            .iter()
            .filter(|d| d.skipped.is_some())
            .count();
        self.counts.failures = self.documents.iter().filter(|d| d.error.is_some()).count();
    }

    /// Write the report as `metadata.json` into `dir`
    pub async fn write_metadata(&self, dir: &Path) -> std::io::Result<PathBuf> {
        tokio::fs::create_dir_all(dir).await?;
        let path = dir.join(METADATA_FILE);
        let json = serde_json::to_string_pretty(self)?;
        tokio::fs::write(&path, json).await?;
        Ok(path)
    }
}

/// Report for a whole run across dates
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub dates: Vec<DateReport>,
    pub tagging: Option<TaggingSummary>,
}

impl RunReport {
    /// Counts summed over every date
    pub fn totals(&self) -> StageCounts {
        let mut totals = StageCounts::default();
        for date in &self.dates {
            totals.add(&date.counts);
        }
        totals
    }

    /// Some date ended in `FAILED`
    pub fn has_failed_date(&self) -> bool {
        self.dates.iter().any(|d| d.stage == Stage::Failed)
    }

    /// Persisting was attempted and never succeeded
    pub fn storage_unavailable(&self) -> bool {
        let totals = self.totals();
        totals.persist_attempts > 0 && totals.persist_failures == totals.persist_attempts
    }

    /// Whether the run should exit successfully
    pub fn is_success(&self) -> bool {
        !self.has_failed_date() && !self.storage_unavailable()
    }

    /// Log the end-of-run summary
    pub fn log_summary(&self) {
        for date in &self.dates {
            let c = &date.counts;
            info!(
                "{} {}: {} | discovered {} | candidates {} | downloaded {} | duplicates {} | structured {} | persisted {} | failures {}",
                date.court,
                date.date,
                date.stage,
                c.discovered,
                c.candidates,
                c.downloaded,
                c.duplicates,
                c.structured,
                c.persisted,
                c.failures
            );
        }
        let t = self.totals();
        info!(
            "Run complete: {} dates, discovered {}, downloaded {}, structured {}, persisted {}, failures {}",
            self.dates.len(),
            t.discovered,
            t.downloaded,
            t.structured,
            t.persisted,
            t.failures
        );
        if self.storage_unavailable() {
            warn!(
                "Every persist call failed ({} attempts); storage looks unavailable",
                t.persist_attempts
            );
        }
    }
}
