//! # Document Structurer Module
//!
//! Turns a downloaded cause-list document into a structured record of court,
//! bench and cases using the two-pass extraction capability.
//!
//! ## Key Components
//!
//! - `Structurer`: runs the markdown pass and the JSON pass for one document
//! - `StructuredDoc` / `ExtractedCase`: the typed shape of an extraction
//! - `parse_extraction_response`: lenient parsing with named repairs
//! - `derive_list_date`: list-date derivation with logged fallbacks
//!
//! ## Features
//!
//! - Markdown and JSON companions written next to the document and reused on
//!   later runs
//! - Malformed JSON-pass output is repaired or replaced by a manual pass over
//!   the markdown; a document fails only when no case can be recovered
//! - Failures are returned as values naming the file and stage, never raised

pub mod dates;
pub mod manual;
pub mod parse;

pub use dates::{DateSource, derive_list_date};
pub use parse::{ParseIssue, Parsed, Repair, UNKNOWN, parse_extraction_response};

use crate::extract::Extractor;
use crate::fetcher::layout;
use crate::profile::CourtProfile;
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

/// A case as extracted from a cause list
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExtractedCase {
    pub case_number: String,
    pub title: Option<String>,
    pub tags: Vec<String>,
    pub item_number: Option<String>,
    pub file_number: Option<String>,
    pub cause_list: Option<String>,
    pub petitioner_adv: Option<String>,
    pub respondent_adv: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub petitioner: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub respondent: Option<String>,
}

/// The structured content of one cause-list document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructuredDoc {
    /// Court name
    pub court: String,

    /// Court/bench number label, e.g. `COURT NO. 4`
    #[serde(rename = "courtNo")]
    pub bench_label: String,

    /// Free-text judge names
    #[serde(rename = "bench")]
    pub judges: String,

    pub cases: Vec<ExtractedCase>,
}

impl StructuredDoc {
    /// First list type named by a case, else `default`
    pub fn list_type(&self, default: &str) -> String {
        self.cases
            .iter()
            .filter_map(|c| c.cause_list.as_deref())
            .map(str::trim)
            .find(|t| !t.is_empty())
            .unwrap_or(default)
            .to_string()
    }

    /// Judges, unless missing or the `UNKNOWN` placeholder
    pub fn judges_opt(&self) -> Option<&str> {
        let judges = self.judges.trim();
        (!judges.is_empty() && !judges.eq_ignore_ascii_case(UNKNOWN)).then_some(judges)
    }
}

/// A successfully structured document
#[derive(Debug, Clone)]
pub struct Structured {
    pub doc: StructuredDoc,
    pub list_date: NaiveDate,
    pub date_source: DateSource,
    pub repairs: Vec<Repair>,
    pub markdown_path: PathBuf,
    pub json_path: PathBuf,
    /// Both extraction passes were skipped in favour of an existing `.json`
    pub reused_companion: bool,
}

/// Stage at which structuring a document failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StructureStage {
    Read,
    Markdown,
    Json,
}

impl fmt::Display for StructureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stage = match self {
            StructureStage::Read => "read",
            StructureStage::Markdown => "markdown",
            StructureStage::Json => "json",
        };
        f.write_str(stage)
    }
}

/// A document that could not be structured
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{stage} stage failed for {}: {message}", .file.display())]
pub struct StructureFailure {
    pub file: PathBuf,
    pub stage: StructureStage,
    pub message: String,
}

impl StructureFailure {
    fn new(file: &Path, stage: StructureStage, message: impl Into<String>) -> Self {
        Self {
            file: file.to_path_buf(),
            stage,
            message: message.into(),
        }
    }
}


/// Two-pass document structurer
pub struct Structurer<E> {
    extractor: E,
    court_name: String,
    expected_mime: String,
    reuse_companions: bool,
}

impl<E: Extractor> Structurer<E> {
    /// Create a structurer for the court described by `profile`
    pub fn new(extractor: E, profile: &CourtProfile) -> Self {
        Self {
            extractor,
            court_name: profile.name.clone(),
            expected_mime: profile.expected_mime.clone(),
            reuse_companions: true,
        }
    }

    /// Whether existing `.md`/`.json` companions short-cut extraction
    pub fn reuse_companions(mut self, reuse: bool) -> Self {
        self.reuse_companions = reuse;
        self
    }

    /// The underlying extractor
    pub fn extractor(&self) -> &E {
        &self.extractor
    }

    /// Structure one document
    #[instrument(skip(self), fields(file = %document.display()))]
    pub async fn structure(&self, document: &Path) -> Result<Structured, StructureFailure> {
        let markdown_path = layout::markdown_path(document);
        let json_path = layout::json_path(document);

        if self.reuse_companions {
            if let Some(structured) = self.from_companions(document, &markdown_path, &json_path).await
            {
                return Ok(structured);
            }
        }

        let markdown = self.markdown_for(document, &markdown_path).await?;

        let parsed = match self.extractor.markdown_to_json(&markdown, &self.court_name).await {
            Ok(raw) => match parse_extraction_response(&raw, &markdown, &self.court_name) {
                Ok(parsed) => parsed,
                Err(issue) => {
                    warn!(
                        file = %document.display(),
                        stage = %StructureStage::Json,
                        "Unusable extraction response ({}); falling back to markdown",
                        issue
                    );
                    parse::parse_from_text(&markdown, &self.court_name)
                }
            },
            Err(e) => {
                warn!(
                    file = %document.display(),
                    stage = %StructureStage::Json,
                    "JSON extraction failed ({}); falling back to markdown",
                    e
                );
                parse::parse_from_text(&markdown, &self.court_name)
            }
        };

        if !parsed.repairs.is_empty() {
            debug!("Repairs for {}: {:?}", document.display(), parsed.repairs);
        }
        if parsed.doc.cases.is_empty() {
            return Err(StructureFailure::new(
                document,
                StructureStage::Json,
                "no cases could be extracted",
            ));
        }

        match serde_json::to_string_pretty(&parsed.doc) {
            Ok(json) => {
                if let Err(e) = tokio::fs::write(&json_path, json).await {
                    warn!("Failed to write {}: {}", json_path.display(), e);
                }
            }
            Err(e) => warn!("Failed to serialize {}: {}", json_path.display(), e),
        }

        let (list_date, date_source) =
            derive_list_date(document, Some(&markdown), Local::now().date_naive());

        info!(
            "Structured {} with {} cases",
            document.display(),
            parsed.doc.cases.len()
        );

        Ok(Structured {
            doc: parsed.doc,
            list_date,
            date_source,
            repairs: parsed.repairs,
            markdown_path,
            json_path,
            reused_companion: false,
        })
    }

    async fn from_companions(
        &self,
        document: &Path,
        markdown_path: &Path,
        json_path: &Path,
    ) -> Option<Structured> {
        let json = tokio::fs::read_to_string(json_path).await.ok()?;
        let markdown = tokio::fs::read_to_string(markdown_path).await.ok();
        let source = markdown.as_deref().unwrap_or_default();

        let parsed = match parse_extraction_response(&json, source, &self.court_name) {
            Ok(parsed) if !parsed.doc.cases.is_empty() => parsed,
            _ => {
                debug!("Ignoring unusable companion {}", json_path.display());
                return None;
            }
        };

        debug!("Reusing companion {}", json_path.display());
        let (list_date, date_source) =
            derive_list_date(document, markdown.as_deref(), Local::now().date_naive());

        Some(Structured {
            doc: parsed.doc,
            list_date,
            date_source,
            repairs: parsed.repairs,
            markdown_path: markdown_path.to_path_buf(),
            json_path: json_path.to_path_buf(),
            reused_companion: true,
        })
    }

    async fn markdown_for(
        &self,
        document: &Path,
        markdown_path: &Path,
    ) -> Result<String, StructureFailure> {
        if self.reuse_companions {
            if let Ok(existing) = tokio::fs::read_to_string(markdown_path).await {
                if !existing.trim().is_empty() {
                    debug!("Reusing companion {}", markdown_path.display());
                    return Ok(existing);
                }
            }
        }

        let bytes = tokio::fs::read(document)
            .await
            .map_err(|e| StructureFailure::new(document, StructureStage::Read, e.to_string()))?;

        let raw = self
            .extractor
            .document_to_markdown(&bytes, self.mime_for(document))
            .await
            .map_err(|e| {
                warn!(
                    file = %document.display(),
                    stage = %StructureStage::Markdown,
                    "Markdown extraction failed: {}",
                    e
                );
                StructureFailure::new(document, StructureStage::Markdown, e.to_string())
            })?;

        let markdown = clean_markdown(&raw);
        if markdown.is_empty() {
            warn!(
                file = %document.display(),
                stage = %StructureStage::Markdown,
                "Markdown extraction returned no text"
            );
            return Err(StructureFailure::new(
                document,
                StructureStage::Markdown,
                "empty markdown",
            ));
        }

        if let Err(e) = tokio::fs::write(markdown_path, &markdown).await {
            warn!("Failed to write {}: {}", markdown_path.display(), e);
        }
        Ok(markdown)
    }

    fn mime_for(&self, document: &Path) -> &str {
        let extension = document
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();
        match extension.as_str() {
            "pdf" => "application/pdf",
            "html" | "htm" => "text/html",
            "txt" => "text/plain",
            _ => &self.expected_mime,
        }
    }
}

/// Strip code fences and assistant preambles from a markdown response
pub fn clean_markdown(raw: &str) -> String {
    let mut text = raw.trim();

    if let Some((first, rest)) = text.split_once('\n') {
        if is_preamble(first) {
            text = rest.trim();
        }
    }

    if let Some(rest) = text.strip_prefix("```") {
        let rest = match rest.split_once('\n') {
            Some((_, body)) => body,
            None => "",
        };
        let rest = rest.trim_end();
        text = rest.strip_suffix("```").unwrap_or(rest);
    }

    text.trim().to_string()
}

fn is_preamble(line: &str) -> bool {
    let line = line.trim().to_lowercase();
    let opener = ["here is", "here's", "sure", "below is", "certainly"]
        .iter()
        .any(|p| line.starts_with(p));
    opener && line.ends_with(':')
}
