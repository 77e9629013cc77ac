//! Filesystem layout for downloaded documents and their companions
//!
//! ```text
//! <root>/<court_code>/cause_lists/<YYYY-MM-DD>/
//!     <document>.pdf
//!     <document>.md      normalized text from the first extraction pass
//!     <document>.json    structured result from the second pass
//!     metadata.json      per-document outcomes of the run
//! ```

use chrono::NaiveDate;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use url::Url;

/// Name of the per-date run metadata file
pub const METADATA_FILE: &str = "metadata.json";

const MAX_FILENAME_LEN: usize = 255;
const UNSAFE_CHARS: [char; 9] = ['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Directory layout rooted at the output directory
#[derive(Debug, Clone)]
pub struct Layout {
    root: PathBuf,
    court_code: String,
}

impl Layout {
    /// Create a layout for one court
    pub fn new(root: impl Into<PathBuf>, court_code: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            court_code: court_code.into(),
        }
    }

    /// Directory holding every date of this court
    pub fn lists_dir(&self) -> PathBuf {
        self.root.join(&self.court_code).join("cause_lists")
    }

    /// Directory for one target date
    pub fn date_dir(&self, date: NaiveDate) -> PathBuf {
        self.lists_dir().join(date.format("%Y-%m-%d").to_string())
    }

    /// Dates that already have a directory, newest first
    pub fn existing_dates(&self) -> std::io::Result<Vec<NaiveDate>> {
        let dir = self.lists_dir();
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut dates = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            if let Some(date) = entry
                .file_name()
                .to_str()
                .and_then(|name| NaiveDate::parse_from_str(name, "%Y-%m-%d").ok())
            {
                dates.push(date);
            }
        }
        dates.sort_unstable_by(|a, b| b.cmp(a));
        Ok(dates)
    }
}

/// Replace characters that are unsafe in file names, trim and cap the length
pub fn clean_filename(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| if UNSAFE_CHARS.contains(&c) || c.is_control() { '_' } else { c })
        .collect();
    let trimmed = replaced.trim_matches(|c: char| c.is_whitespace() || c == '.');

    let mut cleaned = String::with_capacity(trimmed.len().min(MAX_FILENAME_LEN));
    for c in trimmed.chars() {
        if cleaned.len() + c.len_utf8() > MAX_FILENAME_LEN {
            break;
        }
        cleaned.push(c);
    }
    cleaned
}

/// File name for a document URL: its cleaned basename, or a hash of the URL
pub fn filename_for_url(url: &str) -> String {
    let basename = Url::parse(url)
        .ok()
        .map(|u| crate::fetcher::links::file_name(&u))
        .unwrap_or_default();

    let cleaned = clean_filename(&basename);
    if cleaned.is_empty() {
        let digest = hex::encode(Sha256::digest(url.as_bytes()));
        digest[..16].to_string()
    } else {
        cleaned
    }
}

/// `name` with 8 hex chars of the URL's SHA-256 appended to its stem
pub fn unique_filename(name: &str, url: &str) -> String {
    let digest = hex::encode(Sha256::digest(url.as_bytes()));
    let path = Path::new(name);
    let stem: String = path
        .file_stem()
        .map(|s| s.to_string_lossy().chars().take(200).collect())
        .unwrap_or_default();

    match path.extension() {
        Some(ext) => format!("{}_{}.{}", stem, &digest[..8], ext.to_string_lossy()),
        None => format!("{}_{}", stem, &digest[..8]),
    }
}

/// Partial-download name for a document file
pub fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".part");
    path.with_file_name(name)
}

/// Whether a file name carries an extension
pub fn has_extension(name: &str) -> bool {
    Path::new(name).extension().is_some()
}

/// Extension (with dot) for a response content type
pub fn extension_for_content_type(content_type: Option<&str>) -> &'static str {
    let mime = content_type
        .and_then(|c| c.split(';').next())
        .map(|c| c.trim().to_lowercase())
        .unwrap_or_default();

    match mime.as_str() {
        "application/pdf" => ".pdf",
        "text/html" => ".html",
        "text/plain" => ".txt",
        "application/msword" => ".doc",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => ".docx",
        "application/vnd.ms-excel" => ".xls",
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet" => ".xlsx",
        _ => ".bin",
    }
}

/// Markdown companion of a document
pub fn markdown_path(document: &Path) -> PathBuf {
    document.with_extension("md")
}

/// Structured JSON companion of a document
pub fn json_path(document: &Path) -> PathBuf {
    document.with_extension("json")
}

/// Hex SHA-256 of a byte slice
pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}
