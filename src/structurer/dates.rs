//! List-date derivation
//!
//! The date of a cause list is taken, in order, from the document's file
//! name, from the head of its normalized text, from the date directory it
//! sits in, and finally from the processing date. Every fallback past the
//! file name is logged.

use chrono::{Datelike, NaiveDate};
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::LazyLock;
use tracing::{info, warn};

/// Only the head of a document is scanned; later dates usually belong to orders
const CONTENT_SCAN_CHARS: usize = 3000;

static YMD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|\D)(\d{4})[-_.](\d{1,2})[-_.](\d{1,2})(?:\D|$)").unwrap());

static DMY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|\D)(\d{1,2})[-_./](\d{1,2})[-_./](\d{4})(?:\D|$)").unwrap());

static COMPACT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?:^|\D)(\d{8})(?:\D|$)").unwrap());

static LONG_FORM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(\d{1,2})(?:st|nd|rd|th)?\s+(jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\.?,?\s+(\d{4})\b",
    )
    .unwrap()
});

/// Where a list date came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateSource {
    FileName,
    Content,
    Directory,
    ProcessingDate,
}

/// Derive the list date of a document
pub fn derive_list_date(
    document: &Path,
    content: Option<&str>,
    processing_date: NaiveDate,
) -> (NaiveDate, DateSource) {
    if let Some(date) = document
        .file_stem()
        .and_then(|s| s.to_str())
        .and_then(date_in_file_name)
    {
        return (date, DateSource::FileName);
    }

    if let Some(date) = content.and_then(date_in_content) {
        info!(
            "List date {} for {} taken from document content",
            date,
            document.display()
        );
        return (date, DateSource::Content);
    }

    if let Some(date) = document
        .parent()
        .and_then(|p| p.file_name())
        .and_then(|n| n.to_str())
        .and_then(|n| NaiveDate::parse_from_str(n, "%Y-%m-%d").ok())
    {
        warn!(
            "No date in name or content of {}; using directory date {}",
            document.display(),
            date
        );
        return (date, DateSource::Directory);
    }

    warn!(
        "No list date found for {}; defaulting to processing date {}",
        document.display(),
        processing_date
    );
    (processing_date, DateSource::ProcessingDate)
}

/// Numeric date in a file name, including 8-digit `DDMMYYYY`/`YYYYMMDD` tokens
pub fn date_in_file_name(name: &str) -> Option<NaiveDate> {
    earliest(&[numeric_date(name), compact_date(name)])
}

/// Numeric or long-form date near the start of a text
pub fn date_in_content(text: &str) -> Option<NaiveDate> {
    let head = match text.char_indices().nth(CONTENT_SCAN_CHARS) {
        Some((end, _)) => &text[..end],
        None => text,
    };
    earliest(&[numeric_date(head), long_form_date(head)])
}

type Found = Option<(usize, NaiveDate)>;

fn earliest(candidates: &[Found]) -> Option<NaiveDate> {
    candidates
        .iter()
        .flatten()
        .min_by_key(|(position, _)| *position)
        .map(|(_, date)| *date)
}

fn numeric_date(text: &str) -> Found {
    let ymd_hit = first_valid(&YMD, text, |c| ymd(num(c, 1)?, num(c, 2)?, num(c, 3)?));
    let dmy_hit = first_valid(&DMY, text, |c| ymd(num(c, 3)?, num(c, 2)?, num(c, 1)?));
    [ymd_hit, dmy_hit].into_iter().flatten().min_by_key(|(p, _)| *p)
}

fn compact_date(text: &str) -> Found {
    first_valid(&COMPACT, text, |c| {
        let digits = c.get(1)?.as_str();
        let day_first = ymd(
            digits[4..8].parse().ok()?,
            digits[2..4].parse().ok()?,
            digits[0..2].parse().ok()?,
        );
        day_first.or_else(|| {
            ymd(
                digits[0..4].parse().ok()?,
                digits[4..6].parse().ok()?,
                digits[6..8].parse().ok()?,
            )
        })
    })
}

fn long_form_date(text: &str) -> Found {
    first_valid(&LONG_FORM, text, |c| {
        let month = month_number(c.get(2)?.as_str())?;
        ymd(num(c, 3)?, month, num(c, 1)?)
    })
}

fn first_valid<F>(regex: &Regex, text: &str, build: F) -> Found
where
    F: Fn(&Captures) -> Option<NaiveDate>,
{
    regex
        .captures_iter(text)
        .find_map(|c| build(&c).map(|date| (c.get(0).map(|m| m.start()).unwrap_or(0), date)))
}

fn num(caps: &Captures, index: usize) -> Option<u32> {
    caps.get(index)?.as_str().parse().ok()
}

fn ymd(year: u32, month: u32, day: u32) -> Option<NaiveDate> {
    if !(1990..=2100).contains(&year) {
        return None;
    }
    NaiveDate::from_ymd_opt(year as i32, month, day).filter(|d| d.year() >= 1990)
}

fn month_number(name: &str) -> Option<u32> {
    let prefix: String = name.chars().take(3).collect::<String>().to_lowercase();
    let months = [
        "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
    ];
    months.iter().position(|m| *m == prefix).map(|i| i as u32 + 1)
}
