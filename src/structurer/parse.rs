//! Lenient parsing of the JSON extraction pass
//!
//! The extraction model is asked for a single JSON object but does not always
//! comply. This module accepts fenced output, arrays, prose around the object
//! and loosely typed fields, then backfills missing court details from the
//! markdown. Every deviation is recorded as a [`Repair`].

use crate::structurer::manual;
use crate::structurer::{ExtractedCase, StructuredDoc};
use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::LazyLock;
use thiserror::Error;

/// Placeholder used when no court number or bench can be found
pub const UNKNOWN: &str = "UNKNOWN";

static COURT_NO: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)COURT\s*NO\.?\s*:?\s*(\d+)").unwrap());

static BENCH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)(HON(?:'|’)?BLE.*?)(?:\n\s*\n|\z)").unwrap());

/// A correction applied while turning a response into a document
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "repair", rename_all = "snake_case")]
pub enum Repair {
    /// Response was wrapped in a markdown code fence
    CodeFence,
    /// Response was an array; its first element was used
    ArrayWrapped,
    /// Response was not an object; an empty object was used
    NonObjectPlaceholder,
    /// Court name was missing and the profile's name was used
    BackfilledCourt,
    /// Court number was missing
    BackfilledCourtNo { from_text: bool },
    /// Bench judges were missing
    BackfilledBench { from_text: bool },
    /// `cases` was absent or not a list
    MissingCases,
    /// Cases without a case number were discarded
    DroppedCases { count: usize },
    /// Cases were recovered from the numbered items of the markdown
    ManualExtraction { cases: usize },
    /// The JSON pass failed outright and everything came from the markdown
    TextFallback,
}

/// Why a response could not be parsed at all
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseIssue {
    #[error("Empty extraction response")]
    Empty,

    #[error("Invalid JSON in extraction response: {0}")]
    InvalidJson(String),
}

/// A parsed document plus the repairs that produced it
#[derive(Debug, Clone)]
pub struct Parsed {
    pub doc: StructuredDoc,
    pub repairs: Vec<Repair>,
}

/// Parse a JSON-pass response, repairing what can be repaired
pub fn parse_extraction_response(
    raw: &str,
    source_text: &str,
    default_court: &str,
) -> Result<Parsed, ParseIssue> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ParseIssue::Empty);
    }

    let mut repairs = Vec::new();
    let body = match strip_code_fence(trimmed) {
        Some(inner) => {
            repairs.push(Repair::CodeFence);
            inner
        }
        None => trimmed,
    };
    if body.is_empty() {
        return Err(ParseIssue::Empty);
    }

    let value = parse_value(body)?;
    let object = match value {
        Value::Object(map) => map,
        Value::Array(items) => {
            repairs.push(Repair::ArrayWrapped);
            match items.into_iter().next() {
                Some(Value::Object(map)) => map,
                _ => {
                    repairs.push(Repair::NonObjectPlaceholder);
                    Map::new()
                }
            }
        }
        _ => {
            repairs.push(Repair::NonObjectPlaceholder);
            Map::new()
        }
    };

    Ok(build_document(&object, source_text, default_court, repairs))
}

/// Build a document from the markdown alone, for when the JSON pass failed
pub fn parse_from_text(source_text: &str, default_court: &str) -> Parsed {
    build_document(
        &Map::new(),
        source_text,
        default_court,
        vec![Repair::TextFallback],
    )
}

fn strip_code_fence(text: &str) -> Option<&str> {
    let rest = text.strip_prefix("```")?;
    // Drop the language tag line
    let rest = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => "",
    };
    let rest = rest.trim_end();
    Some(rest.strip_suffix("```").unwrap_or(rest).trim())
}

fn parse_value(body: &str) -> Result<Value, ParseIssue> {
    match serde_json::from_str::<Value>(body) {
        Ok(value) => Ok(value),
        Err(err) => {
            // Prose around the object
            if let (Some(start), Some(end)) = (body.find('{'), body.rfind('}')) {
                if start < end {
                    if let Ok(value) = serde_json::from_str::<Value>(&body[start..=end]) {
                        return Ok(value);
                    }
                }
            }
            Err(ParseIssue::InvalidJson(err.to_string()))
        }
    }
}

fn build_document(
    object: &Map<String, Value>,
    source_text: &str,
    default_court: &str,
    mut repairs: Vec<Repair>,
) -> Parsed {
    let court = match text_field(object, &["court", "courtName", "court_name"]) {
        Some(court) => court,
        None => {
            repairs.push(Repair::BackfilledCourt);
            default_court.to_string()
        }
    };

    let bench_label = match text_field(object, &["courtNo", "court_no", "courtNumber"]) {
        Some(label) => label,
        None => match court_number_in(source_text) {
            Some(label) => {
                repairs.push(Repair::BackfilledCourtNo { from_text: true });
                label
            }
            None => {
                repairs.push(Repair::BackfilledCourtNo { from_text: false });
                UNKNOWN.to_string()
            }
        },
    };

    let judges = match text_field(object, &["bench", "judges", "coram"]) {
        Some(judges) => judges,
        None => match judges_in(source_text) {
            Some(judges) => {
                repairs.push(Repair::BackfilledBench { from_text: true });
                judges
            }
            None => {
                repairs.push(Repair::BackfilledBench { from_text: false });
                UNKNOWN.to_string()
            }
        },
    };

    let mut cases = Vec::new();
    match object.get("cases") {
        Some(Value::Array(items)) => {
            let mut dropped = 0;
            for item in items {
                match item.as_object().and_then(read_case) {
                    Some(case) => cases.push(case),
                    None => dropped += 1,
                }
            }
            if dropped > 0 {
                repairs.push(Repair::DroppedCases { count: dropped });
            }
        }
        _ if repairs.contains(&Repair::TextFallback) => {}
        _ => repairs.push(Repair::MissingCases),
    }

    if cases.is_empty() {
        cases = manual::extract_cases(source_text);
        if !cases.is_empty() {
            repairs.push(Repair::ManualExtraction { cases: cases.len() });
        }
    }

    for case in &mut cases {
        if case.petitioner.is_none() || case.respondent.is_none() {
            if let Some((petitioner, respondent)) =
                case.title.as_deref().and_then(manual::split_parties)
            {
                case.petitioner.get_or_insert(petitioner);
                case.respondent.get_or_insert(respondent);
            }
        }
    }

    Parsed {
        doc: StructuredDoc {
            court,
            bench_label,
            judges,
            cases,
        },
        repairs,
    }
}

fn read_case(object: &Map<String, Value>) -> Option<ExtractedCase> {
    let case_number = text_field(object, &["caseNumber", "case_number", "caseNo", "case_no"])?;
    Some(ExtractedCase {
        case_number,
        title: text_field(object, &["title", "parties"]),
        tags: tags_field(object.get("tags")),
        item_number: text_field(object, &["itemNumber", "item_number", "itemNo", "item_no"]),
        file_number: text_field(object, &["fileNumber", "file_number"]),
        cause_list: text_field(object, &["causeList", "cause_list", "listType"]),
        petitioner_adv: text_field(object, &["petitionerAdv", "petitioner_adv"]),
        respondent_adv: text_field(object, &["respondentAdv", "respondent_adv"]),
        petitioner: text_field(object, &["petitioner"]),
        respondent: text_field(object, &["respondent"]),
    })
}

/// First non-empty string or number under any of `keys`
fn text_field(object: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match object.get(*key)? {
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn tags_field(value: Option<&Value>) -> Vec<String> {
    let raw: Vec<String> = match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        Some(Value::String(s)) => s.split(',').map(str::to_string).collect(),
        _ => Vec::new(),
    };
    raw.into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

fn court_number_in(text: &str) -> Option<String> {
    COURT_NO
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| format!("COURT NO. {}", m.as_str()))
}

fn judges_in(text: &str) -> Option<String> {
    let block = BENCH.captures(text)?.get(1)?.as_str();
    let cleaned = block
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim_matches(|c: char| c == '*' || c == '#' || c == '_' || c.is_whitespace())
        .to_string();
    (!cleaned.is_empty()).then_some(cleaned)
}
