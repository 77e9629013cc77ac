//! # Auto-Tagging Module
//!
//! Rule-based tags derived from a case's number and title. Rules are checked
//! in order and every matching rule contributes its tag once.

use crate::store::{DbError, Repository};
use regex::Regex;
use std::sync::LazyLock;
use tracing::{info, instrument, warn};

/// Which field a rule inspects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    CaseNumber,
    Title,
}

struct TagRule {
    field: Field,
    pattern: Regex,
    tag: &'static str,
}

fn rule(field: Field, pattern: &str, tag: &'static str) -> TagRule {
    TagRule {
        field,
        pattern: Regex::new(pattern).unwrap(),
        tag,
    }
}

static RULES: LazyLock<Vec<TagRule>> = LazyLock::new(|| {
    use Field::{CaseNumber, Title};
    vec![
        rule(CaseNumber, r"(?i)W\.P\.\s*\(C\)", "writ_petition_civil"),
        rule(CaseNumber, r"(?i)CRL\.A\.", "criminal_appeal"),
        rule(CaseNumber, r"(?i)\bRFA\b", "regular_first_appeal"),
        rule(CaseNumber, r"(?i)\bFAO\b", "first_appeal_order"),
        rule(CaseNumber, r"(?i)CM\s*APPL", "civil_misc_application"),
        rule(CaseNumber, r"(?i)CS\s*\(COMM\)", "commercial_suit"),
        rule(CaseNumber, r"(?i)ARB\.P\.", "arbitration_petition"),
        rule(CaseNumber, r"(?i)CONT\.CAS", "contempt_case"),
        rule(CaseNumber, r"(?i)\bLPA\b", "letters_patent_appeal"),
        rule(CaseNumber, r"(?i)MAT\.APP", "matrimonial_appeal"),
        rule(CaseNumber, r"(?i)BAIL\s*APPLN", "bail_application"),
        rule(CaseNumber, r"(?i)CRL\.M\.C\.", "criminal_misc_case"),
        rule(Title, r"(?i)INCOME\s+TAX", "tax_matter"),
        rule(Title, r"(?i)\bSERVICE\b", "service_matter"),
        rule(Title, r"(?i)\b(?:PROPERTY|LAND|RENT)\b", "property_matter"),
        rule(Title, r"(?i)\b(?:BANK|INSURANCE)\b", "financial_matter"),
        rule(
            Title,
            r"(?i)\b(?:EDUCATION|UNIVERSITY|COLLEGE|SCHOOL|STUDENTS?)\b",
            "education_matter",
        ),
        rule(
            Title,
            r"(?i)UNION\s+OF\s+INDIA|\b(?:GOVT|GOVERNMENT|DDA|MUNICIPAL)\b",
            "govt_party",
        ),
        rule(
            Title,
            r"(?i)M/S|\b(?:LTD|LIMITED|PVT|PRIVATE|CORPORATION)\b",
            "company_party",
        ),
    ]
});

/// Tags whose rules match the case
pub fn tags_for(case_number: &str, title: Option<&str>) -> Vec<&'static str> {
    let mut tags = Vec::new();
    for rule in RULES.iter() {
        let text = match rule.field {
            Field::CaseNumber => case_number,
            Field::Title => title.unwrap_or_default(),
        };
        if rule.pattern.is_match(text) && !tags.contains(&rule.tag) {
            tags.push(rule.tag);
        }
    }
    tags
}

/// Counts from one auto-tagging pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaggingSummary {
    pub cases_seen: usize,
    pub tags_added: usize,
    pub failures: usize,
}

/// Apply the tag rules to every stored case
#[instrument(skip(repo))]
pub async fn apply_auto_tags(repo: &Repository) -> Result<TaggingSummary, DbError> {
    let cases = repo.cases_for_tagging().await?;
    let mut summary = TaggingSummary {
        cases_seen: cases.len(),
        ..Default::default()
    };

    for case in &cases {
        for tag in tags_for(&case.case_number, case.title.as_deref()) {
            match repo.attach_tag(case.id, tag).await {
                Ok(true) => summary.tags_added += 1,
                Ok(false) => {}
                Err(e) => {
                    summary.failures += 1;
                    warn!("Failed to tag case {} with {}: {}", case.id, tag, e);
                }
            }
        }
    }

    info!(
        "Auto-tagged {} cases: {} tags added, {} failures",
        summary.cases_seen, summary.tags_added, summary.failures
    );
    Ok(summary)
}
