//! Manual case extraction from normalized markdown
//!
//! Used when the JSON pass yields no cases. Matches numbered items of the form
//!
//! ```text
//! 12. **W.P.(C) 1234/2024**
//!     * ACME LTD. Vs. UNION OF INDIA
//! ```
//!
//! with the title either on the same line or on a following bullet line.

use crate::structurer::ExtractedCase;
use regex::Regex;
use std::sync::LazyLock;

static NUMBERED_ITEM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^[ \t]*(\d+)\.[ \t]+\*\*([^*\n]+)\*\*[ \t]*([^\n]*)(?:\n[ \t]*[*-][ \t]*([^\n]+))?")
        .unwrap()
});

static VERSUS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s+(?:vs\.?|v/s\.?|versus)\s+").unwrap());

/// Extract cases from numbered bold items
pub fn extract_cases(markdown: &str) -> Vec<ExtractedCase> {
    NUMBERED_ITEM
        .captures_iter(markdown)
        .filter_map(|caps| {
            let case_number = caps.get(2)?.as_str().trim().to_string();
            if case_number.is_empty() {
                return None;
            }

            let same_line = caps.get(3).map(|m| m.as_str().trim()).unwrap_or_default();
            let next_line = caps.get(4).map(|m| m.as_str().trim()).unwrap_or_default();
            let title = if same_line.is_empty() { next_line } else { same_line };
            let title = title.trim_matches('*').trim();

            let mut case = ExtractedCase {
                case_number,
                item_number: caps.get(1).map(|m| m.as_str().to_string()),
                title: (!title.is_empty()).then(|| title.to_string()),
                ..Default::default()
            };
            if let Some((petitioner, respondent)) = split_parties(title) {
                case.petitioner = Some(petitioner);
                case.respondent = Some(respondent);
            }
            Some(case)
        })
        .collect()
}

/// Split a title such as `A Vs. B` into its two sides
pub fn split_parties(title: &str) -> Option<(String, String)> {
    let mut sides = VERSUS.splitn(title, 2);
    let petitioner = sides.next()?.trim();
    let respondent = sides.next()?.trim();
    if petitioner.is_empty() || respondent.is_empty() {
        return None;
    }
    Some((petitioner.to_string(), respondent.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bullet_title_on_next_line() {
        let markdown = "## COURT NO. 3\n\n1. **W.P.(C) 1234/2024**\n   * ACME LTD. Vs. UNION OF INDIA\n\n2. **CRL.A. 55/2023**\n   * STATE Vs. RAVI KUMAR\n";
        let cases = extract_cases(markdown);

        assert_eq!(cases.len(), 2);
        assert_eq!(cases[0].case_number, "W.P.(C) 1234/2024");
        assert_eq!(cases[0].item_number.as_deref(), Some("1"));
        assert_eq!(cases[0].title.as_deref(), Some("ACME LTD. Vs. UNION OF INDIA"));
        assert_eq!(cases[0].petitioner.as_deref(), Some("ACME LTD."));
        assert_eq!(cases[0].respondent.as_deref(), Some("UNION OF INDIA"));
        assert_eq!(cases[1].case_number, "CRL.A. 55/2023");
    }

    #[test]
    fn test_title_on_same_line() {
        let cases = extract_cases("7. **FAO 12/2022** RAM Versus SHYAM");
        assert_eq!(cases.len(), 1);
        assert_eq!(cases[0].item_number.as_deref(), Some("7"));
        assert_eq!(cases[0].petitioner.as_deref(), Some("RAM"));
        assert_eq!(cases[0].respondent.as_deref(), Some("SHYAM"));
    }

    #[test]
    fn test_title_without_parties() {
        let cases = extract_cases("3. **CM APPL. 9/2024**\n* IN RE: SUO MOTU\n");
        assert_eq!(cases[0].title.as_deref(), Some("IN RE: SUO MOTU"));
        assert!(cases[0].petitioner.is_none());
    }

    #[test]
    fn test_no_numbered_items() {
        assert!(extract_cases("# Notice\n\nNo sitting today.").is_empty());
    }

    #[test]
    fn test_split_parties_variants() {
        assert_eq!(
            split_parties("A v/s B"),
            Some(("A".to_string(), "B".to_string()))
        );
        assert_eq!(split_parties("A VS B"), Some(("A".to_string(), "B".to_string())));
        assert_eq!(split_parties("IN RE A"), None);
    }
}
