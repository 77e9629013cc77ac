//! Anchor extraction from listing pages
//!
//! Listing pages are arbitrary and often malformed HTML. Every `<a href>` is
//! resolved against the page URL (or a `<base href>` when present); pseudo
//! links such as `javascript:` and `mailto:` and in-page fragments are skipped.

use crate::fetcher::error::FetchError;
use scraper::{Html, Selector};
use std::collections::HashSet;
use tracing::debug;
use url::Url;

const SKIPPED_SCHEMES: [&str; 4] = ["javascript:", "mailto:", "tel:", "data:"];

/// A resolved hyperlink and its anchor text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageLink {
    /// Absolute URL
    pub url: String,

    /// Anchor text, falling back to the title attribute or the URL's file name
    pub text: String,
}

/// Extract resolved, de-duplicated links from an HTML document
pub fn extract_links(html: &str, page_url: &Url) -> Result<Vec<PageLink>, FetchError> {
    let document = Html::parse_document(html);

    let anchor = Selector::parse("a[href]")
        .map_err(|e| FetchError::Other(format!("Invalid anchor selector: {}", e)))?;
    let base_selector = Selector::parse("base[href]")
        .map_err(|e| FetchError::Other(format!("Invalid base selector: {}", e)))?;

    let base = document
        .select(&base_selector)
        .next()
        .and_then(|b| b.value().attr("href"))
        .and_then(|href| page_url.join(href.trim()).ok())
        .unwrap_or_else(|| page_url.clone());

    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for element in document.select(&anchor) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        let href = href.trim();
        if href.is_empty() || href.starts_with('#') {
            continue;
        }
        let lower = href.to_lowercase();
        if SKIPPED_SCHEMES.iter().any(|s| lower.starts_with(s)) {
            debug!("Skipping pseudo link {}", href);
            continue;
        }

        let mut resolved = match base.join(href) {
            Ok(url) => url,
            Err(e) => {
                debug!("Skipping unresolvable link {}: {}", href, e);
                continue;
            }
        };
        if resolved.scheme() != "http" && resolved.scheme() != "https" {
            continue;
        }
        resolved.set_fragment(None);

        let url = resolved.to_string();
        if !seen.insert(url.clone()) {
            continue;
        }

        let text = collapse_whitespace(&element.text().collect::<String>());
        let text = if !text.is_empty() {
            text
        } else if let Some(title) = element.value().attr("title").map(collapse_whitespace).filter(|t| !t.is_empty()) {
            title
        } else {
            file_name(&resolved)
        };

        links.push(PageLink { url, text });
    }

    Ok(links)
}

/// Last non-empty path segment of a URL
pub fn file_name(url: &Url) -> String {
    url.path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
        .unwrap_or_default()
        .to_string()
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
