//! Best-effort publish date detection.
//!
//! Heuristics run in declared order and the first match wins:
//!
//! 1. [`from_meta`]: well-known `<meta>` names and properties
//! 2. [`from_time_element`]: the first `<time>` element
//! 3. [`from_published_text`]: a date following the word "published" in
//!    the flattened body text
//!
//! A match is normalized to `YYYY-MM-DD` when it parses as a date; values
//! that do not parse are kept as found.

use chrono::{DateTime, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use tracing::debug;

/// A single heuristic: document and flattened text in, raw date out.
pub type DateHeuristic = fn(&Html, &str) -> Option<String>;

pub const HEURISTICS: &[(&str, DateHeuristic)] = &[
    ("meta", from_meta),
    ("time", from_time_element),
    ("text", from_published_text),
];

/// Meta keys in priority order, compared case-insensitively.
const META_KEYS: &[&str] = &[
    "article:published_time",
    "og:published_time",
    "datepublished",
    "pubdate",
    "publishdate",
    "publish-date",
    "parsely-pub-date",
    "sailthru.date",
    "dc.date",
    "date",
];

static META: Lazy<Selector> = Lazy::new(|| Selector::parse("meta[content]").expect("valid selector"));
static TIME: Lazy<Selector> = Lazy::new(|| Selector::parse("time").expect("valid selector"));

static PUBLISHED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\bpublished\b(?:\s+(?:on|at))?\s*:?\s*(\d{4}-\d{2}-\d{2}|\d{1,2}/\d{1,2}/\d{2,4}|(?:jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\.?\s+\d{1,2}(?:st|nd|rd|th)?,?\s+\d{4})",
    )
    .expect("valid regex")
});

static ORDINAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(\d{1,2})(?:st|nd|rd|th)\b").expect("valid regex"));

/// Run the heuristic chain and normalize the first hit.
pub fn extract_published_date(document: &Html, text: &str) -> Option<String> {
    HEURISTICS.iter().find_map(|(name, heuristic)| {
        heuristic(document, text).map(|raw| {
            let normalized = normalize_date(&raw);
            debug!(heuristic = *name, %raw, %normalized, "Found publish date");
            normalized
        })
    })
}

pub fn from_meta(document: &Html, _text: &str) -> Option<String> {
    META_KEYS.iter().find_map(|key| {
        document.select(&META).find_map(|meta| {
            let el = meta.value();
            let matches = ["property", "name", "itemprop"]
                .iter()
                .filter_map(|attr| el.attr(attr))
                .any(|value| value.eq_ignore_ascii_case(key));
            if !matches {
                return None;
            }
            el.attr("content")
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_string)
        })
    })
}

pub fn from_time_element(document: &Html, _text: &str) -> Option<String> {
    let time = document.select(&TIME).next()?;
    if let Some(datetime) = time.value().attr("datetime").map(str::trim) {
        if !datetime.is_empty() {
            return Some(datetime.to_string());
        }
    }
    let text = time.text().collect::<String>();
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

pub fn from_published_text(_document: &Html, text: &str) -> Option<String> {
    PUBLISHED
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Normalize a raw date to `YYYY-MM-DD`, or return it trimmed.
pub fn normalize_date(raw: &str) -> String {
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return dt.date_naive().to_string();
    }
    if let Some(prefix) = raw.get(..10) {
        if let Ok(date) = NaiveDate::parse_from_str(prefix, "%Y-%m-%d") {
            return date.to_string();
        }
    }
    for fmt in ["%m/%d/%Y", "%m/%d/%y"] {
        if let Ok(date) = NaiveDate::parse_from_str(raw, fmt) {
            return date.to_string();
        }
    }

    let cleaned = ORDINAL.replace_all(raw, "$1").replace([',', '.'], " ");
    let cleaned = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
    let cleaned = cleaned.replacen("Sept ", "Sep ", 1);
    for fmt in ["%B %d %Y", "%b %d %Y", "%d %B %Y", "%d %b %Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(&cleaned, fmt) {
            return date.to_string();
        }
    }

    raw.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meta_wins_over_text() {
        let html = r#"<html><head>
            <meta property="article:published_time" content="2024-09-30">
            </head><body><p>Published at October 5, 2024</p></body></html>"#;
        let doc = Html::parse_document(html);
        let text = "Published at October 5, 2024";
        assert_eq!(extract_published_date(&doc, text).as_deref(), Some("2024-09-30"));
    }

    #[test]
    fn test_text_fallback_month_name() {
        let doc = Html::parse_document("<html><body><p>x</p></body></html>");
        let text = "Retail Weekly\nPublished at October 5, 2024\nBody";
        assert_eq!(extract_published_date(&doc, text).as_deref(), Some("2024-10-05"));
    }

    #[test]
    fn test_text_fallback_formats() {
        let doc = Html::parse_document("<html></html>");
        assert_eq!(
            extract_published_date(&doc, "published: 2025-01-15 by staff").as_deref(),
            Some("2025-01-15")
        );
        assert_eq!(
            extract_published_date(&doc, "Published on 9/3/2024").as_deref(),
            Some("2024-09-03")
        );
        assert_eq!(
            extract_published_date(&doc, "Published Sept. 12th, 2024").as_deref(),
            Some("2024-09-12")
        );
    }

    #[test]
    fn test_time_element_before_text() {
        let html = r#"<html><body>
            <time datetime="2024-08-01T09:30:00Z">Aug 1</time>
            <p>Published on 2024-07-01</p></body></html>"#;
        let doc = Html::parse_document(html);
        assert_eq!(
            extract_published_date(&doc, "Published on 2024-07-01").as_deref(),
            Some("2024-08-01")
        );
    }

    #[test]
    fn test_time_element_text_when_no_attribute() {
        let doc = Html::parse_document("<html><body><time> March 3, 2025 </time></body></html>");
        assert_eq!(from_time_element(&doc, "").as_deref(), Some("March 3, 2025"));
    }

    #[test]
    fn test_meta_name_case_insensitive() {
        let doc = Html::parse_document(
            r#"<html><head><meta itemprop="datePublished" content="2023-12-24T08:00:00+01:00"></head></html>"#,
        );
        assert_eq!(extract_published_date(&doc, "").as_deref(), Some("2023-12-24"));
    }

    #[test]
    fn test_no_match_is_none() {
        let doc = Html::parse_document("<html><body><p>No dates here.</p></body></html>");
        assert_eq!(extract_published_date(&doc, "No dates here."), None);
    }

    #[test]
    fn test_unparseable_value_kept_raw() {
        assert_eq!(normalize_date("  last Tuesday "), "last Tuesday");
    }
}
