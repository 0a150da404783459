//! HTML extraction helpers shared by the sources
//!
//! Everything here is synchronous over an already-parsed document, so the
//! non-Send DOM never has to live across an await point.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::version;

/// Meta tag names that conventionally carry a version
const VERSION_META_NAMES: &[&str] = &[
    "version",
    "application-version",
    "app-version",
    "software-version",
    "product-version",
];

/// Words that mark an anchor as a download link
const DOWNLOAD_KEYWORDS: &[&str] = &[
    "download", "get", "install", "setup", "binary", "executable", "latest", "stable",
];

/// Installer/archive extensions that mark an anchor as a download link
const DOWNLOAD_EXTENSIONS: &[&str] = &[
    ".exe", ".msi", ".dmg", ".pkg", ".rpm", ".deb", ".zip", ".tar.gz", ".tar.xz", ".appimage",
];

static META_SELECTORS: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    VERSION_META_NAMES
        .iter()
        .map(|name| {
            Selector::parse(&format!(r#"meta[name="{name}"]"#))
                .expect("Failed to parse meta selector")
        })
        .collect()
});

static HEADING_SELECTORS: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    ["h1", "h2", "h3"]
        .iter()
        .map(|tag| Selector::parse(tag).expect("Failed to parse heading selector"))
        .collect()
});

static ANCHOR_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("Failed to parse anchor selector"));

static TIME_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("time").expect("Failed to parse time selector"));

static RELEASE_DATE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    // month-name, ISO, and day/month numeric forms
    const DATE: &str = r"[A-Za-z]+\s+\d{1,2},?\s+\d{4}|\d{4}-\d{2}-\d{2}|\d{1,2}/\d{1,2}/\d{2,4}";
    [
        format!(r"(?i)released\s+on\s+({DATE})"),
        format!(r"(?i)release\s+date:?\s*({DATE})"),
        format!(r"(?i)released:?\s+({DATE})"),
        format!(r"(?i)available\s+since\s+({DATE})"),
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("Failed to compile date pattern"))
    .collect()
});

/// Dates with no wording of their own, accepted only near a release mention
static BARE_DATE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [r"\b(\d{4}-\d{2}-\d{2})\b", r"\b(\d{1,2}/\d{1,2}/\d{2,4})\b"]
        .iter()
        .map(|pattern| Regex::new(pattern).expect("Failed to compile date pattern"))
        .collect()
});

/// Window scanned around a bare date for release wording
const RELEASE_CONTEXT_CHARS: usize = 60;

/// Whitespace-normalized text content of an element
pub fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// First version candidate carried by a conventional version meta tag
pub fn version_in_meta_tags(doc: &Html) -> Option<String> {
    for selector in META_SELECTORS.iter() {
        for meta in doc.select(selector) {
            let Some(content) = meta.value().attr("content") else {
                continue;
            };
            if let Some(candidate) = version::extract(content).into_iter().next() {
                return Some(candidate);
            }
        }
    }
    None
}

/// First version candidate found in the page headings, h1 before h2 before h3
pub fn version_in_headings(doc: &Html) -> Option<String> {
    for selector in HEADING_SELECTORS.iter() {
        for heading in doc.select(selector) {
            let text = element_text(heading);
            if let Some(candidate) = version::extract(&text).into_iter().next() {
                return Some(candidate);
            }
        }
    }
    None
}

/// Anchors that look like software downloads, as (link text, absolute URL)
///
/// An anchor qualifies when its text or href contains a download keyword,
/// or its href ends in an installer/archive extension. Relative hrefs are
/// resolved against `base_url`.
pub fn find_download_links(doc: &Html, base_url: &Url) -> Vec<(String, String)> {
    let mut links = Vec::new();
    for anchor in doc.select(&ANCHOR_SELECTOR) {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        if href.is_empty() || href.starts_with('#') || href.starts_with("javascript:") {
            continue;
        }

        let text = element_text(anchor);
        let href_lower = href.to_lowercase();
        let text_lower = text.to_lowercase();
        let looks_like_download = DOWNLOAD_KEYWORDS
            .iter()
            .any(|keyword| text_lower.contains(keyword) || href_lower.contains(keyword))
            || DOWNLOAD_EXTENSIONS
                .iter()
                .any(|ext| href_lower.ends_with(ext));
        if !looks_like_download {
            continue;
        }

        let absolute = match Url::parse(href) {
            Ok(url) => url.to_string(),
            Err(_) => match base_url.join(href) {
                Ok(url) => url.to_string(),
                Err(_) => continue,
            },
        };
        links.push((text, absolute));
    }
    links
}

/// Release date mentioned by the page, normalized to YYYY-MM-DD when it
/// parses
///
/// `<time>` elements win over textual patterns like "released on
/// March 5, 2024". A bare date counts only when release wording appears
/// close to it, so copyright lines and changelog timestamps stay out.
pub fn extract_release_date(doc: &Html) -> Option<String> {
    for time in doc.select(&TIME_SELECTOR) {
        if let Some(datetime) = time.value().attr("datetime") {
            return Some(normalize_date(datetime));
        }
        let text = element_text(time);
        if !text.is_empty() {
            return Some(normalize_date(&text));
        }
    }

    let text = element_text(doc.root_element());
    for pattern in RELEASE_DATE_PATTERNS.iter() {
        if let Some(m) = pattern.captures(&text).and_then(|caps| caps.get(1)) {
            return Some(normalize_date(m.as_str()));
        }
    }
    for pattern in BARE_DATE_PATTERNS.iter() {
        for caps in pattern.captures_iter(&text) {
            let Some(m) = caps.get(1) else { continue };
            if near_release_mention(&text, m.start(), m.end()) {
                return Some(normalize_date(m.as_str()));
            }
        }
    }
    None
}

fn near_release_mention(text: &str, start: usize, end: usize) -> bool {
    let mut from = start.saturating_sub(RELEASE_CONTEXT_CHARS);
    while !text.is_char_boundary(from) {
        from -= 1;
    }
    let mut to = (end + RELEASE_CONTEXT_CHARS).min(text.len());
    while !text.is_char_boundary(to) {
        to += 1;
    }
    text[from..to].to_lowercase().contains("release")
}

fn normalize_date(raw: &str) -> String {
    let trimmed = raw.trim();
    if let Ok(datetime) = chrono::DateTime::parse_from_rfc3339(trimmed) {
        return datetime.date_naive().to_string();
    }
    for format in ["%Y-%m-%d", "%B %d, %Y", "%B %d %Y", "%d/%m/%Y", "%d/%m/%y"] {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            return date.to_string();
        }
    }
    trimmed.to_string()
}
