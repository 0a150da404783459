//! Version string algebra: extraction from free text, normalization,
//! parsing into numeric tuples, and total-order comparison
//!
//! Web sources describe versions loosely ("Firefox version 128.0",
//! "v2.1.3", "3.4.1 (build 77)"), so everything here is intentionally
//! lenient: any dotted digit run is a candidate, and comparison works on
//! numeric tuples rather than strict semver.

use std::cmp::Ordering;
use std::sync::LazyLock;

use indexmap::IndexSet;
use regex::Regex;

/// One extraction pattern plus the boundary checks that `regex` syntax
/// cannot express (the crate has no look-around).
struct VersionPattern {
    re: Regex,
    /// Reject matches preceded by a word character ("x1.2" is not a
    /// version) or by `<digit>.` (the match is the tail of a longer run).
    bare_start: bool,
    /// Reject matches followed by `.<digit>` (a longer dotted run owns them).
    reject_dot_continuation: bool,
}

impl VersionPattern {
    fn new(pattern: &str, bare_start: bool, reject_dot_continuation: bool) -> Self {
        Self {
            re: Regex::new(pattern).expect("Failed to compile version pattern"),
            bare_start,
            reject_dot_continuation,
        }
    }
}

static PATTERNS: LazyLock<Vec<VersionPattern>> = LazyLock::new(|| {
    vec![
        // "version 1.2.3"
        VersionPattern::new(r"(?i)version\s+(\d+(?:\.\d+)+)", false, false),
        // "v1.2.3"
        VersionPattern::new(r"(?i)\bv(\d+(?:\.\d+)+)\b", false, false),
        // bare "1.2.3"
        VersionPattern::new(r"(\d+\.\d+(?:\.\d+)*)", true, false),
        // "Version: 1.2.3"
        VersionPattern::new(r"(?i)version:\s+(\d+(?:\.\d+)+)", false, false),
        // "1.2.3 (build 456)"
        VersionPattern::new(r"(?i)(\d+\.\d+(?:\.\d+)*)\s*\(build\s+\d+\)", false, false),
        // bare "1.2" with no third component
        VersionPattern::new(r"(\d+\.\d+)", true, true),
    ]
});

/// Extract every version-looking substring from free text.
///
/// Patterns are applied in precedence order and duplicates are dropped
/// while preserving first-seen order, so the result is deterministic for
/// a given input.
pub fn extract(text: &str) -> Vec<String> {
    let mut found: IndexSet<String> = IndexSet::new();
    for pattern in PATTERNS.iter() {
        for caps in pattern.re.captures_iter(text) {
            let Some(m) = caps.get(1) else { continue };
            if pattern.bare_start
                && (preceded_by_word_char(text, m.start()) || tail_of_dotted_run(text, m.start()))
            {
                continue;
            }
            if pattern.reject_dot_continuation && continues_with_dot_digit(text, m.end()) {
                continue;
            }
            found.insert(m.as_str().to_string());
        }
    }
    found.into_iter().collect()
}

fn preceded_by_word_char(text: &str, start: usize) -> bool {
    text[..start]
        .chars()
        .next_back()
        .is_some_and(|c| c.is_alphanumeric() || c == '_')
}

fn tail_of_dotted_run(text: &str, start: usize) -> bool {
    let mut before = text[..start].chars().rev();
    before.next() == Some('.') && before.next().is_some_and(|c| c.is_ascii_digit())
}

fn continues_with_dot_digit(text: &str, end: usize) -> bool {
    let mut rest = text[end..].chars();
    rest.next() == Some('.') && rest.next().is_some_and(|c| c.is_ascii_digit())
}

/// Normalize a version string for comparison.
///
/// Strips one leading `v`/`V` and drops trailing zero components until a
/// single component remains, so "v1.2.0" normalizes to "1.2" and
/// "2.0.0.0" to "2".
pub fn normalize(version: &str) -> String {
    let trimmed = version.trim();
    let stripped = trimmed.strip_prefix(['v', 'V']).unwrap_or(trimmed);
    let mut parts: Vec<&str> = stripped.split('.').collect();
    while parts.len() > 1 && parts.last().copied() == Some("0") {
        parts.pop();
    }
    parts.join(".")
}

/// Parse a version string into a numeric tuple.
///
/// Components that are not plain integers fall back to their leading
/// digit run ("2ubuntu3" -> 2), or 0 when they contain no digits.
/// Empty input parses to an empty tuple, which compares as all-zero.
pub fn parse(version: &str) -> Vec<u64> {
    let normalized = normalize(version);
    if normalized.is_empty() {
        return Vec::new();
    }
    normalized
        .split('.')
        .map(|part| {
            part.parse::<u64>().unwrap_or_else(|_| {
                let digits: String = part.chars().take_while(char::is_ascii_digit).collect();
                digits.parse().unwrap_or(0)
            })
        })
        .collect()
}

/// Compare two version strings component-wise.
///
/// The shorter tuple is zero-padded, so "1.2" and "1.2.0" are equal.
/// This is a total order over normalized tuples.
pub fn compare(a: &str, b: &str) -> Ordering {
    let mut left = parse(a);
    let mut right = parse(b);
    let width = left.len().max(right.len());
    left.resize(width, 0);
    right.resize(width, 0);
    left.cmp(&right)
}
