//! Source trait and the report types sources produce

#[cfg(test)]
use mockall::automock;

use serde::Serialize;
use thiserror::Error;

/// Kind of web source a version answer came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Search-engine result pages
    Google,
    /// Encyclopedia article infoboxes
    Wikipedia,
    /// Curated vendor download/release pages
    Vendor,
}

impl SourceKind {
    /// Returns the configuration identifier of this source kind
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Google => "google",
            SourceKind::Wikipedia => "wikipedia",
            SourceKind::Vendor => "vendor",
        }
    }
}

impl std::str::FromStr for SourceKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "google" => Ok(SourceKind::Google),
            "wikipedia" => Ok(SourceKind::Wikipedia),
            "vendor" => Ok(SourceKind::Vendor),
            _ => Err(()),
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What one source reported for one piece of software
///
/// Immutable once produced; the resolver builds a derived copy when it
/// attaches the caller's current version to the winning report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionReport {
    /// Version the caller already has, attached by the resolver
    pub current_version: Option<String>,
    /// Best version this source discovered, unset on a miss
    pub latest_version: Option<String>,
    /// Whether `latest_version` is newer than `current_version`
    pub update_found: bool,
    /// Where the answer came from (download link or page URL)
    pub source_url: Option<String>,
    /// Release date of the latest version, if the page mentioned one
    pub release_date: Option<String>,
    /// Which source produced this report
    pub method: SourceKind,
}

impl VersionReport {
    /// A report carrying no information, attributed to `method`.
    pub fn empty(method: SourceKind) -> Self {
        Self {
            current_version: None,
            latest_version: None,
            update_found: false,
            source_url: None,
            release_date: None,
            method,
        }
    }
}

/// A version-looking substring pulled out of one text fragment
///
/// Ephemeral: lives only within a single fetch, to pick the maximum and
/// to record where a candidate was seen for debug logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub value: String,
    /// Fragment that produced the value ("result title", "infobox row", ...)
    pub origin: &'static str,
}

impl Candidate {
    pub fn new(value: impl Into<String>, origin: &'static str) -> Self {
        Self {
            value: value.into(),
            origin,
        }
    }
}

/// Contract violations inside a source implementation
///
/// Ordinary bad luck (network errors, absent DOM nodes, malformed
/// payloads) never becomes a `SourceError`; sources log those and return
/// an empty report instead.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Invalid CSS selector {selector:?} configured for {software}")]
    InvalidSelector { software: String, selector: String },

    #[error("Invalid version pattern {pattern:?} configured for {software}")]
    InvalidPattern { software: String, pattern: String },
}

/// Trait for discovering the latest published version of a piece of
/// software from one kind of web source
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait Source: Send + Sync {
    /// Returns which kind of source this implementation is
    fn kind(&self) -> SourceKind;

    /// Cheap, I/O-free check: can this source say anything about `software`?
    fn can_handle(&self, software: &str) -> bool;

    /// Fetches this source's answer for `software`
    ///
    /// # Returns
    /// * `Ok(VersionReport)` - possibly empty when the source had nothing
    /// * `Err(SourceError)` - only for broken catalog entries; the
    ///   resolver logs these and moves on to the next source
    async fn fetch_latest(&self, software: &str) -> Result<VersionReport, SourceError>;
}
