//! Cross-source reconciliation: dispatching to sources, picking the
//! winning report, and deriving the update flag

use std::cmp::Ordering;
use std::str::FromStr;
use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, error, info, warn};

use crate::source::{Source, VersionReport};
use crate::version;

/// How `update_found` is decided when the caller supplies no current
/// version.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MissingCurrentPolicy {
    /// Without a baseline there is nothing to update; report `false`.
    #[default]
    NoUpdate,
    /// Treat the absent baseline as older than any published version.
    AssumeOlder,
}

impl FromStr for MissingCurrentPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "no-update" => Ok(MissingCurrentPolicy::NoUpdate),
            "assume-older" => Ok(MissingCurrentPolicy::AssumeOlder),
            _ => Err(format!(
                "unknown policy {s:?}, expected no-update or assume-older"
            )),
        }
    }
}

/// Queries sources in configured order and reconciles their answers
pub struct Resolver {
    sources: Vec<Arc<dyn Source>>,
    missing_current: MissingCurrentPolicy,
}

impl Resolver {
    pub fn new(sources: Vec<Arc<dyn Source>>, missing_current: MissingCurrentPolicy) -> Self {
        Self {
            sources,
            missing_current,
        }
    }

    /// Resolve the latest published version of `software`.
    ///
    /// Every applicable source is asked in order. Source failures are
    /// logged and skipped so one broken source cannot sink the lookup.
    /// The highest reported version wins; ties keep the earlier source.
    /// Returns `None` when no source produced a version.
    pub async fn resolve(
        &self,
        software: &str,
        current_version: Option<&str>,
    ) -> Option<VersionReport> {
        info!("Resolving latest version of {software}");

        let mut reports = Vec::new();
        for source in &self.sources {
            if !source.can_handle(software) {
                debug!(
                    "Source {} has no entry for {software}, skipping",
                    source.kind()
                );
                continue;
            }
            match source.fetch_latest(software).await {
                Ok(report) => {
                    if let Some(latest) = report.latest_version.as_deref() {
                        debug!("Source {} reports {latest} for {software}", source.kind());
                        reports.push(report);
                    } else {
                        debug!("Source {} found nothing for {software}", source.kind());
                    }
                }
                Err(e) => {
                    error!("Source {} failed for {software}: {e}", source.kind());
                }
            }
        }

        let Some(best) = select_best(reports) else {
            warn!("No version information found for {software}");
            return None;
        };
        Some(finalize(best, current_version, self.missing_current))
    }
}

/// Pick the report with the highest version; ties keep the earliest.
fn select_best(reports: Vec<VersionReport>) -> Option<VersionReport> {
    let mut best: Option<VersionReport> = None;
    for report in reports {
        let Some(candidate) = report.latest_version.as_deref() else {
            continue;
        };
        let wins = match best.as_ref().and_then(|b| b.latest_version.as_deref()) {
            Some(leader) => version::compare(candidate, leader) == Ordering::Greater,
            None => true,
        };
        if wins {
            best = Some(report);
        }
    }
    best
}

/// Attach the caller's version to the winning report and derive the
/// update flag.
fn finalize(
    report: VersionReport,
    current_version: Option<&str>,
    policy: MissingCurrentPolicy,
) -> VersionReport {
    let update_found = match (current_version, report.latest_version.as_deref()) {
        (Some(current), Some(latest)) => version::compare(latest, current) == Ordering::Greater,
        (None, Some(latest)) => match policy {
            MissingCurrentPolicy::NoUpdate => false,
            MissingCurrentPolicy::AssumeOlder => version::compare(latest, "") == Ordering::Greater,
        },
        _ => false,
    };

    VersionReport {
        current_version: current_version.map(str::to_string),
        update_found,
        ..report
    }
}
