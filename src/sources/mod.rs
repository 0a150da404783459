//! The web sources that can answer "what is the latest version of X?"

pub mod google;
pub mod vendor;
pub mod wikipedia;

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, error, warn};

pub use google::GoogleSource;
pub use vendor::VendorSource;
pub use wikipedia::WikipediaSource;

use crate::config::Config;
use crate::http::HttpClient;
use crate::source::{Source, SourceKind};

/// Construct the sources named in `config.methods`, preserving their order.
///
/// Order matters: it is the dispatch order, and ties between equal
/// versions go to the earlier source. Unknown identifiers are skipped so
/// a typo in a config file cannot take resolution down with it.
pub fn build_sources(config: &Config, client: &HttpClient) -> Vec<Arc<dyn Source>> {
    let mut sources: Vec<Arc<dyn Source>> = Vec::new();
    let mut seen: HashSet<SourceKind> = HashSet::new();

    for name in &config.methods {
        let Ok(kind) = name.parse::<SourceKind>() else {
            error!("Unknown source {name:?} in configuration, skipping");
            continue;
        };
        if !seen.insert(kind) {
            warn!("Duplicate source {name:?} in configuration, skipping");
            continue;
        }

        let source: Arc<dyn Source> = match kind {
            SourceKind::Google => Arc::new(GoogleSource::new(client.clone())),
            SourceKind::Wikipedia => Arc::new(WikipediaSource::new(client.clone())),
            SourceKind::Vendor => Arc::new(VendorSource::new(client.clone())),
        };
        debug!("Loaded source {kind}");
        sources.push(source);
    }

    sources
}
