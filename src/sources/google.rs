//! Search-engine source: mine result titles, snippets, and featured
//! answers for version numbers

use std::cmp::Ordering;
use std::sync::LazyLock;

use async_trait::async_trait;
use scraper::{Html, Selector};
use tracing::{debug, warn};

use crate::http::HttpClient;
use crate::scrape;
use crate::source::{Candidate, Source, SourceError, SourceKind, VersionReport};
use crate::version;

const DEFAULT_BASE_URL: &str = "https://www.google.com";

/// Query phrasings tried per software name
const QUERY_VARIANTS: &[&str] = &["latest version", "current version", "download latest version"];

/// Words that make a result link worth reporting as provenance
const LINK_KEYWORDS: &[&str] = &["download", "updates", "changelog", "release"];

static RESULT_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".MjjYud").expect("Failed to parse result selector"));

static TITLE_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h3").expect("Failed to parse title selector"));

static SNIPPET_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".VwiC3b").expect("Failed to parse snippet selector"));

static FEATURED_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".hgKElc").expect("Failed to parse featured selector"));

static ANCHOR_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("Failed to parse anchor selector"));

/// Search-engine backed source
pub struct GoogleSource {
    client: HttpClient,
    base_url: String,
}

impl GoogleSource {
    pub fn new(client: HttpClient) -> Self {
        Self::with_base_url(client, DEFAULT_BASE_URL.to_string())
    }

    /// Point the source at a different host, for tests.
    pub fn with_base_url(client: HttpClient, base_url: String) -> Self {
        Self { client, base_url }
    }
}

#[async_trait]
impl Source for GoogleSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Google
    }

    // A search engine can be asked about anything.
    fn can_handle(&self, _software: &str) -> bool {
        true
    }

    async fn fetch_latest(&self, software: &str) -> Result<VersionReport, SourceError> {
        let url = format!("{}/search", self.base_url);
        let mut candidates: Vec<Candidate> = Vec::new();
        let mut links: Vec<String> = Vec::new();

        for variant in QUERY_VARIANTS {
            let query = format!("{software} {variant}");
            let page = match self.client.get(&url, &[("q", &query)]).await {
                Ok(page) => page,
                Err(e) => {
                    warn!("Search for {query:?} failed: {e}");
                    continue;
                }
            };
            scan_results(page.text(), software, &mut candidates, &mut links);
        }

        let best = best_candidate(&candidates);
        if let Some(candidate) = best {
            debug!(
                "Best of {} search candidates for {software}: {} (from {})",
                candidates.len(),
                candidate.value,
                candidate.origin
            );
        }

        Ok(VersionReport {
            latest_version: best.map(|candidate| candidate.value.clone()),
            source_url: links.first().cloned(),
            ..VersionReport::empty(SourceKind::Google)
        })
    }
}

/// Pull version candidates and download-ish links out of one result page.
///
/// Parsing stays synchronous so the DOM never crosses an await point.
fn scan_results(
    body: &str,
    software: &str,
    candidates: &mut Vec<Candidate>,
    links: &mut Vec<String>,
) {
    let doc = Html::parse_document(body);
    let software_lower = software.to_lowercase();

    for block in doc.select(&RESULT_SELECTOR) {
        if let Some(title) = block.select(&TITLE_SELECTOR).next() {
            collect_candidates(&scrape::element_text(title), "result title", candidates);
        }
        if let Some(snippet) = block.select(&SNIPPET_SELECTOR).next() {
            collect_candidates(&scrape::element_text(snippet), "result snippet", candidates);
        }
        let Some(href) = block
            .select(&ANCHOR_SELECTOR)
            .find_map(|anchor| anchor.value().attr("href"))
        else {
            continue;
        };
        let href_lower = href.to_lowercase();
        let interesting = LINK_KEYWORDS
            .iter()
            .any(|keyword| href_lower.contains(keyword))
            || href_lower.contains(&software_lower);
        if interesting && !links.iter().any(|known| known == href) {
            links.push(href.to_string());
        }
    }

    for featured in doc.select(&FEATURED_SELECTOR) {
        collect_candidates(&scrape::element_text(featured), "featured snippet", candidates);
    }
}

fn collect_candidates(text: &str, origin: &'static str, candidates: &mut Vec<Candidate>) {
    for value in version::extract(text) {
        debug!("Search candidate {value} from {origin}");
        candidates.push(Candidate::new(value, origin));
    }
}

/// Stable maximum: the first candidate wins ties.
fn best_candidate(candidates: &[Candidate]) -> Option<&Candidate> {
    let mut best: Option<&Candidate> = None;
    for candidate in candidates {
        let is_better = match best {
            None => true,
            Some(current) => {
                version::compare(&candidate.value, &current.value) == Ordering::Greater
            }
        };
        if is_better {
            best = Some(candidate);
        }
    }
    best
}
