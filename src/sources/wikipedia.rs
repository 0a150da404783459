//! Encyclopedia source: version rows in article infoboxes
//!
//! Finds the article through the MediaWiki prefix-search API, fetches it,
//! and reads the first infobox row that mentions a version.

use std::sync::LazyLock;

use async_trait::async_trait;
use indexmap::IndexMap;
use scraper::{Html, Selector};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::http::HttpClient;
use crate::scrape;
use crate::source::{Source, SourceError, SourceKind, VersionReport};
use crate::version;

/// Language editions tried in order
const DEFAULT_EDITIONS: &[&str] = &["en", "pt"];

static INFOBOX_ROW_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("table.infobox tr").expect("Failed to parse infobox selector")
});

/// One language edition of the encyclopedia
#[derive(Debug, Clone)]
pub struct Edition {
    pub lang: String,
    pub base_url: String,
}

impl Edition {
    fn standard(lang: &str) -> Self {
        Self {
            lang: lang.to_string(),
            base_url: format!("https://{lang}.wikipedia.org"),
        }
    }
}

/// Encyclopedia-backed source
pub struct WikipediaSource {
    client: HttpClient,
    editions: Vec<Edition>,
}

impl WikipediaSource {
    pub fn new(client: HttpClient) -> Self {
        let editions = DEFAULT_EDITIONS
            .iter()
            .map(|lang| Edition::standard(lang))
            .collect();
        Self::with_editions(client, editions)
    }

    /// Override the edition list, for tests.
    pub fn with_editions(client: HttpClient, editions: Vec<Edition>) -> Self {
        Self { client, editions }
    }

    /// First page matching `software` on one edition, by prefix search.
    async fn search_page(&self, edition: &Edition, software: &str) -> Option<PageStub> {
        let url = format!("{}/w/api.php", edition.base_url);
        let params = [
            ("action", "query"),
            ("format", "json"),
            ("generator", "prefixsearch"),
            ("redirects", ""),
            ("gpssearch", software),
            ("gpslimit", "1"),
            ("gpsnamespace", "0"),
        ];

        let page = match self.client.get(&url, &params).await {
            Ok(page) => page,
            Err(e) => {
                warn!("Article search on {}.wikipedia failed: {e}", edition.lang);
                return None;
            }
        };
        let response: SearchResponse = match page.json() {
            Ok(response) => response,
            Err(e) => {
                warn!(
                    "Malformed search response from {}.wikipedia: {e}",
                    edition.lang
                );
                return None;
            }
        };
        response.query.and_then(|query| query.pages.into_values().next())
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    query: Option<SearchQuery>,
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    #[serde(default)]
    pages: IndexMap<String, PageStub>,
}

#[derive(Debug, Deserialize)]
struct PageStub {
    pageid: u64,
    #[serde(default)]
    title: String,
}

#[async_trait]
impl Source for WikipediaSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Wikipedia
    }

    // Prefix search works for any name.
    fn can_handle(&self, _software: &str) -> bool {
        true
    }

    async fn fetch_latest(&self, software: &str) -> Result<VersionReport, SourceError> {
        for edition in &self.editions {
            let Some(stub) = self.search_page(edition, software).await else {
                continue;
            };
            debug!(
                "Found article {:?} (id {}) on {}.wikipedia",
                stub.title, stub.pageid, edition.lang
            );

            let url = format!("{}/w/index.php", edition.base_url);
            let pageid = stub.pageid.to_string();
            let page = match self.client.get(&url, &[("curid", pageid.as_str())]).await {
                Ok(page) => page,
                Err(e) => {
                    warn!(
                        "Fetching article {} from {}.wikipedia failed: {e}",
                        stub.pageid, edition.lang
                    );
                    continue;
                }
            };

            // The first edition whose article loads decides; later
            // editions are not consulted even when its infobox is bare.
            let latest = version_from_infobox(page.text());
            if latest.is_none() {
                warn!(
                    "No version in the {}.wikipedia infobox for {software}",
                    edition.lang
                );
            }
            return Ok(VersionReport {
                latest_version: latest,
                source_url: Some(page.url().to_string()),
                ..VersionReport::empty(SourceKind::Wikipedia)
            });
        }

        debug!("No article found for {software} on any edition");
        Ok(VersionReport::empty(SourceKind::Wikipedia))
    }
}

/// First version token in the article's infobox rows, scanned in document
/// order.
fn version_from_infobox(body: &str) -> Option<String> {
    let doc = Html::parse_document(body);
    for row in doc.select(&INFOBOX_ROW_SELECTOR) {
        let text = scrape::element_text(row);
        if let Some(candidate) = version::extract(&text).into_iter().next() {
            return Some(candidate);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HttpConfig;
    use mockito::{Matcher, Server, ServerGuard};

    fn client() -> HttpClient {
        HttpClient::new(&HttpConfig::default()).unwrap()
    }

    fn edition(lang: &str, server: &ServerGuard) -> Edition {
        Edition {
            lang: lang.to_string(),
            base_url: server.url(),
        }
    }

    const ARTICLE: &str = r#"<html><body>
        <table class="infobox"><tbody>
            <tr><th>Developer(s)</th><td>Mozilla</td></tr>
            <tr><th>Initial release</th><td>September 2002</td></tr>
            <tr><th>Stable release</th><td>128.0.2 (July 2024)</td></tr>
        </tbody></table>
    </body></html>"#;

    fn mock_search(server: &mut ServerGuard, software: &str, pageid: u64) -> mockito::Mock {
        server
            .mock("GET", "/w/api.php")
            .match_query(Matcher::UrlEncoded("gpssearch".into(), software.into()))
            .with_status(200)
            .with_body(format!(
                r#"{{"query":{{"pages":{{"{pageid}":{{"pageid":{pageid},"ns":0,"title":"Firefox"}}}}}}}}"#
            ))
    }

    #[tokio::test]
    async fn fetch_latest_reads_version_from_infobox() {
        let mut server = Server::new_async().await;
        let search = mock_search(&mut server, "firefox", 299).create_async().await;
        let article = server
            .mock("GET", "/w/index.php")
            .match_query(Matcher::UrlEncoded("curid".into(), "299".into()))
            .with_status(200)
            .with_body(ARTICLE)
            .create_async()
            .await;

        let source = WikipediaSource::with_editions(client(), vec![edition("en", &server)]);
        let report = source.fetch_latest("firefox").await.unwrap();

        search.assert_async().await;
        article.assert_async().await;
        assert_eq!(report.latest_version.as_deref(), Some("128.0.2"));
        assert_eq!(report.method, SourceKind::Wikipedia);
        let source_url = report.source_url.unwrap();
        assert!(source_url.contains("/w/index.php"));
        assert!(source_url.contains("curid=299"));
    }

    #[tokio::test]
    async fn fetch_latest_falls_back_to_next_edition() {
        let mut en_server = Server::new_async().await;
        let en_search = en_server
            .mock("GET", "/w/api.php")
            .match_query(Matcher::Any)
            .with_status(404)
            .create_async()
            .await;

        let mut pt_server = Server::new_async().await;
        let pt_search = mock_search(&mut pt_server, "firefox", 77).create_async().await;
        let pt_article = pt_server
            .mock("GET", "/w/index.php")
            .match_query(Matcher::UrlEncoded("curid".into(), "77".into()))
            .with_status(200)
            .with_body(ARTICLE)
            .create_async()
            .await;

        let source = WikipediaSource::with_editions(
            client(),
            vec![edition("en", &en_server), edition("pt", &pt_server)],
        );
        let report = source.fetch_latest("firefox").await.unwrap();

        en_search.assert_async().await;
        pt_search.assert_async().await;
        pt_article.assert_async().await;
        assert_eq!(report.latest_version.as_deref(), Some("128.0.2"));
    }

    #[tokio::test]
    async fn fetch_latest_returns_empty_report_without_an_article() {
        let mut server = Server::new_async().await;
        let search = server
            .mock("GET", "/w/api.php")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"batchcomplete":""}"#)
            .create_async()
            .await;

        let source = WikipediaSource::with_editions(client(), vec![edition("en", &server)]);
        let report = source.fetch_latest("unheard-of software").await.unwrap();

        search.assert_async().await;
        assert_eq!(report, VersionReport::empty(SourceKind::Wikipedia));
    }

    #[tokio::test]
    async fn fetch_latest_keeps_page_url_when_infobox_is_bare() {
        let mut server = Server::new_async().await;
        mock_search(&mut server, "firefox", 299).create_async().await;
        server
            .mock("GET", "/w/index.php")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("<html><body><p>An article without an infobox.</p></body></html>")
            .create_async()
            .await;

        let source = WikipediaSource::with_editions(client(), vec![edition("en", &server)]);
        let report = source.fetch_latest("firefox").await.unwrap();

        assert_eq!(report.latest_version, None);
        assert!(report.source_url.is_some());
    }

    #[test]
    fn version_from_infobox_takes_first_matching_row() {
        let body = r#"<table class="infobox">
            <tr><td>Preview release 130.0b3</td></tr>
            <tr><td>Stable release 128.0.2</td></tr>
        </table>"#;
        // the b3 suffix is not part of the dotted run
        assert_eq!(version_from_infobox(body).as_deref(), Some("130.0"));
    }

    #[test]
    fn version_from_infobox_handles_missing_table() {
        assert_eq!(version_from_infobox("<p>nothing here</p>"), None);
    }
}
