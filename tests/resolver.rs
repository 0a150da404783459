//! End-to-end resolution through real sources wired to mock HTTP servers

use std::sync::Arc;

use indexmap::IndexMap;
use mockito::{Matcher, Server};
use serde_json::json;

use version_scout::config::HttpConfig;
use version_scout::http::HttpClient;
use version_scout::resolver::{MissingCurrentPolicy, Resolver};
use version_scout::source::{Source, SourceKind, VersionReport};
use version_scout::sources::vendor::VendorEntry;
use version_scout::sources::wikipedia::Edition;
use version_scout::sources::{GoogleSource, VendorSource, WikipediaSource};

fn test_client() -> HttpClient {
    // No retries, so degraded-source paths stay fast.
    let config = HttpConfig {
        max_retries: 0,
        ..HttpConfig::default()
    };
    HttpClient::new(&config).unwrap()
}

fn single_edition(base_url: String) -> Vec<Edition> {
    vec![Edition {
        lang: "en".to_string(),
        base_url,
    }]
}

#[tokio::test(flavor = "multi_thread")]
async fn highest_version_across_all_three_sources_wins() {
    // 1. The search engine knows an older release
    let mut google = Server::new_async().await;
    let google_mock = google
        .mock("GET", "/search")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(
            r#"<html><body>
            <div class="MjjYud">
              <h3>VLC media player 3.0.18 released</h3>
              <div class="VwiC3b">Download VLC media player 3.0.18 for Windows</div>
              <a href="https://www.videolan.org/vlc/download.html">Download</a>
            </div>
            </body></html>"#,
        )
        .expect(3)
        .create_async()
        .await;

    // 2. The encyclopedia infobox is slightly newer
    let mut wiki = Server::new_async().await;
    wiki.mock("GET", "/w/api.php")
        .match_query(Matcher::UrlEncoded("gpssearch".into(), "vlc".into()))
        .with_status(200)
        .with_body(
            json!({"query": {"pages": {"299": {"pageid": 299, "title": "VLC media player"}}}})
                .to_string(),
        )
        .create_async()
        .await;
    wiki.mock("GET", "/w/index.php")
        .match_query(Matcher::UrlEncoded("curid".into(), "299".into()))
        .with_status(200)
        .with_body(
            r#"<html><body><table class="infobox">
            <tr><th>Initial release</th><td>February 2001</td></tr>
            <tr><th>Stable release</th><td>3.0.20</td></tr>
            </table></body></html>"#,
        )
        .create_async()
        .await;

    // 3. The vendor page carries the newest release
    let mut vendor = Server::new_async().await;
    let vendor_mock = vendor
        .mock("GET", "/download")
        .with_status(200)
        .with_body(
            r#"<html><body>
            <p class="release-version">VLC 3.0.21</p>
            <a class="download-button" href="/files/vlc-3.0.21-win64.exe">Download</a>
            <p>Released on 2024-06-07</p>
            </body></html>"#,
        )
        .create_async()
        .await;

    let catalog = IndexMap::from([(
        "vlc".to_string(),
        VendorEntry {
            url: format!("{}/download", vendor.url()),
            version_selector: Some(".release-version".to_string()),
            download_selector: Some(".download-button".to_string()),
            ..VendorEntry::default()
        },
    )]);

    let sources: Vec<Arc<dyn Source>> = vec![
        Arc::new(GoogleSource::with_base_url(test_client(), google.url())),
        Arc::new(WikipediaSource::with_editions(
            test_client(),
            single_edition(wiki.url()),
        )),
        Arc::new(VendorSource::with_catalog(
            test_client(),
            catalog,
            IndexMap::new(),
        )),
    ];
    let resolver = Resolver::new(sources, MissingCurrentPolicy::default());

    // 4. Resolve with an installed version older than everything found
    let report = resolver.resolve("vlc", Some("3.0.17")).await.unwrap();

    google_mock.assert_async().await;
    vendor_mock.assert_async().await;
    assert_eq!(
        report,
        VersionReport {
            current_version: Some("3.0.17".to_string()),
            latest_version: Some("3.0.21".to_string()),
            update_found: true,
            source_url: Some(format!("{}/files/vlc-3.0.21-win64.exe", vendor.url())),
            release_date: Some("2024-06-07".to_string()),
            method: SourceKind::Vendor,
        }
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn surviving_source_answers_when_others_are_down_or_unlisted() {
    // 1. The search engine is down hard
    let mut google = Server::new_async().await;
    google
        .mock("GET", "/search")
        .match_query(Matcher::Any)
        .with_status(500)
        .create_async()
        .await;

    // 2. The encyclopedia knows the software
    let mut wiki = Server::new_async().await;
    wiki.mock("GET", "/w/api.php")
        .match_query(Matcher::UrlEncoded("gpssearch".into(), "gimp".into()))
        .with_status(200)
        .with_body(json!({"query": {"pages": {"4291": {"pageid": 4291, "title": "GIMP"}}}}).to_string())
        .create_async()
        .await;
    wiki.mock("GET", "/w/index.php")
        .match_query(Matcher::UrlEncoded("curid".into(), "4291".into()))
        .with_status(200)
        .with_body(
            r#"<html><body><table class="infobox vevent">
            <tr><th>Developer(s)</th><td>GIMP Development Team</td></tr>
            <tr><th>Stable release</th><td>2.10.38</td></tr>
            </table></body></html>"#,
        )
        .create_async()
        .await;

    // 3. No vendor catalog entry for this software
    let sources: Vec<Arc<dyn Source>> = vec![
        Arc::new(GoogleSource::with_base_url(test_client(), google.url())),
        Arc::new(WikipediaSource::with_editions(
            test_client(),
            single_edition(wiki.url()),
        )),
        Arc::new(VendorSource::with_catalog(
            test_client(),
            IndexMap::new(),
            IndexMap::new(),
        )),
    ];
    let resolver = Resolver::new(sources, MissingCurrentPolicy::default());

    let report = resolver.resolve("gimp", None).await.unwrap();

    assert_eq!(report.method, SourceKind::Wikipedia);
    assert_eq!(report.latest_version.as_deref(), Some("2.10.38"));
    assert_eq!(
        report.source_url,
        Some(format!("{}/w/index.php?curid=4291", wiki.url()))
    );
    assert!(!report.update_found);
    assert_eq!(report.current_version, None);
}

#[tokio::test(flavor = "multi_thread")]
async fn no_information_from_any_source_resolves_to_none() {
    // 1. Search results carry no version numbers
    let mut google = Server::new_async().await;
    google
        .mock("GET", "/search")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(
            r#"<html><body><div class="MjjYud"><h3>News about nothing</h3></div></body></html>"#,
        )
        .create_async()
        .await;

    // 2. No article on the encyclopedia
    let mut wiki = Server::new_async().await;
    wiki.mock("GET", "/w/api.php")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(json!({"batchcomplete": ""}).to_string())
        .create_async()
        .await;

    // 3. The vendor catalog has no entry either
    let sources: Vec<Arc<dyn Source>> = vec![
        Arc::new(GoogleSource::with_base_url(test_client(), google.url())),
        Arc::new(WikipediaSource::with_editions(
            test_client(),
            single_edition(wiki.url()),
        )),
        Arc::new(VendorSource::with_catalog(
            test_client(),
            IndexMap::new(),
            IndexMap::new(),
        )),
    ];
    let resolver = Resolver::new(sources, MissingCurrentPolicy::default());

    assert!(resolver.resolve("netscape navigator", None).await.is_none());
}
