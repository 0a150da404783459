//! Curated vendor-page source: known download/release pages and how to
//! read each of them

use async_trait::async_trait;
use indexmap::IndexMap;
use regex::Regex;
use scraper::{Html, Selector};
use tracing::{debug, warn};
use url::Url;

use crate::http::HttpClient;
use crate::scrape;
use crate::source::{Source, SourceError, SourceKind, VersionReport};
use crate::version;

/// Where to look for one piece of software and how to read the page
#[derive(Debug, Clone, Default)]
pub struct VendorEntry {
    pub url: String,
    /// CSS selector for the element carrying the version
    pub version_selector: Option<String>,
    /// Regex with one capture group; applied to the selected element's
    /// text, or to the raw page when no selector is configured
    pub version_pattern: Option<String>,
    /// CSS selector for the download anchor
    pub download_selector: Option<String>,
}

fn default_catalog() -> IndexMap<String, VendorEntry> {
    IndexMap::from([
        (
            "firefox".to_string(),
            VendorEntry {
                url: "https://www.mozilla.org/en-US/firefox/new/".to_string(),
                version_selector: Some(".c-release-version".to_string()),
                download_selector: Some(".download-link".to_string()),
                ..VendorEntry::default()
            },
        ),
        (
            "chrome".to_string(),
            VendorEntry {
                url: "https://www.google.com/chrome/".to_string(),
                version_pattern: Some(r"Chrome\s+(\d+\.\d+\.\d+\.\d+)".to_string()),
                ..VendorEntry::default()
            },
        ),
        (
            "vlc".to_string(),
            VendorEntry {
                url: "https://www.videolan.org/vlc/".to_string(),
                version_selector: Some(".get-vlc-release".to_string()),
                ..VendorEntry::default()
            },
        ),
        (
            "vmware".to_string(),
            VendorEntry {
                url: "https://www.vmware.com/products/workstation-pro.html".to_string(),
                version_pattern: Some(r"VMware Workstation (\d+\.?\d*)".to_string()),
                ..VendorEntry::default()
            },
        ),
        (
            "visual studio code".to_string(),
            VendorEntry {
                url: "https://code.visualstudio.com/updates".to_string(),
                version_selector: Some(".release .title".to_string()),
                ..VendorEntry::default()
            },
        ),
        (
            "nodejs".to_string(),
            VendorEntry {
                url: "https://nodejs.org/en/".to_string(),
                version_selector: Some(".home-downloadbutton".to_string()),
                ..VendorEntry::default()
            },
        ),
        (
            "python".to_string(),
            VendorEntry {
                url: "https://www.python.org/downloads/".to_string(),
                version_selector: Some(".download-for-current-os .download-os-windows a".to_string()),
                version_pattern: Some(r"Python\s+(\d+\.\d+\.\d+)".to_string()),
                ..VendorEntry::default()
            },
        ),
    ])
}

fn default_aliases() -> IndexMap<String, String> {
    IndexMap::from([
        ("vs code".to_string(), "visual studio code".to_string()),
        ("vscode".to_string(), "visual studio code".to_string()),
        ("chrome browser".to_string(), "chrome".to_string()),
        ("google chrome".to_string(), "chrome".to_string()),
        ("mozilla firefox".to_string(), "firefox".to_string()),
        ("vmware workstation".to_string(), "vmware".to_string()),
        ("vmware workstation pro".to_string(), "vmware".to_string()),
        ("node.js".to_string(), "nodejs".to_string()),
        ("node".to_string(), "nodejs".to_string()),
    ])
}

/// Source backed by a curated catalog of vendor pages
pub struct VendorSource {
    client: HttpClient,
    catalog: IndexMap<String, VendorEntry>,
    aliases: IndexMap<String, String>,
}

impl VendorSource {
    pub fn new(client: HttpClient) -> Self {
        Self::with_catalog(client, default_catalog(), default_aliases())
    }

    /// Custom catalog and aliases, for tests.
    pub fn with_catalog(
        client: HttpClient,
        catalog: IndexMap<String, VendorEntry>,
        aliases: IndexMap<String, String>,
    ) -> Self {
        Self {
            client,
            catalog,
            aliases,
        }
    }

    fn entry_for(&self, software: &str) -> Option<(&str, &VendorEntry)> {
        let key = software.trim().to_lowercase();
        let canonical = self.aliases.get(&key).map(String::as_str).unwrap_or(&key);
        self.catalog
            .get_key_value(canonical)
            .map(|(name, entry)| (name.as_str(), entry))
    }
}

#[async_trait]
impl Source for VendorSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Vendor
    }

    fn can_handle(&self, software: &str) -> bool {
        self.entry_for(software).is_some()
    }

    async fn fetch_latest(&self, software: &str) -> Result<VersionReport, SourceError> {
        let Some((canonical, entry)) = self.entry_for(software) else {
            // can_handle gates this; no point guessing at unknown vendors
            return Ok(VersionReport::empty(SourceKind::Vendor));
        };

        let page = match self.client.get(&entry.url, &[]).await {
            Ok(page) => page,
            Err(e) => {
                warn!("Vendor page for {canonical} unavailable: {e}");
                return Ok(VersionReport::empty(SourceKind::Vendor));
            }
        };

        let findings = read_vendor_page(canonical, entry, page.text())?;
        match &findings.version {
            Some(found) => debug!("Vendor page reports {canonical} at {found}"),
            None => warn!("No version found on the vendor page for {canonical}"),
        }

        Ok(VersionReport {
            latest_version: findings.version,
            source_url: findings.download_url.or_else(|| Some(entry.url.clone())),
            release_date: findings.release_date,
            ..VersionReport::empty(SourceKind::Vendor)
        })
    }
}

struct PageFindings {
    version: Option<String>,
    download_url: Option<String>,
    release_date: Option<String>,
}

/// Read one vendor page according to its catalog entry.
///
/// Extraction precedence is fixed: selector plus pattern, then selector
/// alone, then pattern alone over the raw page. When the configured route
/// finds nothing the conventional page metadata gets a chance.
fn read_vendor_page(
    software: &str,
    entry: &VendorEntry,
    body: &str,
) -> Result<PageFindings, SourceError> {
    let doc = Html::parse_document(body);
    let base_url = Url::parse(&entry.url).ok();

    let mut found_version = None;
    if let Some(selector_str) = &entry.version_selector {
        let selector = parse_selector(software, selector_str)?;
        if let Some(element) = doc.select(&selector).next() {
            let text = scrape::element_text(element);
            found_version = match &entry.version_pattern {
                Some(pattern) => capture_version(software, pattern, &text)?,
                None => version::extract(&text).into_iter().next(),
            };
        } else {
            debug!("Selector {selector_str:?} matched nothing for {software}");
        }
    } else if let Some(pattern) = &entry.version_pattern {
        found_version = capture_version(software, pattern, body)?;
    }

    // Markup drifts out from under catalog entries; page metadata is the
    // last resort before giving up.
    if found_version.is_none() {
        found_version =
            scrape::version_in_meta_tags(&doc).or_else(|| scrape::version_in_headings(&doc));
        if found_version.is_some() {
            debug!("Fell back to page metadata for {software}");
        }
    }

    let mut download_url = None;
    if let Some(selector_str) = &entry.download_selector {
        let selector = parse_selector(software, selector_str)?;
        if let Some(href) = doc
            .select(&selector)
            .find_map(|element| element.value().attr("href"))
        {
            download_url = Some(absolutize(href, base_url.as_ref()));
        }
    }
    if download_url.is_none() {
        if let Some(base) = base_url.as_ref() {
            download_url = scrape::find_download_links(&doc, base)
                .into_iter()
                .map(|(_, link)| link)
                .next();
        }
    }

    Ok(PageFindings {
        version: found_version,
        download_url,
        release_date: scrape::extract_release_date(&doc),
    })
}

fn parse_selector(software: &str, selector: &str) -> Result<Selector, SourceError> {
    Selector::parse(selector).map_err(|_| SourceError::InvalidSelector {
        software: software.to_string(),
        selector: selector.to_string(),
    })
}

fn capture_version(
    software: &str,
    pattern: &str,
    text: &str,
) -> Result<Option<String>, SourceError> {
    let re = Regex::new(pattern).map_err(|_| SourceError::InvalidPattern {
        software: software.to_string(),
        pattern: pattern.to_string(),
    })?;
    Ok(re
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string()))
}

fn absolutize(href: &str, base: Option<&Url>) -> String {
    match Url::parse(href) {
        Ok(absolute) => absolute.to_string(),
        Err(_) => base
            .and_then(|base| base.join(href).ok())
            .map(|joined| joined.to_string())
            .unwrap_or_else(|| href.to_string()),
    }
}
