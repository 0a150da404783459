//! Shared HTTP collaborator: one configured client behind a retry and
//! status-classification policy that every source reuses
//!
//! Sources never open sockets or interpret status codes themselves; they
//! ask this client for a page and treat any error as "source unavailable".

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use reqwest::{Client, StatusCode};
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use crate::config::{HttpConfig, RETRY_BACKOFF_MS};

/// Fixed agent used when rotation is disabled
pub const DEFAULT_USER_AGENT: &str = concat!("version-scout/", env!("CARGO_PKG_VERSION"));

/// Browser-like agents cycled per request when rotation is enabled.
/// Some vendors serve stripped-down pages to obvious bots.
const USER_AGENT_POOL: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:128.0) Gecko/20100101 Firefox/128.0",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36",
];

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Retries exhausted for {url} (last status {status})")]
    RetriesExhausted { url: String, status: u16 },

    #[error("Unexpected status {status} for {url}")]
    Status { url: String, status: u16 },
}

/// A fetched page: final URL after redirects, status, decoded body
#[derive(Debug, Clone)]
pub struct Page {
    url: Url,
    status: StatusCode,
    body: String,
}

impl Page {
    /// URL the response actually came from, after redirects
    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn text(&self) -> &str {
        &self.body
    }

    /// Decode the body as JSON
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_str(&self.body)
    }
}

/// Configured HTTP client shared by all sources.
///
/// Cheap to clone; clones share the underlying connection pool and the
/// User-Agent rotation counter.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    config: Arc<HttpConfig>,
    next_agent: Arc<AtomicUsize>,
}

impl HttpClient {
    pub fn new(config: &HttpConfig) -> Result<Self, HttpError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(build_headers(config))
            .build()?;

        Ok(Self {
            client,
            config: Arc::new(config.clone()),
            next_agent: Arc::new(AtomicUsize::new(0)),
        })
    }

    fn user_agent(&self) -> &'static str {
        if self.config.rotate_user_agent {
            let n = self.next_agent.fetch_add(1, Ordering::Relaxed);
            USER_AGENT_POOL[n % USER_AGENT_POOL.len()]
        } else {
            DEFAULT_USER_AGENT
        }
    }

    /// GET `url` with `params`, honoring the configured retry policy.
    ///
    /// Transport errors and statuses in `retryStatusCodes` are retried up
    /// to `maxRetries` times with linear backoff; statuses outside the
    /// configured success set fail immediately.
    pub async fn get(&self, url: &str, params: &[(&str, &str)]) -> Result<Page, HttpError> {
        let mut attempt: u32 = 0;
        loop {
            if attempt > 0 {
                tokio::time::sleep(Duration::from_millis(RETRY_BACKOFF_MS * u64::from(attempt)))
                    .await;
            }

            let request = self
                .client
                .get(url)
                .query(params)
                .header(USER_AGENT, self.user_agent());

            let response = match request.send().await {
                Ok(response) => response,
                Err(e) => {
                    if attempt >= self.config.max_retries {
                        return Err(HttpError::Transport(e));
                    }
                    warn!("Request to {url} failed (attempt {}): {e}", attempt + 1);
                    attempt += 1;
                    continue;
                }
            };

            let status = response.status();
            if self.config.success_status_codes.contains(&status.as_u16()) {
                let final_url = response.url().clone();
                let body = response.text().await?;
                debug!("Fetched {final_url} ({status}, {} bytes)", body.len());
                return Ok(Page {
                    url: final_url,
                    status,
                    body,
                });
            }

            if self.config.retry_status_codes.contains(&status.as_u16()) {
                if attempt >= self.config.max_retries {
                    return Err(HttpError::RetriesExhausted {
                        url: url.to_string(),
                        status: status.as_u16(),
                    });
                }
                warn!("Retryable status {status} from {url} (attempt {})", attempt + 1);
                attempt += 1;
                continue;
            }

            return Err(HttpError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
    }
}

fn build_headers(config: &HttpConfig) -> HeaderMap {
    let mut headers = HeaderMap::new();
    for (name, value) in &config.headers {
        let Ok(header_name) = HeaderName::from_bytes(name.as_bytes()) else {
            warn!("Skipping invalid header name {name:?}");
            continue;
        };
        let Ok(header_value) = HeaderValue::from_str(value) else {
            warn!("Skipping invalid value for header {name}");
            continue;
        };
        headers.insert(header_name, header_value);
    }
    headers
}
