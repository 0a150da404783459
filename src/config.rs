use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::Deserialize;
use thiserror::Error;

use crate::resolver::MissingCurrentPolicy;

// =============================================================================
// Network-related constants
// =============================================================================

/// Default per-request timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Default number of retries after the first attempt
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Linear backoff step between retry attempts (milliseconds)
pub const RETRY_BACKOFF_MS: u64 = 250;

/// Top-level configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    /// Enabled sources, in dispatch (and tie-break) order
    pub methods: Vec<String>,
    /// How to report updates when the caller supplies no current version
    pub missing_current: MissingCurrentPolicy,
    pub http: HttpConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            methods: default_methods(),
            missing_current: MissingCurrentPolicy::default(),
            http: HttpConfig::default(),
        }
    }
}

fn default_methods() -> Vec<String> {
    vec![
        "google".to_string(),
        "wikipedia".to_string(),
        "vendor".to_string(),
    ]
}

/// HTTP collaborator configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct HttpConfig {
    pub timeout_secs: u64,
    pub max_retries: u32,
    /// Statuses worth another attempt
    pub retry_status_codes: Vec<u16>,
    /// Statuses whose body is usable
    pub success_status_codes: Vec<u16>,
    /// Cycle through browser-like User-Agent values instead of a fixed one
    pub rotate_user_agent: bool,
    /// Headers attached to every request
    pub headers: IndexMap<String, String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_status_codes: vec![429, 500, 502, 503, 504],
            success_status_codes: (200..=208).collect(),
            rotate_user_agent: true,
            headers: default_headers(),
        }
    }
}

fn default_headers() -> IndexMap<String, String> {
    IndexMap::from([
        (
            "Accept".to_string(),
            "text/html,application/xhtml+xml,application/xml;q=0.9,application/json;q=0.8"
                .to_string(),
        ),
        ("Accept-Language".to_string(), "en-US,en,pt-BR,pt".to_string()),
        ("Cache-Control".to_string(), "no-cache".to_string()),
        ("Referer".to_string(), "https://www.google.com/".to_string()),
        ("DNT".to_string(), "1".to_string()),
    ])
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),
}

impl Config {
    /// Load configuration from a JSON file. Missing fields take their
    /// defaults, so a partial file is fine.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// Returns the path to the data directory for version-scout.
/// Uses $XDG_DATA_HOME/version-scout if XDG_DATA_HOME is set,
/// otherwise falls back to ~/.local/share/version-scout,
/// or ./version-scout if neither is available.
pub fn data_dir() -> PathBuf {
    data_dir_with_env(std::env::var("XDG_DATA_HOME").ok(), dirs::home_dir())
}

/// Returns the path to the log file.
pub fn log_path() -> PathBuf {
    data_dir().join("version-scout.log")
}

fn data_dir_with_env(xdg_data_home: Option<String>, home_dir: Option<PathBuf>) -> PathBuf {
    let data_dir = xdg_data_home
        .map(PathBuf::from)
        .or_else(|| home_dir.map(|home| home.join(".local/share")))
        .unwrap_or_else(|| PathBuf::from("."));

    data_dir.join("version-scout")
}
