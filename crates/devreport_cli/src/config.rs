//! Configuration file support for devreport.
//!
//! Configuration is loaded with the following precedence (highest to lowest):
//! 1. CLI flags
//! 2. Environment variables (prefixed with `DEVREPORT_`, sections split by `__`,
//!    e.g. `DEVREPORT_CLICKUP__TOKEN`)
//! 3. Config file (./devreport.toml, then ~/.config/devreport/config.toml)
//! 4. Built-in defaults
//!
//! Example config file:
//! ```toml
//! [clickup]
//! token = "pk_..."              # or DEVREPORT_CLICKUP__TOKEN / CLICKUP_API_KEY
//! list_ids = ["901", "902"]     # or a comma-separated string
//! folder_id = "90120"           # alternative to list_ids
//! assignee_ids = ["4242"]
//! category = "Improvements/Issues/New Development/Urgent Support/Fixes"
//!
//! [fetch]
//! max_workers = 5
//! requests_per_minute = 100
//! burst = 10
//! max_retries = 5
//!
//! [rewrite]
//! enabled = false
//! url = "http://localhost:11434"
//! model = "gemma3"
//! timeout_secs = 60
//! ```

use std::path::PathBuf;
use std::time::Duration;

use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use devreport::clickup::{DEFAULT_BASE_URL, DEFAULT_CATEGORY, DEFAULT_MAX_WORKERS, FetchOptions};
use devreport::rewrite::{DEFAULT_MODEL, DEFAULT_OLLAMA_URL, DEFAULT_TIMEOUT, RewriteOptions};
use devreport::{RetryConfig, rate_limits, retry};
use directories::ProjectDirs;
use serde::{Deserialize, Deserializer};

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub clickup: ClickUpConfig,
    pub fetch: FetchConfig,
    pub rewrite: RewriteConfig,
}

/// ClickUp configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ClickUpConfig {
    /// API token.
    pub token: Option<String>,
    /// Lists to fetch. Ignored when `folder_id` is set.
    #[serde(deserialize_with = "string_or_list")]
    pub list_ids: Vec<String>,
    /// Fetch every list in this folder.
    pub folder_id: Option<String>,
    /// Only fetch tasks assigned to these users.
    #[serde(deserialize_with = "string_or_list")]
    pub assignee_ids: Vec<String>,
    pub base_url: String,
    /// Suffix for roll-up titles.
    pub category: String,
}

impl Default for ClickUpConfig {
    fn default() -> Self {
        Self {
            token: None,
            list_ids: Vec::new(),
            folder_id: None,
            assignee_ids: Vec::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            category: DEFAULT_CATEGORY.to_string(),
        }
    }
}

/// Fetch pipeline tunables.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub max_workers: usize,
    pub requests_per_minute: u32,
    pub burst: u32,
    pub max_retries: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_workers: DEFAULT_MAX_WORKERS,
            requests_per_minute: rate_limits::DEFAULT_REQUESTS_PER_MINUTE,
            burst: rate_limits::DEFAULT_BURST,
            max_retries: retry::DEFAULT_MAX_RETRIES,
        }
    }
}

impl FetchConfig {
    pub fn options(&self) -> FetchOptions {
        FetchOptions {
            max_workers: self.max_workers,
            requests_per_minute: self.requests_per_minute,
            burst: self.burst,
            retry: RetryConfig::default().with_max_retries(self.max_retries),
        }
    }
}

/// Rephrasing of roll-up achievements through a local model.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RewriteConfig {
    pub enabled: bool,
    pub url: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl Default for RewriteConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: DEFAULT_OLLAMA_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT.as_secs(),
        }
    }
}

impl RewriteConfig {
    pub fn options(&self) -> RewriteOptions {
        RewriteOptions {
            base_url: self.url.clone(),
            model: self.model.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }
}

/// Accept either `["a", "b"]` or `"a, b"`.
fn string_or_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrList {
        One(String),
        Many(Vec<String>),
    }

    Ok(match StringOrList::deserialize(deserializer)? {
        StringOrList::One(s) => split_list(&s),
        StringOrList::Many(v) => v
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
    })
}

/// Split a comma-separated value, dropping empty entries.
pub fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

impl Config {
    /// Load configuration using the config crate's layered approach.
    ///
    /// Sources are loaded in order (later sources override earlier):
    /// 1. Built-in defaults
    /// 2. XDG config file (~/.config/devreport/config.toml)
    /// 3. Local config file (./devreport.toml)
    /// 4. Environment variables with DEVREPORT_ prefix
    pub fn load() -> Self {
        let mut builder = ConfigBuilder::builder();

        if let Some(path) = Self::default_config_path()
            && path.exists()
        {
            tracing::debug!("Loading config from {:?}", path);
            builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(false));
        }

        let local_config = PathBuf::from("devreport.toml");
        if local_config.exists() {
            tracing::debug!("Loading config from ./devreport.toml");
            builder = builder.add_source(
                File::from(local_config)
                    .format(FileFormat::Toml)
                    .required(false),
            );
        }

        // DEVREPORT_FETCH__MAX_WORKERS -> fetch.max_workers
        builder = builder.add_source(
            Environment::with_prefix("DEVREPORT")
                .prefix_separator("_")
                .separator("__"),
        );

        match builder.build() {
            Ok(settings) => match settings.try_deserialize::<Config>() {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!("Failed to deserialize config: {}", e);
                    Config::default()
                }
            },
            Err(e) => {
                tracing::warn!("Failed to build config: {}", e);
                Config::default()
            }
        }
    }

    /// Get the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "devreport").map(|dirs| dirs.config_dir().join("config.toml"))
    }
}
