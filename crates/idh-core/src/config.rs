use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::retry::{BackoffPolicy, RetryPolicy};

/// Retry policy parameters (optional section in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of retries after a 429 (total attempts = max_retries + 1).
    pub max_retries: u32,
    /// Initial backoff delay in milliseconds; doubled on every retry.
    pub initial_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            initial_delay_ms: 1000,
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            backoff: BackoffPolicy::new(Duration::from_millis(self.initial_delay_ms)),
        }
    }
}

/// Remote identity API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Scheme and host of the API, e.g. `https://outputter.io`.
    pub base_url: String,
    /// Country code appended to `/api/identity/`.
    pub country_code: String,
    /// Basic-auth user.
    #[serde(default)]
    pub client_id: String,
    /// Basic-auth password.
    #[serde(default)]
    pub secret: String,
    /// Total per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    10
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://outputter.io".to_string(),
            country_code: "DE".to_string(),
            client_id: String::new(),
            secret: String::new(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl ApiConfig {
    /// Full identity endpoint: `<base_url>/api/identity/<country_code>`.
    pub fn endpoint(&self) -> Result<url::Url> {
        let mut base = url::Url::parse(&self.base_url)
            .with_context(|| format!("invalid api base_url: {}", self.base_url))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let endpoint = base
            .join(&format!("api/identity/{}", self.country_code.trim()))
            .context("build identity endpoint")?;
        Ok(endpoint)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }

    pub fn has_credentials(&self) -> bool {
        !self.client_id.is_empty()
    }
}

/// Global configuration loaded from `~/.config/idh/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarvestConfig {
    /// Number of identity requests issued per run.
    pub total_requests: u64,
    /// Maximum number of requests in flight at once.
    pub max_concurrency: usize,
    /// Flush the buffer every time this many requests have completed.
    pub flush_every: u64,
    /// Spreadsheet written by the run (relative paths resolve against the cwd).
    pub output_path: PathBuf,
    /// Worksheet that receives the rows.
    pub sheet_name: String,
    /// Optional retry policy; if missing, built-in defaults are used.
    #[serde(default)]
    pub retry: Option<RetryConfig>,
    #[serde(default)]
    pub api: ApiConfig,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            total_requests: 5500,
            max_concurrency: 5,
            flush_every: 30,
            output_path: PathBuf::from("user_data.xlsx"),
            sheet_name: "User Data".to_string(),
            retry: None,
            api: ApiConfig::default(),
        }
    }
}

impl HarvestConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry.clone().unwrap_or_default().policy()
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("idh")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<HarvestConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = HarvestConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }
    load_from_path(&path)
}

/// Load configuration from an explicit file; it must exist.
pub fn load_from_path(path: &Path) -> Result<HarvestConfig> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("read config {}", path.display()))?;
    let cfg: HarvestConfig =
        toml::from_str(&data).with_context(|| format!("parse config {}", path.display()))?;
    Ok(cfg)
}
