// =============================================================================
// Runtime Configuration — dashboard settings loaded from JSON + environment
// =============================================================================
//
// All fields carry `#[serde(default)]` so that a partial or older config file
// still loads. Secrets (API key, dashboard passphrase) are never part of this
// struct; they are read from the environment by `main`.
// =============================================================================

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::market::{DEFAULT_BEDROOM_COUNTS, DEFAULT_HISTORY_MONTHS, DEFAULT_HOUSING_TYPES};
use crate::rentcast::DEFAULT_BASE_URL;

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_zips() -> Vec<String> {
    vec!["32789".to_string(), "32792".to_string(), "32807".to_string()]
}

fn default_bind_addr() -> String {
    "0.0.0.0:3001".to_string()
}

fn default_housing_types() -> Vec<String> {
    DEFAULT_HOUSING_TYPES.iter().map(|t| t.to_string()).collect()
}

fn default_bedroom_counts() -> Vec<u32> {
    DEFAULT_BEDROOM_COUNTS.to_vec()
}

fn default_history_months() -> Vec<String> {
    DEFAULT_HISTORY_MONTHS.iter().map(|m| m.to_string()).collect()
}

// =============================================================================
// DashboardConfig
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    // --- Upstream -----------------------------------------------------------

    /// Market-data API root, or a local proxy in front of it.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Request timeout in seconds. Unset means the transport default.
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,

    // --- Dashboard ----------------------------------------------------------

    /// ZIP codes compared on the dashboard.
    #[serde(default = "default_zips")]
    pub zips: Vec<String>,

    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    // --- Cache --------------------------------------------------------------

    /// Directory for on-disk cache entries. In-memory when unset.
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,

    /// Entry limit for the in-memory store.
    #[serde(default)]
    pub cache_max_entries: Option<usize>,

    // --- Chart defaults -----------------------------------------------------

    #[serde(default = "default_housing_types")]
    pub housing_types: Vec<String>,

    #[serde(default = "default_bedroom_counts")]
    pub bedroom_counts: Vec<u32>,

    #[serde(default = "default_history_months")]
    pub history_months: Vec<String>,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_secs: None,
            zips: default_zips(),
            bind_addr: default_bind_addr(),
            cache_dir: None,
            cache_max_entries: None,
            housing_types: default_housing_types(),
            bedroom_counts: default_bedroom_counts(),
            history_months: default_history_months(),
        }
    }
}

impl DashboardConfig {
    /// Load configuration from a JSON file at `path`.
    ///
    /// A missing file is an error so the caller can fall back to defaults
    /// with a warning.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read dashboard config from {}", path.display()))?;

        let mut config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse dashboard config from {}", path.display()))?;
        config.zips = clean_zips(config.zips);

        info!(
            path = %path.display(),
            zips = ?config.zips,
            base_url = %config.base_url,
            "dashboard config loaded"
        );

        Ok(config)
    }

    /// Apply environment overrides on top of the file/default values.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(url) = var("RENTCAST_BASE_URL").filter(|v| !v.trim().is_empty()) {
            self.base_url = url.trim().to_string();
        }
        if let Some(list) = var("RENTSCOPE_ZIPS") {
            let zips = clean_zips(list.split(',').map(str::to_string).collect());
            if !zips.is_empty() {
                self.zips = zips;
            }
        }
        if let Some(addr) = var("RENTSCOPE_BIND_ADDR").filter(|v| !v.trim().is_empty()) {
            self.bind_addr = addr.trim().to_string();
        }
        if let Some(dir) = var("RENTSCOPE_CACHE_DIR").filter(|v| !v.trim().is_empty()) {
            self.cache_dir = Some(PathBuf::from(dir.trim()));
        }
    }

    pub fn request_timeout(&self) -> Option<std::time::Duration> {
        self.request_timeout_secs.map(std::time::Duration::from_secs)
    }
}

/// Trim every ZIP and drop blanks.
pub fn clean_zips(zips: Vec<String>) -> Vec<String> {
    zips.into_iter()
        .map(|z| z.trim().to_string())
        .filter(|z| !z.is_empty())
        .collect()
}
