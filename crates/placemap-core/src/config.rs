//! Application configuration management.
//!
//! Configuration is stored at `~/.config/placemap/config.json`. A missing
//! file yields the defaults. `PLACEMAP_DATA_ROOT` and `PLACEMAP_NO_WORKER`
//! override the file; command-line flags override both.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::api::client::DEFAULT_REQUEST_TIMEOUT_SECS;
use crate::api::{DirectoryFetcher, HttpFetcher, ResourceFetcher};
use crate::cache::{CacheCapacity, DEFAULT_CAPACITY_PER_KIND};
use crate::catalogue::{CatalogueLayout, DEFAULT_MANIFEST_PATH, DEFAULT_MAPS_DIR};
use crate::labels::DEFAULT_LABELS_PATH;
use crate::search::SearchOptions;

/// Application name used for the config directory path
const APP_NAME: &str = "placemap";

const CONFIG_FILE: &str = "config.json";

pub const DEFAULT_TRANSPORTATIONS_PATH: &str = "system/transportations.json";

pub const ENV_DATA_ROOT: &str = "PLACEMAP_DATA_ROOT";
pub const ENV_NO_WORKER: &str = "PLACEMAP_NO_WORKER";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Local directory or http(s) base URL holding the data files
    pub data_root: String,
    pub manifest_path: String,
    pub maps_dir: String,
    pub labels_path: String,
    pub transportations_path: String,
    pub theme_capacity: usize,
    pub trip_capacity: usize,
    pub use_worker: bool,
    pub request_timeout_secs: u64,
    pub search_descriptions: bool,
    pub search_labels: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_root: ".".to_string(),
            manifest_path: DEFAULT_MANIFEST_PATH.to_string(),
            maps_dir: DEFAULT_MAPS_DIR.to_string(),
            labels_path: DEFAULT_LABELS_PATH.to_string(),
            transportations_path: DEFAULT_TRANSPORTATIONS_PATH.to_string(),
            theme_capacity: DEFAULT_CAPACITY_PER_KIND,
            trip_capacity: DEFAULT_CAPACITY_PER_KIND,
            use_worker: true,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            search_descriptions: true,
            search_labels: true,
        }
    }
}

impl Config {
    /// Load from the default location, then apply environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::config_path()?)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Invalid config {}", path.display()))
        } else {
            debug!(path = %path.display(), "No config file, using defaults");
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Apply environment overrides through `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(root) = lookup(ENV_DATA_ROOT).filter(|s| !s.trim().is_empty()) {
            self.data_root = root;
        }
        if let Some(flag) = lookup(ENV_NO_WORKER) {
            let flag = flag.trim().to_lowercase();
            if !flag.is_empty() && flag != "0" && flag != "false" {
                self.use_worker = false;
            }
        }
    }

    pub fn is_remote(&self) -> bool {
        self.data_root.starts_with("http://") || self.data_root.starts_with("https://")
    }

    pub fn layout(&self) -> CatalogueLayout {
        CatalogueLayout {
            manifest: self.manifest_path.clone(),
            maps_dir: self.maps_dir.clone(),
        }
    }

    pub fn capacity(&self) -> CacheCapacity {
        CacheCapacity {
            theme: self.theme_capacity,
            trip: self.trip_capacity,
        }
    }

    pub fn search_options(&self) -> SearchOptions {
        SearchOptions {
            include_description: self.search_descriptions,
            include_labels: self.search_labels,
        }
    }
}

/// Build the fetcher for the configured data root: HTTP for http(s) URLs,
/// a local directory otherwise.
pub fn fetcher_for(config: &Config) -> Result<Arc<dyn ResourceFetcher>> {
    if config.is_remote() {
        let fetcher = HttpFetcher::with_timeout(
            config.data_root.clone(),
            Duration::from_secs(config.request_timeout_secs),
        )
        .with_context(|| format!("Failed to create HTTP client for {}", config.data_root))?;
        Ok(Arc::new(fetcher))
    } else {
        let root = PathBuf::from(&config.data_root);
        anyhow::ensure!(
            root.is_dir(),
            "Data root {} is not a directory",
            root.display()
        );
        Ok(Arc::new(DirectoryFetcher::new(root)))
    }
}
