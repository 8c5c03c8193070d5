//! Application configuration

use crate::downloader::DownloadConfig;
use crate::extractor::innertube::{FetcherConfig, DEFAULT_PLAYER_ENDPOINT};
use crate::utils::error::{Result, TubeloaderError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// Download location
    pub download_location: PathBuf,

    /// Player endpoint used for metadata
    pub player_endpoint: String,

    /// Client identity sent to the player endpoint
    pub client_name: String,
    pub client_version: String,

    /// Metadata attempts (at least 2)
    pub metadata_attempts: usize,
    pub metadata_retry_delay_ms: u64,

    /// Download attempts under rate limiting
    pub download_attempts: usize,
    pub retry_delay_ms: u64,

    /// Chunk size for streaming (bytes)
    pub chunk_size: usize,

    /// Bound on every individual network call
    pub request_timeout_secs: u64,

    /// Proxy URLs for the rotating pool; empty means direct connections
    pub proxies: Vec<String>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            download_location: dirs::download_dir().unwrap_or_else(|| PathBuf::from("./downloads")),
            player_endpoint: DEFAULT_PLAYER_ENDPOINT.to_string(),
            client_name: "ANDROID".to_string(),
            client_version: "19.09.37".to_string(),
            metadata_attempts: 3,
            metadata_retry_delay_ms: 500,
            download_attempts: 5,
            retry_delay_ms: 1000,
            chunk_size: 8192, // 8KB
            request_timeout_secs: 30,
            proxies: Vec::new(),
        }
    }
}

impl AppSettings {
    /// Default config file location (`~/.config/tubeloader/config.toml` on Linux)
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("tubeloader").join("config.toml"))
    }

    /// Parse settings from TOML; missing keys fall back to defaults
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let settings: AppSettings =
            toml::from_str(raw).map_err(|e| TubeloaderError::Config(e.to_string()))?;
        Ok(settings.validate())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        debug!("Loaded settings from {}", path.display());
        Self::from_toml_str(&raw)
    }

    /// Load from `path`, or from the default location when it exists, or defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => match Self::default_path().filter(|p| p.is_file()) {
                Some(default) => Self::load(&default),
                None => Ok(Self::default()),
            },
        }
    }

    /// Enforce sane minimums
    pub fn validate(mut self) -> Self {
        self.metadata_attempts = self.metadata_attempts.max(2);
        self.download_attempts = self.download_attempts.max(1);
        self.chunk_size = self.chunk_size.max(1);
        self.request_timeout_secs = self.request_timeout_secs.max(1);
        self
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn metadata_config(&self) -> FetcherConfig {
        FetcherConfig {
            endpoint: self.player_endpoint.clone(),
            client_name: self.client_name.clone(),
            client_version: self.client_version.clone(),
            attempts: self.metadata_attempts,
            retry_delay: Duration::from_millis(self.metadata_retry_delay_ms),
            timeout: self.request_timeout(),
        }
    }

    pub fn download_config(&self) -> DownloadConfig {
        DownloadConfig {
            chunk_size: self.chunk_size,
            max_attempts: self.download_attempts,
            retry_delay: Duration::from_millis(self.retry_delay_ms),
            request_timeout: self.request_timeout(),
        }
    }
}
