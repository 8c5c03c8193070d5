//! Player endpoint client
//!
//! Fetches video metadata with a single POST per attempt. Every transport-level
//! failure (connect error, timeout, non-2xx status) is retried up to
//! `FetcherConfig::attempts` times; proxies are never used here.

use crate::extractor::models::VideoMetadata;
use crate::extractor::traits::MetadataSource;
use crate::utils::error::{Result, TubeloaderError};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

pub const DEFAULT_PLAYER_ENDPOINT: &str = "https://www.youtube.com/youtubei/v1/player";

/// Metadata fetch configuration
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    pub endpoint: String,
    pub client_name: String,
    pub client_version: String,
    pub attempts: usize,        // Total attempts, never below 2
    pub retry_delay: Duration,  // Delay between attempts
    pub timeout: Duration,      // Per-request bound
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_PLAYER_ENDPOINT.to_string(),
            client_name: "ANDROID".to_string(),
            client_version: "19.09.37".to_string(),
            attempts: 3,
            retry_delay: Duration::from_millis(500),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Retrying client for the platform's internal player API
pub struct InnertubeClient {
    client: Client,
    config: FetcherConfig,
}

impl InnertubeClient {
    pub fn new(config: FetcherConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(format!(
                "com.google.android.youtube/{} (Linux; U; Android 11) gzip",
                config.client_version
            ))
            .timeout(config.timeout)
            .no_proxy()
            .build()?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &FetcherConfig {
        &self.config
    }

    /// Request body understood by the player endpoint
    pub fn request_body(&self, video_id: &str) -> serde_json::Value {
        json!({
            "videoId": video_id,
            "context": {
                "client": {
                    "clientName": self.config.client_name,
                    "clientVersion": self.config.client_version,
                    "androidSdkVersion": 30,
                    "hl": "en",
                    "gl": "US",
                }
            },
            "contentCheckOk": true,
            "racyCheckOk": true,
        })
    }

    async fn fetch_once(&self, video_id: &str) -> Result<VideoMetadata> {
        let response = self
            .client
            .post(&self.config.endpoint)
            .json(&self.request_body(video_id))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TubeloaderError::HttpStatus {
                status,
                url: self.config.endpoint.clone(),
            });
        }

        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

#[async_trait]
impl MetadataSource for InnertubeClient {
    fn id(&self) -> &'static str {
        "innertube-android"
    }

    async fn fetch_metadata(&self, video_id: &str) -> Result<VideoMetadata> {
        let attempts = self.config.attempts.max(2);
        let mut attempt = 1;

        loop {
            debug!("Fetching player metadata for {} (attempt {})", video_id, attempt);
            match self.fetch_once(video_id).await {
                Ok(metadata) => {
                    info!(
                        "Fetched metadata for {} via {} (playability: {})",
                        video_id,
                        self.id(),
                        metadata.status()
                    );
                    return Ok(metadata);
                }
                Err(e) if attempt >= attempts => {
                    return Err(TubeloaderError::MetadataFetch {
                        attempts,
                        source: Box::new(e),
                    });
                }
                Err(e) => {
                    warn!(
                        "Metadata request for {} failed (attempt {}/{}): {}",
                        video_id, attempt, attempts, e
                    );
                    sleep(self.config.retry_delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
