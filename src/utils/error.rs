//! Error handling for tubeloader

use crate::extractor::models::SelectionCriteria;
use reqwest::StatusCode;
use std::time::Duration;
use thiserror::Error;

/// Convenience alias used across the library
pub type Result<T> = std::result::Result<T, TubeloaderError>;

/// Main error type for tubeloader
#[derive(Debug, Error)]
pub enum TubeloaderError {
    #[error("Failed to fetch video info after {attempts} attempt(s): {source}")]
    MetadataFetch {
        attempts: usize,
        #[source]
        source: Box<TubeloaderError>,
    },

    #[error("Video not available: {reason}")]
    VideoUnavailable { reason: String },

    #[error("{}", describe_missing(.criteria))]
    FormatNotFound { criteria: SelectionCriteria },

    #[error("Download failed: {0}")]
    Download(String),

    #[error("Rate limited ({status}) while requesting {url}")]
    RateLimited { status: StatusCode, url: String },

    #[error("HTTP error: {status} for {url}")]
    HttpStatus { status: StatusCode, url: String },

    #[error("{stage} timed out after {after:?}")]
    Timeout { stage: &'static str, after: Duration },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Proxy pool is empty")]
    NoProxies,
}

impl TubeloaderError {
    /// True when the server asked us to slow down or change origin.
    pub fn is_rate_limited(&self) -> bool {
        match self {
            TubeloaderError::RateLimited { .. } => true,
            TubeloaderError::HttpStatus { status, .. } => *status == StatusCode::TOO_MANY_REQUESTS,
            TubeloaderError::Network(e) => e.status() == Some(StatusCode::TOO_MANY_REQUESTS),
            _ => false,
        }
    }
}

fn describe_missing(criteria: &SelectionCriteria) -> String {
    if let Some(id) = criteria.id {
        format!("Format with itag {} not found", id)
    } else if let Some(quality) = &criteria.quality {
        format!("Quality {} not found", quality)
    } else {
        "No downloadable formats found".to_string()
    }
}
