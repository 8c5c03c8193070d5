//! tubeloader library
//!
//! Fetches player metadata for a video, normalizes its formats into a catalog,
//! picks one format and streams it to a sink, rotating proxies when the CDN
//! rate-limits us.

pub mod app;
pub mod downloader;
pub mod extractor;
pub mod utils;

// Re-export main types for easier use
pub use app::{default_file_name, Selection, YouTubeDownloader};
pub use downloader::{
    DownloadConfig, DownloadEngine, DownloadOutcome, DownloadProgress, DownloadStatus,
    ProxyHandle, ProxyManager, RotatingProxyManager,
};
pub use extractor::{
    build_catalog, FormatDescriptor, FormatSelector, InnertubeClient, MetadataSource,
    SelectionCriteria, VideoMetadata,
};
pub use utils::{AppSettings, TubeloaderError};
