//! Download engine module

pub mod engine;
pub mod progress;
pub mod proxy;

// Re-export for convenience
pub use engine::{DownloadConfig, DownloadEngine, DownloadOutcome};
pub use progress::{DownloadProgress, DownloadStatus};
pub use proxy::{ProxyHandle, ProxyManager, ProxyStats, RotatingProxyManager};
