//! Utility modules for error handling, configuration and input parsing

pub mod config;
pub mod error;
pub mod video_id;

// Re-export for convenience
pub use config::AppSettings;
pub use error::{Result, TubeloaderError};
pub use video_id::extract_video_id;
