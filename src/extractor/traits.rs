use crate::extractor::catalog::build_catalog;
use crate::extractor::models::{FormatDescriptor, VideoMetadata};
use crate::utils::error::Result;
use async_trait::async_trait;

/// Anything that can produce player metadata for a video ID
///
/// This keeps the download pipeline independent of how metadata is obtained
/// (live player endpoint, recorded fixture, cache).
#[async_trait]
pub trait MetadataSource: Send + Sync {
    /// Returns a unique identifier for this source (e.g., "innertube-android")
    fn id(&self) -> &'static str;

    /// Fetch the raw player response for `video_id`
    async fn fetch_metadata(&self, video_id: &str) -> Result<VideoMetadata>;

    /// Gets available formats (calls fetch_metadata internally)
    async fn get_formats(&self, video_id: &str) -> Result<Vec<FormatDescriptor>> {
        let metadata = self.fetch_metadata(video_id).await?;
        build_catalog(&metadata)
    }
}
