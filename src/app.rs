//! End-to-end pipeline: metadata → catalog → selection → download

use crate::downloader::{
    DownloadConfig, DownloadEngine, DownloadOutcome, DownloadProgress, ProxyManager,
    RotatingProxyManager,
};
use crate::extractor::{
    build_catalog, FormatDescriptor, FormatSelector, InnertubeClient, MetadataSource,
    SelectionCriteria, VideoMetadata,
};
use crate::utils::{extract_video_id, AppSettings, Result, TubeloaderError};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs::File;
use tokio::io::AsyncWrite;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Metadata plus the format picked from it
#[derive(Debug, Clone)]
pub struct Selection {
    pub metadata: VideoMetadata,
    pub format: FormatDescriptor,
}

/// Downloader for a single video
pub struct YouTubeDownloader {
    video_id: String,
    source: Arc<dyn MetadataSource>,
    engine: DownloadEngine,
    proxies: Option<Arc<dyn ProxyManager>>,
    download_dir: PathBuf,
}

impl YouTubeDownloader {
    /// `input` may be a watch/short/embed URL or a bare video ID.
    pub fn new(input: &str, source: Arc<dyn MetadataSource>, engine: DownloadEngine) -> Result<Self> {
        Ok(Self {
            video_id: extract_video_id(input)?,
            source,
            engine,
            proxies: None,
            download_dir: PathBuf::from("."),
        })
    }

    /// Wire up the live player client, engine and proxy pool from settings.
    pub fn from_settings(input: &str, settings: &AppSettings) -> Result<Self> {
        let source = Arc::new(InnertubeClient::new(settings.metadata_config())?);
        let engine = DownloadEngine::new(settings.download_config())?;
        let mut downloader = Self::new(input, source, engine)?
            .with_download_dir(settings.download_location.clone());

        if !settings.proxies.is_empty() {
            let pool = RotatingProxyManager::from_urls(settings.proxies.iter().cloned())?;
            info!("Using {} proxies", pool.len());
            downloader = downloader.with_proxy_manager(Arc::new(pool));
        }
        Ok(downloader)
    }

    pub fn with_proxy_manager(mut self, proxies: Arc<dyn ProxyManager>) -> Self {
        self.proxies = Some(proxies);
        self
    }

    pub fn with_download_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.download_dir = dir.into();
        self
    }

    pub fn video_id(&self) -> &str {
        &self.video_id
    }

    pub fn download_config(&self) -> &DownloadConfig {
        self.engine.config()
    }

    pub async fn fetch_metadata(&self) -> Result<VideoMetadata> {
        debug!("Fetching metadata for {} from {}", self.video_id, self.source.id());
        self.source.fetch_metadata(&self.video_id).await
    }

    pub async fn get_formats(&self) -> Result<Vec<FormatDescriptor>> {
        let metadata = self.fetch_metadata().await?;
        build_catalog(&metadata)
    }

    /// Fetch metadata and pick one format. An empty catalog is a download error.
    pub async fn prepare(&self, criteria: &SelectionCriteria) -> Result<Selection> {
        let metadata = self.fetch_metadata().await?;
        let catalog = build_catalog(&metadata)?;
        if catalog.is_empty() {
            return Err(TubeloaderError::Download(
                "No downloadable formats found".to_string(),
            ));
        }

        let format = FormatSelector::select(&catalog, criteria)?.clone();
        info!(
            "{}: selected itag {} ({}, {})",
            metadata.title().unwrap_or(&self.video_id),
            format.id,
            format.quality,
            format.kind()
        );
        Ok(Selection { metadata, format })
    }

    pub async fn download_format<W>(
        &self,
        format: &FormatDescriptor,
        sink: &mut W,
        progress_tx: Option<mpsc::Sender<DownloadProgress>>,
    ) -> Result<DownloadOutcome>
    where
        W: AsyncWrite + Unpin + Send + ?Sized,
    {
        self.engine
            .download(format, sink, self.proxies.as_deref(), progress_tx)
            .await
    }

    /// Download into a new file at `path`; a failed download removes the partial file.
    pub async fn download_format_to_file(
        &self,
        format: &FormatDescriptor,
        path: &Path,
        progress_tx: Option<mpsc::Sender<DownloadProgress>>,
    ) -> Result<DownloadOutcome> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut file = File::create(path).await?;
        let result = self.download_format(format, &mut file, progress_tx).await;
        drop(file);

        if result.is_err() {
            if let Err(e) = tokio::fs::remove_file(path).await {
                warn!("Failed to remove partial file {}: {}", path.display(), e);
            }
        }
        result
    }

    pub async fn download<W>(
        &self,
        criteria: &SelectionCriteria,
        sink: &mut W,
        progress_tx: Option<mpsc::Sender<DownloadProgress>>,
    ) -> Result<DownloadOutcome>
    where
        W: AsyncWrite + Unpin + Send + ?Sized,
    {
        let selection = self.prepare(criteria).await?;
        self.download_format(&selection.format, sink, progress_tx).await
    }

    /// Select, download and return the output path. Without `output` the file
    /// lands in the download directory under [`default_file_name`].
    pub async fn download_to_file(
        &self,
        criteria: &SelectionCriteria,
        output: Option<&Path>,
        progress_tx: Option<mpsc::Sender<DownloadProgress>>,
    ) -> Result<PathBuf> {
        let selection = self.prepare(criteria).await?;
        let path = match output {
            Some(path) => path.to_path_buf(),
            None => self.download_dir.join(default_file_name(
                selection.metadata.title(),
                &self.video_id,
                &selection.format,
            )),
        };

        self.download_format_to_file(&selection.format, &path, progress_tx)
            .await?;
        Ok(path)
    }
}

/// `{title or id}.{ext}` with path-hostile characters replaced
pub fn default_file_name(title: Option<&str>, video_id: &str, format: &FormatDescriptor) -> String {
    let stem: String = title
        .unwrap_or(video_id)
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .take(120)
        .collect();
    let stem = stem.trim().trim_matches('.');
    let stem = if stem.is_empty() { video_id } else { stem };

    format!("{}.{}", stem, format.extension())
}
