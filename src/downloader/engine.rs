//! Chunked, proxy-rotating download engine
//!
//! One download is a strictly sequential loop: acquire proxy, send request,
//! classify the response, then either retry (rate limiting only) or stream the
//! body into the sink. Everything else fails the download immediately.

use crate::downloader::progress::DownloadProgress;
use crate::downloader::proxy::{ProxyHandle, ProxyManager};
use crate::extractor::models::FormatDescriptor;
use crate::utils::error::{Result, TubeloaderError};
use futures::stream::StreamExt;
use reqwest::{Client, Response, StatusCode};
use std::time::{Duration, Instant};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Download configuration
#[derive(Debug, Clone)]
pub struct DownloadConfig {
    pub chunk_size: usize,          // Largest slice written per progress event (default: 8192)
    pub max_attempts: usize,        // Attempts under rate limiting (default: 5)
    pub retry_delay: Duration,      // Delay before rotating to the next proxy
    pub request_timeout: Duration,  // Bound on connecting and on each body read
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            chunk_size: 8192,
            max_attempts: 5,
            retry_delay: Duration::from_secs(1),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Result of a successful download
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadOutcome {
    pub bytes_written: u64,
    pub total_expected: Option<u64>,
    pub attempts: usize,
    pub proxy: Option<ProxyHandle>,
}

/// Per-call state, never shared between downloads
struct DownloadSession<'a, W: ?Sized> {
    sink: &'a mut W,
    format: &'a FormatDescriptor,
    bytes_written: u64,
    total_expected: Option<u64>,
    proxy: Option<ProxyHandle>,
    attempts: usize,
}

/// Single-stream download engine
pub struct DownloadEngine {
    direct: Client,
    config: DownloadConfig,
}

impl DownloadEngine {
    /// Create new download engine with configuration
    pub fn new(config: DownloadConfig) -> Result<Self> {
        let direct = Self::client_builder(&config).no_proxy().build()?;
        Ok(Self { direct, config })
    }

    pub fn config(&self) -> &DownloadConfig {
        &self.config
    }

    fn client_builder(config: &DownloadConfig) -> reqwest::ClientBuilder {
        Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(config.request_timeout)
    }

    fn client_for(&self, proxy: Option<&ProxyHandle>) -> Result<Client> {
        match proxy {
            Some(proxy) => Ok(Self::client_builder(&self.config)
                .proxy(proxy.to_reqwest()?)
                .build()?),
            None => Ok(self.direct.clone()),
        }
    }

    /// Stream `format` into `sink`.
    ///
    /// The sink is shut down (flushed and closed) on every exit path. Progress
    /// events go to `progress_tx` when given; a dropped receiver never aborts
    /// the download.
    pub async fn download<W>(
        &self,
        format: &FormatDescriptor,
        sink: &mut W,
        proxies: Option<&dyn ProxyManager>,
        progress_tx: Option<mpsc::Sender<DownloadProgress>>,
    ) -> Result<DownloadOutcome>
    where
        W: AsyncWrite + Unpin + Send + ?Sized,
    {
        info!("Downloading itag {} ({}) from {}", format.id, format.quality, format.url);

        let mut session = DownloadSession {
            sink,
            format,
            bytes_written: 0,
            total_expected: format.size_bytes,
            proxy: None,
            attempts: 0,
        };
        let mut progress = DownloadProgress::new(format.size_bytes);

        let result = match self.connect(&mut session, proxies).await {
            Ok(response) => {
                self.stream_body(response, &mut session, &mut progress, progress_tx.as_ref())
                    .await
            }
            Err(e) => Err(e),
        };
        let closed = session.sink.shutdown().await;

        match (result, closed) {
            (Ok(()), Ok(())) => {
                progress.complete();
                emit(progress_tx.as_ref(), &progress).await;
                info!(
                    "Download of itag {} finished: {} bytes in {} attempt(s)",
                    format.id, session.bytes_written, session.attempts
                );
                Ok(DownloadOutcome {
                    bytes_written: session.bytes_written,
                    total_expected: session.total_expected,
                    attempts: session.attempts,
                    proxy: session.proxy,
                })
            }
            (Ok(()), Err(e)) => {
                let e = TubeloaderError::from(e);
                progress.failed(e.to_string());
                emit(progress_tx.as_ref(), &progress).await;
                Err(e)
            }
            (Err(e), closed) => {
                if let Err(close_err) = closed {
                    warn!("Failed to close sink after error: {}", close_err);
                }
                warn!(
                    "Download of itag {} failed after {} bytes: {}",
                    format.id, session.bytes_written, e
                );
                progress.failed(e.to_string());
                emit(progress_tx.as_ref(), &progress).await;
                Err(e)
            }
        }
    }

    /// Attempt loop. Only rate-limited attempts are retried, each through a
    /// freshly acquired proxy.
    async fn connect<W: ?Sized>(
        &self,
        session: &mut DownloadSession<'_, W>,
        proxies: Option<&dyn ProxyManager>,
    ) -> Result<Response> {
        let max_attempts = self.config.max_attempts.max(1);
        let format = session.format;
        let url = format.url.as_str();

        while session.attempts < max_attempts {
            session.attempts += 1;
            session.proxy = proxies.map(|manager| manager.get_proxy());
            let client = self.client_for(session.proxy.as_ref())?;

            debug!(
                "Attempt {}/{} via {}",
                session.attempts,
                max_attempts,
                session.proxy.as_ref().map_or("direct", |p| p.url())
            );

            let sent = match timeout(self.config.request_timeout, client.get(url).send()).await {
                Ok(sent) => sent.map_err(TubeloaderError::from),
                Err(_) => Err(TubeloaderError::Timeout {
                    stage: "Download request",
                    after: self.config.request_timeout,
                }),
            };

            let error = match sent {
                Ok(response) if response.status() == StatusCode::TOO_MANY_REQUESTS => {
                    TubeloaderError::RateLimited {
                        status: response.status(),
                        url: url.to_string(),
                    }
                }
                Ok(response) if !response.status().is_success() => {
                    return Err(TubeloaderError::HttpStatus {
                        status: response.status(),
                        url: url.to_string(),
                    });
                }
                Ok(response) => {
                    if let (Some(manager), Some(proxy)) = (proxies, session.proxy.as_ref()) {
                        manager.record_success(proxy);
                    }
                    return Ok(response);
                }
                Err(e) if e.is_rate_limited() => e,
                Err(e) => return Err(e),
            };

            warn!(
                "Rate limited on attempt {}/{}: {}",
                session.attempts, max_attempts, error
            );
            if let (Some(manager), Some(proxy)) = (proxies, session.proxy.as_ref()) {
                manager.record_failure(proxy, &error);
            }
            if session.attempts < max_attempts {
                sleep(self.config.retry_delay).await;
            }
        }

        Err(TubeloaderError::Download(
            "Failed to get a successful response".to_string(),
        ))
    }

    async fn stream_body<W>(
        &self,
        response: Response,
        session: &mut DownloadSession<'_, W>,
        progress: &mut DownloadProgress,
        progress_tx: Option<&mpsc::Sender<DownloadProgress>>,
    ) -> Result<()>
    where
        W: AsyncWrite + Unpin + Send + ?Sized,
    {
        let advertised = response.content_length();
        session.total_expected = advertised.or(session.format.size_bytes);
        progress.total_bytes = session.total_expected;
        debug!("Expected size: {:?} (header: {:?})", session.total_expected, advertised);

        let chunk_size = self.config.chunk_size.max(1);
        let started = Instant::now();
        let mut stream = response.bytes_stream();

        loop {
            let next = timeout(self.config.request_timeout, stream.next())
                .await
                .map_err(|_| TubeloaderError::Timeout {
                    stage: "Reading response body",
                    after: self.config.request_timeout,
                })?;
            let Some(chunk) = next else { break };
            let chunk = chunk?;

            for piece in chunk.chunks(chunk_size) {
                session.sink.write_all(piece).await?;
                session.bytes_written += piece.len() as u64;

                let elapsed = started.elapsed().as_secs_f64();
                let speed = if elapsed > 0.0 {
                    session.bytes_written as f64 / elapsed
                } else {
                    0.0
                };
                progress.record_chunk(piece.len() as u64, speed);
                emit(progress_tx, progress).await;
            }
        }

        match (advertised, session.total_expected) {
            (Some(expected), _) if expected != session.bytes_written => {
                Err(TubeloaderError::Download(format!(
                    "Incomplete body: received {} of {} bytes",
                    session.bytes_written, expected
                )))
            }
            (None, Some(expected)) if expected != session.bytes_written => {
                warn!(
                    "Format advertised {} bytes but stream ended at {}",
                    expected, session.bytes_written
                );
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

async fn emit(progress_tx: Option<&mpsc::Sender<DownloadProgress>>, progress: &DownloadProgress) {
    if let Some(tx) = progress_tx {
        if let Err(e) = tx.send(progress.clone()).await {
            debug!("Progress receiver dropped: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn format(url: &str) -> FormatDescriptor {
        FormatDescriptor {
            id: 22,
            quality: "720p".to_string(),
            mime_type: "video/mp4".to_string(),
            has_video: true,
            has_audio: true,
            url: url.to_string(),
            size_bytes: Some(10),
        }
    }

    #[test]
    fn test_default_config() {
        let config = DownloadConfig::default();
        assert!(config.chunk_size > 0);
        assert!(config.max_attempts > 0);
        assert!(config.request_timeout > Duration::ZERO);
    }

    #[tokio::test]
    async fn test_sink_closed_when_request_fails() {
        let engine = DownloadEngine::new(DownloadConfig {
            max_attempts: 1,
            request_timeout: Duration::from_secs(2),
            ..Default::default()
        })
        .unwrap();

        // Nothing listens on port 1; the connect error is fatal and not retried.
        let mut sink = tokio_test::io::Builder::new().build();
        let err = engine
            .download(&format("http://127.0.0.1:1/video.mp4"), &mut sink, None, None)
            .await
            .unwrap_err();

        assert!(matches!(err, TubeloaderError::Network(_)), "got {:?}", err);
        assert!(!err.is_rate_limited());
    }
}
