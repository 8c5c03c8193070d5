//! Progress tracking for downloads

/// Progress event emitted by the download engine.
///
/// While streaming, one event is sent per chunk written to the sink with
/// `chunk_bytes` equal to that chunk's length.
#[derive(Debug, Clone)]
pub struct DownloadProgress {
    pub chunk_bytes: u64,
    pub downloaded_bytes: u64,
    /// `None` when neither the response nor the format knew the size
    pub total_bytes: Option<u64>,
    pub speed: f64, // bytes per second
    pub status: DownloadStatus,
}

impl DownloadProgress {
    /// Create a new progress tracker
    pub fn new(total_bytes: Option<u64>) -> Self {
        Self {
            chunk_bytes: 0,
            downloaded_bytes: 0,
            total_bytes,
            speed: 0.0,
            status: DownloadStatus::Connecting,
        }
    }

    /// Account for one chunk written to the sink
    pub fn record_chunk(&mut self, chunk_bytes: u64, speed: f64) {
        self.chunk_bytes = chunk_bytes;
        self.downloaded_bytes += chunk_bytes;
        self.speed = speed;
        self.status = DownloadStatus::Downloading;
    }

    /// Mark as completed
    pub fn complete(&mut self) {
        self.chunk_bytes = 0;
        self.status = DownloadStatus::Completed;
    }

    /// Mark as failed
    pub fn failed(&mut self, error: String) {
        self.chunk_bytes = 0;
        self.status = DownloadStatus::Failed(error);
    }

    /// Get progress percentage (0.0 to 1.0), `None` when the total is unknown
    pub fn percentage(&self) -> Option<f64> {
        match self.total_bytes {
            Some(0) => Some(0.0),
            Some(total) => Some(self.downloaded_bytes as f64 / total as f64),
            None => None,
        }
    }
}

/// Download status
#[derive(Debug, Clone, PartialEq, Default)]
pub enum DownloadStatus {
    #[default]
    Connecting,
    Downloading,
    Completed,
    Failed(String),
}
