//! Data structures for video information

use serde::{Deserialize, Deserializer, Serialize};

/// Player endpoint response
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoMetadata {
    /// Absent in some responses; only an explicit non-OK status makes a video unavailable
    #[serde(default)]
    pub playability_status: Option<PlayabilityStatus>,
    #[serde(default)]
    pub streaming_data: Option<StreamingData>,
    #[serde(default)]
    pub video_details: Option<VideoDetails>,
}

impl VideoMetadata {
    pub fn is_playable(&self) -> bool {
        self.playability_status
            .as_ref()
            .map_or(true, |status| status.status == "OK")
    }

    /// Reported playability status, `"OK"` when the response omits it
    pub fn status(&self) -> &str {
        self.playability_status
            .as_ref()
            .map_or("OK", |status| status.status.as_str())
    }

    pub fn title(&self) -> Option<&str> {
        self.video_details
            .as_ref()
            .and_then(|d| d.title.as_deref())
            .filter(|t| !t.trim().is_empty())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlayabilityStatus {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamingData {
    /// Muxed audio+video streams
    #[serde(default)]
    pub formats: Vec<RawFormat>,
    /// Video-only or audio-only streams
    #[serde(default)]
    pub adaptive_formats: Vec<RawFormat>,
}

/// A format record exactly as the platform reports it
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawFormat {
    #[serde(default)]
    pub itag: Option<u32>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub quality_label: Option<String>,
    #[serde(default)]
    pub quality: Option<String>,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub content_length: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoDetails {
    #[serde(default)]
    pub video_id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub length_seconds: Option<u64>,
}

/// The platform sends numeric fields as strings ("1048576"); accept both.
fn lenient_u64<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumOrString {
        Num(u64),
        Str(String),
    }

    Ok(match Option::<NumOrString>::deserialize(deserializer)? {
        Some(NumOrString::Num(n)) => Some(n),
        Some(NumOrString::Str(s)) => s.trim().parse().ok(),
        None => None,
    })
}

/// Normalized, selectable stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatDescriptor {
    pub id: u32,
    /// Resolution label for video streams, bitrate label for audio-only streams
    pub quality: String,
    pub mime_type: String,
    pub has_video: bool,
    pub has_audio: bool,
    pub url: String,
    pub size_bytes: Option<u64>,
}

impl FormatDescriptor {
    pub fn is_combined(&self) -> bool {
        self.has_video && self.has_audio
    }

    /// File extension derived from the MIME subtype (`video/mp4` -> `mp4`).
    pub fn extension(&self) -> &str {
        self.mime_type
            .split_once('/')
            .map(|(_, subtype)| subtype)
            .filter(|s| !s.is_empty())
            .unwrap_or("bin")
    }

    pub fn kind(&self) -> &'static str {
        match (self.has_video, self.has_audio) {
            (true, true) => "video+audio",
            (true, false) => "video only",
            (false, true) => "audio only",
            (false, false) => "unknown",
        }
    }
}

/// How the caller wants a format picked. `id` wins over `quality` when both are set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionCriteria {
    pub id: Option<u32>,
    pub quality: Option<String>,
}

impl SelectionCriteria {
    pub fn by_id(id: u32) -> Self {
        Self {
            id: Some(id),
            quality: None,
        }
    }

    pub fn by_quality(quality: impl Into<String>) -> Self {
        Self {
            id: None,
            quality: Some(quality.into()),
        }
    }
}
