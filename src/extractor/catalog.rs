//! Normalization of raw player formats into a uniform catalog

use crate::extractor::models::{FormatDescriptor, RawFormat, VideoMetadata};
use crate::utils::error::{Result, TubeloaderError};
use tracing::{debug, trace};

/// Which list of `streamingData` a raw record came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Combined,
    Adaptive,
}

/// Build the ordered catalog: combined formats first, then adaptive, each in
/// the order the platform sent them.
///
/// Fails with [`TubeloaderError::VideoUnavailable`] when the response reports a
/// playability status other than OK. A response without one is treated as playable.
/// A playable response without streaming data yields an empty catalog.
pub fn build_catalog(metadata: &VideoMetadata) -> Result<Vec<FormatDescriptor>> {
    if let Some(status) = metadata.playability_status.as_ref() {
        if status.status != "OK" {
            let reason = status
                .reason
                .clone()
                .unwrap_or_else(|| format!("status {}", status.status));
            return Err(TubeloaderError::VideoUnavailable { reason });
        }
    }

    let Some(streaming) = metadata.streaming_data.as_ref() else {
        debug!("Playable response carries no streamingData");
        return Ok(Vec::new());
    };

    let combined = streaming
        .formats
        .iter()
        .filter_map(|raw| normalize(raw, StreamKind::Combined));
    let adaptive = streaming
        .adaptive_formats
        .iter()
        .filter_map(|raw| normalize(raw, StreamKind::Adaptive));

    let catalog: Vec<FormatDescriptor> = combined.chain(adaptive).collect();
    debug!(
        "Catalog built: {} of {} raw formats usable",
        catalog.len(),
        streaming.formats.len() + streaming.adaptive_formats.len()
    );
    Ok(catalog)
}

/// Map one raw record to a descriptor, or `None` when it cannot be selected.
///
/// Field precedence:
/// - quality: `qualityLabel`, then `quality`, then empty
/// - mime type: raw MIME up to the first `;`
/// - size: `contentLength` when present
pub fn normalize(raw: &RawFormat, kind: StreamKind) -> Option<FormatDescriptor> {
    let url = raw.url.as_deref().map(str::trim).filter(|u| !u.is_empty());
    let (Some(id), Some(url)) = (raw.itag, url) else {
        trace!("Dropping format without itag/url: {:?}", raw.itag);
        return None;
    };

    let mime_type = base_mime(raw.mime_type.as_deref().unwrap_or_default());
    // Adaptive streams carry exactly one track: video when the MIME says so, audio otherwise
    let (has_video, has_audio) = match kind {
        StreamKind::Combined => (true, true),
        StreamKind::Adaptive => {
            let video = mime_type.starts_with("video/");
            (video, !video)
        }
    };

    let quality = raw
        .quality_label
        .clone()
        .or_else(|| raw.quality.clone())
        .unwrap_or_default();

    Some(FormatDescriptor {
        id,
        quality,
        mime_type,
        has_video,
        has_audio,
        url: url.to_string(),
        size_bytes: raw.content_length,
    })
}

fn base_mime(raw: &str) -> String {
    raw.split(';').next().unwrap_or_default().trim().to_string()
}
