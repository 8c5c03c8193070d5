//! Video ID extraction from user input

use crate::utils::error::{Result, TubeloaderError};
use regex::Regex;
use std::sync::OnceLock;

fn bare_id() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9_-]{11}$").expect("valid regex"))
}

fn url_id() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^(?:https?://)?(?:(?:www|m|music)\.)?(?:youtube\.com/(?:watch\?(?:.*&)?v=|embed/|shorts/|v/|live/)|youtu\.be/)([A-Za-z0-9_-]{11})(?:[&?#/].*)?$",
        )
        .expect("valid regex")
    })
}

/// Extract the 11-character video ID from a watch/short/embed URL or a bare ID.
pub fn extract_video_id(input: &str) -> Result<String> {
    let input = input.trim();

    if bare_id().is_match(input) {
        return Ok(input.to_string());
    }

    url_id()
        .captures(input)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| TubeloaderError::InvalidUrl(input.to_string()))
}
