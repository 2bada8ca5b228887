//! Utility functions for source URL parsing and filename sanitization.

use thiserror::Error;
use url::Url;

/// Maximum length of an extracted video ID.
const MAX_VIDEO_ID_LENGTH: usize = 64;

/// Maximum length of a sanitized filename token.
const MAX_FILENAME_TOKEN_LENGTH: usize = 80;

/// Token used when a title sanitizes to nothing.
const FALLBACK_FILENAME_TOKEN: &str = "video";

/// Hosts that serve the standard watch page (`?v=VIDEO_ID`).
const WATCH_HOSTS: [&str; 4] = [
    "youtube.com",
    "www.youtube.com",
    "m.youtube.com",
    "music.youtube.com",
];

/// Hosts that serve short links (`/VIDEO_ID`).
const SHORT_LINK_HOSTS: [&str; 2] = ["youtu.be", "www.youtu.be"];

/// Errors that can occur while resolving a source URL to a video ID.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceUrlError {
    /// Not an absolute http(s) URL
    #[error("URL is malformed")]
    Malformed,
    /// Host is not a known video source
    #[error("URL host is not a supported video source")]
    UnsupportedHost,
    /// Neither a `v` parameter nor a short-link segment
    #[error("Video ID not found in URL")]
    MissingVideoId,
    /// Video ID has invalid format
    #[error("Video ID has invalid format")]
    InvalidVideoId,
}

/// Result type for video ID extraction.
pub type SourceUrlResult<T> = Result<T, SourceUrlError>;

/// Extract the canonical video ID from a source URL.
///
/// Supported shapes:
/// - https://www.youtube.com/watch?v=VIDEO_ID (any query parameter order)
/// - https://youtu.be/VIDEO_ID
pub fn extract_video_id(url: &str) -> SourceUrlResult<String> {
    let parsed = Url::parse(url.trim()).map_err(|_| SourceUrlError::Malformed)?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(SourceUrlError::Malformed);
    }

    let host = parsed
        .host_str()
        .ok_or(SourceUrlError::Malformed)?
        .to_ascii_lowercase();

    let id = if WATCH_HOSTS.contains(&host.as_str()) {
        parsed
            .query_pairs()
            .find(|(key, _)| key == "v")
            .map(|(_, value)| value.into_owned())
    } else if SHORT_LINK_HOSTS.contains(&host.as_str()) {
        parsed
            .path_segments()
            .and_then(|mut segments| segments.find(|s| !s.is_empty()))
            .map(str::to_string)
    } else {
        return Err(SourceUrlError::UnsupportedHost);
    };

    match id {
        Some(id) if !id.is_empty() => validate_video_id(id),
        _ => Err(SourceUrlError::MissingVideoId),
    }
}

/// Rebuild the canonical watch URL for a video ID.
pub fn canonical_watch_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={}", video_id)
}

/// Check if string contains only valid video ID characters
fn is_valid_video_id_chars(s: &str) -> bool {
    s.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Validate video ID format and return it
fn validate_video_id(id: String) -> SourceUrlResult<String> {
    if id.len() > MAX_VIDEO_ID_LENGTH || !is_valid_video_id_chars(&id) {
        return Err(SourceUrlError::InvalidVideoId);
    }
    Ok(id)
}

/// Map an arbitrary title to a filesystem-safe token.
///
/// Keeps ASCII alphanumerics, `-` and `_`; whitespace runs become a single `_`.
pub fn sanitize_filename(title: &str) -> String {
    let mut out = String::with_capacity(title.len());
    let mut pending_sep = false;

    for c in title.chars() {
        if c.is_whitespace() {
            pending_sep = true;
        } else if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
            if pending_sep && !out.is_empty() {
                out.push('_');
            }
            pending_sep = false;
            out.push(c);
        }
    }

    let truncated: String = out.chars().take(MAX_FILENAME_TOKEN_LENGTH).collect();
    let token = truncated.trim_matches('_');

    if token.is_empty() {
        FALLBACK_FILENAME_TOKEN.to_string()
    } else {
        token.to_string()
    }
}
