//! Source stream metadata reported by a source fetcher.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// What a downloadable stream carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum StreamKind {
    /// Video and audio in one file
    Muxed,
    VideoOnly,
    AudioOnly,
}

impl StreamKind {
    pub fn has_video(&self) -> bool {
        matches!(self, StreamKind::Muxed | StreamKind::VideoOnly)
    }

    pub fn has_audio(&self) -> bool {
        matches!(self, StreamKind::Muxed | StreamKind::AudioOnly)
    }
}

/// One downloadable stream of a source video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct StreamInfo {
    /// Fetcher-specific identifier used to request the download
    pub format_id: String,
    /// Container extension (e.g. "mp4", "m4a", "webm")
    pub container: String,
    pub kind: StreamKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    /// Total bitrate in kbit/s
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bitrate_kbps: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_codec: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_codec: Option<String>,
}

impl StreamInfo {
    /// Muxed stream with the given geometry.
    pub fn muxed(format_id: impl Into<String>, container: impl Into<String>, width: u32, height: u32) -> Self {
        Self::video(format_id, container, StreamKind::Muxed, width, height)
    }

    /// Video-only stream with the given geometry.
    pub fn video_only(
        format_id: impl Into<String>,
        container: impl Into<String>,
        width: u32,
        height: u32,
    ) -> Self {
        Self::video(format_id, container, StreamKind::VideoOnly, width, height)
    }

    /// Audio-only stream.
    pub fn audio_only(format_id: impl Into<String>, container: impl Into<String>) -> Self {
        Self {
            format_id: format_id.into(),
            container: container.into(),
            kind: StreamKind::AudioOnly,
            width: None,
            height: None,
            bitrate_kbps: None,
            video_codec: None,
            audio_codec: None,
        }
    }

    fn video(
        format_id: impl Into<String>,
        container: impl Into<String>,
        kind: StreamKind,
        width: u32,
        height: u32,
    ) -> Self {
        Self {
            format_id: format_id.into(),
            container: container.into(),
            kind,
            width: Some(width),
            height: Some(height),
            bitrate_kbps: None,
            video_codec: None,
            audio_codec: None,
        }
    }

    /// Set the bitrate (builder style).
    pub fn with_bitrate(mut self, kbps: u32) -> Self {
        self.bitrate_kbps = Some(kbps);
        self
    }

    /// Height in pixels, 0 when unknown.
    pub fn height_or_zero(&self) -> u32 {
        self.height.unwrap_or(0)
    }

    /// Bitrate in kbit/s, 0 when unknown.
    pub fn bitrate_or_zero(&self) -> u32 {
        self.bitrate_kbps.unwrap_or(0)
    }

    /// Container with any leading dot removed, lowercased.
    pub fn extension(&self) -> String {
        self.container.trim_start_matches('.').to_ascii_lowercase()
    }
}

/// Metadata for a resolved source video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SourceInfo {
    pub video_id: String,
    pub title: String,
    #[serde(default)]
    pub streams: Vec<StreamInfo>,
}
