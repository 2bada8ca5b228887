//! Source resolution and stream download using yt-dlp.
//!
//! A [`SourceFetcher`] turns a canonical video ID into the list of streams the
//! source offers, and downloads one of them to a local file.

use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info};

use vfetch_models::{canonical_watch_url, SourceInfo, StreamInfo, StreamKind};

use crate::error::{MediaError, MediaResult};

/// Resolves video IDs to streams and downloads them.
#[async_trait]
pub trait SourceFetcher: Send + Sync {
    /// List the title and downloadable streams of a video.
    async fn fetch_source(&self, video_id: &str) -> MediaResult<SourceInfo>;

    /// Download one stream of a video to `dest`.
    async fn download_stream(&self, video_id: &str, stream: &StreamInfo, dest: &Path) -> MediaResult<()>;
}

/// [`SourceFetcher`] backed by the yt-dlp CLI.
///
/// Child processes are killed when the call is dropped, so a caller-side
/// timeout terminates the download.
#[derive(Debug, Clone)]
pub struct YtDlpFetcher {
    program: String,
}

impl Default for YtDlpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl YtDlpFetcher {
    pub fn new() -> Self {
        Self {
            program: "yt-dlp".to_string(),
        }
    }

    /// Use a specific yt-dlp binary.
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    async fn run(&self, args: &[&str]) -> MediaResult<Vec<u8>> {
        which::which(&self.program).map_err(|_| MediaError::YtDlpNotFound)?;

        debug!("Running yt-dlp: {} {}", self.program, args.join(" "));

        let output = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            debug!("yt-dlp stderr: {}", stderr);
            let error_msg = stderr
                .lines()
                .rev()
                .find(|l| !l.trim().is_empty())
                .unwrap_or("Unknown error");
            return Err(MediaError::download_failed(format!("yt-dlp failed: {}", error_msg.trim())));
        }

        Ok(output.stdout)
    }
}

#[async_trait]
impl SourceFetcher for YtDlpFetcher {
    async fn fetch_source(&self, video_id: &str) -> MediaResult<SourceInfo> {
        let url = canonical_watch_url(video_id);
        let stdout = self
            .run(&["-J", "--no-playlist", "--no-warnings", &url])
            .await?;

        let info = parse_source_info(video_id, &stdout)?;
        info!(
            video_id = video_id,
            streams = info.streams.len(),
            "Resolved source streams"
        );
        Ok(info)
    }

    async fn download_stream(&self, video_id: &str, stream: &StreamInfo, dest: &Path) -> MediaResult<()> {
        let url = canonical_watch_url(video_id);
        let template = output_template(dest);

        info!(
            video_id = video_id,
            format_id = %stream.format_id,
            output = %dest.display(),
            "Downloading stream"
        );

        self.run(&[
            "-f",
            &stream.format_id,
            "--no-part",
            "--no-playlist",
            "--no-warnings",
            "--no-progress",
            "-o",
            &template,
            &url,
        ])
        .await?;

        if !dest.exists() {
            return Err(MediaError::download_failed("Output file not created"));
        }

        let file_size = tokio::fs::metadata(dest).await?.len();
        info!(
            output = %dest.display(),
            size_mb = file_size as f64 / (1024.0 * 1024.0),
            "Downloaded stream successfully"
        );

        Ok(())
    }
}

/// yt-dlp `-J` output (only the fields we use).
#[derive(Debug, Deserialize)]
struct YtDlpInfo {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    formats: Vec<YtDlpFormat>,
}

#[derive(Debug, Deserialize)]
struct YtDlpFormat {
    format_id: String,
    #[serde(default)]
    ext: Option<String>,
    #[serde(default)]
    vcodec: Option<String>,
    #[serde(default)]
    acodec: Option<String>,
    #[serde(default)]
    width: Option<u32>,
    #[serde(default)]
    height: Option<u32>,
    /// Total bitrate in kbit/s
    #[serde(default)]
    tbr: Option<f64>,
    #[serde(default)]
    abr: Option<f64>,
    #[serde(default)]
    format_note: Option<String>,
}

/// Parse yt-dlp's JSON dump into [`SourceInfo`].
/// yt-dlp treats `-o` as a template, so a literal `%` must be doubled.
fn output_template(dest: &Path) -> String {
    dest.to_string_lossy().replace('%', "%%")
}

fn parse_source_info(video_id: &str, json: &[u8]) -> MediaResult<SourceInfo> {
    let raw: YtDlpInfo = serde_json::from_slice(json)?;

    let streams = raw.formats.into_iter().filter_map(into_stream).collect();

    Ok(SourceInfo {
        video_id: video_id.to_string(),
        title: raw.title.unwrap_or_default(),
        streams,
    })
}

fn into_stream(format: YtDlpFormat) -> Option<StreamInfo> {
    let container = format.ext?;
    if container == "mhtml"
        || format
            .format_note
            .as_deref()
            .is_some_and(|n| n.contains("storyboard"))
    {
        return None;
    }

    let codec = |c: Option<String>| c.filter(|c| c != "none");
    let video_codec = codec(format.vcodec);
    let audio_codec = codec(format.acodec);

    let kind = match (video_codec.is_some(), audio_codec.is_some()) {
        (true, true) => StreamKind::Muxed,
        (true, false) => StreamKind::VideoOnly,
        (false, true) => StreamKind::AudioOnly,
        (false, false) => return None,
    };

    Some(StreamInfo {
        format_id: format.format_id,
        container,
        kind,
        width: format.width,
        height: format.height,
        bitrate_kbps: format.tbr.or(format.abr).map(|b| b.round() as u32),
        video_codec,
        audio_codec,
    })
}
