//! yt-dlp and FFmpeg CLI wrappers for video fetching and transcoding.
//!
//! This crate provides:
//! - The [`SourceFetcher`] collaborator and its yt-dlp implementation
//! - Stream selection for mp4 output
//! - The [`Transcoder`] collaborator and its FFmpeg implementation
//! - Type-safe FFmpeg command building
//! - Progress parsing from `-progress pipe:2`

pub mod command;
pub mod error;
pub mod filters;
pub mod probe;
pub mod progress;
pub mod selection;
pub mod source;
pub mod transcode;

pub use command::{check_ffmpeg, check_ffprobe, check_ytdlp, FfmpegCommand, FfmpegRunner};
pub use error::{MediaError, MediaResult};
pub use probe::{probe_video, VideoInfo};
pub use progress::{FfmpegProgress, ProgressCallback};
pub use selection::{select_streams, StreamSelection};
pub use source::{SourceFetcher, YtDlpFetcher};
pub use transcode::{FfmpegTranscoder, TranscodeJob, Transcoder};
