//! Scaling and re-encoding to a target geometry.

use async_trait::async_trait;
use std::path::PathBuf;
use tracing::{debug, info};

use vfetch_models::EncodingConfig;

use crate::command::{check_ffprobe, FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::filters::scale_and_pad;
use crate::probe::{probe_video, VideoInfo};
use crate::progress::ProgressCallback;

/// Parameters for one transcode.
#[derive(Debug, Clone)]
pub struct TranscodeJob {
    /// File providing the video stream (and audio when muxed)
    pub video_input: PathBuf,
    /// Separate audio file, when video and audio were downloaded apart
    pub audio_input: Option<PathBuf>,
    pub output: PathBuf,
    pub width: u32,
    pub height: u32,
    pub encoding: EncodingConfig,
}

impl TranscodeJob {
    /// Build the FFmpeg command for this job.
    pub fn to_command(&self) -> FfmpegCommand {
        let mut cmd = FfmpegCommand::new(&self.video_input, &self.output);

        let audio_map = match &self.audio_input {
            Some(audio) => {
                cmd = cmd.extra_input(audio);
                "1:a:0"
            }
            // Optional so silent sources still transcode
            None => "0:a:0?",
        };

        cmd.video_filter(scale_and_pad(self.width, self.height))
            .map("0:v:0")
            .map(audio_map)
            .output_args(self.encoding.to_ffmpeg_args())
            .faststart()
    }
}

/// Produces a scaled-and-padded output file.
#[async_trait]
pub trait Transcoder: Send + Sync {
    async fn transcode(&self, job: &TranscodeJob, on_progress: ProgressCallback) -> MediaResult<()>;
}

/// [`Transcoder`] backed by the FFmpeg CLI.
#[derive(Debug, Clone, Default)]
pub struct FfmpegTranscoder {
    runner: FfmpegRunner,
}

impl FfmpegTranscoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_runner(runner: FfmpegRunner) -> Self {
        Self { runner }
    }

    /// Input duration in ms, 0 when it cannot be probed.
    async fn input_duration_ms(job: &TranscodeJob) -> i64 {
        if check_ffprobe().is_err() {
            return 0;
        }
        match probe_video(&job.video_input).await {
            Ok(info) => info.duration_ms(),
            Err(e) => {
                debug!("Could not probe input duration: {}", e);
                0
            }
        }
    }

    /// Confirm the output has exactly the requested geometry.
    async fn verify_output(job: &TranscodeJob) -> MediaResult<()> {
        if check_ffprobe().is_err() {
            debug!("ffprobe not available, skipping output verification");
            return Ok(());
        }

        let info = probe_video(&job.output).await?;
        check_geometry(&info, job.width, job.height)
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn transcode(&self, job: &TranscodeJob, on_progress: ProgressCallback) -> MediaResult<()> {
        if !job.video_input.exists() {
            return Err(MediaError::FileNotFound(job.video_input.clone()));
        }
        if let Some(audio) = job.audio_input.as_ref().filter(|a| !a.exists()) {
            return Err(MediaError::FileNotFound(audio.clone()));
        }

        let total_ms = Self::input_duration_ms(job).await;
        let cmd = job.to_command();

        info!(
            input = %job.video_input.display(),
            output = %job.output.display(),
            width = job.width,
            height = job.height,
            separate_audio = job.audio_input.is_some(),
            "Transcoding"
        );

        self.runner
            .run_with_progress(&cmd, move |p| {
                if total_ms > 0 || p.is_complete {
                    on_progress(p.percent(total_ms));
                }
            })
            .await?;

        Self::verify_output(job).await?;

        info!(output = %job.output.display(), "Transcode finished");
        Ok(())
    }
}

/// Reject output whose frame size differs from the requested one.
fn check_geometry(info: &VideoInfo, width: u32, height: u32) -> MediaResult<()> {
    if (info.width, info.height) != (width, height) {
        return Err(MediaError::InvalidVideo(format!(
            "expected {}x{} output, got {}x{}",
            width, height, info.width, info.height
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(audio: Option<&str>) -> TranscodeJob {
        TranscodeJob {
            video_input: PathBuf::from("work/t1_clip_video.mp4"),
            audio_input: audio.map(PathBuf::from),
            output: PathBuf::from("work/t1_clip_720p.mp4"),
            width: 1280,
            height: 720,
            encoding: EncodingConfig::default(),
        }
    }

    #[test]
    fn test_muxed_command() {
        let args = job(None).to_command().build_args();
        assert_eq!(args.iter().filter(|a| *a == "-i").count(), 1);
        assert!(args.windows(2).any(|w| w == ["-map", "0:v:0"]));
        assert!(args.windows(2).any(|w| w == ["-map", "0:a:0?"]));
        assert!(args.windows(2).any(|w| w
            == [
                "-vf",
                "scale=1280:720:force_original_aspect_ratio=decrease,pad=1280:720:(ow-iw)/2:(oh-ih)/2,setsar=1"
            ]));
        assert!(args.windows(2).any(|w| w == ["-c:v", "libx264"]));
        assert!(args.windows(2).any(|w| w == ["-c:a", "aac"]));
        assert_eq!(args.last().unwrap(), "work/t1_clip_720p.mp4");
    }

    #[test]
    fn test_separate_audio_command() {
        let args = job(Some("work/t1_clip_audio.m4a")).to_command().build_args();
        assert_eq!(args.iter().filter(|a| *a == "-i").count(), 2);
        assert!(args.contains(&"work/t1_clip_audio.m4a".to_string()));
        assert!(args.windows(2).any(|w| w == ["-map", "1:a:0"]));
    }

    #[tokio::test]
    async fn test_missing_input_is_rejected() {
        let dir = tempfile::TempDir::new().unwrap();
        let job = TranscodeJob {
            video_input: dir.path().join("missing.mp4"),
            output: dir.path().join("out.mp4"),
            ..job(None)
        };
        let err = FfmpegTranscoder::new()
            .transcode(&job, Box::new(|_| {}))
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::FileNotFound(_)));
    }

    #[tokio::test]
    async fn test_missing_ffmpeg_is_reported() {
        let dir = tempfile::TempDir::new().unwrap();
        let input = dir.path().join("in.mp4");
        tokio::fs::write(&input, b"not really a video").await.unwrap();
        let job = TranscodeJob {
            video_input: input,
            output: dir.path().join("out.mp4"),
            ..job(None)
        };

        let transcoder =
            FfmpegTranscoder::with_runner(FfmpegRunner::new().with_program("definitely-not-ffmpeg-vfetch"));
        let err = transcoder.transcode(&job, Box::new(|_| {})).await.unwrap_err();
        assert!(err.is_missing_tool());
    }

    #[test]
    fn test_matching_geometry_passes() {
        let info = VideoInfo {
            duration: 4.0,
            width: 1280,
            height: 720,
        };
        assert!(check_geometry(&info, 1280, 720).is_ok());
    }

    #[test]
    fn test_wrong_geometry_is_rejected() {
        let info = VideoInfo {
            duration: 4.0,
            width: 1280,
            height: 718,
        };
        match check_geometry(&info, 1280, 720) {
            Err(MediaError::InvalidVideo(msg)) => {
                assert_eq!(msg, "expected 1280x720 output, got 1280x718")
            }
            other => panic!("expected InvalidVideo, got {:?}", other),
        }
    }
}
