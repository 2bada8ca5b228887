//! Choosing which source streams to download.
//!
//! Output is always mp4, so only mp4 video and m4a/mp4 audio are considered.

use vfetch_models::{StreamInfo, StreamKind};

use crate::error::{MediaError, MediaResult};

/// Streams picked for one task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamSelection {
    /// A single stream carrying both video and audio.
    Muxed(StreamInfo),
    /// Video and audio downloaded separately and muxed during transcode.
    Separate { video: StreamInfo, audio: StreamInfo },
}

impl StreamSelection {
    /// The stream providing video.
    pub fn video(&self) -> &StreamInfo {
        match self {
            StreamSelection::Muxed(stream) => stream,
            StreamSelection::Separate { video, .. } => video,
        }
    }

    /// The separate audio stream, if any.
    pub fn audio(&self) -> Option<&StreamInfo> {
        match self {
            StreamSelection::Muxed(_) => None,
            StreamSelection::Separate { audio, .. } => Some(audio),
        }
    }

    /// Height of the selected video stream, 0 when unknown.
    pub fn video_height(&self) -> u32 {
        self.video().height_or_zero()
    }
}

fn is_mp4_video(stream: &StreamInfo, kind: StreamKind) -> bool {
    stream.kind == kind && stream.extension() == "mp4"
}

fn is_mp4_audio(stream: &StreamInfo) -> bool {
    stream.kind == StreamKind::AudioOnly && matches!(stream.extension().as_str(), "m4a" | "mp4")
}

fn best_video<'a>(streams: &'a [StreamInfo], kind: StreamKind) -> Option<&'a StreamInfo> {
    streams
        .iter()
        .filter(|s| is_mp4_video(s, kind))
        .max_by_key(|s| (s.height_or_zero(), s.bitrate_or_zero()))
}

/// Pick the streams to download for a target output height.
///
/// The best muxed mp4 stream wins when it reaches `target_height`. Otherwise a
/// taller video-only stream is paired with the best audio-only stream.
pub fn select_streams(streams: &[StreamInfo], target_height: u32) -> MediaResult<StreamSelection> {
    let muxed = best_video(streams, StreamKind::Muxed);
    let muxed_height = muxed.map(StreamInfo::height_or_zero).unwrap_or(0);

    if muxed_height < target_height {
        if let Some(video) = best_video(streams, StreamKind::VideoOnly)
            .filter(|v| v.height_or_zero() > muxed_height)
        {
            let audio = streams
                .iter()
                .filter(|s| is_mp4_audio(s))
                .max_by_key(|s| s.bitrate_or_zero());

            if let Some(audio) = audio {
                return Ok(StreamSelection::Separate {
                    video: video.clone(),
                    audio: audio.clone(),
                });
            }
        }
    }

    muxed
        .cloned()
        .map(StreamSelection::Muxed)
        .ok_or(MediaError::NoSuitableStream)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Vec<StreamInfo> {
        vec![
            StreamInfo::muxed("18", "mp4", 640, 360).with_bitrate(500),
            StreamInfo::muxed("22", "mp4", 1280, 720).with_bitrate(1500),
            StreamInfo::video_only("137", "mp4", 1920, 1080).with_bitrate(4000),
            StreamInfo::video_only("313", "webm", 3840, 2160).with_bitrate(15000),
            StreamInfo::audio_only("140", "m4a").with_bitrate(128),
            StreamInfo::audio_only("139", "m4a").with_bitrate(48),
            StreamInfo::audio_only("251", "webm").with_bitrate(160),
        ]
    }

    #[test]
    fn test_muxed_when_it_reaches_target() {
        let selection = select_streams(&catalog(), 720).unwrap();
        assert_eq!(selection, StreamSelection::Muxed(catalog()[1].clone()));
        assert!(selection.audio().is_none());

        let selection = select_streams(&catalog(), 480).unwrap();
        assert_eq!(selection.video().format_id, "22");
    }

    #[test]
    fn test_separate_when_muxed_is_too_small() {
        let selection = select_streams(&catalog(), 1080).unwrap();
        assert_eq!(selection.video().format_id, "137");
        assert_eq!(selection.audio().unwrap().format_id, "140");
        assert_eq!(selection.video_height(), 1080);
    }

    #[test]
    fn test_webm_is_ignored() {
        // 2160p only exists as webm; best mp4 video-only is still 1080p
        let selection = select_streams(&catalog(), 2160).unwrap();
        assert_eq!(selection.video().format_id, "137");
    }

    #[test]
    fn test_falls_back_to_muxed_without_audio() {
        let streams = vec![
            StreamInfo::muxed("18", "mp4", 640, 360),
            StreamInfo::video_only("137", "mp4", 1920, 1080),
        ];
        let selection = select_streams(&streams, 1080).unwrap();
        assert_eq!(selection.video().format_id, "18");
    }

    #[test]
    fn test_video_only_without_muxed() {
        let streams = vec![
            StreamInfo::video_only("136", "mp4", 1280, 720),
            StreamInfo::audio_only("140", "mp4"),
        ];
        let selection = select_streams(&streams, 480).unwrap();
        assert!(matches!(selection, StreamSelection::Separate { .. }));
    }

    #[test]
    fn test_no_suitable_stream() {
        assert!(matches!(select_streams(&[], 720), Err(MediaError::NoSuitableStream)));

        let only_video = vec![StreamInfo::video_only("137", "mp4", 1920, 1080)];
        assert!(matches!(
            select_streams(&only_video, 720),
            Err(MediaError::NoSuitableStream)
        ));

        let only_webm = vec![StreamInfo::muxed("43", "webm", 640, 360)];
        assert!(matches!(
            select_streams(&only_webm, 360),
            Err(MediaError::NoSuitableStream)
        ));
    }
}
