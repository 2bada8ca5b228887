//! FFmpeg progress parsing.

/// Position of a running encode, taken from FFmpeg's `-progress` blocks.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FfmpegProgress {
    /// Output time in milliseconds
    pub out_time_ms: i64,
    /// Set by the final `progress=end` block
    pub is_complete: bool,
}

impl FfmpegProgress {
    /// Calculate progress percentage given total duration in milliseconds.
    pub fn percentage(&self, total_duration_ms: i64) -> f64 {
        if self.is_complete {
            return 100.0;
        }
        if total_duration_ms <= 0 {
            return 0.0;
        }
        ((self.out_time_ms as f64 / total_duration_ms as f64) * 100.0).clamp(0.0, 100.0)
    }

    /// Whole percentage, as stored on a task.
    pub fn percent(&self, total_duration_ms: i64) -> u8 {
        self.percentage(total_duration_ms).floor() as u8
    }
}

/// Callback receiving transcode progress as a percentage (0-100).
pub type ProgressCallback = Box<dyn Fn(u8) + Send + Sync + 'static>;

/// Keys FFmpeg writes in `-progress` blocks.
const PROGRESS_KEYS: [&str; 12] = [
    "frame",
    "fps",
    "stream_0_0_q",
    "bitrate",
    "total_size",
    "out_time_us",
    "out_time_ms",
    "out_time",
    "dup_frames",
    "drop_frames",
    "speed",
    "progress",
];

/// Whether a stderr line belongs to FFmpeg's `-progress` output.
pub(crate) fn is_progress_line(line: &str) -> bool {
    line.trim()
        .split_once('=')
        .map(|(key, _)| PROGRESS_KEYS.contains(&key) || key.starts_with("stream_"))
        .unwrap_or(false)
}

/// Parse a progress line from FFmpeg's -progress output.
///
/// Returns a snapshot at the end of each block (`progress=...`).
pub(crate) fn parse_progress_line(line: &str, current: &mut FfmpegProgress) -> Option<FfmpegProgress> {
    let (key, value) = line.trim().split_once('=')?;
    match key {
        // Despite its name, out_time_ms is in microseconds too
        "out_time_us" | "out_time_ms" => {
            if let Ok(us) = value.parse::<i64>() {
                current.out_time_ms = us / 1000;
            }
            None
        }
        "progress" => {
            current.is_complete = value == "end";
            Some(*current)
        }
        _ => None,
    }
}
