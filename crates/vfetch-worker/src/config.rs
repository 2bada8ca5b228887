//! Worker configuration.

use std::path::PathBuf;
use std::time::Duration;

use vfetch_models::EncodingConfig;

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Directory for in-flight and completed files
    pub work_dir: PathBuf,
    /// Maximum concurrently running pipelines
    pub max_concurrent_tasks: usize,
    /// Bound on source metadata lookup and each stream download
    pub fetch_timeout: Duration,
    /// Bound on a single transcode
    pub transcode_timeout: Duration,
    /// How long shutdown waits for in-flight tasks
    pub shutdown_timeout: Duration,
    pub encoding: EncodingConfig,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            work_dir: PathBuf::from("downloaded_videos"),
            max_concurrent_tasks: 4,
            fetch_timeout: Duration::from_secs(600),
            transcode_timeout: Duration::from_secs(3600), // 1 hour
            shutdown_timeout: Duration::from_secs(30),
            encoding: EncodingConfig::default(),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.trim().parse().ok())
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let mut encoding = defaults
            .encoding
            .with_crf(env_parse("TRANSCODE_CRF").unwrap_or(vfetch_models::encoding::DEFAULT_CRF))
            .with_audio_copy(env_parse("TRANSCODE_AUDIO_COPY").unwrap_or(false));
        if let Ok(preset) = std::env::var("TRANSCODE_PRESET") {
            encoding = encoding.with_preset(preset);
        }

        Self {
            work_dir: std::env::var("WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.work_dir),
            max_concurrent_tasks: env_parse::<usize>("MAX_CONCURRENT_TASKS")
                .filter(|n| *n > 0)
                .unwrap_or(defaults.max_concurrent_tasks),
            fetch_timeout: env_parse("FETCH_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.fetch_timeout),
            transcode_timeout: env_parse("TRANSCODE_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.transcode_timeout),
            shutdown_timeout: env_parse("SHUTDOWN_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.shutdown_timeout),
            encoding,
        }
    }
}
