//! Fetch-and-transcode pipeline.
//!
//! Drives one task from `Queued` to a terminal state:
//! resolve the source URL, pick and download streams, transcode to the target
//! geometry, then record the output filename. Every transition goes through
//! the [`TaskStore`]; any error ends the task as `Failed`.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, warn, Instrument};

use vfetch_media::{select_streams, ProgressCallback, SourceFetcher, StreamSelection, TranscodeJob, Transcoder};
use vfetch_models::{extract_video_id, EncodingConfig, Resolution, Task, TaskId, TaskStatus};

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::logging::TaskLogger;
use crate::metrics;
use crate::store::TaskStore;
use crate::workdir::WorkDir;

/// Operation name attached to pipeline logs.
const OPERATION: &str = "fetch_transcode";

/// Downloaded inputs for the transcode step.
struct Downloads {
    video: PathBuf,
    audio: Option<PathBuf>,
}

impl Downloads {
    fn paths(&self) -> Vec<PathBuf> {
        std::iter::once(self.video.clone())
            .chain(self.audio.clone())
            .collect()
    }
}

/// Runs tasks against the injected collaborators.
pub struct Pipeline {
    store: Arc<TaskStore>,
    work_dir: Arc<WorkDir>,
    fetcher: Arc<dyn SourceFetcher>,
    transcoder: Arc<dyn Transcoder>,
    fetch_timeout: Duration,
    transcode_timeout: Duration,
    encoding: EncodingConfig,
}

impl Pipeline {
    pub fn new(
        store: Arc<TaskStore>,
        work_dir: Arc<WorkDir>,
        fetcher: Arc<dyn SourceFetcher>,
        transcoder: Arc<dyn Transcoder>,
        config: &WorkerConfig,
    ) -> Self {
        Self {
            store,
            work_dir,
            fetcher,
            transcoder,
            fetch_timeout: config.fetch_timeout,
            transcode_timeout: config.transcode_timeout,
            encoding: config.encoding.clone(),
        }
    }

    /// Run a task to completion. Never returns an error: failures are recorded
    /// on the task.
    pub async fn run(&self, task_id: &TaskId, url: &str, resolution: Resolution) {
        let logger = TaskLogger::new(task_id, OPERATION);
        let span = logger.create_span();

        async {
            logger.log_start(&format!("{} at {}", url, resolution));

            match self.execute(task_id, url, resolution, &logger).await {
                Ok(filename) => {
                    metrics::record_task_completed();
                    logger.log_completion(&filename);
                }
                Err(e) => {
                    let kind = e.kind();
                    logger.log_error(kind.as_str(), &e.to_string());
                    metrics::record_task_failed(kind);
                    self.fail_task(task_id, &e.task_message());
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Mark a task failed, unless it is already terminal.
    ///
    /// A task that never left `Queued` passes through `Fetching` in the same
    /// update, so readers never see it skip an edge.
    pub fn fail_task(&self, task_id: &TaskId, message: &str) {
        let outcome = self.store.update(task_id, |t| {
            if t.status() == TaskStatus::Queued {
                t.start_fetching()?;
            }
            t.fail(message)
        });
        if let Err(e) = outcome {
            warn!(task_id = %task_id, "Could not mark task failed: {}", e);
        }
    }

    async fn execute(
        &self,
        task_id: &TaskId,
        url: &str,
        resolution: Resolution,
        logger: &TaskLogger,
    ) -> WorkerResult<String> {
        self.store.update(task_id, Task::start_fetching)?;

        let fetch_started = Instant::now();
        let video_id = extract_video_id(url)?;

        let source = self
            .with_fetch_timeout(self.fetcher.fetch_source(&video_id))
            .await?;
        let selection = select_streams(&source.streams, resolution.height())?;
        logger.log_progress(&format!(
            "selected {} stream(s) for '{}' ({}p source)",
            if selection.audio().is_some() { 2 } else { 1 },
            source.title,
            selection.video_height()
        ));

        let downloads = self
            .download(task_id, &video_id, &source.title, &selection)
            .await?;
        metrics::record_fetch_duration(fetch_started.elapsed());

        if let Err(e) = self.store.update(task_id, Task::begin_processing) {
            self.discard(&downloads.paths()).await;
            return Err(e.into());
        }

        let output_name = WorkDir::file_name(task_id, &source.title, resolution.label(), "mp4");
        let job = TranscodeJob {
            video_input: downloads.video.clone(),
            audio_input: downloads.audio.clone(),
            output: self.work_dir.path_for(&output_name),
            width: resolution.width(),
            height: resolution.height(),
            encoding: self.encoding.clone(),
        };

        let transcode_started = Instant::now();
        let result = self.transcode(task_id, &job).await;

        // Inputs are superseded whatever the outcome
        self.discard(&downloads.paths()).await;

        if let Err(e) = result {
            self.discard(std::slice::from_ref(&job.output)).await;
            return Err(e);
        }
        metrics::record_transcode_duration(transcode_started.elapsed());

        self.store
            .update(task_id, |t| t.complete(output_name.as_str()))?;
        Ok(output_name)
    }

    /// Download the selected streams. Partial files are removed on failure.
    async fn download(
        &self,
        task_id: &TaskId,
        video_id: &str,
        title: &str,
        selection: &StreamSelection,
    ) -> WorkerResult<Downloads> {
        let video_stream = selection.video();
        let downloads = Downloads {
            video: self.work_dir.path_for(&WorkDir::file_name(
                task_id,
                title,
                "video",
                &video_stream.extension(),
            )),
            audio: selection.audio().map(|audio| {
                self.work_dir
                    .path_for(&WorkDir::file_name(task_id, title, "audio", &audio.extension()))
            }),
        };

        let mut result = self
            .with_fetch_timeout(self.fetcher.download_stream(video_id, video_stream, &downloads.video))
            .await;

        if result.is_ok() {
            if let (Some(audio), Some(dest)) = (selection.audio(), downloads.audio.as_deref()) {
                result = self
                    .with_fetch_timeout(self.fetcher.download_stream(video_id, audio, dest))
                    .await;
            }
        }

        match result {
            Ok(()) => Ok(downloads),
            Err(e) => {
                self.discard(&downloads.paths()).await;
                Err(e)
            }
        }
    }

    async fn transcode(&self, task_id: &TaskId, job: &TranscodeJob) -> WorkerResult<()> {
        let store = Arc::clone(&self.store);
        let id = task_id.clone();
        let on_progress: ProgressCallback = Box::new(move |percent| {
            // Rejected once the task has left Processing
            let _ = store.update(&id, |t| t.set_progress(percent));
        });

        match tokio::time::timeout(self.transcode_timeout, self.transcoder.transcode(job, on_progress)).await {
            Ok(result) => result.map_err(WorkerError::from),
            Err(_) => Err(WorkerError::TranscodeTimeout(self.transcode_timeout.as_secs())),
        }
    }

    async fn with_fetch_timeout<T, F>(&self, fut: F) -> WorkerResult<T>
    where
        F: Future<Output = vfetch_media::MediaResult<T>>,
    {
        match tokio::time::timeout(self.fetch_timeout, fut).await {
            Ok(result) => result.map_err(WorkerError::from),
            Err(_) => Err(WorkerError::FetchTimeout(self.fetch_timeout.as_secs())),
        }
    }

    /// Best-effort removal of working files.
    async fn discard(&self, paths: &[PathBuf]) {
        for path in paths {
            remove_quietly(path).await;
        }
    }
}

async fn remove_quietly(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!(path = %path.display(), "Removed working file"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), "Failed to remove working file: {}", e),
    }
}
