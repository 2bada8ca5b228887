//! Task executor.
//!
//! Each submitted task gets its own tokio task; a semaphore bounds how many
//! pipelines run at once. Tasks waiting for a permit stay `Queued`.

use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::FutureExt;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use vfetch_models::{Resolution, TaskId};

use crate::error::ErrorKind;
use crate::metrics;
use crate::pipeline::Pipeline;

/// Message recorded when a pipeline panics.
const INTERNAL_ERROR: &str = "Internal error";

/// Decrements the in-flight counter when a spawned task ends, however it ends.
struct InFlightGuard(Arc<AtomicUsize>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Fire-and-forget scheduler for pipeline runs.
pub struct TaskExecutor {
    pipeline: Arc<Pipeline>,
    semaphore: Arc<Semaphore>,
    in_flight: Arc<AtomicUsize>,
}

impl TaskExecutor {
    pub fn new(pipeline: Arc<Pipeline>, max_concurrent_tasks: usize) -> Self {
        info!("Task executor ready with {} max concurrent tasks", max_concurrent_tasks);
        Self {
            pipeline,
            semaphore: Arc::new(Semaphore::new(max_concurrent_tasks.max(1))),
            in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Schedule a pipeline run and return immediately.
    pub fn spawn(&self, task_id: TaskId, url: String, resolution: Resolution) -> JoinHandle<()> {
        let pipeline = Arc::clone(&self.pipeline);
        let semaphore = Arc::clone(&self.semaphore);

        self.in_flight.fetch_add(1, Ordering::SeqCst);
        let guard = InFlightGuard(Arc::clone(&self.in_flight));

        tokio::spawn(async move {
            let _guard = guard;

            let _permit = match semaphore.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    error!(task_id = %task_id, "Executor closed before task could start");
                    pipeline.fail_task(&task_id, INTERNAL_ERROR);
                    return;
                }
            };

            debug!(task_id = %task_id, "Starting pipeline");
            let outcome = AssertUnwindSafe(pipeline.run(&task_id, &url, resolution))
                .catch_unwind()
                .await;

            if outcome.is_err() {
                error!(task_id = %task_id, "Pipeline panicked");
                metrics::record_task_failed(ErrorKind::ProcessingFailure);
                pipeline.fail_task(&task_id, INTERNAL_ERROR);
            }
        })
    }

    /// Number of scheduled tasks that have not finished, including queued ones.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Wait until no task is in flight. Returns false on timeout.
    pub async fn wait_idle(&self, timeout: Duration) -> bool {
        let wait = async {
            while self.in_flight() > 0 {
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
        };
        tokio::time::timeout(timeout, wait).await.is_ok()
    }
}
