//! Application state.

use std::sync::Arc;

use vfetch_media::{SourceFetcher, Transcoder};
use vfetch_worker::{Pipeline, TaskExecutor, TaskStore, WorkDir, WorkerConfig};

use crate::config::ApiConfig;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub store: Arc<TaskStore>,
    pub executor: Arc<TaskExecutor>,
    pub work_dir: Arc<WorkDir>,
}

impl AppState {
    /// Wire the store, pipeline and executor around the given collaborators.
    pub fn new(
        config: ApiConfig,
        worker_config: &WorkerConfig,
        work_dir: Arc<WorkDir>,
        fetcher: Arc<dyn SourceFetcher>,
        transcoder: Arc<dyn Transcoder>,
    ) -> Self {
        let store = Arc::new(TaskStore::new());
        let pipeline = Pipeline::new(
            Arc::clone(&store),
            Arc::clone(&work_dir),
            fetcher,
            transcoder,
            worker_config,
        );
        let executor = Arc::new(TaskExecutor::new(
            Arc::new(pipeline),
            worker_config.max_concurrent_tasks,
        ));

        Self {
            config,
            store,
            executor,
            work_dir,
        }
    }
}
