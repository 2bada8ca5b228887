//! Download submission and artifact retrieval.

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::header;
use axum::response::Response;
use axum::Json;
use serde::{Deserialize, Serialize};
use tokio_util::io::ReaderStream;
use tracing::{debug, info};

use vfetch_models::{Resolution, TaskId, TaskStatus};

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::state::AppState;

/// Longest source URL accepted at submission.
pub const MAX_URL_LENGTH: usize = 2048;

const NOT_READY: &str = "Download not ready or doesn't exist";

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct DownloadRequest {
    pub url: String,
    pub resolution: String,
}

#[derive(Debug, Serialize)]
pub struct DownloadAccepted {
    pub task_id: TaskId,
    pub message: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// Accept a fetch-and-transcode request and schedule it.
///
/// Only the resolution and the gross shape of the URL are checked here; a
/// URL that names no recognizable video still yields a task, which fails.
pub async fn submit_download(
    State(state): State<AppState>,
    Json(request): Json<DownloadRequest>,
) -> ApiResult<Json<DownloadAccepted>> {
    let resolution: Resolution = request.resolution.parse()?;

    let url = request.url.trim();
    if url.is_empty() {
        return Err(ApiError::bad_request("URL must not be empty"));
    }
    if url.len() > MAX_URL_LENGTH {
        return Err(ApiError::bad_request(format!(
            "URL exceeds {} characters",
            MAX_URL_LENGTH
        )));
    }

    let task_id = TaskId::new();
    state.store.create(task_id.clone())?;
    state
        .executor
        .spawn(task_id.clone(), url.to_string(), resolution);
    metrics::record_task_submitted(resolution.label());

    info!(task_id = %task_id, resolution = %resolution, "Download request accepted");

    Ok(Json(DownloadAccepted {
        task_id,
        message: "Download request accepted".to_string(),
    }))
}

/// Stream a completed task's output file.
pub async fn download_file(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> ApiResult<Response> {
    let task_id = TaskId::from_string(task_id);
    let task = state
        .store
        .get(&task_id)
        .ok_or_else(|| ApiError::not_found(NOT_READY))?;

    let filename = match (task.status(), task.filename()) {
        (TaskStatus::Completed, Some(name)) => name.to_string(),
        _ => return Err(ApiError::not_found(NOT_READY)),
    };

    let path = state.work_dir.path_for(&filename);
    let file = match tokio::fs::File::open(&path).await {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(task_id = %task_id, path = %path.display(), "Output file missing");
            return Err(ApiError::not_found(NOT_READY));
        }
        Err(e) => return Err(e.into()),
    };
    let len = file.metadata().await?.len();

    Response::builder()
        .header(header::CONTENT_TYPE, "video/mp4")
        .header(header::CONTENT_LENGTH, len)
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", filename),
        )
        .body(Body::from_stream(ReaderStream::new(file)))
        .map_err(|e| ApiError::internal(e.to_string()))
}
