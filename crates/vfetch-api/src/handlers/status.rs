//! Task status polling.

use axum::extract::{Path, State};
use axum::Json;

use vfetch_models::{Task, TaskId};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Current snapshot of a task.
pub async fn get_status(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> ApiResult<Json<Task>> {
    state
        .store
        .get(&TaskId::from_string(task_id))
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Task not found"))
}
