//! Health check handlers.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::Serialize;

use vfetch_media::{check_ffmpeg, check_ytdlp, MediaResult};

use crate::state::AppState;

/// Health response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: String,
}

/// Health check endpoint (liveness probe).
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now().to_rfc3339(),
    })
}

/// Readiness check response.
#[derive(Serialize)]
pub struct ReadinessResponse {
    pub status: String,
    pub checks: ReadinessChecks,
    pub tasks_in_flight: usize,
    pub tasks_total: usize,
}

#[derive(Serialize)]
pub struct ReadinessChecks {
    pub work_dir: CheckStatus,
    pub ffmpeg: CheckStatus,
    pub yt_dlp: CheckStatus,
}

#[derive(Serialize)]
pub struct CheckStatus {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CheckStatus {
    fn ok() -> Self {
        Self {
            status: "ok".to_string(),
            error: None,
        }
    }

    fn error(msg: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            error: Some(msg.into()),
        }
    }

    fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

impl<T> From<MediaResult<T>> for CheckStatus {
    fn from(result: MediaResult<T>) -> Self {
        match result {
            Ok(_) => Self::ok(),
            Err(e) => Self::error(e.to_string()),
        }
    }
}

/// Readiness check endpoint.
pub async fn ready(
    State(state): State<AppState>,
) -> Result<Json<ReadinessResponse>, (StatusCode, Json<ReadinessResponse>)> {
    let work_dir = if state.work_dir.exists() {
        CheckStatus::ok()
    } else {
        CheckStatus::error(format!(
            "Working directory {} is missing",
            state.work_dir.path().display()
        ))
    };

    let checks = ReadinessChecks {
        work_dir,
        ffmpeg: check_ffmpeg().into(),
        yt_dlp: check_ytdlp().into(),
    };
    let all_ok = checks.work_dir.is_ok() && checks.ffmpeg.is_ok() && checks.yt_dlp.is_ok();

    let response = ReadinessResponse {
        status: if all_ok { "ready" } else { "degraded" }.to_string(),
        checks,
        tasks_in_flight: state.executor.in_flight(),
        tasks_total: state.store.len(),
    };

    if all_ok {
        Ok(Json(response))
    } else {
        Err((StatusCode::SERVICE_UNAVAILABLE, Json(response)))
    }
}
