//! HTTP-level tests against the full router with fake collaborators.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio_test::assert_ok;
use tower::ServiceExt;

use vfetch_api::{create_router, ApiConfig, AppState};
use vfetch_media::{
    MediaResult, ProgressCallback, SourceFetcher, TranscodeJob, Transcoder,
};
use vfetch_models::{SourceInfo, StreamInfo};
use vfetch_worker::{WorkDir, WorkerConfig};

const OUTPUT_BYTES: &[u8] = b"transcoded video bytes";

struct FakeFetcher;

#[async_trait]
impl SourceFetcher for FakeFetcher {
    async fn fetch_source(&self, video_id: &str) -> MediaResult<SourceInfo> {
        Ok(SourceInfo {
            video_id: video_id.to_string(),
            title: "Big Buck Bunny".to_string(),
            streams: vec![
                StreamInfo::muxed("18", "mp4", 640, 360),
                StreamInfo::video_only("136", "mp4", 1280, 720),
                StreamInfo::audio_only("140", "m4a").with_bitrate(128),
            ],
        })
    }

    async fn download_stream(&self, _video_id: &str, _stream: &StreamInfo, dest: &Path) -> MediaResult<()> {
        tokio::fs::write(dest, b"source").await?;
        Ok(())
    }
}

struct FakeTranscoder {
    hang: bool,
}

#[async_trait]
impl Transcoder for FakeTranscoder {
    async fn transcode(&self, job: &TranscodeJob, on_progress: ProgressCallback) -> MediaResult<()> {
        on_progress(40);
        if self.hang {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        tokio::fs::write(&job.output, OUTPUT_BYTES).await?;
        Ok(())
    }
}

struct TestApp {
    _root: TempDir,
    router: Router,
    state: AppState,
}

async fn app_with(config: ApiConfig, hang: bool) -> TestApp {
    let root = TempDir::new().unwrap();
    let worker_config = WorkerConfig {
        work_dir: root.path().join("work"),
        fetch_timeout: Duration::from_secs(5),
        transcode_timeout: Duration::from_secs(5),
        ..WorkerConfig::default()
    };
    let work_dir = Arc::new(WorkDir::create(&worker_config.work_dir).await.unwrap());
    let state = AppState::new(
        config,
        &worker_config,
        work_dir,
        Arc::new(FakeFetcher),
        Arc::new(FakeTranscoder { hang }),
    );
    TestApp {
        _root: root,
        router: create_router(state.clone(), None),
        state,
    }
}

async fn app() -> TestApp {
    app_with(ApiConfig::default(), false).await
}

fn submit_request(url: &str, resolution: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/download")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({ "url": url, "resolution": resolution }).to_string(),
        ))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn send(app: &TestApp, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

async fn submit(app: &TestApp, url: &str, resolution: &str) -> String {
    let (status, body) = send(app, submit_request(url, resolution)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Download request accepted");
    body["task_id"].as_str().unwrap().to_string()
}

/// Poll status until the task reaches a terminal state.
async fn wait_terminal(app: &TestApp, task_id: &str) -> Value {
    for _ in 0..100 {
        let (status, body) = send(app, get(&format!("/status/{}", task_id))).await;
        assert_eq!(status, StatusCode::OK);
        if body["status"] == "Completed" || body["status"] == "Failed" {
            return body;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("task {} never finished", task_id);
}

#[tokio::test]
async fn test_submit_poll_and_download() {
    let app = app().await;
    let task_id = submit(&app, "https://www.youtube.com/watch?v=aqz-KE-bpKQ", "720p").await;

    let task = wait_terminal(&app, &task_id).await;
    assert_eq!(task["status"], "Completed");
    assert_eq!(task["progress"], 100);
    assert_eq!(task["task_id"], task_id.as_str());
    let filename = task["filename"].as_str().unwrap();
    assert!(filename.ends_with(".mp4"));

    let response = app
        .router
        .clone()
        .oneshot(get(&format!("/download/{}", task_id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(headers[header::CONTENT_TYPE], "video/mp4");
    assert_eq!(
        headers[header::CONTENT_LENGTH],
        OUTPUT_BYTES.len().to_string().as_str()
    );
    let disposition = headers[header::CONTENT_DISPOSITION].to_str().unwrap();
    assert!(disposition.starts_with("attachment"));
    assert!(disposition.contains(filename));

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], OUTPUT_BYTES);
}

#[tokio::test]
async fn test_status_is_idempotent() {
    let app = app().await;
    let task_id = submit(&app, "https://youtu.be/aqz-KE-bpKQ", "480p").await;
    wait_terminal(&app, &task_id).await;

    let (_, first) = send(&app, get(&format!("/status/{}", task_id))).await;
    let (_, second) = send(&app, get(&format!("/status/{}", task_id))).await;
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_unsupported_resolution_rejected() {
    let app = app().await;
    let (status, body) = send(&app, submit_request("https://youtu.be/aqz-KE-bpKQ", "4k")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let detail = body["detail"].as_str().unwrap();
    assert!(detail.contains("4k"));
    assert!(detail.contains("2160p, 1080p, 720p, 480p"));
    assert!(app.state.store.is_empty());
}

#[tokio::test]
async fn test_empty_url_rejected() {
    let app = app().await;
    let (status, _) = send(&app, submit_request("   ", "720p")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(app.state.store.is_empty());
}

#[tokio::test]
async fn test_overlong_url_rejected() {
    let app = app().await;
    let url = format!("https://youtu.be/{}", "a".repeat(2100));
    let (status, _) = send(&app, submit_request(&url, "720p")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unrecognized_url_fails_task() {
    let app = app().await;
    let task_id = submit(&app, "https://example.com/watch?v=abc", "720p").await;

    let task = wait_terminal(&app, &task_id).await;
    assert_eq!(task["status"], "Failed");
    assert_eq!(task["error"], "Invalid source URL");
}

#[tokio::test]
async fn test_unknown_task_status() {
    let app = app().await;
    let (status, body) = send(&app, get("/status/does-not-exist")).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "detail": "Task not found" }));
}

#[tokio::test]
async fn test_download_unknown_task() {
    let app = app().await;
    let (status, body) = send(&app, get("/download/does-not-exist")).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], "Download not ready or doesn't exist");
}

#[tokio::test]
async fn test_download_before_completion() {
    let app = app_with(ApiConfig::default(), true).await;
    let task_id = submit(&app, "https://youtu.be/aqz-KE-bpKQ", "720p").await;

    // Wait until the transcode has reported progress
    for _ in 0..100 {
        let (_, task) = send(&app, get(&format!("/status/{}", task_id))).await;
        if task["status"] == "Processing" && task["progress"] == 40 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    let (status, body) = send(&app, get(&format!("/download/{}", task_id))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], "Download not ready or doesn't exist");
}

#[tokio::test]
async fn test_download_after_purge() {
    let app = app().await;
    let task_id = submit(&app, "https://youtu.be/aqz-KE-bpKQ", "1080p").await;
    let task = wait_terminal(&app, &task_id).await;
    assert_eq!(task["status"], "Completed");

    assert_ok!(app.state.work_dir.purge().await);

    let (status, _) = send(&app, get(&format!("/download/{}", task_id))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_submissions_are_rate_limited_per_client() {
    let config = ApiConfig {
        rate_limit_rps: 1,
        ..ApiConfig::default()
    };
    let app = app_with(config, false).await;

    let from = |ip: &str| {
        let mut request = submit_request("https://youtu.be/aqz-KE-bpKQ", "8k");
        request
            .headers_mut()
            .insert("x-forwarded-for", ip.parse().unwrap());
        request
    };

    let (first, _) = send(&app, from("203.0.113.7")).await;
    assert_eq!(first, StatusCode::BAD_REQUEST);

    let response = app.router.clone().oneshot(from("203.0.113.7")).await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(response.headers()[header::RETRY_AFTER], "1");

    let (other, _) = send(&app, from("203.0.113.8")).await;
    assert_eq!(other, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_health_and_response_headers() {
    let app = app().await;
    let response = app.router.clone().oneshot(get("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-content-type-options"], "nosniff");
    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn test_ready_degraded_without_work_dir() {
    let app = app().await;
    assert_ok!(app.state.work_dir.purge().await);

    let (status, body) = send(&app, get("/ready")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["checks"]["work_dir"]["status"], "error");
}
