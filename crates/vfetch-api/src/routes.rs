//! API routes.

use axum::extract::State;
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};

use crate::handlers::{download_file, get_status, health, ready, submit_download};
use crate::metrics::{metrics_middleware, set_task_counts};
use crate::middleware::{cors_layer, rate_limit_middleware, request_logging, security_headers, RateLimiterCache};
use crate::state::AppState;

/// Create the API router.
pub fn create_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    let rate_limiter = RateLimiterCache::new(state.config.rate_limit_rps);

    // Only submissions start work, so only they are rate limited
    let submit_routes = Router::new()
        .route("/download", post(submit_download))
        .route_layer(middleware::from_fn_with_state(rate_limiter, rate_limit_middleware));

    let task_routes = Router::new()
        .route("/status/:task_id", get(get_status))
        .route("/download/:task_id", get(download_file));

    let health_routes = Router::new()
        .route("/health", get(health))
        .route("/healthz", get(health))
        .route("/ready", get(ready));

    let metrics_routes = match metrics_handle {
        Some(handle) => Router::new().route(
            "/metrics",
            get(move |State(state): State<AppState>| async move {
                set_task_counts(&state.store.counts_by_status(), state.executor.in_flight());
                handle.render()
            }),
        ),
        None => Router::new(),
    };

    Router::new()
        .merge(submit_routes)
        .merge(task_routes)
        .merge(health_routes)
        .merge(metrics_routes)
        .layer(RequestBodyLimitLayer::new(state.config.max_body_size))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(security_headers))
        .layer(middleware::from_fn(request_logging))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}
