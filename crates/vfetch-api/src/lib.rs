//! Axum HTTP API server.
//!
//! This crate provides:
//! - Download submission, status polling and artifact retrieval
//! - Per-client rate limiting and security headers
//! - Health and readiness probes
//! - Prometheus metrics

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
