//! Axum API server binary.

use std::net::SocketAddr;
use std::sync::Arc;

use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use vfetch_api::{create_router, error, metrics, ApiConfig, AppState};
use vfetch_media::{check_ffmpeg, check_ffprobe, check_ytdlp, FfmpegTranscoder, YtDlpFetcher};
use vfetch_worker::{WorkDir, WorkerConfig};

#[tokio::main]
async fn main() {
    // Load environment variables
    dotenvy::dotenv().ok();

    init_tracing();

    info!("Starting vfetch-api");

    let config = ApiConfig::from_env();
    let worker_config = WorkerConfig::from_env();
    error::configure_error_details(&config);
    info!(
        "API config: host={}, port={}, work_dir={}, max_concurrent_tasks={}",
        config.host,
        config.port,
        worker_config.work_dir.display(),
        worker_config.max_concurrent_tasks
    );

    for (tool, check) in [
        ("ffmpeg", check_ffmpeg()),
        ("ffprobe", check_ffprobe()),
        ("yt-dlp", check_ytdlp()),
    ] {
        match check {
            Ok(path) => info!("Found {} at {}", tool, path.display()),
            Err(e) => warn!("{}; tasks needing {} will fail", e, tool),
        }
    }

    let work_dir = match WorkDir::create(&worker_config.work_dir).await {
        Ok(dir) => Arc::new(dir),
        Err(e) => {
            error!("Failed to create working directory: {}", e);
            std::process::exit(1);
        }
    };

    let metrics_enabled = std::env::var("METRICS_ENABLED")
        .map(|v| v == "true" || v == "1")
        .unwrap_or(true);

    let metrics_handle = if metrics_enabled {
        match metrics::init_metrics() {
            Ok(handle) => {
                info!("Prometheus metrics enabled at /metrics");
                Some(handle)
            }
            Err(e) => {
                warn!("Failed to install Prometheus recorder: {}", e);
                None
            }
        }
    } else {
        None
    };

    let state = AppState::new(
        config.clone(),
        &worker_config,
        Arc::clone(&work_dir),
        Arc::new(YtDlpFetcher::new()),
        Arc::new(FfmpegTranscoder::new()),
    );
    let app = create_router(state.clone(), metrics_handle);

    let addr: SocketAddr = match config.bind_addr().parse() {
        Ok(addr) => addr,
        Err(e) => {
            error!("Invalid bind address {}: {}", config.bind_addr(), e);
            std::process::exit(1);
        }
    };
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };
    info!("Listening on {}", addr);

    if let Err(e) = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    {
        error!("Server error: {}", e);
    }

    // Let running pipelines finish, then remove everything they produced
    if !state.executor.wait_idle(worker_config.shutdown_timeout).await {
        warn!(
            in_flight = state.executor.in_flight(),
            "Shutdown timeout reached with tasks still running"
        );
    }
    match work_dir.purge().await {
        Ok(removed) => info!("Working directory purged ({} files)", removed),
        Err(e) => error!("Failed to purge working directory: {}", e),
    }

    info!("Server shutdown complete");
}

/// Colored output for dev, JSON for production.
fn init_tracing() {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("vfetch=info,tower_http=warn"));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(true).with_target(true))
            .with(env_filter)
            .init();
    }
}

/// Resolves on SIGINT (Ctrl-C) or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown");
}
