//! Drowsiness Monitor API Server
//!
//! HTTP control surface: start and stop the detection session and read the
//! current driver status.

use anyhow::Context;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use serde::Serialize;
use std::str::FromStr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

pub mod routes;
pub mod settings;

use alerting::build_alarm;
use camera_capture::FfmpegBackend;
use dms::{DetectionSession, DriverStatus, OnnxRegionDetector};
use settings::{LoggingSettings, Settings};

/// Application state shared across handlers
pub struct AppState {
    /// The single detection session
    pub session: DetectionSession,
    /// Version string
    pub version: String,
    /// Start time
    pub start_time: std::time::Instant,
    /// Prometheus exposition, when the recorder is installed
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// Create new application state
    pub fn new(session: DetectionSession, metrics: Option<PrometheusHandle>) -> Self {
        Self {
            session,
            version: env!("CARGO_PKG_VERSION").to_string(),
            start_time: std::time::Instant::now(),
            metrics,
        }
    }
}

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: u64,
    pub version: String,
    pub uptime_seconds: u64,
    pub detection_running: bool,
    pub driver_status: DriverStatus,
}

/// Create the application router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/start", post(routes::control::start_detection))
        .route("/stop", post(routes::control::stop_detection))
        .route("/status", get(routes::control::get_status))
        .route("/api/v1/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check handler
async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    let driver_status = state.session.status().status;
    let status = if driver_status == DriverStatus::CameraError {
        "degraded"
    } else {
        "healthy"
    };

    Json(HealthResponse {
        status: status.to_string(),
        timestamp,
        version: state.version.clone(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        detection_running: state.session.is_running(),
        driver_status,
    })
}

/// Prometheus text exposition
async fn metrics_handler(State(state): State<Arc<AppState>>) -> Response {
    match &state.metrics {
        Some(handle) => (StatusCode::OK, handle.render()).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Initialize logging
pub fn init_logging(settings: &LoggingSettings) -> anyhow::Result<()> {
    let level = Level::from_str(&settings.level)
        .with_context(|| format!("invalid log level {:?}", settings.level))?;

    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true);

    if settings.json {
        tracing::subscriber::set_global_default(builder.json().finish())
    } else {
        tracing::subscriber::set_global_default(builder.finish())
    }
    .context("Failed to set tracing subscriber")
}

/// Build the detection session from settings
pub fn build_session(settings: &Settings) -> anyhow::Result<DetectionSession> {
    let detector =
        OnnxRegionDetector::new(&settings.dms).context("failed to load detection models")?;
    let camera = FfmpegBackend::new(settings.camera.clone());
    let alarm = build_alarm(&settings.alarm);

    Ok(DetectionSession::new(
        Arc::new(camera),
        Arc::new(detector),
        alarm,
        dms::config::FRAME_WIDTH,
    ))
}

/// Run the server until Ctrl-C, then stop detection and release the camera
pub async fn run_server(settings: Settings) -> anyhow::Result<()> {
    let session = build_session(&settings)?;

    let metrics = if settings.server.metrics {
        Some(
            PrometheusBuilder::new()
                .install_recorder()
                .context("failed to install metrics recorder")?,
        )
    } else {
        None
    };

    let state = Arc::new(AppState::new(session, metrics));
    let app = create_router(state.clone());

    info!("Starting API server on {}", settings.server.bind_addr);

    let listener = tokio::net::TcpListener::bind(&settings.server.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", settings.server.bind_addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    state.session.shutdown().await;
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
