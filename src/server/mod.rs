//! HTTP surface: job submission, polling, results, subtitle download and video streaming.

pub mod api;
pub mod error;
pub mod handlers;
pub mod stream;

use axum::http::{header, HeaderValue, Method, StatusCode, Uri};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::Environment;
use crate::error::{AppError, Result};
use crate::jobs::JobStore;
use crate::workflow::Workflow;
use self::error::ApiError;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub workflow: Arc<Workflow>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(workflow: Arc<Workflow>) -> Self {
        Self {
            workflow,
            started_at: Instant::now(),
        }
    }

    pub fn environment(&self) -> Environment {
        self.workflow.config().server.environment
    }

    pub fn fail(&self, e: AppError) -> ApiError {
        ApiError::from_app_error(e, self.environment())
    }
}

pub fn router(state: AppState) -> Router {
    let config = state.workflow.config();
    let prefix = config.api_prefix();

    let video = Router::new()
        .route("/process", post(handlers::process_video))
        .route("/validate", post(handlers::validate_url))
        .route("/jobs", get(handlers::list_jobs))
        .route("/stats", get(handlers::job_stats))
        .route("/job/:job_id", delete(handlers::delete_job))
        .route("/job/:job_id/status", get(handlers::job_status))
        .route("/job/:job_id/result", get(handlers::job_result))
        .route("/job/:job_id/subtitles", get(handlers::job_subtitles))
        .route("/:job_id/stream", get(stream::stream_video));

    Router::new()
        .route("/", get(api::welcome))
        .route("/health", get(api::health))
        .route(&format!("{}/status", prefix), get(api::api_status))
        .route(&format!("{}/translate", prefix), post(api::translate_text))
        .route(&format!("{}/improve", prefix), post(api::improve_translation))
        .route(&format!("{}/languages", prefix), get(api::languages))
        .route(&format!("{}/models", prefix), get(api::models))
        .nest(&format!("{}/video", prefix), video)
        .fallback(route_not_found)
        .layer(cors_layer(&config.server.cors_origin))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn route_not_found(method: Method, uri: Uri) -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": "Route not found",
            "path": uri.path(),
            "method": method.as_str(),
        })),
    )
}

fn cors_layer(origin: &str) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::RANGE, header::AUTHORIZATION])
        .expose_headers([header::CONTENT_RANGE, header::ACCEPT_RANGES, header::CONTENT_LENGTH]);

    if origin.trim() == "*" {
        return layer.allow_origin(Any);
    }
    match HeaderValue::from_str(origin.trim()) {
        Ok(value) => layer.allow_origin(value),
        Err(e) => {
            warn!("Invalid CORS origin {:?} ({}), allowing any origin", origin, e);
            layer.allow_origin(Any)
        }
    }
}

/// Periodically drop jobs older than `max_age` until `token` is cancelled
fn spawn_sweeper(
    store: Arc<JobStore>,
    every: Duration,
    max_age: chrono::Duration,
    token: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every.max(Duration::from_secs(1)));
        // the first tick fires immediately
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = ticker.tick() => {
                    let store = store.clone();
                    match tokio::task::spawn_blocking(move || store.sweep(max_age)).await {
                        Ok(0) => {}
                        Ok(removed) => info!("Swept {} expired jobs", removed),
                        Err(e) => warn!("Sweep failed: {}", e),
                    }
                }
            }
        }
    })
}

/// Bind, serve until Ctrl-C, then stop the sweeper.
pub async fn serve(workflow: Arc<Workflow>) -> Result<()> {
    let server = workflow.config().server.clone();
    let pipeline = workflow.config().pipeline.clone();
    let max_age_secs = pipeline.job_max_age_hours.saturating_mul(3600);

    let layout = workflow.layout().clone();
    layout.ensure_directories().await?;
    let purged = tokio::task::spawn_blocking(move || {
        layout.purge_stale_files(Duration::from_secs(max_age_secs))
    })
    .await
    .map_err(|e| AppError::Internal(format!("Startup cleanup failed: {}", e)))?;
    if purged > 0 {
        info!("Removed {} stale media files", purged);
    }

    workflow.check_dependencies().await;

    let shutdown = CancellationToken::new();
    let sweeper = spawn_sweeper(
        workflow.store().clone(),
        Duration::from_secs(pipeline.sweep_interval_secs),
        chrono::Duration::seconds(max_age_secs as i64),
        shutdown.clone(),
    );

    let listener = TcpListener::bind((server.host.as_str(), server.port)).await?;
    info!(
        "Listening on http://{} ({})",
        listener.local_addr()?,
        server.environment.as_str()
    );

    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for shutdown signal: {}", e);
            return;
        }
        info!("Shutdown signal received");
        signal_token.cancel();
    });

    let server_token = shutdown.clone();
    axum::serve(listener, router(AppState::new(workflow)))
        .with_graceful_shutdown(async move { server_token.cancelled().await })
        .await?;

    shutdown.cancel();
    if let Err(e) = sweeper.await {
        warn!("Sweeper task ended abnormally: {}", e);
    }
    info!("Server stopped");
    Ok(())
}
