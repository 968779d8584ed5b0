//! HTTP API: dashboard, metric queries, health checks and Prometheus metrics

use crate::anomaly::{is_valid_contamination, MAX_CONTAMINATION};
use crate::health::{ComponentStatus, HealthRegistry};
use crate::monitor::Monitor;
use crate::observability::MonitorMetrics;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use prometheus::{Encoder, TextEncoder};
use serde::Deserialize;
use serde_json::json;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};

const DASHBOARD_TEMPLATE: &str = include_str!("../assets/dashboard.html");

/// Placeholder replaced with the dashboard refresh interval in milliseconds
const REFRESH_PLACEHOLDER: &str = "{{REFRESH_MS}}";

/// Render the dashboard page polling every `refresh_secs` seconds
pub fn render_dashboard(refresh_secs: u64) -> String {
    let refresh_ms = refresh_secs.max(1).saturating_mul(1000);
    DASHBOARD_TEMPLATE.replace(REFRESH_PLACEHOLDER, &refresh_ms.to_string())
}

/// Errors returned by API handlers
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("contamination must be a number in (0, {max}], got '{0}'", max = MAX_CONTAMINATION)]
    InvalidContamination(String),

    #[error("failed to encode metrics: {0}")]
    MetricsEncoding(#[from] prometheus::Error),
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidContamination(_) => StatusCode::BAD_REQUEST,
            ApiError::MetricsEncoding(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            warn!(error = %self, "Request failed");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub monitor: Arc<Monitor>,
    pub health_registry: HealthRegistry,
    pub metrics: MonitorMetrics,
    pub dashboard_html: Arc<str>,
}

impl AppState {
    pub fn new(monitor: Arc<Monitor>, refresh_secs: u64) -> Self {
        Self {
            health_registry: monitor.health_registry().clone(),
            monitor,
            metrics: MonitorMetrics::new(),
            dashboard_html: render_dashboard(refresh_secs).into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct AnomalyQuery {
    contamination: Option<String>,
}

async fn dashboard(State(state): State<Arc<AppState>>) -> Html<String> {
    Html(state.dashboard_html.to_string())
}

/// Health check response - returns 200 unless a component is unhealthy
async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy | ComponentStatus::Degraded => StatusCode::OK,
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

async fn current_metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.monitor.record_current().await)
}

async fn metrics_history(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.monitor.get_history())
}

async fn metrics_summary(State(state): State<Arc<AppState>>) -> Response {
    match state.monitor.summary() {
        Some(summary) => Json(summary).into_response(),
        None => Json(json!({})).into_response(),
    }
}

async fn anomalies(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AnomalyQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let contamination = match query.contamination {
        None => None,
        Some(raw) => match raw.trim().parse::<f64>() {
            Ok(value) if is_valid_contamination(value) => Some(value),
            _ => return Err(ApiError::InvalidContamination(raw)),
        },
    };

    Ok(Json(state.monitor.detect_anomalies(contamination)))
}

async fn predictions(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.monitor.predictions())
}

async fn alerts(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.monitor.alerts().await)
}

/// Prometheus metrics endpoint
async fn prometheus_metrics(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    state
        .metrics
        .set_history_size(state.monitor.history_stats().entries);

    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;

    Ok((
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
        .into_response())
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(dashboard))
        .route("/health", get(health))
        .route("/api/metrics", get(current_metrics))
        .route("/api/metrics/history", get(metrics_history))
        .route("/api/metrics/summary", get(metrics_summary))
        .route("/api/anomalies", get(anomalies))
        .route("/api/predictions", get(predictions))
        .route("/api/alerts", get(alerts))
        .route("/metrics", get(prometheus_metrics))
        .with_state(state)
}

/// Start the API server, returning once `shutdown` resolves
pub async fn serve<F>(addr: SocketAddr, state: Arc<AppState>, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = create_router(state);

    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}
