//! Health, version and metrics probes

use crate::state::AppState;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

const SERVICE_NAME: &str = "llm-gatekeeper";

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ReadyResponse {
    pub status: &'static str,
    pub policy: &'static str,
    pub inbound_scanners: usize,
    pub outbound_scanners: usize,
}

#[derive(Debug, Serialize)]
pub struct VersionResponse {
    pub service: &'static str,
    pub version: &'static str,
}

/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: SERVICE_NAME,
    })
}

/// GET /health/ready
pub async fn ready(State(state): State<AppState>) -> Json<ReadyResponse> {
    Json(ReadyResponse {
        status: "ready",
        policy: state.gateway.policy_name(),
        inbound_scanners: state.gateway.inbound_scanners().len(),
        outbound_scanners: state.gateway.outbound_scanners().len(),
    })
}

/// GET /health/live
pub async fn live() -> StatusCode {
    StatusCode::OK
}

/// GET /version
pub async fn version() -> Json<VersionResponse> {
    Json(VersionResponse {
        service: SERVICE_NAME,
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// GET /metrics - Prometheus text format; 404 when the exporter is disabled.
pub async fn metrics(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(handle) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        )
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
