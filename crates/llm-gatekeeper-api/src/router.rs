//! Route configuration

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::middleware::{outcome_middleware, request_context_middleware};
use crate::state::AppState;

/// Create the application router
///
/// ## Routes
/// - GET /health - Basic health check
/// - GET /health/ready - Readiness probe
/// - GET /health/live - Liveness probe
/// - GET /version - Version information
/// - GET /metrics - Prometheus metrics
/// - GET /v1/scanners - Configured pipelines
/// - POST /v1/chat/completions - Filtered chat completion
///
/// Every route gets a request id; body size and overall request time are
/// bounded by the state's server limits. Request outcomes are counted outside
/// those limits so their rejections are counted too.
pub fn create_router(state: AppState) -> Router {
    let body_limit = state.body_limit;
    let request_timeout = state.request_timeout;

    Router::new()
        .route("/health", get(handlers::health))
        .route("/health/ready", get(handlers::ready))
        .route("/health/live", get(handlers::live))
        .route("/version", get(handlers::version))
        .route("/metrics", get(handlers::metrics))
        .route("/v1/scanners", get(handlers::list_scanners))
        .route("/v1/chat/completions", post(handlers::chat_completions))
        .with_state(state)
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(TimeoutLayer::new(request_timeout))
        .layer(middleware::from_fn(outcome_middleware))
        .layer(middleware::from_fn(request_context_middleware))
        .layer(TraceLayer::new_for_http())
}
