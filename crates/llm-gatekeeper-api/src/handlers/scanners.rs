//! Configured scanner listing

use crate::state::AppState;
use axum::extract::State;
use axum::Json;
use llm_gatekeeper_core::PlaceholderScope;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ScannersResponse {
    pub policy: &'static str,
    pub placeholder_scope: &'static str,
    pub inbound: Vec<String>,
    pub outbound: Vec<String>,
}

/// GET /v1/scanners - pipeline order per direction.
pub async fn list_scanners(State(state): State<AppState>) -> Json<ScannersResponse> {
    let gateway = &state.gateway;
    Json(ScannersResponse {
        policy: gateway.policy_name(),
        placeholder_scope: match gateway.placeholder_scope() {
            PlaceholderScope::Request => "request",
            PlaceholderScope::Unscoped => "unscoped",
        },
        inbound: gateway.inbound_scanners().into_iter().map(String::from).collect(),
        outbound: gateway.outbound_scanners().into_iter().map(String::from).collect(),
    })
}
