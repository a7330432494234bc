//! Chat completion handler

use crate::error::ApiError;
use crate::middleware::{RequestId, RequestOutcome};
use crate::state::AppState;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::{Extension, Json};
use llm_gatekeeper_core::GatewayResponse;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub prompt: String,
}

/// POST /v1/chat/completions
///
/// Runs the prompt through the gateway. 200 carries the sanitized prompt and
/// completion; rejections and failures are mapped by [`ApiError`].
pub async fn chat_completions(
    State(state): State<AppState>,
    request_id: Option<Extension<RequestId>>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<(Extension<RequestOutcome>, Json<GatewayResponse>), ApiError> {
    let Json(request) = payload?;
    let request_id = request_id.map(|Extension(id)| id).unwrap_or_else(RequestId::generate);

    let response = state
        .gateway
        .handle_with_id(request_id.as_str(), &request.prompt)
        .await?;
    Ok((Extension(RequestOutcome("accepted")), Json(response)))
}
