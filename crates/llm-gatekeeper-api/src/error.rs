//! HTTP mapping of gateway failures.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use llm_gatekeeper_core::{GatewayError, ModelError};
use serde_json::json;

use crate::middleware::RequestOutcome;

/// Error returned by API handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error("Invalid request body: {message}")]
    InvalidBody { status: StatusCode, message: String },
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::InvalidBody {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl ApiError {
    /// Status code returned to the client.
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Gateway(GatewayError::InputRejected(_) | GatewayError::OutputRejected(_)) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Gateway(GatewayError::Upstream(ModelError::Timeout(_))) => {
                StatusCode::GATEWAY_TIMEOUT
            }
            ApiError::Gateway(GatewayError::Upstream(_)) => StatusCode::BAD_GATEWAY,
            ApiError::Gateway(GatewayError::ScannerFault { .. } | GatewayError::Config(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ApiError::InvalidBody { status, .. } => *status,
        }
    }

    /// Outcome label for request metrics.
    pub fn outcome(&self) -> &'static str {
        match self {
            ApiError::Gateway(GatewayError::InputRejected(_)) => "input_rejected",
            ApiError::Gateway(GatewayError::OutputRejected(_)) => "output_rejected",
            ApiError::Gateway(GatewayError::Upstream(ModelError::Timeout(_))) => "upstream_timeout",
            ApiError::Gateway(GatewayError::Upstream(_)) => "upstream_error",
            ApiError::Gateway(GatewayError::ScannerFault { .. }) => "scanner_fault",
            ApiError::Gateway(GatewayError::Config(_)) => "internal_error",
            ApiError::InvalidBody { .. } => "invalid_request",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let outcome = RequestOutcome(self.outcome());
        let body = match &self {
            ApiError::Gateway(
                err @ (GatewayError::InputRejected(decision)
                | GatewayError::OutputRejected(decision)),
            ) => json!({
                "detail": err.to_string(),
                "scores": decision.per_scanner_scores,
                "valid": decision.per_scanner_valid,
            }),
            ApiError::Gateway(GatewayError::ScannerFault { direction, fault }) => {
                tracing::error!(
                    %direction,
                    scanner = %fault.scanner,
                    error = %fault.source,
                    "scanner fault"
                );
                json!({
                    "detail": format!(
                        "Scanner '{}' failed during {} scanning",
                        fault.scanner, direction
                    ),
                    "scanner": fault.scanner,
                })
            }
            ApiError::Gateway(GatewayError::Upstream(ModelError::Timeout(deadline))) => json!({
                "detail": format!(
                    "Upstream model did not respond within {}s",
                    deadline.as_secs_f64()
                ),
            }),
            ApiError::Gateway(GatewayError::Upstream(ModelError::Status(code))) => json!({
                "detail": format!("Upstream model returned status {code}"),
            }),
            ApiError::Gateway(GatewayError::Upstream(_)) => json!({
                "detail": "Upstream model request failed",
            }),
            ApiError::Gateway(GatewayError::Config(_)) => {
                tracing::error!(error = %self, "gateway misconfigured");
                json!({ "detail": "Internal server error" })
            }
            ApiError::InvalidBody { message, .. } => json!({ "detail": message }),
        };

        (status, Extension(outcome), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use llm_gatekeeper_core::pipeline::ScannerFault;
    use llm_gatekeeper_core::{Decision, Direction, ScanError};
    use serde_json::Value;
    use std::collections::BTreeMap;
    use std::time::Duration;

    async fn render(err: ApiError) -> (StatusCode, Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn rejected() -> Decision {
        Decision {
            accepted: false,
            per_scanner_scores: BTreeMap::from([
                ("anonymize".to_string(), 0.0),
                ("toxicity".to_string(), 0.8),
            ]),
            per_scanner_valid: BTreeMap::from([
                ("anonymize".to_string(), true),
                ("toxicity".to_string(), false),
            ]),
        }
    }

    #[tokio::test]
    async fn test_input_rejection_body() {
        let (status, body) = render(GatewayError::InputRejected(rejected()).into()).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body["detail"],
            r#"Prompt not valid, scores: {"anonymize": 0, "toxicity": 0.8}"#
        );
        assert_eq!(body["scores"]["toxicity"], 0.8);
        assert_eq!(body["valid"]["toxicity"], false);
        assert_eq!(body["valid"]["anonymize"], true);
    }

    #[test]
    fn test_response_carries_outcome() {
        let response = ApiError::from(GatewayError::InputRejected(rejected())).into_response();
        assert_eq!(
            response.extensions().get::<RequestOutcome>(),
            Some(&RequestOutcome("input_rejected"))
        );
    }

    #[tokio::test]
    async fn test_output_rejection_body() {
        let (status, body) = render(GatewayError::OutputRejected(rejected()).into()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["detail"].as_str().unwrap().starts_with("Output not valid, scores: "));
    }

    #[tokio::test]
    async fn test_upstream_mapping() {
        let timeout = ModelError::Timeout(Duration::from_secs(30));
        let (status, body) = render(GatewayError::Upstream(timeout).into()).await;
        assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(body["detail"], "Upstream model did not respond within 30s");

        let (status, _) = render(GatewayError::Upstream(ModelError::Status(500)).into()).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);

        let transport = ModelError::Transport("connection refused 10.0.0.7".to_string());
        let (status, body) = render(GatewayError::Upstream(transport).into()).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(!body["detail"].as_str().unwrap().contains("10.0.0.7"));
    }

    #[tokio::test]
    async fn test_scanner_fault_hides_internals() {
        let err: ApiError = GatewayError::ScannerFault {
            direction: Direction::Outbound,
            fault: ScannerFault {
                scanner: "relevance".to_string(),
                source: ScanError::Internal("index out of bounds at /src/relevance.rs".to_string()),
            },
        }
        .into();
        assert_eq!(err.outcome(), "scanner_fault");

        let (status, body) = render(err).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["scanner"], "relevance");
        assert!(!body.to_string().contains("index out of bounds"));
    }
}
