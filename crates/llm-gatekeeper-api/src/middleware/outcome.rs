//! Request outcome accounting.
//!
//! Handlers tag their responses with a [`RequestOutcome`]. Responses produced
//! by outer layers (body limit, request timeout) carry no tag and are
//! classified here by status, so `gatekeeper_requests_total` sees every
//! completed gateway request.

use axum::{
    extract::Request,
    http::{Method, StatusCode},
    middleware::Next,
    response::Response,
};

use crate::telemetry;

/// Outcome label attached to a response as an extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestOutcome(pub &'static str);

pub async fn outcome_middleware(request: Request, next: Next) -> Response {
    let is_post = request.method() == Method::POST;
    let response = next.run(request).await;

    let outcome = match response.extensions().get::<RequestOutcome>() {
        Some(RequestOutcome(outcome)) => Some(*outcome),
        None if is_post => layer_outcome(response.status()),
        None => None,
    };
    if let Some(outcome) = outcome {
        telemetry::record_request(outcome);
    }
    response
}

fn layer_outcome(status: StatusCode) -> Option<&'static str> {
    match status {
        StatusCode::PAYLOAD_TOO_LARGE => Some("invalid_request"),
        StatusCode::REQUEST_TIMEOUT => Some("request_timeout"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::routing::{get, post};
    use axum::{middleware, Extension, Router};
    use metrics_exporter_prometheus::PrometheusBuilder;
    use tower::ServiceExt;

    fn app() -> Router {
        Router::new()
            .route(
                "/tagged",
                post(|| async { (Extension(RequestOutcome("accepted")), "ok") }),
            )
            .route("/too-large", post(|| async { StatusCode::PAYLOAD_TOO_LARGE }))
            .route("/health", get(|| async { StatusCode::REQUEST_TIMEOUT }))
            .layer(middleware::from_fn(outcome_middleware))
    }

    async fn call(method: Method, uri: &str) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        app().oneshot(request).await.unwrap();
    }

    #[tokio::test]
    async fn test_outcomes_are_counted() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        let _guard = metrics::set_default_local_recorder(&recorder);

        call(Method::POST, "/tagged").await;
        call(Method::POST, "/too-large").await;
        call(Method::GET, "/health").await;

        let rendered = handle.render();
        assert!(rendered.contains(r#"gatekeeper_requests_total{outcome="accepted"} 1"#));
        assert!(rendered.contains(r#"gatekeeper_requests_total{outcome="invalid_request"} 1"#));
        assert!(!rendered.contains("request_timeout"));
    }

    #[test]
    fn test_layer_outcome() {
        assert_eq!(layer_outcome(StatusCode::PAYLOAD_TOO_LARGE), Some("invalid_request"));
        assert_eq!(layer_outcome(StatusCode::REQUEST_TIMEOUT), Some("request_timeout"));
        assert_eq!(layer_outcome(StatusCode::NOT_FOUND), None);
    }
}
