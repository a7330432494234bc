//! Tracing and metrics setup.

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

pub const REQUESTS_TOTAL: &str = "gatekeeper_requests_total";
pub const UPSTREAM_SECONDS: &str = "gatekeeper_upstream_seconds";
pub const UPSTREAM_FAILURES_TOTAL: &str = "gatekeeper_upstream_failures_total";

const DEFAULT_FILTER: &str = "info,tower_http=warn";

/// Install the global tracing subscriber.
///
/// `RUST_LOG` selects the filter; `LOG_FORMAT=json` switches to one JSON
/// object per line.
pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .with_current_span(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init();
    }
}

/// Install the Prometheus recorder and return the handle `/metrics` renders.
pub fn install_metrics_recorder() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    describe_metrics();
    Ok(handle)
}

fn describe_metrics() {
    metrics::describe_counter!(REQUESTS_TOTAL, "Completed gateway requests by outcome");
    metrics::describe_histogram!(
        UPSTREAM_SECONDS,
        metrics::Unit::Seconds,
        "Latency of model backend calls"
    );
    metrics::describe_counter!(UPSTREAM_FAILURES_TOTAL, "Failed model backend calls by kind");
}

pub fn record_request(outcome: &'static str) {
    metrics::counter!(REQUESTS_TOTAL, "outcome" => outcome).increment(1);
}

pub fn record_upstream(elapsed: Duration) {
    metrics::histogram!(UPSTREAM_SECONDS).record(elapsed.as_secs_f64());
}

pub fn record_upstream_failure(kind: &'static str) {
    metrics::counter!(UPSTREAM_FAILURES_TOTAL, "kind" => kind).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_are_rendered() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();

        metrics::with_local_recorder(&recorder, || {
            record_request("accepted");
            record_request("accepted");
            record_request("input_rejected");
            record_upstream_failure("timeout");
        });

        let rendered = handle.render();
        assert!(rendered.contains(r#"gatekeeper_requests_total{outcome="accepted"} 2"#));
        assert!(rendered.contains(r#"gatekeeper_requests_total{outcome="input_rejected"} 1"#));
        assert!(rendered.contains(r#"gatekeeper_upstream_failures_total{kind="timeout"} 1"#));
    }
}
