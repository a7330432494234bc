//! Shared application state.

use crate::config::{build_scanners, ConfigError, ServerSettings, Settings};
use crate::upstream::HttpModelClient;
use llm_gatekeeper_core::Gateway;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Duration;

/// State handed to every handler. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<Gateway>,
    pub metrics: Option<PrometheusHandle>,
    pub body_limit: usize,
    pub request_timeout: Duration,
}

impl AppState {
    pub fn new(gateway: Arc<Gateway>) -> Self {
        let server = ServerSettings::default();
        Self {
            gateway,
            metrics: None,
            body_limit: server.request_body_limit,
            request_timeout: server.request_timeout(),
        }
    }

    /// Build the gateway and upstream client described by `settings`.
    pub fn from_settings(settings: &Settings) -> Result<Self, ConfigError> {
        let client = HttpModelClient::new(&settings.model)
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        let mut builder = Gateway::builder()
            .with_model_client(Arc::new(client))
            .with_model_deadline(settings.model.timeout())
            .with_policy(settings.decision.policy.into_policy());
        if let Some(input) = &settings.scanners.input {
            builder = builder.with_input_scanners(build_scanners(input)?);
        }
        if let Some(output) = &settings.scanners.output {
            builder = builder.with_output_scanners(build_scanners(output)?);
        }
        let gateway = builder.build().map_err(|e| ConfigError::Invalid(e.to_string()))?;

        Ok(Self::new(Arc::new(gateway)).with_server_limits(&settings.server))
    }

    pub fn with_server_limits(mut self, server: &ServerSettings) -> Self {
        self.body_limit = server.request_body_limit;
        self.request_timeout = server.request_timeout();
        self
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use llm_gatekeeper_core::PlaceholderScope;

    #[test]
    fn test_from_settings() {
        let settings = Settings::from_toml(
            r#"
            [server]
            request_body_limit = 2048

            [model]
            api_url = "http://127.0.0.1:9/v1/chat/completions"
            model = "test-model"
            timeout_secs = 7

            [decision]
            policy = "reject_on_all"

            [[scanners.output]]
            type = "deanonymize"
            "#,
        )
        .unwrap();

        let state = AppState::from_settings(&settings).unwrap();
        assert_eq!(state.body_limit, 2048);
        assert_eq!(state.gateway.policy_name(), "reject_on_all");
        assert_eq!(state.gateway.model_deadline(), Duration::from_secs(7));
        assert_eq!(state.gateway.outbound_scanners(), vec!["deanonymize"]);
        assert_eq!(state.gateway.inbound_scanners().len(), 4);
        assert_eq!(state.gateway.placeholder_scope(), PlaceholderScope::Request);
        assert!(state.metrics.is_none());
    }

    #[test]
    fn test_duplicate_scanner_is_a_config_error() {
        let settings = Settings::from_toml(
            r#"
            [model]
            api_url = "http://127.0.0.1:9/v1/chat/completions"
            model = "test-model"

            [[scanners.input]]
            type = "toxicity"

            [[scanners.input]]
            type = "toxicity"
            "#,
        )
        .unwrap();

        let err = AppState::from_settings(&settings).err().unwrap();
        assert!(err.to_string().contains("duplicate scanner id 'toxicity'"));
    }
}
