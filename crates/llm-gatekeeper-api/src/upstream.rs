//! OpenAI-compatible chat completion client.

use crate::config::ModelSettings;
use crate::telemetry;
use async_trait::async_trait;
use llm_gatekeeper_core::model::{ChatCompletionRequest, ChatCompletionResponse};
use llm_gatekeeper_core::{ModelClient, ModelError};
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, instrument, warn};

/// Sends `{model, messages: [{role: "user", content}]}` to the configured
/// endpoint and returns `choices[0].message.content`.
///
/// The underlying `reqwest::Client` pools connections and is shared by all
/// requests.
pub struct HttpModelClient {
    client: reqwest::Client,
    api_url: String,
    api_token: Option<String>,
    model: String,
    timeout: Duration,
}

impl HttpModelClient {
    pub fn new(settings: &ModelSettings) -> Result<Self, ModelError> {
        let timeout = settings.timeout();
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .danger_accept_invalid_certs(settings.accept_invalid_certs)
            .build()
            .map_err(|e| ModelError::Transport(format!("failed to build HTTP client: {e}")))?;

        if settings.accept_invalid_certs {
            warn!(
                api_url = %settings.api_url,
                "TLS certificate verification is disabled for the model backend"
            );
        }

        Ok(Self {
            client,
            api_url: settings.api_url.clone(),
            api_token: settings.api_token.clone(),
            model: settings.model.clone(),
            timeout,
        })
    }

    fn classify(&self, err: reqwest::Error) -> ModelError {
        if err.is_timeout() {
            ModelError::Timeout(self.timeout)
        } else {
            ModelError::Transport(err.without_url().to_string())
        }
    }
}

impl fmt::Debug for HttpModelClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpModelClient")
            .field("api_url", &self.api_url)
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[async_trait]
impl ModelClient for HttpModelClient {
    #[instrument(skip_all, fields(model = %self.model))]
    async fn complete(&self, prompt: &str) -> Result<String, ModelError> {
        let body = ChatCompletionRequest::single_turn(&self.model, prompt);
        let mut request = self.client.post(&self.api_url).json(&body);
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }

        let started = Instant::now();
        let result = async {
            let response = request.send().await.map_err(|e| self.classify(e))?;
            let status = response.status();
            if !status.is_success() {
                return Err(ModelError::Status(status.as_u16()));
            }

            let completion: ChatCompletionResponse = response.json().await.map_err(|e| {
                if e.is_timeout() {
                    ModelError::Timeout(self.timeout)
                } else {
                    ModelError::MalformedResponse(e.without_url().to_string())
                }
            })?;
            completion.into_first_content()
        }
        .await;

        let elapsed = started.elapsed();
        telemetry::record_upstream(elapsed);
        match &result {
            Ok(text) => debug!(
                elapsed_ms = elapsed.as_millis() as u64,
                completion_len = text.len(),
                "model call finished"
            ),
            Err(e) => {
                telemetry::record_upstream_failure(failure_kind(e));
                warn!(elapsed_ms = elapsed.as_millis() as u64, error = %e, "model call failed");
            }
        }
        result
    }
}

fn failure_kind(err: &ModelError) -> &'static str {
    match err {
        ModelError::Transport(_) => "transport",
        ModelError::Status(_) => "status",
        ModelError::Timeout(_) => "timeout",
        ModelError::MalformedResponse(_) => "malformed",
    }
}
