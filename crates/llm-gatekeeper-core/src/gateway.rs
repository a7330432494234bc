//! Gateway - the request orchestrator.
//!
//! Every prompt goes through [`Gateway::handle`]:
//!
//! ```text
//! RECEIVED -> INBOUND_SCANNED -> {REJECTED | FORWARDED}
//!          -> OUTBOUND_SCANNED -> {REJECTED | RESPONDED}
//! ```
//!
//! Each request gets its own [`Vault`]; it is created on entry, shared by the
//! inbound and outbound runs, and dropped when the request ends (including
//! when the caller drops the future mid-flight).

use crate::audit;
use crate::decision::{DecisionEngine, DecisionPolicy};
use crate::error::GatewayError;
use crate::model::{ModelClient, ModelError};
use crate::pipeline::{Pipeline, PipelineResult};
use crate::scanner::{Direction, ScanContext, Scanner};
use crate::scanners::{default_input_scanners, default_output_scanners};
use crate::vault::Vault;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

const DEFAULT_MODEL_DEADLINE: Duration = Duration::from_secs(30);

/// Sanitized prompt and sanitized completion of an accepted request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayResponse {
    pub prompt: String,
    pub response: String,
}

/// How placeholders are formed for each request's vault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaceholderScope {
    /// Append a random per-request tag: `[REDACTED_SSN_1_3FA85F64]`.
    #[default]
    Request,
    /// Plain sequential form: `[REDACTED_SSN_1]`.
    ///
    /// Every request numbers from 1, so placeholders are not unique across
    /// requests. Not for use behind a shared service.
    Unscoped,
}

impl PlaceholderScope {
    fn new_vault(self) -> Vault {
        match self {
            PlaceholderScope::Request => Vault::scoped(),
            PlaceholderScope::Unscoped => Vault::new(),
        }
    }
}

/// Request lifecycle states, logged on each transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Received,
    InboundScanned,
    Forwarded,
    OutboundScanned,
    Rejected,
    Responded,
    UpstreamFailed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Received => "RECEIVED",
            Stage::InboundScanned => "INBOUND_SCANNED",
            Stage::Forwarded => "FORWARDED",
            Stage::OutboundScanned => "OUTBOUND_SCANNED",
            Stage::Rejected => "REJECTED",
            Stage::Responded => "RESPONDED",
            Stage::UpstreamFailed => "UPSTREAM_FAILED",
        };
        f.write_str(name)
    }
}

/// The gateway: two pipelines, a decision engine and a model client.
///
/// Immutable after construction and safe to share across tasks behind an
/// `Arc`; all per-request state lives in [`Gateway::handle`].
///
/// # Example
///
/// ```rust,ignore
/// let gateway = Gateway::builder()
///     .with_model_client(Arc::new(my_client))
///     .with_model_deadline(Duration::from_secs(10))
///     .build()?;
///
/// let reply = gateway.handle("My SSN is 123-45-6789").await?;
/// ```
pub struct Gateway {
    inbound: Pipeline,
    outbound: Pipeline,
    engine: DecisionEngine,
    model: Arc<dyn ModelClient>,
    model_deadline: Duration,
    placeholder_scope: PlaceholderScope,
}

impl Gateway {
    /// Create a builder for a custom gateway.
    pub fn builder() -> GatewayBuilder {
        GatewayBuilder::new()
    }

    pub fn inbound_scanners(&self) -> Vec<&str> {
        self.inbound.scanner_ids()
    }

    pub fn outbound_scanners(&self) -> Vec<&str> {
        self.outbound.scanner_ids()
    }

    pub fn policy_name(&self) -> &'static str {
        self.engine.policy_name()
    }

    pub fn model_deadline(&self) -> Duration {
        self.model_deadline
    }

    pub fn placeholder_scope(&self) -> PlaceholderScope {
        self.placeholder_scope
    }

    /// Handle one prompt under a freshly generated request id.
    pub async fn handle(&self, prompt: &str) -> Result<GatewayResponse, GatewayError> {
        let request_id = uuid::Uuid::new_v4().to_string();
        self.handle_with_id(&request_id, prompt).await
    }

    /// Handle one prompt end to end.
    ///
    /// Rejections and faults end the request; the model is only called when
    /// the inbound decision accepts, and its failures are never passed through.
    #[instrument(
        skip_all,
        fields(request_id = %request_id, policy = self.engine.policy_name())
    )]
    pub async fn handle_with_id(
        &self,
        request_id: &str,
        prompt: &str,
    ) -> Result<GatewayResponse, GatewayError> {
        let mut vault = self.placeholder_scope.new_vault();
        debug!(stage = %Stage::Received, prompt_len = prompt.len(), "request received");

        let inbound = self.scan(Direction::Inbound, prompt, None, &mut vault)?;
        debug!(stage = %Stage::InboundScanned, redactions = vault.len(), "inbound scan finished");

        let decision = self.engine.evaluate(&inbound);
        audit::record_decision(
            request_id,
            Direction::Inbound,
            self.policy_name(),
            &decision,
            &inbound.output,
        );
        if !decision.accepted {
            info!(stage = %Stage::Rejected, direction = %Direction::Inbound, "prompt rejected");
            return Err(GatewayError::InputRejected(decision));
        }

        let sanitized_prompt = inbound.output;
        debug!(stage = %Stage::Forwarded, "forwarding sanitized prompt");
        let completion = self.call_model(&sanitized_prompt).await.map_err(|e| {
            warn!(stage = %Stage::UpstreamFailed, error = %e, "model call failed");
            GatewayError::Upstream(e)
        })?;

        let outbound = self.scan(
            Direction::Outbound,
            &completion,
            Some(&sanitized_prompt),
            &mut vault,
        )?;
        debug!(stage = %Stage::OutboundScanned, "outbound scan finished");

        let decision = self.engine.evaluate(&outbound);
        audit::record_decision(
            request_id,
            Direction::Outbound,
            self.policy_name(),
            &decision,
            &outbound.output,
        );
        if !decision.accepted {
            info!(
                stage = %Stage::Rejected,
                direction = %Direction::Outbound,
                "completion rejected"
            );
            return Err(GatewayError::OutputRejected(decision));
        }

        info!(stage = %Stage::Responded, "request completed");
        Ok(GatewayResponse {
            prompt: sanitized_prompt,
            response: outbound.output,
        })
    }

    fn scan(
        &self,
        direction: Direction,
        input: &str,
        prompt: Option<&str>,
        vault: &mut Vault,
    ) -> Result<PipelineResult, GatewayError> {
        let pipeline = match direction {
            Direction::Inbound => &self.inbound,
            Direction::Outbound => &self.outbound,
        };

        let mut ctx = ScanContext::new(direction, vault);
        if let Some(prompt) = prompt {
            ctx = ctx.with_prompt(prompt);
        }

        pipeline
            .run(input, &mut ctx)
            .map_err(|fault| GatewayError::ScannerFault { direction, fault })
    }

    async fn call_model(&self, prompt: &str) -> Result<String, ModelError> {
        match tokio::time::timeout(self.model_deadline, self.model.complete(prompt)).await {
            Ok(result) => result,
            Err(_) => Err(ModelError::Timeout(self.model_deadline)),
        }
    }
}

impl fmt::Debug for Gateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Gateway")
            .field("inbound", &self.inbound.scanner_ids())
            .field("outbound", &self.outbound.scanner_ids())
            .field("policy", &self.engine.policy_name())
            .field("model_deadline", &self.model_deadline)
            .field("placeholder_scope", &self.placeholder_scope)
            .finish()
    }
}

/// Builder for [`Gateway`].
///
/// Pipelines default to the built-in scanner sets and the policy defaults to
/// fail-closed. A model client is required.
pub struct GatewayBuilder {
    inbound: Option<Vec<Arc<dyn Scanner>>>,
    outbound: Option<Vec<Arc<dyn Scanner>>>,
    policy: Option<Arc<dyn DecisionPolicy>>,
    model: Option<Arc<dyn ModelClient>>,
    model_deadline: Duration,
    placeholder_scope: PlaceholderScope,
}

impl GatewayBuilder {
    fn new() -> Self {
        Self {
            inbound: None,
            outbound: None,
            policy: None,
            model: None,
            model_deadline: DEFAULT_MODEL_DEADLINE,
            placeholder_scope: PlaceholderScope::default(),
        }
    }

    /// Set the inbound scanners, in execution order.
    pub fn with_input_scanners(mut self, scanners: Vec<Arc<dyn Scanner>>) -> Self {
        self.inbound = Some(scanners);
        self
    }

    /// Set the outbound scanners, in execution order.
    pub fn with_output_scanners(mut self, scanners: Vec<Arc<dyn Scanner>>) -> Self {
        self.outbound = Some(scanners);
        self
    }

    pub fn with_policy(mut self, policy: Arc<dyn DecisionPolicy>) -> Self {
        self.policy = Some(policy);
        self
    }

    /// Set the model client (required).
    pub fn with_model_client(mut self, model: Arc<dyn ModelClient>) -> Self {
        self.model = Some(model);
        self
    }

    /// Deadline for a single model call.
    pub fn with_model_deadline(mut self, deadline: Duration) -> Self {
        self.model_deadline = deadline;
        self
    }

    pub fn with_placeholder_scope(mut self, scope: PlaceholderScope) -> Self {
        self.placeholder_scope = scope;
        self
    }

    /// Build the gateway.
    pub fn build(self) -> Result<Gateway, GatewayError> {
        let model = self
            .model
            .ok_or_else(|| GatewayError::Config("a model client is required".to_string()))?;
        if self.model_deadline.is_zero() {
            return Err(GatewayError::Config(
                "model deadline must be greater than zero".to_string(),
            ));
        }

        let inbound = match self.inbound {
            Some(scanners) => scanners,
            None => default_input_scanners().map_err(|e| GatewayError::Config(e.to_string()))?,
        };
        let outbound = match self.outbound {
            Some(scanners) => scanners,
            None => default_output_scanners().map_err(|e| GatewayError::Config(e.to_string()))?,
        };

        Ok(Gateway {
            inbound: Pipeline::new(Direction::Inbound, inbound)?,
            outbound: Pipeline::new(Direction::Outbound, outbound)?,
            engine: self
                .policy
                .map(DecisionEngine::new)
                .unwrap_or_else(DecisionEngine::fail_closed),
            model,
            model_deadline: self.model_deadline,
            placeholder_scope: self.placeholder_scope,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::RejectOnAll;
    use crate::scanner::{ScanError, ScanOutcome};
    use crate::scanners::{Anonymize, Deanonymize, Sensitive, Toxicity};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Records every prompt it receives and answers through `reply`.
    struct MockModel {
        calls: Mutex<Vec<String>>,
        reply: fn(&str) -> Result<String, ModelError>,
        delay: Option<Duration>,
    }

    impl MockModel {
        fn new(reply: fn(&str) -> Result<String, ModelError>) -> Arc<Self> {
            Arc::new(Self {
                calls: Mutex::new(Vec::new()),
                reply,
                delay: None,
            })
        }

        fn echo() -> Arc<Self> {
            Self::new(|prompt| Ok(format!("Noted: {prompt}")))
        }

        fn slow(delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                calls: Mutex::new(Vec::new()),
                reply: |_| Ok("late".to_string()),
                delay: Some(delay),
            })
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ModelClient for MockModel {
        async fn complete(&self, prompt: &str) -> Result<String, ModelError> {
            self.calls.lock().unwrap().push(prompt.to_string());
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            (self.reply)(prompt)
        }
    }

    /// Always fails with a fault.
    struct Broken;

    impl Scanner for Broken {
        fn id(&self) -> &str {
            "broken"
        }

        fn scan(&self, _input: &str, _ctx: &mut ScanContext<'_>) -> Result<ScanOutcome, ScanError> {
            Err(ScanError::Internal("model weights missing".to_string()))
        }
    }

    fn unscoped(model: Arc<MockModel>) -> Gateway {
        Gateway::builder()
            .with_model_client(model)
            .with_placeholder_scope(PlaceholderScope::Unscoped)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_redacted_prompt_reaches_model() {
        let model = MockModel::echo();
        let gateway = unscoped(model.clone());

        let reply = gateway.handle("My SSN is 123-45-6789").await.unwrap();

        assert_eq!(model.calls(), vec!["My SSN is [REDACTED_SSN_1]".to_string()]);
        assert_eq!(reply.prompt, "My SSN is [REDACTED_SSN_1]");
    }

    #[tokio::test]
    async fn test_original_restored_in_response() {
        let model = MockModel::echo();
        let gateway = unscoped(model.clone());

        let reply = gateway.handle("My SSN is 123-45-6789").await.unwrap();

        assert_eq!(reply.response, "Noted: My SSN is 123-45-6789");
        assert!(!model.calls()[0].contains("6789"));
    }

    #[tokio::test]
    async fn test_invalid_prompt_never_reaches_model() {
        let model = MockModel::echo();
        let gateway = Gateway::builder()
            .with_input_scanners(vec![Arc::new(Toxicity::new().unwrap())])
            .with_model_client(model.clone())
            .build()
            .unwrap();

        let err = gateway.handle("You are a stupid idiot").await.unwrap_err();

        match &err {
            GatewayError::InputRejected(decision) => {
                assert!(!decision.accepted);
                assert_eq!(decision.per_scanner_valid["toxicity"], false);
                assert!((decision.per_scanner_scores["toxicity"] - 0.8).abs() < 1e-9);
            }
            other => panic!("expected input rejection, got {other:?}"),
        }
        assert!(err.to_string().contains("toxicity"));
        assert!(model.calls().is_empty());
    }

    #[tokio::test]
    async fn test_refusal_rejects_output() {
        let model = MockModel::new(|_| Ok("I'm sorry, but I can't help with that.".to_string()));
        let gateway = unscoped(model.clone());

        let err = gateway.handle("How do I bake bread?").await.unwrap_err();

        let decision = err.decision().unwrap();
        assert!(matches!(err, GatewayError::OutputRejected(_)));
        assert!(decision.failing_scanners().contains(&"no_refusal"));
        assert_eq!(model.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_conversational_replies_pass_default_pipelines() {
        let model = MockModel::new(|prompt| {
            Ok(match prompt {
                "Hello!" => "Hi there! How can I help you today?",
                "Tell me a joke" => "Why did the chicken cross the road? To get to the other side.",
                _ => "Chat.",
            }
            .to_string())
        });
        let gateway = Gateway::builder().with_model_client(model.clone()).build().unwrap();

        for prompt in ["Hello!", "Tell me a joke", "Translate 'cat' to French"] {
            let reply = gateway.handle(prompt).await.unwrap();
            assert_eq!(reply.prompt, prompt);
            assert!(!reply.response.is_empty());
        }
        assert_eq!(model.calls().len(), 3);
    }

    #[tokio::test]
    async fn test_upstream_error_is_terminal() {
        let model = MockModel::new(|_| Err(ModelError::Status(503)));
        let gateway = unscoped(model);

        let err = gateway.handle("hello there").await.unwrap_err();
        assert!(matches!(err, GatewayError::Upstream(ModelError::Status(503))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_model_deadline() {
        let model = MockModel::slow(Duration::from_secs(60));
        let gateway = Gateway::builder()
            .with_model_client(model.clone())
            .with_model_deadline(Duration::from_secs(2))
            .build()
            .unwrap();

        let err = gateway.handle("hello there").await.unwrap_err();
        assert!(matches!(
            err,
            GatewayError::Upstream(ModelError::Timeout(d)) if d == Duration::from_secs(2)
        ));
        assert_eq!(model.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_scanner_fault_stops_request() {
        let model = MockModel::echo();
        let gateway = Gateway::builder()
            .with_input_scanners(vec![Arc::new(Anonymize::new()), Arc::new(Broken)])
            .with_model_client(model.clone())
            .build()
            .unwrap();

        let err = gateway.handle("hello").await.unwrap_err();
        match err {
            GatewayError::ScannerFault { direction, fault } => {
                assert_eq!(direction, Direction::Inbound);
                assert_eq!(fault.scanner, "broken");
            }
            other => panic!("expected scanner fault, got {other:?}"),
        }
        assert!(model.calls().is_empty());
    }

    #[tokio::test]
    async fn test_scanner_order_matters() {
        let prompt = "My SSN is 123-45-6789";

        let redact_first = Gateway::builder()
            .with_input_scanners(vec![Arc::new(Anonymize::new()), Arc::new(Sensitive::new())])
            .with_output_scanners(vec![Arc::new(Deanonymize::new())])
            .with_model_client(MockModel::echo())
            .build()
            .unwrap();
        assert!(redact_first.handle(prompt).await.is_ok());

        let detect_first = Gateway::builder()
            .with_input_scanners(vec![Arc::new(Sensitive::new()), Arc::new(Anonymize::new())])
            .with_output_scanners(vec![Arc::new(Deanonymize::new())])
            .with_model_client(MockModel::echo())
            .build()
            .unwrap();
        let err = detect_first.handle(prompt).await.unwrap_err();
        assert_eq!(err.decision().unwrap().failing_scanners(), vec!["sensitive"]);
    }

    #[tokio::test]
    async fn test_legacy_policy_accepts_partial_failure() {
        let gateway = Gateway::builder()
            .with_input_scanners(vec![
                Arc::new(Anonymize::new()),
                Arc::new(Toxicity::new().unwrap()),
            ])
            .with_output_scanners(vec![Arc::new(Deanonymize::new())])
            .with_policy(Arc::new(RejectOnAll))
            .with_model_client(MockModel::echo())
            .build()
            .unwrap();

        assert_eq!(gateway.policy_name(), "reject_on_all");
        let reply = gateway.handle("You are a stupid idiot").await.unwrap();
        assert_eq!(reply.response, "Noted: You are a stupid idiot");
    }

    #[tokio::test]
    async fn test_empty_prompt_flows_through() {
        let model = MockModel::new(|_| Ok(String::new()));
        let gateway = unscoped(model.clone());

        let reply = gateway.handle("").await.unwrap();
        assert_eq!(reply.prompt, "");
        assert_eq!(reply.response, "");
        assert_eq!(model.calls(), vec![String::new()]);
    }

    #[tokio::test]
    async fn test_concurrent_requests_use_separate_vaults() {
        let model = MockModel::echo();
        let gateway = Arc::new(
            Gateway::builder()
                .with_model_client(model.clone())
                .build()
                .unwrap(),
        );

        let tasks: Vec<_> = (0..2)
            .map(|_| {
                let gateway = gateway.clone();
                tokio::spawn(async move { gateway.handle("Email me at jane@example.com").await })
            })
            .collect();
        for task in futures::future::join_all(tasks).await {
            let reply = task.unwrap().unwrap();
            assert_eq!(reply.response, "Noted: Email me at jane@example.com");
        }

        let seen = model.calls();
        assert_eq!(seen.len(), 2);
        assert_ne!(seen[0], seen[1]);
        assert!(seen.iter().all(|p| p.contains("[REDACTED_EMAIL_1_")));
    }

    #[test]
    fn test_builder_validation() {
        let err = Gateway::builder().build().unwrap_err();
        assert!(matches!(err, GatewayError::Config(_)));

        let err = Gateway::builder()
            .with_model_client(MockModel::echo())
            .with_model_deadline(Duration::ZERO)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("deadline"));

        let err = Gateway::builder()
            .with_input_scanners(vec![Arc::new(Anonymize::new()), Arc::new(Anonymize::new())])
            .with_model_client(MockModel::echo())
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("duplicate scanner id 'anonymize'"));
    }

    #[test]
    fn test_defaults() {
        let gateway = Gateway::builder().with_model_client(MockModel::echo()).build().unwrap();

        assert_eq!(
            gateway.inbound_scanners(),
            vec!["anonymize", "toxicity", "token_limit", "prompt_injection"]
        );
        assert_eq!(
            gateway.outbound_scanners(),
            vec!["no_refusal", "sensitive", "deanonymize"]
        );
        assert_eq!(gateway.policy_name(), "reject_on_any");
        assert_eq!(gateway.placeholder_scope(), PlaceholderScope::Request);
        assert_eq!(gateway.model_deadline(), DEFAULT_MODEL_DEADLINE);
        assert_eq!(Stage::InboundScanned.to_string(), "INBOUND_SCANNED");
    }
}
