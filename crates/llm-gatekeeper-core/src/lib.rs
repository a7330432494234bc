//! # LLM-Gatekeeper-Core
//!
//! Bidirectional content filtering between clients and an LLM backend.
//!
//! ## Overview
//!
//! Every request flows through a [`Gateway`]:
//!
//! - **Inbound pipeline**: ordered scanners sanitize and score the prompt
//!   (PII redaction into a request-scoped [`Vault`], toxicity, token limit,
//!   prompt injection)
//! - **Decision engine**: a swappable [`DecisionPolicy`] turns the verdicts
//!   into accept or reject; the default rejects when any scanner objects
//! - **Model client**: the sanitized prompt is sent to the backend under a
//!   deadline
//! - **Outbound pipeline**: the completion is scanned and placeholders are
//!   restored from the same vault
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use llm_gatekeeper_core::{Gateway, GatewayError};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), GatewayError> {
//!     let gateway = Gateway::builder()
//!         .with_model_client(Arc::new(MyClient::new()))
//!         .build()?;
//!
//!     let reply = gateway.handle("My SSN is 123-45-6789").await?;
//!     println!("{}", reply.response);
//!     Ok(())
//! }
//! ```
//!
//! ## Custom Scanner
//!
//! ```rust,ignore
//! use llm_gatekeeper_core::{ScanContext, ScanError, ScanOutcome, Scanner};
//!
//! struct NoShouting;
//!
//! impl Scanner for NoShouting {
//!     fn id(&self) -> &str {
//!         "no_shouting"
//!     }
//!
//!     fn scan(&self, input: &str, _ctx: &mut ScanContext<'_>) -> Result<ScanOutcome, ScanError> {
//!         let shouting = !input.is_empty() && input == input.to_uppercase();
//!         Ok(ScanOutcome::new(input, !shouting, if shouting { 1.0 } else { 0.0 }))
//!     }
//! }
//! ```

pub mod audit;
pub mod decision;
pub mod error;
pub mod gateway;
pub mod model;
pub mod pipeline;
pub mod scanner;
pub mod scanners;
pub mod vault;

// Primary exports
pub use decision::{Decision, DecisionEngine, DecisionPolicy, PolicyKind, RejectOnAll, RejectOnAny};
pub use error::GatewayError;
pub use gateway::{Gateway, GatewayBuilder, GatewayResponse, PlaceholderScope, Stage};
pub use model::{ChatCompletionRequest, ChatCompletionResponse, ModelClient, ModelError};
pub use pipeline::{Pipeline, PipelineResult, ScannerFault};
pub use scanner::{Direction, ScanContext, ScanError, ScanOutcome, ScanResult, Scanner};
pub use vault::{Placeholder, Vault, VaultError};
