//! Scanner trait and related types
//!
//! A scanner inspects one stage's text and returns a verdict plus the text the
//! next stage should see. Scanners are synchronous: the only suspension point of
//! a request is the model call, so pipelines never yield between stages.

use crate::vault::Vault;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Traffic direction a pipeline runs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Client prompt on its way to the model.
    Inbound,
    /// Model completion on its way back to the client.
    Outbound,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Inbound => write!(f, "inbound"),
            Direction::Outbound => write!(f, "outbound"),
        }
    }
}

/// Per-request state handed to every scanner of a pipeline run.
///
/// The vault is borrowed mutably for the whole run so that anonymizers can
/// record redactions; nothing outside the owning request can reach it.
pub struct ScanContext<'a> {
    direction: Direction,
    prompt: Option<&'a str>,
    vault: &'a mut Vault,
}

impl<'a> ScanContext<'a> {
    /// Create a context for one pipeline run.
    pub fn new(direction: Direction, vault: &'a mut Vault) -> Self {
        Self {
            direction,
            prompt: None,
            vault,
        }
    }

    /// Attach the sanitized prompt (outbound scanners compare against it).
    pub fn with_prompt(mut self, prompt: &'a str) -> Self {
        self.prompt = Some(prompt);
        self
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Sanitized prompt of the request, if this is an outbound run.
    pub fn prompt(&self) -> Option<&str> {
        self.prompt
    }

    pub fn vault(&self) -> &Vault {
        self.vault
    }

    pub fn vault_mut(&mut self) -> &mut Vault {
        self.vault
    }
}

/// What a scanner reports for a single stage.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanOutcome {
    /// Text handed to the next stage (possibly unchanged).
    pub sanitized_text: String,
    /// Local policy judgment of this scanner.
    pub valid: bool,
    /// Scanner-defined confidence; opaque to the decision engine.
    pub score: f64,
    /// Operator-facing note. Must never contain detected values.
    pub diagnostic: Option<String>,
}

impl ScanOutcome {
    /// Create an outcome with an explicit verdict.
    pub fn new(sanitized_text: impl Into<String>, valid: bool, score: f64) -> Self {
        Self {
            sanitized_text: sanitized_text.into(),
            valid,
            score,
            diagnostic: None,
        }
    }

    /// Create a "valid" outcome
    pub fn pass(sanitized_text: impl Into<String>, score: f64) -> Self {
        Self::new(sanitized_text, true, score)
    }

    /// Create an "invalid" outcome
    pub fn fail(sanitized_text: impl Into<String>, score: f64) -> Self {
        Self::new(sanitized_text, false, score)
    }

    /// Attach an operator-facing diagnostic.
    pub fn with_diagnostic(mut self, diagnostic: impl Into<String>) -> Self {
        self.diagnostic = Some(diagnostic.into());
        self
    }
}

/// Result of one scanner stage as recorded by the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanResult {
    pub scanner_id: String,
    pub valid: bool,
    pub score: f64,
    #[serde(skip)]
    pub sanitized_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostic: Option<String>,
}

impl ScanResult {
    pub(crate) fn from_outcome(scanner_id: &str, outcome: ScanOutcome) -> Self {
        Self {
            scanner_id: scanner_id.to_string(),
            valid: outcome.valid,
            score: outcome.score,
            sanitized_text: outcome.sanitized_text,
            diagnostic: outcome.diagnostic,
        }
    }
}

/// Core scanner trait
///
/// Implementations must be cheap to share across requests (`Send + Sync`) and
/// must keep all per-request state in the [`ScanContext`].
pub trait Scanner: Send + Sync {
    /// Stable identifier, unique within a pipeline. Used as the key of the
    /// score and validity maps.
    fn id(&self) -> &str;

    /// Scan one stage's text.
    ///
    /// Return `Ok` with `valid = false` for a policy violation. Return `Err`
    /// only when the input could not be evaluated at all; the pipeline treats
    /// that as a hard stop.
    fn scan(&self, input: &str, ctx: &mut ScanContext<'_>) -> Result<ScanOutcome, ScanError>;
}

/// Scanner faults (distinct from a `valid = false` verdict).
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal scanner error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(String),
}
