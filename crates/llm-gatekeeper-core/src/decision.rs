//! Accept/reject decisions over a pipeline's verdicts.

use crate::pipeline::PipelineResult;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Strategy reducing per-scanner validity flags to a single verdict.
///
/// Implementations must be pure: the same flags always yield the same answer.
pub trait DecisionPolicy: Send + Sync {
    /// Name used in configuration and logs.
    fn name(&self) -> &'static str;

    /// Whether content with these validity flags (in pipeline order) is accepted.
    fn accepts(&self, valid: &[bool]) -> bool;
}

/// Fail-closed: a single invalid scanner rejects the content.
#[derive(Debug, Clone, Copy, Default)]
pub struct RejectOnAny;

impl DecisionPolicy for RejectOnAny {
    fn name(&self) -> &'static str {
        "reject_on_any"
    }

    fn accepts(&self, valid: &[bool]) -> bool {
        valid.iter().all(|v| *v)
    }
}

/// Legacy behavior: reject only when every scanner reports invalid.
///
/// An empty pipeline has no valid scanner and is rejected.
#[derive(Debug, Clone, Copy, Default)]
pub struct RejectOnAll;

impl DecisionPolicy for RejectOnAll {
    fn name(&self) -> &'static str {
        "reject_on_all"
    }

    fn accepts(&self, valid: &[bool]) -> bool {
        valid.iter().any(|v| *v)
    }
}

/// Configurable selector for the built-in policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    #[default]
    RejectOnAny,
    RejectOnAll,
}

impl PolicyKind {
    pub fn into_policy(self) -> Arc<dyn DecisionPolicy> {
        match self {
            PolicyKind::RejectOnAny => Arc::new(RejectOnAny),
            PolicyKind::RejectOnAll => Arc::new(RejectOnAll),
        }
    }
}

impl FromStr for PolicyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "reject_on_any" => Ok(PolicyKind::RejectOnAny),
            "reject_on_all" => Ok(PolicyKind::RejectOnAll),
            other => Err(format!("unknown decision policy '{other}'")),
        }
    }
}

/// Verdict plus the per-scanner diagnostic maps.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Decision {
    pub accepted: bool,
    pub per_scanner_scores: BTreeMap<String, f64>,
    pub per_scanner_valid: BTreeMap<String, bool>,
}

impl Decision {
    /// `{"scanner": score, ...}` rendering used in rejection details.
    pub fn summary(&self) -> String {
        let entries: Vec<String> = self
            .per_scanner_scores
            .iter()
            .map(|(id, score)| format!("{:?}: {}", id, round_score(*score)))
            .collect();
        format!("{{{}}}", entries.join(", "))
    }

    /// Ids of the scanners that reported invalid content.
    pub fn failing_scanners(&self) -> Vec<&str> {
        self.per_scanner_valid
            .iter()
            .filter(|(_, valid)| !**valid)
            .map(|(id, _)| id.as_str())
            .collect()
    }
}

/// Applies a [`DecisionPolicy`] to pipeline results.
#[derive(Clone)]
pub struct DecisionEngine {
    policy: Arc<dyn DecisionPolicy>,
}

impl DecisionEngine {
    pub fn new(policy: Arc<dyn DecisionPolicy>) -> Self {
        Self { policy }
    }

    /// Engine with the canonical fail-closed policy.
    pub fn fail_closed() -> Self {
        Self::new(Arc::new(RejectOnAny))
    }

    pub fn policy_name(&self) -> &'static str {
        self.policy.name()
    }

    pub fn evaluate(&self, result: &PipelineResult) -> Decision {
        let flags: Vec<bool> = result.results.iter().map(|r| r.valid).collect();

        Decision {
            accepted: self.policy.accepts(&flags),
            per_scanner_scores: result
                .results
                .iter()
                .map(|r| (r.scanner_id.clone(), r.score))
                .collect(),
            per_scanner_valid: result
                .results
                .iter()
                .map(|r| (r.scanner_id.clone(), r.valid))
                .collect(),
        }
    }
}

impl Default for DecisionEngine {
    fn default() -> Self {
        Self::fail_closed()
    }
}

impl fmt::Debug for DecisionEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecisionEngine")
            .field("policy", &self.policy.name())
            .finish()
    }
}

fn round_score(score: f64) -> f64 {
    (score * 10_000.0).round() / 10_000.0
}
