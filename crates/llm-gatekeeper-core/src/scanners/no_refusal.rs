//! Detect completions where the model refused to answer.

use super::lexicon::Lexicon;
use crate::scanner::{ScanContext, ScanError, ScanOutcome, Scanner};

const DEFAULT_THRESHOLD: f64 = 0.5;

const REFUSAL_PHRASES: &[&str] = &[
    "i'm sorry, but i",
    "i am sorry, but i",
    "i apologize, but i",
    "i cannot help with",
    "i can't help with",
    "i cannot assist",
    "i can't assist",
    "i cannot provide",
    "i can't provide",
    "i'm unable to",
    "i am unable to",
    "i'm not able to",
    "i am not able to",
    "i won't be able to",
    "i must decline",
    "as an ai language model",
    "as an ai, i",
    "i'm not allowed to",
    "it is not appropriate for me",
];

/// Output scanner flagging refusals. Score is 1.0 on any refusal phrase.
#[derive(Debug, Clone)]
pub struct NoRefusal {
    lexicon: Lexicon,
    threshold: f64,
}

impl NoRefusal {
    pub const ID: &'static str = "no_refusal";

    pub fn new() -> Result<Self, ScanError> {
        Ok(Self {
            lexicon: Lexicon::new(REFUSAL_PHRASES.iter().map(|p| (*p, 1.0)))?,
            threshold: DEFAULT_THRESHOLD,
        })
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }
}

impl Scanner for NoRefusal {
    fn id(&self) -> &str {
        Self::ID
    }

    fn scan(&self, input: &str, _ctx: &mut ScanContext<'_>) -> Result<ScanOutcome, ScanError> {
        let score = self.lexicon.max_weight(input);
        if score >= self.threshold {
            return Ok(ScanOutcome::fail(input, score).with_diagnostic("completion is a refusal"));
        }
        Ok(ScanOutcome::pass(input, score))
    }
}
