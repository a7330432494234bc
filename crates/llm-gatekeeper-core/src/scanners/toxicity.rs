//! Lexicon-based toxicity scoring.

use super::lexicon::Lexicon;
use crate::scanner::{ScanContext, ScanError, ScanOutcome, Scanner};

const DEFAULT_TERMS: &[(&str, f64)] = &[
    ("idiot", 0.5),
    ("idiots", 0.5),
    ("moron", 0.5),
    ("morons", 0.5),
    ("stupid", 0.3),
    ("dumb", 0.25),
    ("loser", 0.3),
    ("pathetic", 0.3),
    ("worthless", 0.4),
    ("disgusting", 0.3),
    ("shut up", 0.35),
    ("screw you", 0.6),
    ("i hate you", 0.6),
    ("go to hell", 0.6),
    ("drop dead", 0.7),
    ("kill yourself", 1.0),
    ("i will kill you", 1.0),
    ("i'll kill you", 1.0),
    ("piece of garbage", 0.6),
];

/// Scores text by summing the weights of matched abusive terms (capped at
/// 1.0). Invalid when the score reaches the threshold.
#[derive(Debug, Clone)]
pub struct Toxicity {
    lexicon: Lexicon,
    threshold: f64,
}

impl Toxicity {
    pub const DEFAULT_THRESHOLD: f64 = 0.5;
    pub const ID: &'static str = "toxicity";

    pub fn new() -> Result<Self, ScanError> {
        Self::with_terms(Self::DEFAULT_THRESHOLD, std::iter::empty())
    }

    /// Built-in lexicon extended with `extra_terms`.
    pub fn with_terms<'a>(
        threshold: f64,
        extra_terms: impl IntoIterator<Item = (&'a str, f64)>,
    ) -> Result<Self, ScanError> {
        let terms = DEFAULT_TERMS.iter().copied().chain(extra_terms);
        Ok(Self {
            lexicon: Lexicon::new(terms)?,
            threshold,
        })
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }
}

impl Scanner for Toxicity {
    fn id(&self) -> &str {
        Self::ID
    }

    fn scan(&self, input: &str, _ctx: &mut ScanContext<'_>) -> Result<ScanOutcome, ScanError> {
        let score = self.lexicon.total_weight(input);
        if score >= self.threshold {
            return Ok(ScanOutcome::fail(input, score).with_diagnostic(format!(
                "toxicity score {score:.2} >= threshold {:.2}",
                self.threshold
            )));
        }
        Ok(ScanOutcome::pass(input, score))
    }
}
