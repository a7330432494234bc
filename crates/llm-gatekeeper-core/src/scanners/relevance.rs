//! Lexical relevance of a completion to its prompt.

use crate::scanner::{ScanContext, ScanError, ScanOutcome, Scanner};
use std::collections::HashMap;
use unicode_segmentation::UnicodeSegmentation;

const DEFAULT_MIN_SIMILARITY: f64 = 0.05;

const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "but", "by", "do", "for", "from", "has", "have", "i",
    "if", "in", "is", "it", "its", "me", "my", "of", "on", "or", "so", "that", "the", "this", "to",
    "was", "we", "what", "with", "you", "your",
];

/// Cosine similarity between term-frequency vectors of the sanitized prompt
/// and the completion. Score is `1 - similarity`; invalid when similarity
/// falls below the minimum. Skipped (valid, 0.0) when either side has no
/// content words.
#[derive(Debug, Clone)]
pub struct Relevance {
    min_similarity: f64,
}

impl Relevance {
    pub const ID: &'static str = "relevance";

    pub fn new() -> Self {
        Self::with_min_similarity(DEFAULT_MIN_SIMILARITY)
    }

    pub fn with_min_similarity(min_similarity: f64) -> Self {
        Self { min_similarity }
    }

    pub fn similarity(prompt: &str, output: &str) -> Option<f64> {
        let a = term_frequencies(prompt);
        let b = term_frequencies(output);
        if a.is_empty() || b.is_empty() {
            return None;
        }

        let dot: f64 = a
            .iter()
            .filter_map(|(term, x)| b.get(term).map(|y| x * y))
            .sum();
        let norm = |v: &HashMap<String, f64>| v.values().map(|x| x * x).sum::<f64>().sqrt();

        Some(dot / (norm(&a) * norm(&b)))
    }
}

impl Default for Relevance {
    fn default() -> Self {
        Self::new()
    }
}

impl Scanner for Relevance {
    fn id(&self) -> &str {
        Self::ID
    }

    fn scan(&self, input: &str, ctx: &mut ScanContext<'_>) -> Result<ScanOutcome, ScanError> {
        let Some(prompt) = ctx.prompt() else {
            return Ok(ScanOutcome::pass(input, 0.0));
        };
        let Some(similarity) = Self::similarity(prompt, input) else {
            return Ok(ScanOutcome::pass(input, 0.0));
        };

        let score = 1.0 - similarity;
        if similarity < self.min_similarity {
            return Ok(ScanOutcome::fail(input, score).with_diagnostic(format!(
                "similarity {similarity:.2} below minimum {:.2}",
                self.min_similarity
            )));
        }
        Ok(ScanOutcome::pass(input, score))
    }
}

fn term_frequencies(text: &str) -> HashMap<String, f64> {
    let mut counts = HashMap::new();
    for word in text.unicode_words() {
        let word = word.to_lowercase();
        if STOPWORDS.contains(&word.as_str()) {
            continue;
        }
        *counts.entry(word).or_insert(0.0) += 1.0;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::Direction;
    use crate::vault::Vault;

    fn scan(scanner: &Relevance, prompt: &str, output: &str) -> ScanOutcome {
        let mut vault = Vault::new();
        let mut ctx = ScanContext::new(Direction::Outbound, &mut vault).with_prompt(prompt);
        scanner.scan(output, &mut ctx).unwrap()
    }

    #[test]
    fn test_related_answer_passes() {
        let outcome = scan(
            &Relevance::new(),
            "What is the capital of France?",
            "The capital of France is Paris.",
        );
        assert!(outcome.valid);
        assert!(outcome.score < 0.5);
    }

    #[test]
    fn test_unrelated_answer_fails() {
        let outcome = scan(
            &Relevance::new(),
            "What is the capital of France?",
            "Bananas grow in tropical climates.",
        );
        assert!(!outcome.valid);
        assert_eq!(outcome.score, 1.0);
    }

    #[test]
    fn test_identical_text_has_full_similarity() {
        let similarity =
            Relevance::similarity("rust borrow checker", "Rust borrow checker").unwrap();
        assert!((similarity - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_not_applicable_cases() {
        let scanner = Relevance::new();
        assert!(scan(&scanner, "", "anything").valid);
        assert!(scan(&scanner, "capital of France", "").valid);
        assert!(scan(&scanner, "the a an", "is it").valid);

        let mut vault = Vault::new();
        let mut ctx = ScanContext::new(Direction::Outbound, &mut vault);
        let outcome = scanner.scan("no prompt attached", &mut ctx).unwrap();
        assert!(outcome.valid);
        assert_eq!(outcome.score, 0.0);
    }
}
