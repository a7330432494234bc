//! Weighted phrase matching used by the heuristic scanners.

use crate::scanner::ScanError;
use regex::{Regex, RegexBuilder};
use std::collections::HashMap;

/// Case-insensitive, whole-word phrase matcher with a weight per phrase.
#[derive(Debug, Clone)]
pub(crate) struct Lexicon {
    pattern: Option<Regex>,
    weights: HashMap<String, f64>,
}

impl Lexicon {
    pub(crate) fn new<'a>(
        entries: impl IntoIterator<Item = (&'a str, f64)>,
    ) -> Result<Self, ScanError> {
        let mut weights = HashMap::new();
        for (phrase, weight) in entries {
            let key = normalize(phrase);
            if key.is_empty() {
                continue;
            }
            weights.insert(key, weight);
        }

        if weights.is_empty() {
            return Ok(Self { pattern: None, weights });
        }

        // Longest phrases first so alternation prefers the most specific match.
        let mut phrases: Vec<&String> = weights.keys().collect();
        phrases.sort_by(|a, b| b.len().cmp(&a.len()).then(a.cmp(b)));

        let alternation = phrases
            .iter()
            .map(|p| p.split(' ').map(regex::escape).collect::<Vec<_>>().join(r"\s+"))
            .collect::<Vec<_>>()
            .join("|");

        let pattern = RegexBuilder::new(&format!(r"\b(?:{alternation})\b"))
            .case_insensitive(true)
            .build()
            .map_err(|e| ScanError::Config(format!("invalid lexicon: {e}")))?;

        Ok(Self {
            pattern: Some(pattern),
            weights,
        })
    }

    /// Weight of every phrase occurrence in `text`.
    pub(crate) fn hits(&self, text: &str) -> Vec<f64> {
        let Some(pattern) = &self.pattern else {
            return Vec::new();
        };

        let text = text.replace('\u{2019}', "'");
        pattern
            .find_iter(&text)
            .filter_map(|m| self.weights.get(&normalize(m.as_str())).copied())
            .collect()
    }

    /// Highest weight among the hits, 0.0 when nothing matched.
    pub(crate) fn max_weight(&self, text: &str) -> f64 {
        self.hits(text).into_iter().fold(0.0, f64::max)
    }

    /// Sum of all hit weights, capped at 1.0.
    pub(crate) fn total_weight(&self, text: &str) -> f64 {
        self.hits(text).into_iter().sum::<f64>().min(1.0)
    }
}

fn normalize(phrase: &str) -> String {
    phrase
        .replace('\u{2019}', "'")
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}
