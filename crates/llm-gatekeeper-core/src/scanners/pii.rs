//! Regex PII recognizers shared by the anonymize and sensitive scanners.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Kinds of sensitive entities the built-in recognizer detects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PiiKind {
    Ssn,
    CreditCard,
    Email,
    Phone,
    IpAddress,
    ApiKey,
}

impl PiiKind {
    pub const ALL: [PiiKind; 6] = [
        PiiKind::Ssn,
        PiiKind::CreditCard,
        PiiKind::Email,
        PiiKind::Phone,
        PiiKind::IpAddress,
        PiiKind::ApiKey,
    ];

    /// Entity label used in placeholders (`REDACTED_<LABEL>_<n>`).
    pub fn label(self) -> &'static str {
        match self {
            PiiKind::Ssn => "SSN",
            PiiKind::CreditCard => "CREDIT_CARD",
            PiiKind::Email => "EMAIL",
            PiiKind::Phone => "PHONE",
            PiiKind::IpAddress => "IP_ADDRESS",
            PiiKind::ApiKey => "API_KEY",
        }
    }

    /// Detection confidence reported as the scanner score.
    pub fn confidence(self) -> f64 {
        match self {
            PiiKind::Ssn | PiiKind::CreditCard | PiiKind::Email => 0.95,
            PiiKind::ApiKey => 0.9,
            PiiKind::IpAddress => 0.8,
            PiiKind::Phone => 0.75,
        }
    }

    fn pattern(self) -> &'static Regex {
        match self {
            PiiKind::Ssn => &SSN,
            PiiKind::CreditCard => &CREDIT_CARD,
            PiiKind::Email => &EMAIL,
            PiiKind::Phone => &PHONE,
            PiiKind::IpAddress => &IP_V4,
            PiiKind::ApiKey => &API_KEY,
        }
    }
}

// SSN: 123-45-6789 or 123 45 6789
static SSN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b\d{3}[- ]\d{2}[- ]\d{4}\b").expect("valid SSN pattern"));

// 13-19 digits, optionally grouped by spaces or dashes; Luhn-checked after matching
static CREDIT_CARD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:\d{4}[- ]?){3}\d{1,7}\b").expect("valid credit card pattern"));

static EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").expect("valid email pattern")
});

// North-American style numbers: (555) 123-4567, 555-123-4567, +1 555 123 4567
static PHONE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:\+?1[-. ]?)?(?:\(\d{3}\)|\b\d{3})[-. ]?\d{3}[-. ]\d{4}\b")
        .expect("valid phone pattern")
});

static IP_V4: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"\b(?:(?:25[0-5]|2[0-4]\d|1\d\d|[1-9]?\d)\.){3}",
        r"(?:25[0-5]|2[0-4]\d|1\d\d|[1-9]?\d)\b",
    ))
    .expect("valid IPv4 pattern")
});

static API_KEY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:sk-[A-Za-z0-9_-]{20,}|AKIA[0-9A-Z]{16}|gh[pousr]_[A-Za-z0-9]{36})\b")
        .expect("valid API key pattern")
});

/// A detected entity span (byte offsets into the scanned text).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PiiMatch {
    pub kind: PiiKind,
    pub start: usize,
    pub end: usize,
}

/// Finds PII spans of the enabled kinds.
#[derive(Debug, Clone)]
pub struct PiiRecognizer {
    kinds: HashSet<PiiKind>,
}

impl PiiRecognizer {
    /// Recognizer for every built-in kind.
    pub fn new() -> Self {
        Self::with_kinds(PiiKind::ALL)
    }

    pub fn with_kinds(kinds: impl IntoIterator<Item = PiiKind>) -> Self {
        Self {
            kinds: kinds.into_iter().collect(),
        }
    }

    pub fn is_enabled(&self, kind: PiiKind) -> bool {
        self.kinds.contains(&kind)
    }

    /// Non-overlapping matches sorted by position. On overlap the earlier
    /// match wins, and the longer one when both start at the same offset.
    pub fn find(&self, text: &str) -> Vec<PiiMatch> {
        let mut matches = Vec::new();

        for kind in PiiKind::ALL {
            if !self.is_enabled(kind) {
                continue;
            }
            for m in kind.pattern().find_iter(text) {
                if kind == PiiKind::CreditCard && !luhn_check(m.as_str()) {
                    continue;
                }
                matches.push(PiiMatch {
                    kind,
                    start: m.start(),
                    end: m.end(),
                });
            }
        }

        matches.sort_by(|a, b| a.start.cmp(&b.start).then(b.end.cmp(&a.end)));
        remove_overlaps(&mut matches);
        matches
    }
}

impl Default for PiiRecognizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Distinct labels of the matched kinds, in first-seen order.
pub(crate) fn kind_labels(matches: &[PiiMatch]) -> Vec<&'static str> {
    let mut labels = Vec::new();
    for m in matches {
        if !labels.contains(&m.kind.label()) {
            labels.push(m.kind.label());
        }
    }
    labels
}

fn luhn_check(candidate: &str) -> bool {
    let digits: Vec<u32> = candidate.chars().filter_map(|c| c.to_digit(10)).collect();
    if !(13..=19).contains(&digits.len()) {
        return false;
    }

    let sum: u32 = digits
        .iter()
        .rev()
        .enumerate()
        .map(|(i, &d)| {
            if i % 2 == 1 {
                let doubled = d * 2;
                if doubled > 9 {
                    doubled - 9
                } else {
                    doubled
                }
            } else {
                d
            }
        })
        .sum();

    sum % 10 == 0
}

fn remove_overlaps(matches: &mut Vec<PiiMatch>) {
    let mut kept: Vec<PiiMatch> = Vec::with_capacity(matches.len());
    for m in matches.drain(..) {
        match kept.last() {
            Some(last) if m.start < last.end => {}
            _ => kept.push(m),
        }
    }
    *matches = kept;
}
