//! Replace PII with vault-backed placeholders.

use super::pii::{kind_labels, PiiKind, PiiRecognizer};
use crate::scanner::{ScanContext, ScanError, ScanOutcome, Scanner};
use tracing::debug;

/// Input scanner that swaps every detected entity for a `[REDACTED_<TYPE>_<n>]`
/// token and records the original in the request's vault.
///
/// Successful redaction is a remediation, not a violation, so the verdict is
/// always valid. The score is the highest detection confidence (0.0 when
/// nothing was found).
#[derive(Debug, Clone, Default)]
pub struct Anonymize {
    recognizer: PiiRecognizer,
}

impl Anonymize {
    pub const ID: &'static str = "anonymize";

    pub fn new() -> Self {
        Self::default()
    }

    /// Only redact the given entity kinds.
    pub fn with_entity_types(kinds: impl IntoIterator<Item = PiiKind>) -> Self {
        Self {
            recognizer: PiiRecognizer::with_kinds(kinds),
        }
    }
}

impl Scanner for Anonymize {
    fn id(&self) -> &str {
        Self::ID
    }

    fn scan(&self, input: &str, ctx: &mut ScanContext<'_>) -> Result<ScanOutcome, ScanError> {
        let matches = self.recognizer.find(input);
        if matches.is_empty() {
            return Ok(ScanOutcome::pass(input, 0.0));
        }

        let vault = ctx.vault_mut();
        let mut output = String::with_capacity(input.len());
        let mut last_end = 0;
        let mut score: f64 = 0.0;

        for m in &matches {
            output.push_str(&input[last_end..m.start]);
            let placeholder = vault.anonymize(&input[m.start..m.end], m.kind.label());
            output.push_str(&placeholder.token());
            last_end = m.end;
            score = score.max(m.kind.confidence());
        }
        output.push_str(&input[last_end..]);

        let labels = kind_labels(&matches);
        debug!(entities = matches.len(), kinds = ?labels, "anonymized sensitive entities");

        Ok(ScanOutcome::pass(output, score)
            .with_diagnostic(format!("redacted {} entities: {}", matches.len(), labels.join(", "))))
    }
}
