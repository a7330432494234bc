//! Flag PII that shows up in model output.

use super::pii::{kind_labels, PiiKind, PiiRecognizer};
use crate::scanner::{ScanContext, ScanError, ScanOutcome, Scanner};

/// Fixed marker for output redaction. Not vault-backed, so the
/// de-anonymizer leaves it alone.
pub const REDACTION_MARKER: &str = "[REDACTED]";

/// Output scanner: invalid when the text contains PII. With `redact` enabled
/// the detected spans are also replaced by [`REDACTION_MARKER`].
///
/// Place it before [`Deanonymize`](super::Deanonymize) so it only sees
/// placeholders, never the values the client supplied.
#[derive(Debug, Clone, Default)]
pub struct Sensitive {
    recognizer: PiiRecognizer,
    redact: bool,
}

impl Sensitive {
    pub const ID: &'static str = "sensitive";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entity_types(kinds: impl IntoIterator<Item = PiiKind>) -> Self {
        Self {
            recognizer: PiiRecognizer::with_kinds(kinds),
            redact: false,
        }
    }

    pub fn with_redaction(mut self, redact: bool) -> Self {
        self.redact = redact;
        self
    }
}

impl Scanner for Sensitive {
    fn id(&self) -> &str {
        Self::ID
    }

    fn scan(&self, input: &str, _ctx: &mut ScanContext<'_>) -> Result<ScanOutcome, ScanError> {
        let matches = self.recognizer.find(input);
        if matches.is_empty() {
            return Ok(ScanOutcome::pass(input, 0.0));
        }

        let score = matches.iter().map(|m| m.kind.confidence()).fold(0.0, f64::max);
        let output = if self.redact {
            let mut redacted = String::with_capacity(input.len());
            let mut last_end = 0;
            for m in &matches {
                redacted.push_str(&input[last_end..m.start]);
                redacted.push_str(REDACTION_MARKER);
                last_end = m.end;
            }
            redacted.push_str(&input[last_end..]);
            redacted
        } else {
            input.to_string()
        };

        Ok(ScanOutcome::fail(output, score).with_diagnostic(format!(
            "{} sensitive entities: {}",
            matches.len(),
            kind_labels(&matches).join(", ")
        )))
    }
}
