//! Restore vault-backed placeholders in model output.

use crate::scanner::{ScanContext, ScanError, ScanOutcome, Scanner};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

static PLACEHOLDER_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[(REDACTED_[A-Za-z0-9_]+)\]").expect("valid placeholder pattern"));

/// Output scanner that replaces each `[REDACTED_...]` token with the original
/// value from the request's vault.
///
/// A token with no vault entry is left in place and the verdict becomes
/// invalid (score 1.0); the lookup miss is never a fault.
#[derive(Debug, Clone, Copy, Default)]
pub struct Deanonymize;

impl Deanonymize {
    pub const ID: &'static str = "deanonymize";

    pub fn new() -> Self {
        Self
    }
}

impl Scanner for Deanonymize {
    fn id(&self) -> &str {
        Self::ID
    }

    fn scan(&self, input: &str, ctx: &mut ScanContext<'_>) -> Result<ScanOutcome, ScanError> {
        let vault = ctx.vault();
        let mut output = String::with_capacity(input.len());
        let mut last_end = 0;
        let mut restored = 0usize;
        let mut missing = 0usize;

        for caps in PLACEHOLDER_TOKEN.captures_iter(input) {
            let (Some(token), Some(label)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            output.push_str(&input[last_end..token.start()]);
            match vault.resolve(label.as_str()) {
                Ok(original) => {
                    output.push_str(original);
                    restored += 1;
                }
                Err(err) => {
                    warn!(error = %err, "placeholder has no vault entry");
                    output.push_str(token.as_str());
                    missing += 1;
                }
            }
            last_end = token.end();
        }
        output.push_str(&input[last_end..]);

        debug!(restored, missing, "deanonymized output");

        if missing > 0 {
            return Ok(ScanOutcome::fail(output, 1.0)
                .with_diagnostic(format!("{missing} unresolved placeholder(s)")));
        }
        Ok(ScanOutcome::pass(output, 0.0))
    }
}
