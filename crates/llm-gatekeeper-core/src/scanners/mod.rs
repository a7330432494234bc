//! Built-in scanners and the default pipelines.

mod anonymize;
mod deanonymize;
mod lexicon;
mod no_refusal;
mod pii;
mod prompt_injection;
mod relevance;
mod sensitive;
mod token_limit;
mod toxicity;

pub use anonymize::Anonymize;
pub use deanonymize::Deanonymize;
pub use no_refusal::NoRefusal;
pub use pii::{PiiKind, PiiMatch, PiiRecognizer};
pub use prompt_injection::PromptInjection;
pub use relevance::Relevance;
pub use sensitive::{Sensitive, REDACTION_MARKER};
pub use token_limit::TokenLimit;
pub use toxicity::Toxicity;

use crate::scanner::{ScanError, Scanner};
use std::sync::Arc;

/// `anonymize, toxicity, token_limit, prompt_injection`
pub fn default_input_scanners() -> Result<Vec<Arc<dyn Scanner>>, ScanError> {
    Ok(vec![
        Arc::new(Anonymize::new()),
        Arc::new(Toxicity::new()?),
        Arc::new(TokenLimit::new()?),
        Arc::new(PromptInjection::new()?),
    ])
}

/// `no_refusal, sensitive, deanonymize`
///
/// `sensitive` runs before `deanonymize` so restored values are never
/// reported as leaked PII. [`Relevance`] is lexical and only added on request.
pub fn default_output_scanners() -> Result<Vec<Arc<dyn Scanner>>, ScanError> {
    Ok(vec![
        Arc::new(NoRefusal::new()?),
        Arc::new(Sensitive::new()),
        Arc::new(Deanonymize::new()),
    ])
}
