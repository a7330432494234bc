//! Reject prompts longer than a token budget.

use crate::scanner::{ScanContext, ScanError, ScanOutcome, Scanner};
use std::fmt;
use std::sync::Arc;
use tiktoken_rs::CoreBPE;

const DEFAULT_LIMIT: usize = 4096;

/// Counts `cl100k_base` tokens. Over-limit input is invalid (score 1.0) and is
/// truncated to the first `limit` tokens; anything within the limit, including
/// the empty string, passes with score 0.0.
#[derive(Clone)]
pub struct TokenLimit {
    bpe: Arc<CoreBPE>,
    limit: usize,
}

impl TokenLimit {
    pub const ID: &'static str = "token_limit";

    pub fn new() -> Result<Self, ScanError> {
        Self::with_limit(DEFAULT_LIMIT)
    }

    pub fn with_limit(limit: usize) -> Result<Self, ScanError> {
        let bpe = tiktoken_rs::cl100k_base()
            .map_err(|e| ScanError::Config(format!("failed to load cl100k_base tokenizer: {e}")))?;
        Ok(Self {
            bpe: Arc::new(bpe),
            limit,
        })
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn count(&self, text: &str) -> usize {
        if text.is_empty() {
            return 0;
        }
        self.bpe.encode_ordinary(text).len()
    }

    /// Decode the first `limit` tokens, backing off a few tokens when the cut
    /// lands inside a multi-byte character.
    fn truncate(&self, text: &str) -> Result<String, ScanError> {
        let tokens = self.bpe.encode_ordinary(text);
        let lowest = self.limit.saturating_sub(4);

        for cut in (lowest..=self.limit).rev() {
            if let Ok(head) = self.bpe.decode(tokens[..cut].to_vec()) {
                return Ok(head);
            }
        }
        Err(ScanError::Internal("could not truncate input on a character boundary".to_string()))
    }
}

impl fmt::Debug for TokenLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenLimit").field("limit", &self.limit).finish()
    }
}

impl Scanner for TokenLimit {
    fn id(&self) -> &str {
        Self::ID
    }

    fn scan(&self, input: &str, _ctx: &mut ScanContext<'_>) -> Result<ScanOutcome, ScanError> {
        let count = self.count(input);
        if count <= self.limit {
            return Ok(ScanOutcome::pass(input, 0.0));
        }

        let truncated = self.truncate(input)?;
        Ok(ScanOutcome::fail(truncated, 1.0)
            .with_diagnostic(format!("{count} tokens exceeds limit of {}", self.limit)))
    }
}
