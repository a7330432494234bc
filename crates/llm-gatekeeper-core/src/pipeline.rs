//! Ordered scanner pipeline for one traffic direction.

use crate::error::GatewayError;
use crate::scanner::{Direction, ScanContext, ScanError, ScanResult, Scanner};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, instrument, warn};

/// A scanner that could not evaluate its input. Stops the pipeline.
#[derive(Debug, thiserror::Error)]
#[error("scanner '{scanner}' failed: {source}")]
pub struct ScannerFault {
    pub scanner: String,
    #[source]
    pub source: ScanError,
}

/// Every stage's result plus the document produced by the last stage.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineResult {
    pub results: Vec<ScanResult>,
    pub output: String,
}

impl PipelineResult {
    /// Result of a specific scanner, if it ran.
    pub fn get(&self, scanner_id: &str) -> Option<&ScanResult> {
        self.results.iter().find(|r| r.scanner_id == scanner_id)
    }

    pub fn all_valid(&self) -> bool {
        self.results.iter().all(|r| r.valid)
    }
}

/// Statically configured, ordered list of scanners.
///
/// Each scanner receives the previous scanner's `sanitized_text`. A `valid =
/// false` verdict never short-circuits the run; a [`ScanError`] always does.
pub struct Pipeline {
    direction: Direction,
    scanners: Vec<Arc<dyn Scanner>>,
}

impl Pipeline {
    /// Create a pipeline, rejecting duplicate scanner ids.
    pub fn new(
        direction: Direction,
        scanners: Vec<Arc<dyn Scanner>>,
    ) -> Result<Self, GatewayError> {
        let mut seen = HashSet::with_capacity(scanners.len());
        for scanner in &scanners {
            if !seen.insert(scanner.id().to_string()) {
                return Err(GatewayError::Config(format!(
                    "duplicate scanner id '{}' in {} pipeline",
                    scanner.id(),
                    direction
                )));
            }
        }

        Ok(Self { direction, scanners })
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn scanner_ids(&self) -> Vec<&str> {
        self.scanners.iter().map(|s| s.id()).collect()
    }

    pub fn len(&self) -> usize {
        self.scanners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scanners.is_empty()
    }

    /// Run every scanner in order over `input`.
    #[instrument(skip_all, fields(direction = %self.direction, stages = self.scanners.len()))]
    pub fn run(
        &self,
        input: &str,
        ctx: &mut ScanContext<'_>,
    ) -> Result<PipelineResult, ScannerFault> {
        let mut document = input.to_string();
        let mut results = Vec::with_capacity(self.scanners.len());

        for scanner in &self.scanners {
            let started = Instant::now();
            let outcome = scanner
                .scan(&document, ctx)
                .and_then(|outcome| {
                    if outcome.score.is_finite() {
                        Ok(outcome)
                    } else {
                        Err(ScanError::Internal("scanner returned a non-finite score".to_string()))
                    }
                })
                .map_err(|source| {
                    warn!(
                        scanner = scanner.id(),
                        error = %source,
                        "scanner fault, stopping pipeline"
                    );
                    ScannerFault {
                        scanner: scanner.id().to_string(),
                        source,
                    }
                })?;

            debug!(
                scanner = scanner.id(),
                valid = outcome.valid,
                score = outcome.score,
                elapsed_us = started.elapsed().as_micros() as u64,
                "scanner finished"
            );
            if !outcome.valid {
                warn!(
                    scanner = scanner.id(),
                    score = outcome.score,
                    diagnostic = outcome.diagnostic.as_deref().unwrap_or(""),
                    "scanner reported invalid content"
                );
            }

            let result = ScanResult::from_outcome(scanner.id(), outcome);
            document.clone_from(&result.sanitized_text);
            results.push(result);
        }

        Ok(PipelineResult {
            results,
            output: document,
        })
    }
}
