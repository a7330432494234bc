//! Gateway error types for LLM Gatekeeper.

use crate::decision::Decision;
use crate::model::ModelError;
use crate::pipeline::ScannerFault;
use crate::scanner::Direction;

/// Errors that end a gateway request.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Invalid gateway or pipeline configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A scanner could not evaluate its input; the pipeline was stopped.
    #[error("{direction} pipeline stopped: {fault}")]
    ScannerFault {
        direction: Direction,
        #[source]
        fault: ScannerFault,
    },

    /// The decision engine rejected the prompt. The model was not called.
    #[error("Prompt not valid, scores: {}", .0.summary())]
    InputRejected(Decision),

    /// The decision engine rejected the completion.
    #[error("Output not valid, scores: {}", .0.summary())]
    OutputRejected(Decision),

    /// The model backend failed or timed out.
    #[error("Upstream failure: {0}")]
    Upstream(#[from] ModelError),
}

impl GatewayError {
    /// Decision behind a rejection, if this is one.
    pub fn decision(&self) -> Option<&Decision> {
        match self {
            GatewayError::InputRejected(decision) | GatewayError::OutputRejected(decision) => {
                Some(decision)
            }
            _ => None,
        }
    }
}
