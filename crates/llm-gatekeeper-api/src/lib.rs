//! LLM Gatekeeper HTTP service
//!
//! Exposes the gateway over an OpenAI-style completion route, with
//! health/version probes, a scanner listing and Prometheus metrics.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;
pub mod telemetry;
pub mod upstream;

pub use config::{ConfigError, Settings};
pub use error::ApiError;
pub use router::create_router;
pub use state::AppState;
