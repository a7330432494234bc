//! Middleware layers
//!
//! ## Available Middleware
//!
//! - `request_context`: request id propagation (`x-request-id`)
//! - `outcome`: `gatekeeper_requests_total` accounting

pub mod outcome;
pub mod request_context;

// Re-exports
pub use outcome::{outcome_middleware, RequestOutcome};
pub use request_context::{request_context_middleware, RequestId, REQUEST_ID_HEADER};
