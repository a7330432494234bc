//! HTTP request handlers

pub mod chat;
pub mod health;
pub mod scanners;

pub use chat::chat_completions;
pub use health::{health, live, metrics, ready, version};
pub use scanners::list_scanners;
