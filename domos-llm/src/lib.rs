//! BYO-key completion client for the Domos mailbox assistant.
//!
//! Pure HTTP client: callers hand in a system + user prompt and get completion text back.

mod anthropic;
mod client;
mod error;
mod openai;
mod provider;
mod types;

pub use client::{DEFAULT_ENDPOINT, DEFAULT_MODEL, LlmClient, Provider};
pub use error::{LlmError, Result};
pub use provider::CompletionProvider;
pub use types::{ChatMessage, CompletionRequest, Role};
