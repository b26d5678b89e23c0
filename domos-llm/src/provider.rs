use crate::error::Result;
use crate::types::CompletionRequest;
use async_trait::async_trait;

/// Anything that can turn a prompt into completion text.
///
/// Every failure (transport, status, response shape) comes back as an `LlmError`; callers in
/// the triage core treat all of them the same way and fall back to deterministic rules.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<String>;
}
