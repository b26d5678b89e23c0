use domos_llm::LlmError;
use thiserror::Error;

/// Internal failure of the model tier. Never escapes the public generators: each variant
/// sends the caller down the rule-based path.
#[derive(Debug, Error)]
pub enum TriageError {
    #[error("completion provider unavailable: {0}")]
    ProviderUnavailable(#[from] LlmError),

    #[error("completion was empty")]
    EmptyCompletion,

    #[error("classification is not valid json: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("classification is malformed: {0}")]
    MalformedClassification(String),
}
