use crate::anthropic::AnthropicClient;
use crate::error::{LlmError, Result};
use crate::openai::OpenAiClient;
use crate::provider::CompletionProvider;
use crate::types::CompletionRequest;
use async_trait::async_trait;

/// Together.ai speaks the OpenAI chat-completions dialect.
pub const DEFAULT_ENDPOINT: &str = "https://api.together.xyz/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "mistralai/Mistral-7B-Instruct-v0.1";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    OpenAiCompatible,
    Anthropic,
}

#[derive(Clone)]
pub struct LlmClient {
    provider: Provider,
    api_key: String,
    model: String,
    endpoint: String,
    client: reqwest::Client,
}

impl LlmClient {
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn new(api_key: &str, model: &str) -> Self {
        let provider = detect_provider(model);
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(%e, "reqwest client build failed; falling back to default client");
                reqwest::Client::new()
            });
        let endpoint = match provider {
            Provider::OpenAiCompatible => DEFAULT_ENDPOINT,
            Provider::Anthropic => crate::anthropic::ANTHROPIC_MESSAGES_URL,
        };
        Self {
            provider,
            api_key: api_key.trim().to_string(),
            model: model.to_string(),
            endpoint: endpoint.to_string(),
            client,
        }
    }

    /// Point the client at a different chat endpoint (OpenAI proper, a local gateway, ...).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    #[tracing::instrument(level = "info", skip_all, fields(model = %self.model))]
    pub async fn chat(&self, request: &CompletionRequest) -> Result<String> {
        if self.api_key.is_empty() {
            return Err(LlmError::InvalidInput("api key is not configured".to_string()));
        }
        let content = match self.provider {
            Provider::OpenAiCompatible => {
                OpenAiClient::new(self.client.clone(), &self.api_key, &self.model, &self.endpoint)
                    .chat(request)
                    .await?
            }
            Provider::Anthropic => {
                AnthropicClient::new(self.client.clone(), &self.api_key, &self.model, &self.endpoint)
                    .chat(request)
                    .await?
            }
        };
        ensure_content(content)
    }
}

#[async_trait]
impl CompletionProvider for LlmClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        self.chat(request).await
    }
}

fn detect_provider(model: &str) -> Provider {
    let m = model.to_ascii_lowercase();
    if m.starts_with("claude-") {
        return Provider::Anthropic;
    }
    Provider::OpenAiCompatible
}

fn ensure_content(content: Option<String>) -> Result<String> {
    match content {
        Some(text) if !text.trim().is_empty() => Ok(text),
        Some(_) => Err(LlmError::ResponseFormat(
            "completion text is empty".to_string(),
        )),
        None => Err(LlmError::ResponseFormat(
            "response has no completion text".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claude_models_route_to_anthropic() {
        assert_eq!(detect_provider("claude-3-5-haiku-latest"), Provider::Anthropic);
        assert_eq!(detect_provider("Claude-3-opus"), Provider::Anthropic);
        assert_eq!(detect_provider(DEFAULT_MODEL), Provider::OpenAiCompatible);
        assert_eq!(detect_provider("gpt-4o-mini"), Provider::OpenAiCompatible);
    }

    #[test]
    fn default_endpoint_follows_provider() {
        let together = LlmClient::new("k", DEFAULT_MODEL);
        assert_eq!(together.endpoint(), DEFAULT_ENDPOINT);

        let anthropic = LlmClient::new("k", "claude-3-5-haiku-latest");
        assert_eq!(anthropic.endpoint(), "https://api.anthropic.com/v1/messages");

        let custom = LlmClient::new("k", "gpt-4o-mini")
            .with_endpoint("https://api.openai.com/v1/chat/completions");
        assert_eq!(custom.endpoint(), "https://api.openai.com/v1/chat/completions");
    }

    #[tokio::test]
    async fn blank_api_key_fails_before_any_request() {
        let client = LlmClient::new("   ", DEFAULT_MODEL).with_endpoint("http://127.0.0.1:9/none");
        let err = client
            .complete(&CompletionRequest::new("sys", "hello"))
            .await
            .expect_err("blank key must be rejected");
        assert!(matches!(err, LlmError::InvalidInput(_)));
    }

    #[test]
    fn blank_or_missing_content_is_a_format_error() {
        assert!(matches!(
            ensure_content(None),
            Err(LlmError::ResponseFormat(_))
        ));
        assert!(matches!(
            ensure_content(Some("  \n".to_string())),
            Err(LlmError::ResponseFormat(_))
        ));
        assert_eq!(
            ensure_content(Some(" hi ".to_string())).expect("content"),
            " hi "
        );
    }
}
