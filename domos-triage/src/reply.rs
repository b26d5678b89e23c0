use crate::error::TriageError;
use crate::prompt;
use crate::rules;
use crate::tenant::TenantRecord;
use crate::{DecisionSource, GenerationSettings};
use domos_llm::{CompletionProvider, CompletionRequest};
use std::sync::Arc;

/// Sent when neither the model nor any keyword rule produced a reply.
pub const NO_RULE_REPLY: &str = "(No suitable rule-based reply available.)";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedReply {
    pub text: String,
    pub source: DecisionSource,
}

/// Drafts the reply to a tenant email.
#[derive(Clone)]
pub struct ReplyGenerator {
    provider: Arc<dyn CompletionProvider>,
    settings: GenerationSettings,
}

impl ReplyGenerator {
    pub fn new(provider: Arc<dyn CompletionProvider>) -> Self {
        Self {
            provider,
            settings: GenerationSettings::REPLY,
        }
    }

    pub fn with_settings(mut self, settings: GenerationSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Always returns text: model output when available, otherwise the keyword rules,
    /// otherwise [`NO_RULE_REPLY`].
    #[tracing::instrument(level = "info", skip_all)]
    pub async fn generate(&self, email_body: &str, tenant: &TenantRecord) -> GeneratedReply {
        match self.model_reply(email_body, tenant).await {
            Ok(text) => GeneratedReply {
                text,
                source: DecisionSource::Model,
            },
            Err(e) => {
                tracing::warn!(error = %e, "model reply unavailable; falling back to rule-based reply");
                GeneratedReply {
                    text: rule_based_reply(email_body, tenant)
                        .unwrap_or_else(|| NO_RULE_REPLY.to_string()),
                    source: DecisionSource::Rules,
                }
            }
        }
    }

    async fn model_reply(
        &self,
        email_body: &str,
        tenant: &TenantRecord,
    ) -> Result<String, TriageError> {
        let request = CompletionRequest::new(
            prompt::REPLY_SYSTEM_PROMPT,
            prompt::reply_prompt(email_body, tenant),
        )
        .with_max_tokens(self.settings.max_tokens)
        .with_temperature(self.settings.temperature);

        let text = self.provider.complete(&request).await?;
        let text = text.trim();
        if text.is_empty() {
            return Err(TriageError::EmptyCompletion);
        }
        Ok(text.to_string())
    }
}

/// Templated reply from the first matching keyword rule, `None` if nothing matches.
pub fn rule_based_reply(email_body: &str, tenant: &TenantRecord) -> Option<String> {
    rules::first_match(email_body).map(|rule| rule.render_reply(tenant))
}
