use crate::action_item::{ActionDetails, ActionItem};
use crate::error::TriageError;
use crate::routing::normalize_type;
use crate::{DecisionSource, GenerationSettings, prompt, rules};
use chrono::Utc;
use domos_llm::{CompletionProvider, CompletionRequest};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    pub item: ActionItem,
    pub source: DecisionSource,
}

/// Turns a tenant email into a structured, routed [`ActionItem`].
#[derive(Clone)]
pub struct ActionItemExtractor {
    provider: Arc<dyn CompletionProvider>,
    settings: GenerationSettings,
}

impl ActionItemExtractor {
    pub fn new(provider: Arc<dyn CompletionProvider>) -> Self {
        Self {
            provider,
            settings: GenerationSettings::CLASSIFY,
        }
    }

    pub fn with_settings(mut self, settings: GenerationSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Never fails. A model classification is used only if it parses as a JSON object;
    /// anything else goes to [`rule_based_action_item`].
    #[tracing::instrument(level = "info", skip_all, fields(tenant_email = %tenant_email))]
    pub async fn extract(
        &self,
        email_body: &str,
        subject: &str,
        tenant_email: &str,
        tenant_unit: &str,
    ) -> Extraction {
        match self.model_details(email_body, subject).await {
            Ok(details) => Extraction {
                item: ActionItem::open(details, tenant_email, tenant_unit, email_body, Utc::now()),
                source: DecisionSource::Model,
            },
            Err(e) => {
                tracing::warn!(error = %e, "model classification unavailable; falling back to keyword rules");
                Extraction {
                    item: rule_based_action_item(email_body, subject, tenant_email, tenant_unit),
                    source: DecisionSource::Rules,
                }
            }
        }
    }

    async fn model_details(
        &self,
        email_body: &str,
        subject: &str,
    ) -> Result<ActionDetails, TriageError> {
        let request = CompletionRequest::new(
            prompt::CLASSIFY_SYSTEM_PROMPT,
            prompt::classify_prompt(subject, email_body),
        )
        .with_max_tokens(self.settings.max_tokens)
        .with_temperature(self.settings.temperature);

        let completion = self.provider.complete(&request).await?;
        let fields = prompt::parse_classification(&completion)?;
        let action_type = normalize_type(&fields.raw_type);
        tracing::debug!(raw_type = %fields.raw_type, normalized = %action_type, "classifier label normalized");

        Ok(ActionDetails {
            action_type: Some(action_type),
            issue: fields.issue,
            location: fields.location,
            priority: fields.priority,
        })
    }
}

/// Keyword-only extraction over `subject` + `body`.
pub fn rule_based_action_item(
    email_body: &str,
    subject: &str,
    tenant_email: &str,
    tenant_unit: &str,
) -> ActionItem {
    ActionItem::open(
        rules::classify(subject, email_body),
        tenant_email,
        tenant_unit,
        email_body,
        Utc::now(),
    )
}
