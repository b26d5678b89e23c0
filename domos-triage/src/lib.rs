//! Classification and routing core of the Domos mailbox assistant.
//!
//! Every decision here is two-tier: ask the completion provider first, and fall back to the
//! deterministic keyword rules whenever the provider is unavailable or returns something that
//! is not structurally usable. Nothing in this crate performs mailbox or file I/O.

mod action_item;
mod error;
mod extract;
mod prompt;
mod reply;
mod routing;
mod rules;
mod tenant;

pub use action_item::{ActionDetails, ActionItem, ActionType, Priority, Status};
pub use error::TriageError;
pub use extract::{ActionItemExtractor, Extraction, rule_based_action_item};
pub use reply::{GeneratedReply, NO_RULE_REPLY, ReplyGenerator, rule_based_reply};
pub use routing::{DEFAULT_CC, TYPE_NORMALIZATION, normalize_type, route, stakeholder_for};
pub use rules::{KEYWORD_RULES, KeywordRule, LOCATIONS, URGENCY_KEYWORDS};
pub use tenant::{InMemoryTenantDirectory, TenantDirectory, TenantRecord, UNKNOWN};

/// Which tier produced a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionSource {
    Model,
    Rules,
}

impl DecisionSource {
    pub fn as_str(self) -> &'static str {
        match self {
            DecisionSource::Model => "model",
            DecisionSource::Rules => "rules",
        }
    }
}

/// Sampling parameters for one kind of completion request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationSettings {
    pub max_tokens: u32,
    pub temperature: f32,
}

impl GenerationSettings {
    pub const REPLY: Self = Self {
        max_tokens: 256,
        temperature: 0.7,
    };

    pub const CLASSIFY: Self = Self {
        max_tokens: 256,
        temperature: 0.4,
    };
}
