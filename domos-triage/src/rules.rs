//! Deterministic keyword rules shared by the reply and action-item fallbacks.
//!
//! Both fallbacks walk the same [`KEYWORD_RULES`] list and stop at the first rule that
//! matches, so the tone of a rule-based reply always agrees with the type filed for it.

use crate::action_item::{ActionDetails, ActionType, Priority};
use crate::tenant::TenantRecord;

pub const LOCATIONS: [&str; 6] = [
    "kitchen",
    "bathroom",
    "living room",
    "bedroom",
    "garage",
    "hallway",
];

pub const URGENCY_KEYWORDS: [&str; 3] = ["urgent", "emergency", "asap"];

const SIGN_OFF: &str = "- Property Management";

/// One keyword group: matches when every keyword of at least one clause occurs in the text.
pub struct KeywordRule {
    pub name: &'static str,
    pub clauses: &'static [&'static [&'static str]],
    pub action_type: ActionType,
    pub issue: &'static str,
    render: fn(&TenantRecord) -> String,
}

impl KeywordRule {
    /// `text` must already be lower-cased.
    pub fn matches(&self, text: &str) -> bool {
        self.clauses
            .iter()
            .any(|clause| clause.iter().all(|keyword| text.contains(keyword)))
    }

    pub fn render_reply(&self, tenant: &TenantRecord) -> String {
        (self.render)(tenant)
    }

    pub fn details(&self) -> ActionDetails {
        ActionDetails {
            action_type: Some(self.action_type),
            issue: Some(self.issue.to_string()),
            ..ActionDetails::default()
        }
    }
}

pub static KEYWORD_RULES: [KeywordRule; 9] = [
    KeywordRule {
        name: "lockout",
        clauses: &[&["locked"], &["lock"]],
        action_type: ActionType::AccessIssue,
        issue: "lockout",
        render: |t: &TenantRecord| {
            format!(
                "Hi {},\n\nWe understand you're locked out of Unit {}. If this is urgent, please contact building security or call management directly. We can also coordinate access during regular hours.\n\n{SIGN_OFF}",
                t.name, t.unit
            )
        },
    },
    KeywordRule {
        name: "payment_withheld",
        clauses: &[&["money order"], &["not paying"], &["toilet"]],
        action_type: ActionType::MaintenanceAndPaymentDispute,
        issue: "payment withheld due to maintenance",
        render: |t: &TenantRecord| {
            format!(
                "Hi {},\n\nThanks for letting us know. We'll log a maintenance ticket for the issue in Unit {}. Meanwhile, please don't hesitate to reach out about payment concerns - we're here to help.\n\n{SIGN_OFF}",
                t.name, t.unit
            )
        },
    },
    KeywordRule {
        name: "rent_amount",
        clauses: &[&["rent", "how much"], &["monthly rent"], &["lease"]],
        action_type: ActionType::LeaseInfoRequest,
        issue: "rent inquiry",
        render: |t: &TenantRecord| {
            format!(
                "Hi {},\n\nYour lease began on {} and runs through {}. We can confirm your rent amount or resend your lease if needed - just let us know!\n\n{SIGN_OFF}",
                t.name, t.lease_start, t.lease_end
            )
        },
    },
    KeywordRule {
        name: "callback",
        clauses: &[&["call me"], &["call back"], &["available"], &["tomorrow"]],
        action_type: ActionType::CallbackRequest,
        issue: "tenant requested a phone call",
        render: |t: &TenantRecord| {
            format!(
                "Hi {},\n\nThanks for your message. We'll follow up with a call around your availability tomorrow.\n\n{SIGN_OFF}",
                t.name
            )
        },
    },
    KeywordRule {
        name: "plumbing",
        clauses: &[&["leak"], &["pipe"], &["plumbing"], &["flood"]],
        action_type: ActionType::MaintenanceRequest,
        issue: "plumbing leak",
        render: |t: &TenantRecord| {
            format!(
                "Hi {},\n\nThanks for reporting the plumbing issue in Unit {}. We'll dispatch maintenance shortly.\n\n{SIGN_OFF}",
                t.name, t.unit
            )
        },
    },
    KeywordRule {
        name: "window",
        clauses: &[&["window"], &["glass"], &["crack"]],
        action_type: ActionType::MaintenanceRequest,
        issue: "window damage",
        render: |t: &TenantRecord| {
            format!(
                "Hi {},\n\nWe'll send someone to look into the window issue in Unit {} as soon as possible.\n\n{SIGN_OFF}",
                t.name, t.unit
            )
        },
    },
    KeywordRule {
        name: "hvac",
        clauses: &[&["ac"], &["air conditioner"], &["heat"], &["hvac"]],
        action_type: ActionType::MaintenanceRequest,
        issue: "hvac issue",
        render: |t: &TenantRecord| {
            format!(
                "Hi {},\n\nWe'll have the HVAC team review the issue in Unit {}. We'll reach out to schedule access.\n\n{SIGN_OFF}",
                t.name, t.unit
            )
        },
    },
    KeywordRule {
        name: "payment",
        clauses: &[&["rent"], &["payment"], &["paid"], &["balance"]],
        action_type: ActionType::PaymentInquiry,
        issue: "rent confirmation",
        render: |t: &TenantRecord| {
            format!(
                "Hi {},\n\nWe'll confirm your payment status and follow up with any updates on your balance.\n\n{SIGN_OFF}",
                t.name
            )
        },
    },
    KeywordRule {
        name: "pest",
        clauses: &[
            &["mouse"],
            &["rat"],
            &["roach"],
            &["pest"],
            &["bug"],
            &["infestation"],
        ],
        action_type: ActionType::PestIssue,
        issue: "pest report",
        render: |t: &TenantRecord| {
            format!(
                "Hi {},\n\nWe're arranging pest control for Unit {}. We'll notify you when the visit is scheduled.\n\n{SIGN_OFF}",
                t.name, t.unit
            )
        },
    },
];

/// First rule matching `text` (lower-cased here).
pub(crate) fn first_match(text: &str) -> Option<&'static KeywordRule> {
    let text = text.to_lowercase();
    KEYWORD_RULES.iter().find(|rule| rule.matches(&text))
}

/// Full rule-based classification of `subject` + `body`.
pub(crate) fn classify(subject: &str, body: &str) -> ActionDetails {
    let text = format!("{subject} {body}").to_lowercase();

    let mut details = first_match(&text)
        .map(KeywordRule::details)
        .unwrap_or_default();
    details.location = LOCATIONS
        .iter()
        .find(|location| text.contains(*location))
        .map(|location| location.to_string());
    if URGENCY_KEYWORDS.iter().any(|keyword| text.contains(keyword)) {
        details.priority = Priority::High;
    }
    details
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule_name(text: &str) -> Option<&'static str> {
        first_match(text).map(|rule| rule.name)
    }

    #[test]
    fn rules_are_listed_in_priority_order() {
        let names: Vec<_> = KEYWORD_RULES.iter().map(|rule| rule.name).collect();
        assert_eq!(
            names,
            [
                "lockout",
                "payment_withheld",
                "rent_amount",
                "callback",
                "plumbing",
                "window",
                "hvac",
                "payment",
                "pest",
            ]
        );
    }

    #[test]
    fn earlier_groups_shadow_later_ones() {
        assert_eq!(rule_name("I'm locked out and there's a leak"), Some("lockout"));
        assert_eq!(rule_name("toilet leak"), Some("payment_withheld"));
        assert_eq!(rule_name("can you call me about the leak"), Some("callback"));
        assert_eq!(rule_name("rent payment for a rat problem"), Some("payment"));
    }

    #[test]
    fn rent_amount_needs_both_words_or_a_lease_mention() {
        assert_eq!(rule_name("how much is rent?"), Some("rent_amount"));
        assert_eq!(rule_name("what is my monthly rent"), Some("rent_amount"));
        assert_eq!(rule_name("question about my lease"), Some("rent_amount"));
        assert_eq!(rule_name("i paid rent"), Some("payment"));
        assert_eq!(rule_name("how much longer for the mouse"), Some("pest"));
    }

    #[test]
    fn matching_is_case_insensitive() {
        assert_eq!(rule_name("HVAC down"), Some("hvac"));
        assert_eq!(rule_name("Broken WINDOW"), Some("window"));
    }

    #[test]
    fn no_keywords_means_no_rule() {
        assert_eq!(rule_name("hello there"), None);
        assert_eq!(classify("", "hello there"), ActionDetails::default());
    }

    #[test]
    fn classification_picks_first_location_and_flags_urgency() {
        let details = classify("URGENT", "AC broken in bedroom and the hallway");
        assert_eq!(details.action_type, Some(ActionType::MaintenanceRequest));
        assert_eq!(details.issue.as_deref(), Some("hvac issue"));
        assert_eq!(details.location.as_deref(), Some("bedroom"));
        assert_eq!(details.priority, Priority::High);
    }

    #[test]
    fn subject_participates_in_classification() {
        let details = classify("Pest problem", "see title");
        assert_eq!(details.action_type, Some(ActionType::PestIssue));
        assert_eq!(details.issue.as_deref(), Some("pest report"));
        assert_eq!(details.priority, Priority::Normal);
        assert_eq!(details.location, None);
    }
}
