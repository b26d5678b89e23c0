use crate::routing;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Canonical workflow categories an email can be filed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    MaintenanceRequest,
    PaymentInquiry,
    LeaseInfoRequest,
    AccessIssue,
    CallbackRequest,
    PestIssue,
    MaintenanceAndPaymentDispute,
    Other,
}

impl ActionType {
    pub const ALL: [ActionType; 8] = [
        ActionType::MaintenanceRequest,
        ActionType::PaymentInquiry,
        ActionType::LeaseInfoRequest,
        ActionType::AccessIssue,
        ActionType::CallbackRequest,
        ActionType::PestIssue,
        ActionType::MaintenanceAndPaymentDispute,
        ActionType::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ActionType::MaintenanceRequest => "maintenance_request",
            ActionType::PaymentInquiry => "payment_inquiry",
            ActionType::LeaseInfoRequest => "lease_info_request",
            ActionType::AccessIssue => "access_issue",
            ActionType::CallbackRequest => "callback_request",
            ActionType::PestIssue => "pest_issue",
            ActionType::MaintenanceAndPaymentDispute => "maintenance_and_payment_dispute",
            ActionType::Other => "other",
        }
    }
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    #[default]
    Normal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[default]
    Open,
}

/// The classified part of an action item, before identity and routing are attached.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ActionDetails {
    pub action_type: Option<ActionType>,
    pub issue: Option<String>,
    pub location: Option<String>,
    pub priority: Priority,
}

/// Structured record extracted from one tenant email.
///
/// `cc` is not settable: it is always the routing-table address for `action_type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionItem {
    #[serde(rename = "type")]
    pub action_type: Option<ActionType>,
    pub location: Option<String>,
    pub issue: Option<String>,
    pub status: Status,
    pub tenant_email: String,
    pub unit: String,
    #[serde(with = "utc_timestamp")]
    pub timestamp: DateTime<Utc>,
    pub original_text: String,
    pub priority: Priority,
    cc: String,
}

impl ActionItem {
    pub fn open(
        details: ActionDetails,
        tenant_email: &str,
        unit: &str,
        email_body: &str,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            cc: routing::route(details.action_type).to_string(),
            action_type: details.action_type,
            location: details.location,
            issue: details.issue,
            status: Status::Open,
            tenant_email: tenant_email.to_string(),
            unit: unit.to_string(),
            timestamp: created_at,
            original_text: email_body.trim().to_string(),
            priority: details.priority,
        }
    }

    pub fn cc(&self) -> &str {
        &self.cc
    }

    /// `false` when no workflow-relevant intent was found; such items are not persisted.
    pub fn is_actionable(&self) -> bool {
        self.action_type.is_some()
    }
}

/// ISO-8601 UTC with microsecond precision and an explicit `Z`.
mod utc_timestamp {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_rfc3339_opts(SecondsFormat::Micros, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).single().expect("valid time")
    }

    #[test]
    fn serializes_with_wire_field_names() {
        let item = ActionItem::open(
            ActionDetails {
                action_type: Some(ActionType::AccessIssue),
                issue: Some("lockout".to_string()),
                location: None,
                priority: Priority::High,
            },
            "janedoe@example.com",
            "3B",
            "  I'm locked out!  \n",
            fixed_time(),
        );

        let json = serde_json::to_value(&item).expect("serialize");
        assert_eq!(json["type"], "access_issue");
        assert_eq!(json["issue"], "lockout");
        assert_eq!(json["location"], serde_json::Value::Null);
        assert_eq!(json["status"], "open");
        assert_eq!(json["priority"], "high");
        assert_eq!(json["tenant_email"], "janedoe@example.com");
        assert_eq!(json["unit"], "3B");
        assert_eq!(json["timestamp"], "2024-05-01T12:30:00.000000Z");
        assert_eq!(json["original_text"], "I'm locked out!");
        assert_eq!(json["cc"], "security@propertymanager.com");
    }

    #[test]
    fn missing_type_routes_to_default_and_is_not_actionable() {
        let item = ActionItem::open(ActionDetails::default(), "a@b.c", "1A", "hi", fixed_time());
        assert!(!item.is_actionable());
        assert_eq!(item.cc(), crate::DEFAULT_CC);
        assert_eq!(
            serde_json::to_value(&item).expect("serialize")["type"],
            serde_json::Value::Null
        );
    }

    #[test]
    fn stored_items_read_back_unchanged() {
        let item = ActionItem::open(
            ActionDetails {
                action_type: Some(ActionType::PestIssue),
                issue: Some("pest report".to_string()),
                location: Some("kitchen".to_string()),
                priority: Priority::Normal,
            },
            "a@b.c",
            "1A",
            "roaches in the kitchen",
            fixed_time(),
        );
        let text = serde_json::to_string_pretty(&item).expect("serialize");
        let back: ActionItem = serde_json::from_str(&text).expect("deserialize");
        assert_eq!(back, item);
    }
}
