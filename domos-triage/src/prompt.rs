//! Prompt construction and parsing of the classifier's JSON answer.

use crate::action_item::Priority;
use crate::error::TriageError;
use crate::rules::URGENCY_KEYWORDS;
use crate::tenant::TenantRecord;
use serde_json::Value;

pub(crate) const REPLY_SYSTEM_PROMPT: &str =
    "You are a helpful assistant for property management.";

pub(crate) const CLASSIFY_SYSTEM_PROMPT: &str = "You are an assistant for property managers. Your job is to classify emails and extract action items.";

pub(crate) fn reply_prompt(email_body: &str, tenant: &TenantRecord) -> String {
    let recent = if tenant.recent_requests.is_empty() {
        "None".to_string()
    } else {
        tenant.recent_requests.join(", ")
    };
    format!(
        "You are a helpful and professional assistant who replies on behalf of Property Management. \
         Always sign off with: 'Property Management'.\n\n\
         Tenant Info:\n\
         - Name: {name}\n\
         - Unit: {unit}\n\
         - Lease: {lease_start} to {lease_end}\n\
         - Balance Due: {balance}\n\
         - Recent Requests: {recent}\n\n\
         Tenant Message:\n{body}\n\n\
         Reply (signed as Property Management):",
        name = tenant.name,
        unit = tenant.unit,
        lease_start = tenant.lease_start,
        lease_end = tenant.lease_end,
        balance = tenant.balance_due,
        body = email_body.trim(),
    )
}

pub(crate) fn classify_prompt(subject: &str, email_body: &str) -> String {
    format!(
        "Classify the following email from a tenant and extract an action item in JSON format.\n\n\
         Email:\n\"\"\"{subject} {email_body}\"\"\"\n\n\
         Return only a JSON object with the following fields:\n\
         type, issue, location, priority"
    )
}

/// Fields read back from the classifier, `raw_type` still un-normalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ClassifiedFields {
    pub raw_type: String,
    pub issue: Option<String>,
    pub location: Option<String>,
    pub priority: Priority,
}

/// Strict parse: the whole (trimmed) completion must be one JSON object.
pub(crate) fn parse_classification(completion: &str) -> Result<ClassifiedFields, TriageError> {
    let value: Value = serde_json::from_str(completion.trim())?;
    let Value::Object(fields) = value else {
        return Err(TriageError::MalformedClassification(
            "expected a json object".to_string(),
        ));
    };

    let raw_type = match fields.get("type") {
        None => String::new(),
        Some(Value::String(s)) => s.to_lowercase(),
        Some(other) => {
            return Err(TriageError::MalformedClassification(format!(
                "type must be a string, got {other}"
            )));
        }
    };

    let priority = match fields.get("priority") {
        Some(Value::String(s)) => priority_label(s),
        _ => Priority::Normal,
    };

    Ok(ClassifiedFields {
        raw_type,
        issue: text_field(fields.get("issue")),
        location: text_field(fields.get("location")),
        priority,
    })
}

/// "high" or any urgency keyword the rule tier also treats as high.
fn priority_label(label: &str) -> Priority {
    let label = label.trim().to_lowercase();
    if label == "high" || URGENCY_KEYWORDS.iter().any(|kw| label.contains(kw)) {
        Priority::High
    } else {
        Priority::Normal
    }
}

fn text_field(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
