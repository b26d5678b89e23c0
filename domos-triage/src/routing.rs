//! Stakeholder routing and classifier-label normalization tables.

use crate::action_item::ActionType;

/// Copied on every reply whose type has no dedicated stakeholder.
pub const DEFAULT_CC: &str = "ops@propertymanager.com";

/// Raw classifier label fragment to canonical type. Scanned top to bottom and the first
/// fragment contained in the label wins, so the order here is part of the behavior.
pub const TYPE_NORMALIZATION: &[(&str, ActionType)] = &[
    ("maintenance", ActionType::MaintenanceRequest),
    ("maintenance_request", ActionType::MaintenanceRequest),
    ("hvac", ActionType::MaintenanceRequest),
    ("plumbing", ActionType::MaintenanceRequest),
    ("leak", ActionType::MaintenanceRequest),
    ("payment", ActionType::PaymentInquiry),
    ("rent", ActionType::PaymentInquiry),
    ("invoice", ActionType::PaymentInquiry),
    ("lease", ActionType::LeaseInfoRequest),
    ("contract", ActionType::LeaseInfoRequest),
    ("lockout", ActionType::AccessIssue),
    ("locked out", ActionType::AccessIssue),
    ("access", ActionType::AccessIssue),
    ("callback", ActionType::CallbackRequest),
    ("call me", ActionType::CallbackRequest),
    ("pest", ActionType::PestIssue),
    ("infestation", ActionType::PestIssue),
    ("maintenance + payment", ActionType::MaintenanceAndPaymentDispute),
];

/// Map a free-text label from the model onto the canonical enumeration.
pub fn normalize_type(raw: &str) -> ActionType {
    let raw = raw.to_lowercase();
    TYPE_NORMALIZATION
        .iter()
        .find(|(fragment, _)| raw.contains(fragment))
        .map(|(_, action_type)| *action_type)
        .unwrap_or(ActionType::Other)
}

/// Dedicated stakeholder for a canonical type; `None` for [`ActionType::Other`].
pub fn stakeholder_for(action_type: ActionType) -> Option<&'static str> {
    match action_type {
        ActionType::MaintenanceRequest => Some("maintenance@propertymanager.com"),
        ActionType::PestIssue => Some("maintenance@propertymanager.com"),
        ActionType::PaymentInquiry => Some("accounting@propertymanager.com"),
        ActionType::LeaseInfoRequest => Some("leasing@propertymanager.com"),
        ActionType::AccessIssue => Some("security@propertymanager.com"),
        ActionType::CallbackRequest => Some("support@propertymanager.com"),
        ActionType::MaintenanceAndPaymentDispute => Some("ops@propertymanager.com"),
        ActionType::Other => None,
    }
}

/// CC address for an action item type.
pub fn route(action_type: Option<ActionType>) -> &'static str {
    action_type.and_then(stakeholder_for).unwrap_or(DEFAULT_CC)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_canonical_type_has_a_stakeholder() {
        for action_type in ActionType::ALL {
            if action_type == ActionType::Other {
                continue;
            }
            let address = stakeholder_for(action_type)
                .unwrap_or_else(|| panic!("{action_type} has no stakeholder"));
            assert_eq!(route(Some(action_type)), address);
        }
    }

    #[test]
    fn other_and_missing_fall_back_to_operations() {
        assert_eq!(route(None), DEFAULT_CC);
        assert_eq!(route(Some(ActionType::Other)), DEFAULT_CC);
    }

    #[test]
    fn routes_match_the_stakeholder_table() {
        assert_eq!(route(Some(ActionType::AccessIssue)), "security@propertymanager.com");
        assert_eq!(route(Some(ActionType::MaintenanceRequest)), "maintenance@propertymanager.com");
        assert_eq!(route(Some(ActionType::PestIssue)), "maintenance@propertymanager.com");
        assert_eq!(route(Some(ActionType::PaymentInquiry)), "accounting@propertymanager.com");
        assert_eq!(route(Some(ActionType::LeaseInfoRequest)), "leasing@propertymanager.com");
        assert_eq!(route(Some(ActionType::CallbackRequest)), "support@propertymanager.com");
        assert_eq!(
            route(Some(ActionType::MaintenanceAndPaymentDispute)),
            "ops@propertymanager.com"
        );
    }

    #[test]
    fn normalization_is_case_insensitive_substring_match() {
        assert_eq!(normalize_type("Lockout"), ActionType::AccessIssue);
        assert_eq!(normalize_type("tenant LOCKED OUT"), ActionType::AccessIssue);
        assert_eq!(normalize_type("HVAC repair"), ActionType::MaintenanceRequest);
        assert_eq!(normalize_type("Pest_Issue"), ActionType::PestIssue);
        assert_eq!(normalize_type("callback_request"), ActionType::CallbackRequest);
        assert_eq!(normalize_type("lease_info_request"), ActionType::LeaseInfoRequest);
    }

    #[test]
    fn earlier_fragments_win_over_later_ones() {
        // "rent" sits above "lease" in the table.
        assert_eq!(normalize_type("lease rent question"), ActionType::PaymentInquiry);
        assert_eq!(normalize_type("maintenance and lease"), ActionType::MaintenanceRequest);
        // "maintenance" shadows the combined label entirely.
        assert_eq!(
            normalize_type("maintenance_and_payment_dispute"),
            ActionType::MaintenanceRequest
        );
    }

    #[test]
    fn unmatched_labels_become_other() {
        assert_eq!(normalize_type(""), ActionType::Other);
        assert_eq!(normalize_type("noise complaint"), ActionType::Other);
        assert_eq!(normalize_type("other"), ActionType::Other);
    }
}
