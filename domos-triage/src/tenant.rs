use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Marker used for every field of a tenant the directory does not know.
pub const UNKNOWN: &str = "Unknown";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantRecord {
    pub name: String,
    pub unit: String,
    pub balance_due: String,
    pub lease_start: String,
    pub lease_end: String,
    #[serde(default)]
    pub recent_requests: Vec<String>,
}

impl TenantRecord {
    pub fn unknown() -> Self {
        Self {
            name: UNKNOWN.to_string(),
            unit: UNKNOWN.to_string(),
            balance_due: UNKNOWN.to_string(),
            lease_start: UNKNOWN.to_string(),
            lease_end: UNKNOWN.to_string(),
            recent_requests: Vec::new(),
        }
    }

    pub fn is_unknown(&self) -> bool {
        *self == Self::unknown()
    }
}

/// Address to tenant lookup. Total: a miss yields [`TenantRecord::unknown`].
pub trait TenantDirectory: Send + Sync {
    fn lookup(&self, address: &str) -> TenantRecord;
}

/// Directory backed by a map held in memory. Addresses compare case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTenantDirectory {
    records: HashMap<String, TenantRecord>,
}

impl InMemoryTenantDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records<I, S>(records: I) -> Self
    where
        I: IntoIterator<Item = (S, TenantRecord)>,
        S: AsRef<str>,
    {
        let mut directory = Self::new();
        for (address, record) in records {
            directory.insert(address.as_ref(), record);
        }
        directory
    }

    pub fn insert(&mut self, address: &str, record: TenantRecord) {
        self.records.insert(normalize_address(address), record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl TenantDirectory for InMemoryTenantDirectory {
    fn lookup(&self, address: &str) -> TenantRecord {
        self.records
            .get(&normalize_address(address))
            .cloned()
            .unwrap_or_else(TenantRecord::unknown)
    }
}

fn normalize_address(address: &str) -> String {
    address.trim().to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jane() -> TenantRecord {
        TenantRecord {
            name: "Jane Doe".to_string(),
            unit: "3B".to_string(),
            balance_due: "$150".to_string(),
            lease_start: "2023-10-01".to_string(),
            lease_end: "2024-09-30".to_string(),
            recent_requests: Vec::new(),
        }
    }

    #[test]
    fn unknown_address_yields_sentinel_record() {
        let directory = InMemoryTenantDirectory::from_records([("janedoe@example.com", jane())]);
        let record = directory.lookup("nobody@example.com");

        assert!(record.is_unknown());
        assert_eq!(record.name, "Unknown");
        assert_eq!(record.unit, "Unknown");
        assert_eq!(record.balance_due, "Unknown");
        assert_eq!(record.lease_start, "Unknown");
        assert_eq!(record.lease_end, "Unknown");
        assert!(record.recent_requests.is_empty());
    }

    #[test]
    fn lookup_ignores_case_and_surrounding_whitespace() {
        let directory = InMemoryTenantDirectory::from_records([("JaneDoe@Example.com", jane())]);
        assert_eq!(directory.lookup(" janedoe@example.COM ").unit, "3B");
        assert_eq!(directory.len(), 1);
    }

    #[test]
    fn recent_requests_default_to_empty_when_deserializing() {
        let record: TenantRecord = serde_json::from_str(
            r#"{"name":"A","unit":"1","balance_due":"$0","lease_start":"x","lease_end":"y"}"#,
        )
        .expect("record parses");
        assert!(record.recent_requests.is_empty());
        assert!(!record.is_unknown());
    }
}
