//! Tenant directories available to the binary.

use domos_triage::{InMemoryTenantDirectory, TenantRecord};
use std::collections::HashMap;
use std::path::Path;

fn record(
    name: &str,
    unit: &str,
    balance_due: &str,
    lease: (&str, &str),
    recent_requests: &[&str],
) -> TenantRecord {
    TenantRecord {
        name: name.to_string(),
        unit: unit.to_string(),
        balance_due: balance_due.to_string(),
        lease_start: lease.0.to_string(),
        lease_end: lease.1.to_string(),
        recent_requests: recent_requests.iter().map(|r| r.to_string()).collect(),
    }
}

/// Built-in tenants used when no tenants file is configured.
pub fn sample_directory() -> InMemoryTenantDirectory {
    InMemoryTenantDirectory::from_records([
        (
            "schaudhry216@gmail.com",
            record(
                "Shane Chaudhry",
                "2A",
                "$0",
                ("2024-05-01", "2025-04-30"),
                &["AC repair in April", "Plumbing issue in March"],
            ),
        ),
        (
            "janedoe@example.com",
            record("Jane Doe", "3B", "$150", ("2023-10-01", "2024-09-30"), &[]),
        ),
        (
            "david.smith@renters.net",
            record(
                "David Smith",
                "1C",
                "$75",
                ("2024-01-15", "2024-12-31"),
                &["Broken heater in January"],
            ),
        ),
        (
            "maria.lopez@samplemail.com",
            record(
                "Maria Lopez",
                "4D",
                "$0",
                ("2023-08-01", "2024-07-31"),
                &["Light fixture flickering", "Window jammed in February"],
            ),
        ),
    ])
}

/// Reads a JSON object mapping address to tenant record.
pub async fn load_directory(path: &Path) -> anyhow::Result<InMemoryTenantDirectory> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| anyhow::anyhow!("read tenants file {}: {e}", path.display()))?;
    let records: HashMap<String, TenantRecord> = serde_json::from_str(&text)
        .map_err(|e| anyhow::anyhow!("parse tenants file {}: {e}", path.display()))?;
    tracing::info!(path = %path.display(), tenants = records.len(), "tenant directory loaded");
    Ok(InMemoryTenantDirectory::from_records(records))
}
