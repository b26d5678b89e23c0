//! Append-only JSON array file of action items.

use domos_triage::ActionItem;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("serialize action item: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// The whole file is rewritten on every append. Not safe for concurrent writers.
#[derive(Debug, Clone)]
pub struct ActionItemStore {
    path: PathBuf,
}

impl ActionItemStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    #[tracing::instrument(level = "debug", skip_all, fields(path = %self.path.display()))]
    pub async fn append(&self, item: &ActionItem) -> Result<usize> {
        let mut records = self.read_array().await?;
        records.push(serde_json::to_value(item)?);
        let count = records.len();

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| self.io_error(source))?;
        }
        let text = serde_json::to_string_pretty(&serde_json::Value::Array(records))?;
        tokio::fs::write(&self.path, text)
            .await
            .map_err(|source| self.io_error(source))?;

        tracing::debug!(records = count, "action item appended");
        Ok(count)
    }

    /// Entries that no longer deserialize as an action item are skipped.
    pub async fn load(&self) -> Result<Vec<ActionItem>> {
        let records = self.read_array().await?;
        let mut items = Vec::with_capacity(records.len());
        for (index, value) in records.into_iter().enumerate() {
            match serde_json::from_value::<ActionItem>(value) {
                Ok(item) => items.push(item),
                Err(e) => tracing::warn!(index, error = %e, "skipping unreadable action item"),
            }
        }
        Ok(items)
    }

    async fn read_array(&self) -> Result<Vec<serde_json::Value>> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => return Err(self.io_error(source)),
        };
        // from_slice also rejects invalid UTF-8, which lands in the reset branch below.
        match serde_json::from_slice::<serde_json::Value>(&bytes) {
            Ok(serde_json::Value::Array(records)) => Ok(records),
            Ok(_) => {
                tracing::warn!(path = %self.path.display(), "action item file is not a JSON array; starting fresh");
                Ok(Vec::new())
            }
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "action item file is not valid JSON; starting fresh");
                Ok(Vec::new())
            }
        }
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}
