use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::PathBuf;

use super::mobile::{NativeContact, NativeContactStore};

/// Native store backed by a JSON array of contact records.
///
/// A readable file counts as granted access; a missing one as denied.
#[derive(Debug, Clone)]
pub struct JsonContactStore {
    path: PathBuf,
}

impl JsonContactStore {
    /// Store reading from `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn status(&self) -> String {
        let status = if self.path.is_file() { "granted" } else { "denied" };
        status.to_string()
    }
}

#[async_trait]
impl NativeContactStore for JsonContactStore {
    async fn request_permission(&self) -> Result<String> {
        Ok(self.status())
    }

    async fn permission_status(&self) -> Result<String> {
        Ok(self.status())
    }

    async fn fetch_contacts(&self) -> Result<Vec<NativeContact>> {
        let data = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("Failed to read contacts file {}", self.path.display()))?;

        serde_json::from_str(&data)
            .with_context(|| format!("Failed to parse contacts file {}", self.path.display()))
    }
}
