//! File-backed inventory adapter.
//!
//! Reads raw provider records from a JSON file — the same shape a cloud
//! adapter would emit from live API calls. Used for demos, fixtures, and
//! integration tests, and as the reference implementation of the
//! [`ResourceProvider`] contract.
//!
//! The inventory file is a JSON array of raw records:
//!
//! ```json
//! [
//!   {
//!     "native_id": "disk-001",
//!     "resource_type": "disk",
//!     "region": "eastus",
//!     "estimated_monthly_cost": 12.5,
//!     "created_at": "2024-01-01T00:00:00Z",
//!     "status": "unattached"
//!   }
//! ]
//! ```

use async_trait::async_trait;
use costguard_core::{CloudProvider, RawResourceRecord};
use costguard_runtime::{ProviderError, ResourceProvider, ResourceTypeFilter};
use std::path::PathBuf;

/// Serves one provider's inventory from a JSON file.
pub struct FileInventoryProvider {
    provider: CloudProvider,
    path: PathBuf,
}

impl FileInventoryProvider {
    pub fn new(provider: CloudProvider, path: impl Into<PathBuf>) -> Self {
        Self {
            provider,
            path: path.into(),
        }
    }
}

#[async_trait]
impl ResourceProvider for FileInventoryProvider {
    fn provider(&self) -> CloudProvider {
        self.provider.clone()
    }

    async fn list_resources(
        &self,
        filter: &ResourceTypeFilter,
    ) -> Result<Vec<RawResourceRecord>, ProviderError> {
        let contents =
            tokio::fs::read_to_string(&self.path)
                .await
                .map_err(|e| ProviderError::Transport {
                    provider: self.provider.clone(),
                    message: format!("failed to read '{}': {e}", self.path.display()),
                })?;

        let records: Vec<RawResourceRecord> =
            serde_json::from_str(&contents).map_err(|e| ProviderError::Other {
                provider: self.provider.clone(),
                message: format!("invalid inventory '{}': {e}", self.path.display()),
            })?;

        let total = records.len();
        let filtered: Vec<RawResourceRecord> = records
            .into_iter()
            .filter(|r| {
                r.resource_type
                    .as_deref()
                    .is_none_or(|t| filter.matches(t))
            })
            .collect();

        tracing::debug!(
            provider = %self.provider,
            path = %self.path.display(),
            total,
            matched = filtered.len(),
            "Loaded inventory"
        );

        Ok(filtered)
    }
}
