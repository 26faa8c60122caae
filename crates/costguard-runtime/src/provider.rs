//! Provider adapter interface.
//!
//! One adapter per provider (or per provider/resource-type pair). The
//! core treats adapters as opaque, possibly-slow, possibly-failing data
//! sources: they emit raw records and nothing else.

use async_trait::async_trait;
use costguard_core::{CloudProvider, RawResourceRecord};
use serde::{Deserialize, Serialize};

/// Resource types a scan is interested in. Empty matches everything.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResourceTypeFilter {
    pub types: Vec<String>,
}

impl ResourceTypeFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn of(types: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            types: types.into_iter().map(Into::into).collect(),
        }
    }

    pub fn matches(&self, resource_type: &str) -> bool {
        self.types.is_empty() || self.types.iter().any(|t| t == resource_type)
    }
}

/// Per-provider failure. Non-fatal to the scan: the provider contributes
/// an empty record set and the error is collected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProviderError {
    #[error("provider '{provider}' authentication failed: {message}")]
    Auth {
        provider: CloudProvider,
        message: String,
    },

    #[error("provider '{provider}' timed out after {seconds}s")]
    Timeout {
        provider: CloudProvider,
        seconds: u64,
    },

    #[error("provider '{provider}' transport failure: {message}")]
    Transport {
        provider: CloudProvider,
        message: String,
    },

    #[error("provider '{provider}' failed: {message}")]
    Other {
        provider: CloudProvider,
        message: String,
    },
}

impl ProviderError {
    pub fn provider(&self) -> &CloudProvider {
        match self {
            ProviderError::Auth { provider, .. }
            | ProviderError::Timeout { provider, .. }
            | ProviderError::Transport { provider, .. }
            | ProviderError::Other { provider, .. } => provider,
        }
    }
}

/// A source of raw inventory records for one provider.
#[async_trait]
pub trait ResourceProvider: Send + Sync {
    /// The provider this adapter speaks for.
    fn provider(&self) -> CloudProvider;

    /// List resources, optionally restricted by type.
    async fn list_resources(
        &self,
        filter: &ResourceTypeFilter,
    ) -> Result<Vec<RawResourceRecord>, ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_filter_matches_everything() {
        let f = ResourceTypeFilter::all();
        assert!(f.matches("disk"));
        assert!(f.matches("anything"));
    }

    #[test]
    fn filter_restricts_to_listed_types() {
        let f = ResourceTypeFilter::of(["disk", "snapshot"]);
        assert!(f.matches("disk"));
        assert!(!f.matches("vm"));
    }
}
