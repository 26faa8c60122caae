//! Scan behavior configuration.

use serde::{Deserialize, Serialize};

/// Configuration for a governance scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Per-provider call timeout in seconds. A provider that exceeds it
    /// contributes a provider error instead of blocking the scan.
    #[serde(default = "default_provider_timeout_secs")]
    pub provider_timeout_secs: u64,

    /// Resource types to scan. Empty means all types.
    #[serde(default)]
    pub resource_types: Vec<String>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            provider_timeout_secs: default_provider_timeout_secs(),
            resource_types: Vec::new(),
        }
    }
}

fn default_provider_timeout_secs() -> u64 {
    60
}
