//! Provider inventory source configuration.

use serde::{Deserialize, Serialize};

/// One provider inventory source.
///
/// The runtime maps each entry to an adapter; the file adapter reads raw
/// records from `inventory`, cloud adapters ignore it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Provider name ("azure", "aws", "gcp", or a custom name).
    pub provider: String,

    /// Inventory file path for the file adapter.
    #[serde(default)]
    pub inventory: Option<String>,

    /// Whether this provider participates in scans.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}
