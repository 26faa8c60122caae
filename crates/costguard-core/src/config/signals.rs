//! Numeric signal service configuration.

use serde::{Deserialize, Serialize};

/// Whether to consult the external anomaly/forecast service during scans.
///
/// The service is optional; scans degrade gracefully when it is disabled
/// or unreachable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalsConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Forecast horizon in days, when forecasting is requested.
    #[serde(default = "default_horizon_days")]
    pub horizon_days: u32,
}

impl Default for SignalsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            horizon_days: default_horizon_days(),
        }
    }
}

fn default_horizon_days() -> u32 {
    30
}
