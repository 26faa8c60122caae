//! Numeric signal service interface.
//!
//! Anomaly scoring and cost forecasting are external, possibly-absent
//! collaborators. The core consumes their outputs as annotations only;
//! their absence must never block recommendation generation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use costguard_core::{ResourceId, ResourceRecord};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Anomaly score for one resource, higher meaning more anomalous.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyScore {
    pub score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// One forecasted point of a cost series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub date: DateTime<Utc>,
    pub estimate: f64,
    /// Lower bound of the confidence interval.
    pub lower: f64,
    /// Upper bound of the confidence interval.
    pub upper: f64,
}

/// External numeric service consumed by the recommendation step.
#[async_trait]
pub trait SignalService: Send + Sync {
    /// Score each record for anomalous cost behavior. Ids absent from the
    /// returned map simply carry no annotation.
    async fn score_anomalies(
        &self,
        records: &[ResourceRecord],
    ) -> anyhow::Result<HashMap<ResourceId, AnomalyScore>>;

    /// Forecast a cost series `horizon_days` into the future.
    async fn forecast_cost(
        &self,
        series: &[(DateTime<Utc>, f64)],
        horizon_days: u32,
    ) -> anyhow::Result<Vec<ForecastPoint>>;
}

/// Signals collected for one scan, keyed by resource id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanSignals {
    #[serde(default)]
    pub anomalies: HashMap<ResourceId, AnomalyScore>,
    #[serde(default)]
    pub forecasts: HashMap<ResourceId, Vec<ForecastPoint>>,
}

impl ScanSignals {
    pub fn is_empty(&self) -> bool {
        self.anomalies.is_empty() && self.forecasts.is_empty()
    }
}
