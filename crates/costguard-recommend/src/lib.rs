//! Recommendation aggregation.
//!
//! Merges each resource's disposition, estimated cost, graph safety, and
//! optional numeric signals into a ranked list of actionable
//! recommendations. The numeric models themselves (anomaly scoring,
//! forecasting) live behind [`SignalService`] and are never re-implemented
//! here; a scan without signals produces the same recommendations minus
//! the annotations.

pub mod aggregate;
pub mod signals;

pub use aggregate::{EffortRating, EffortTable, Recommendation, RecommendationAggregator, RiskRating};
pub use signals::{AnomalyScore, ForecastPoint, ScanSignals, SignalService};
