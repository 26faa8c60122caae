//! Recommendation assembly and ranking.

use crate::signals::{AnomalyScore, ForecastPoint, ScanSignals};
use costguard_core::{CloudProvider, ResourceId, ResourceRecord};
use costguard_graph::SafetyVerdict;
use costguard_policy::{Disposition, DispositionAction};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How much work deleting a resource of a given type takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffortRating {
    Low,
    Medium,
    High,
}

/// How risky acting on the recommendation is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskRating {
    Low,
    Medium,
    High,
}

/// Effort lookup by resource type.
///
/// Stateless network artifacts release instantly; stateful storage needs a
/// verification pass; compute and databases need coordination. Unknown
/// types get the configurable default.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffortTable {
    entries: BTreeMap<String, EffortRating>,
    default: EffortRating,
}

impl Default for EffortTable {
    fn default() -> Self {
        let entries = [
            ("public_ip", EffortRating::Low),
            ("elastic_ip", EffortRating::Low),
            ("static_ip", EffortRating::Low),
            ("load_balancer", EffortRating::Low),
            ("nic", EffortRating::Low),
            ("snapshot", EffortRating::Low),
            ("ebs_snapshot", EffortRating::Low),
            ("disk", EffortRating::Medium),
            ("ebs_volume", EffortRating::Medium),
            ("storage_account", EffortRating::Medium),
            ("bucket", EffortRating::Medium),
            ("vm", EffortRating::High),
            ("instance", EffortRating::High),
            ("database", EffortRating::High),
            ("rds_instance", EffortRating::High),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

        Self {
            entries,
            default: EffortRating::Medium,
        }
    }
}

impl EffortTable {
    pub fn rating(&self, resource_type: &str) -> EffortRating {
        self.entries
            .get(resource_type)
            .copied()
            .unwrap_or(self.default)
    }

    /// Add or replace an entry.
    pub fn with_entry(mut self, resource_type: impl Into<String>, rating: EffortRating) -> Self {
        self.entries.insert(resource_type.into(), rating);
        self
    }
}

/// One actionable recommendation. Immutable once emitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub resource_id: ResourceId,
    pub resource_name: String,
    pub provider: CloudProvider,
    pub resource_type: String,

    pub action: DispositionAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule_id: Option<String>,
    pub justification: String,

    pub estimated_monthly_savings: f64,
    pub estimated_annual_savings: f64,
    pub effort: EffortRating,
    pub risk: RiskRating,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anomaly: Option<AnomalyScore>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forecast: Option<Vec<ForecastPoint>>,
}

/// Builds the ranked recommendation list for one scan.
#[derive(Debug, Clone, Default)]
pub struct RecommendationAggregator {
    effort: EffortTable,
}

impl RecommendationAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_effort_table(effort: EffortTable) -> Self {
        Self { effort }
    }

    /// Merge dispositions, costs, graph safety, and optional signals into
    /// ranked recommendations.
    ///
    /// Only actionable dispositions (`AutoApproveDelete`,
    /// `RequireApproval`) are emitted. Output is sorted by descending
    /// estimated annual savings, ties broken by ascending resource id.
    pub fn aggregate(
        &self,
        records: &[ResourceRecord],
        dispositions: &BTreeMap<ResourceId, Disposition>,
        safeties: &BTreeMap<ResourceId, SafetyVerdict>,
        signals: Option<&ScanSignals>,
    ) -> Vec<Recommendation> {
        let mut recommendations = Vec::new();

        for record in records {
            let Some(disposition) = dispositions.get(&record.id) else {
                continue;
            };
            if !disposition.action.is_actionable() {
                continue;
            }

            let risk = risk_rating(disposition, safeties.get(&record.id));
            let monthly = record.estimated_monthly_cost;

            recommendations.push(Recommendation {
                resource_id: record.id.clone(),
                resource_name: record.name.clone(),
                provider: record.provider.clone(),
                resource_type: record.resource_type.clone(),
                action: disposition.action,
                rule_id: disposition.rule_id.clone(),
                justification: disposition.justification.clone(),
                estimated_monthly_savings: monthly,
                estimated_annual_savings: monthly * 12.0,
                effort: self.effort.rating(&record.resource_type),
                risk,
                anomaly: signals.and_then(|s| s.anomalies.get(&record.id).cloned()),
                forecast: signals.and_then(|s| s.forecasts.get(&record.id).cloned()),
            });
        }

        recommendations.sort_by(|a, b| {
            b.estimated_annual_savings
                .total_cmp(&a.estimated_annual_savings)
                .then_with(|| a.resource_id.cmp(&b.resource_id))
        });

        tracing::debug!(
            records = records.len(),
            recommendations = recommendations.len(),
            "Aggregated recommendations"
        );

        recommendations
    }
}

/// Unsafe or cyclic resources are high risk regardless of cost; anything
/// routed to a human is at least medium.
fn risk_rating(disposition: &Disposition, safety: Option<&SafetyVerdict>) -> RiskRating {
    if let Some(safety) = safety {
        if !safety.safe || safety.in_cycle {
            return RiskRating::High;
        }
    }
    match disposition.action {
        DispositionAction::RequireApproval => RiskRating::Medium,
        _ => RiskRating::Low,
    }
}
