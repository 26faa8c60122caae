//! Scan result: the immutable handoff surface.
//!
//! A [`ScanResult`] is the only object the core hands to report
//! consumers (HTML/CSV/JSON/chat renderers live elsewhere). It carries
//! everything a renderer needs and is never mutated after assembly.

use crate::provider::ProviderError;
use chrono::{DateTime, Utc};
use costguard_core::{NormalizationError, ResourceId, ResourceRecord};
use costguard_graph::GraphAnomaly;
use costguard_policy::{ApprovalState, Disposition, DispositionAction, PolicyEvaluationError};
use costguard_recommend::Recommendation;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Any non-fatal error accumulated during a scan.
#[derive(Debug, Clone, PartialEq, thiserror::Error, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum ScanIssue {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Normalization(#[from] NormalizationError),

    #[error(transparent)]
    Graph(#[from] GraphAnomaly),

    #[error(transparent)]
    Policy(#[from] PolicyEvaluationError),
}

/// Per-provider contribution summary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderStats {
    pub resources: usize,
    pub monthly_cost: f64,
    pub errors: usize,
}

/// Immutable result of one governance scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanResult {
    pub scan_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,

    /// The merged, normalized batch.
    pub records: Vec<ResourceRecord>,

    /// Policy verdict per resource.
    pub dispositions: BTreeMap<ResourceId, Disposition>,

    /// Approval lifecycle snapshot for resources requiring review.
    pub approvals: BTreeMap<ResourceId, ApprovalState>,

    /// Ranked, actionable recommendations.
    pub recommendations: Vec<Recommendation>,

    /// Dependency-respecting execution order for the auto-approved set,
    /// leaves first.
    pub auto_delete_order: Vec<ResourceId>,

    /// Cycles and other structural anomalies found in the batch.
    pub anomalies: Vec<GraphAnomaly>,

    /// Every non-fatal error collected along the way.
    pub errors: Vec<ScanIssue>,

    /// Contribution summary per provider name.
    pub provider_stats: BTreeMap<String, ProviderStats>,
}

impl ScanResult {
    pub fn total_monthly_cost(&self) -> f64 {
        self.records.iter().map(|r| r.estimated_monthly_cost).sum()
    }

    pub fn total_annual_savings(&self) -> f64 {
        self.recommendations
            .iter()
            .map(|r| r.estimated_annual_savings)
            .sum()
    }

    /// Disposition tally by action, for summaries.
    pub fn disposition_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for d in self.dispositions.values() {
            let key = match d.action {
                DispositionAction::AutoApproveDelete => "auto_approve_delete",
                DispositionAction::RequireApproval => "require_approval",
                DispositionAction::Exempt => "exempt",
                DispositionAction::Keep => "keep",
            };
            *counts.entry(key.to_string()).or_insert(0) += 1;
        }
        counts
    }
}
