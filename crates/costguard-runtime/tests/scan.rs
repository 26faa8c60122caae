//! End-to-end scan tests with mock providers.

use async_trait::async_trait;
use costguard_core::{CloudProvider, RawResourceRecord, ResourceId, ResourceRecord};
use costguard_policy::{ApprovalLedger, ApprovalStatus, DispositionAction, PolicyEngine};
use costguard_recommend::{AnomalyScore, SignalService};
use costguard_runtime::{
    GovernanceOrchestrator, ProviderError, ResourceProvider, ResourceTypeFilter, ScanIssue,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

struct StaticProvider {
    provider: CloudProvider,
    records: Vec<RawResourceRecord>,
}

#[async_trait]
impl ResourceProvider for StaticProvider {
    fn provider(&self) -> CloudProvider {
        self.provider.clone()
    }

    async fn list_resources(
        &self,
        filter: &ResourceTypeFilter,
    ) -> Result<Vec<RawResourceRecord>, ProviderError> {
        Ok(self
            .records
            .iter()
            .filter(|r| {
                r.resource_type
                    .as_deref()
                    .is_some_and(|t| filter.matches(t))
            })
            .cloned()
            .collect())
    }
}

struct FailingProvider {
    provider: CloudProvider,
}

#[async_trait]
impl ResourceProvider for FailingProvider {
    fn provider(&self) -> CloudProvider {
        self.provider.clone()
    }

    async fn list_resources(
        &self,
        _filter: &ResourceTypeFilter,
    ) -> Result<Vec<RawResourceRecord>, ProviderError> {
        Err(ProviderError::Auth {
            provider: self.provider.clone(),
            message: "credentials expired".to_string(),
        })
    }
}

struct SlowProvider {
    provider: CloudProvider,
}

#[async_trait]
impl ResourceProvider for SlowProvider {
    fn provider(&self) -> CloudProvider {
        self.provider.clone()
    }

    async fn list_resources(
        &self,
        _filter: &ResourceTypeFilter,
    ) -> Result<Vec<RawResourceRecord>, ProviderError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(Vec::new())
    }
}

struct FailingSignals;

#[async_trait]
impl SignalService for FailingSignals {
    async fn score_anomalies(
        &self,
        _records: &[ResourceRecord],
    ) -> anyhow::Result<HashMap<ResourceId, AnomalyScore>> {
        Err(anyhow::anyhow!("model endpoint unreachable"))
    }

    async fn forecast_cost(
        &self,
        _series: &[(chrono::DateTime<chrono::Utc>, f64)],
        _horizon_days: u32,
    ) -> anyhow::Result<Vec<costguard_recommend::ForecastPoint>> {
        Err(anyhow::anyhow!("model endpoint unreachable"))
    }
}

struct StaticSignals {
    anomalies: HashMap<ResourceId, AnomalyScore>,
}

#[async_trait]
impl SignalService for StaticSignals {
    async fn score_anomalies(
        &self,
        _records: &[ResourceRecord],
    ) -> anyhow::Result<HashMap<ResourceId, AnomalyScore>> {
        Ok(self.anomalies.clone())
    }

    async fn forecast_cost(
        &self,
        _series: &[(chrono::DateTime<chrono::Utc>, f64)],
        _horizon_days: u32,
    ) -> anyhow::Result<Vec<costguard_recommend::ForecastPoint>> {
        Ok(Vec::new())
    }
}

fn raw(native_id: &str, resource_type: &str, cost: f64) -> RawResourceRecord {
    RawResourceRecord {
        native_id: Some(native_id.to_string()),
        resource_type: Some(resource_type.to_string()),
        region: Some("eastus".to_string()),
        estimated_monthly_cost: Some(cost),
        created_at: Some("2020-01-01T00:00:00Z".to_string()),
        ..Default::default()
    }
}

fn engine(yaml: &str) -> Arc<PolicyEngine> {
    Arc::new(PolicyEngine::from_yaml(yaml).unwrap())
}

const OLD_DISK_RULE: &str = r#"
rules:
  - id: old-disks
    description: Disks older than 90 days
    when:
      all:
        - resource_type_in: [disk]
        - age_days_at_least: 90
    action: auto_approve_delete
"#;

fn orchestrator(rules: &str) -> GovernanceOrchestrator {
    GovernanceOrchestrator::new(engine(rules), Arc::new(ApprovalLedger::new()))
}

#[tokio::test]
async fn provider_failure_degrades_without_aborting() {
    let result = orchestrator(OLD_DISK_RULE)
        .with_provider(Arc::new(FailingProvider {
            provider: CloudProvider::Azure,
        }))
        .with_provider(Arc::new(StaticProvider {
            provider: CloudProvider::Aws,
            records: vec![
                raw("vol-1", "disk", 5.0),
                raw("vol-2", "disk", 6.0),
                raw("vol-3", "snapshot", 1.0),
            ],
        }))
        .run_scan()
        .await;

    assert_eq!(result.records.len(), 3);
    let provider_errors: Vec<_> = result
        .errors
        .iter()
        .filter(|e| matches!(e, ScanIssue::Provider(ProviderError::Auth { .. })))
        .collect();
    assert_eq!(provider_errors.len(), 1);

    assert_eq!(result.provider_stats["aws"].resources, 3);
    assert_eq!(result.provider_stats["azure"].resources, 0);
    assert_eq!(result.provider_stats["azure"].errors, 1);
}

#[tokio::test]
async fn dependent_disk_is_downgraded_to_require_approval() {
    // D1: disk, 120+ days old, $10/mo, no dependents of its own.
    // S1: snapshot depending on D1, $2/mo.
    let mut s1 = raw("S1", "snapshot", 2.0);
    s1.depends_on = vec!["D1".to_string()];

    let ledger = Arc::new(ApprovalLedger::new());
    let result = GovernanceOrchestrator::new(engine(OLD_DISK_RULE), Arc::clone(&ledger))
        .with_provider(Arc::new(StaticProvider {
            provider: CloudProvider::Azure,
            records: vec![raw("D1", "disk", 10.0), s1],
        }))
        .run_scan()
        .await;

    let d1 = ResourceId::new(CloudProvider::Azure, "D1");
    let s1 = ResourceId::new(CloudProvider::Azure, "S1");

    // The rule matched D1, but S1 depends on it: downgraded.
    let d1_disposition = &result.dispositions[&d1];
    assert_eq!(d1_disposition.action, DispositionAction::RequireApproval);
    assert!(d1_disposition.downgraded);

    // S1 matched nothing.
    assert_eq!(result.dispositions[&s1].action, DispositionAction::Keep);

    // The downgrade seeded an approval entry.
    assert_eq!(result.approvals[&d1].status, ApprovalStatus::Proposed);
    assert!(ledger.get(&d1).is_some());
    assert!(ledger.get(&s1).is_none());
}

#[tokio::test]
async fn slow_provider_times_out_as_provider_error() {
    let result = orchestrator(OLD_DISK_RULE)
        .with_provider_timeout(Duration::from_millis(50))
        .with_provider(Arc::new(SlowProvider {
            provider: CloudProvider::Gcp,
        }))
        .with_provider(Arc::new(StaticProvider {
            provider: CloudProvider::Aws,
            records: vec![raw("vol-1", "disk", 5.0)],
        }))
        .run_scan()
        .await;

    assert_eq!(result.records.len(), 1);
    assert!(result.errors.iter().any(|e| matches!(
        e,
        ScanIssue::Provider(ProviderError::Timeout { .. })
    )));
}

#[tokio::test]
async fn duplicate_ids_across_adapters_are_dropped_and_reported() {
    let result = orchestrator(OLD_DISK_RULE)
        .with_provider(Arc::new(StaticProvider {
            provider: CloudProvider::Aws,
            records: vec![raw("vol-1", "disk", 5.0)],
        }))
        .with_provider(Arc::new(StaticProvider {
            provider: CloudProvider::Aws,
            records: vec![raw("vol-1", "disk", 5.0)],
        }))
        .run_scan()
        .await;

    assert_eq!(result.records.len(), 1);
    assert!(result.errors.iter().any(|e| matches!(
        e,
        ScanIssue::Normalization(costguard_core::NormalizationError::DuplicateId { .. })
    )));

    // Uniqueness invariant holds on the merged batch.
    let mut ids: Vec<_> = result.records.iter().map(|r| r.id.clone()).collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), result.records.len());
}

#[tokio::test]
async fn cycle_members_are_never_auto_approved() {
    let mut a = raw("a", "disk", 5.0);
    a.depends_on = vec!["b".to_string()];
    let mut b = raw("b", "disk", 5.0);
    b.depends_on = vec!["a".to_string()];

    let result = orchestrator(OLD_DISK_RULE)
        .with_provider(Arc::new(StaticProvider {
            provider: CloudProvider::Azure,
            records: vec![a, b, raw("c", "disk", 5.0)],
        }))
        .run_scan()
        .await;

    assert_eq!(result.anomalies.len(), 1);
    assert!(result
        .errors
        .iter()
        .any(|e| matches!(e, ScanIssue::Graph(_))));

    for native in ["a", "b"] {
        let id = ResourceId::new(CloudProvider::Azure, native);
        assert_eq!(
            result.dispositions[&id].action,
            DispositionAction::RequireApproval
        );
    }

    // Only the acyclic disk is auto-approved and ordered for execution.
    let c = ResourceId::new(CloudProvider::Azure, "c");
    assert_eq!(result.dispositions[&c].action, DispositionAction::AutoApproveDelete);
    assert_eq!(result.auto_delete_order, vec![c]);
}

#[tokio::test]
async fn failing_signal_service_degrades_gracefully() {
    let result = orchestrator(OLD_DISK_RULE)
        .with_signals(Arc::new(FailingSignals))
        .with_provider(Arc::new(StaticProvider {
            provider: CloudProvider::Aws,
            records: vec![raw("vol-1", "disk", 5.0)],
        }))
        .run_scan()
        .await;

    assert_eq!(result.recommendations.len(), 1);
    assert!(result.recommendations[0].anomaly.is_none());
}

#[tokio::test]
async fn anomaly_scores_attach_to_recommendations() {
    let vol = ResourceId::new(CloudProvider::Aws, "vol-1");
    let mut anomalies = HashMap::new();
    anomalies.insert(
        vol.clone(),
        AnomalyScore {
            score: 0.88,
            description: None,
        },
    );

    let result = orchestrator(OLD_DISK_RULE)
        .with_signals(Arc::new(StaticSignals { anomalies }))
        .with_provider(Arc::new(StaticProvider {
            provider: CloudProvider::Aws,
            records: vec![raw("vol-1", "disk", 5.0)],
        }))
        .run_scan()
        .await;

    assert_eq!(
        result.recommendations[0].anomaly.as_ref().map(|a| a.score),
        Some(0.88)
    );
}

#[tokio::test]
async fn recommendations_rank_by_savings_and_order_respects_dependencies() {
    // lb -> vm -> disk chain, all auto-deletable by a catch-all rule.
    let mut vm = raw("vm-1", "vm", 30.0);
    vm.depends_on = vec!["disk-1".to_string()];
    let mut lb = raw("lb-1", "load_balancer", 3.0);
    lb.depends_on = vec!["vm-1".to_string()];

    let result = orchestrator(
        r#"
rules:
  - id: everything
    when:
      age_days_at_least: 0
    action: auto_approve_delete
"#,
    )
    .with_provider(Arc::new(StaticProvider {
        provider: CloudProvider::Azure,
        records: vec![raw("disk-1", "disk", 8.0), vm, lb],
    }))
    .run_scan()
    .await;

    // Only the leaf of the dependency relation is safe; the other two
    // have live dependents and get downgraded.
    let lb_id = ResourceId::new(CloudProvider::Azure, "lb-1");
    assert_eq!(
        result.dispositions[&lb_id].action,
        DispositionAction::AutoApproveDelete
    );
    assert_eq!(result.auto_delete_order, vec![lb_id]);

    // All three are actionable, ranked by annual savings.
    let order: Vec<&str> = result
        .recommendations
        .iter()
        .map(|r| r.resource_id.native_id.as_str())
        .collect();
    assert_eq!(order, vec!["vm-1", "disk-1", "lb-1"]);
    assert_eq!(result.recommendations[0].estimated_annual_savings, 360.0);
}

#[tokio::test]
async fn scan_with_no_providers_is_empty_but_valid() {
    let result = orchestrator(OLD_DISK_RULE).run_scan().await;
    assert!(result.records.is_empty());
    assert!(result.recommendations.is_empty());
    assert!(result.errors.is_empty());
    assert!(result.finished_at >= result.started_at);
}
