//! The governance orchestrator.
//!
//! Runs one scan end to end: fan out provider adapters, normalize and
//! merge, build the dependency graph, evaluate policy, seed approvals,
//! consult the optional signal service, aggregate recommendations, and
//! assemble the [`ScanResult`].
//!
//! The merge before graph construction is a hard barrier: safety
//! analysis needs the complete cross-provider batch. Everything after
//! the barrier reads shared, already-built state and mutates nothing
//! except the approval ledger seeds.

use crate::provider::{ProviderError, ResourceProvider, ResourceTypeFilter};
use crate::scan::{ProviderStats, ScanIssue, ScanResult};
use costguard_core::{ResourceId, ResourceRecord, normalize};
use costguard_graph::DependencyGraph;
use costguard_policy::{ApprovalLedger, DispositionAction, PolicyEngine};
use costguard_recommend::{RecommendationAggregator, ScanSignals, SignalService};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Top-level driver for governance scans.
pub struct GovernanceOrchestrator {
    providers: Vec<Arc<dyn ResourceProvider>>,
    engine: Arc<PolicyEngine>,
    ledger: Arc<ApprovalLedger>,
    aggregator: RecommendationAggregator,
    signals: Option<Arc<dyn SignalService>>,
    filter: ResourceTypeFilter,
    provider_timeout: Duration,
}

impl GovernanceOrchestrator {
    pub fn new(engine: Arc<PolicyEngine>, ledger: Arc<ApprovalLedger>) -> Self {
        Self {
            providers: Vec::new(),
            engine,
            ledger,
            aggregator: RecommendationAggregator::new(),
            signals: None,
            filter: ResourceTypeFilter::all(),
            provider_timeout: Duration::from_secs(60),
        }
    }

    pub fn with_provider(mut self, provider: Arc<dyn ResourceProvider>) -> Self {
        self.providers.push(provider);
        self
    }

    pub fn with_signals(mut self, signals: Arc<dyn SignalService>) -> Self {
        self.signals = Some(signals);
        self
    }

    pub fn with_filter(mut self, filter: ResourceTypeFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_provider_timeout(mut self, timeout: Duration) -> Self {
        self.provider_timeout = timeout;
        self
    }

    pub fn with_aggregator(mut self, aggregator: RecommendationAggregator) -> Self {
        self.aggregator = aggregator;
        self
    }

    /// The shared approval ledger, for the external approval surface.
    pub fn ledger(&self) -> Arc<ApprovalLedger> {
        Arc::clone(&self.ledger)
    }

    /// Run one full scan. Never aborts: every failure short of a broken
    /// rule set (rejected at engine construction, before this point)
    /// degrades into the result's error list.
    pub async fn run_scan(&self) -> ScanResult {
        let scan_id = Uuid::new_v4();
        let started_at = chrono::Utc::now();
        let mut errors: Vec<ScanIssue> = Vec::new();
        let mut provider_stats: BTreeMap<String, ProviderStats> = BTreeMap::new();

        tracing::info!(%scan_id, providers = self.providers.len(), "Starting governance scan");

        // Malformed rules were disabled at engine construction; surface
        // them in every scan result so operators see them.
        for rejected in self.engine.rejected_rules() {
            errors.push(ScanIssue::Policy(rejected.clone()));
        }

        // Fan out: one task per provider, each bounded by the timeout.
        let mut names = Vec::new();
        let mut handles = Vec::new();
        for adapter in &self.providers {
            let adapter = Arc::clone(adapter);
            let filter = self.filter.clone();
            let timeout = self.provider_timeout;
            names.push(adapter.provider());
            handles.push(tokio::spawn(async move {
                match tokio::time::timeout(timeout, adapter.list_resources(&filter)).await {
                    Ok(result) => result,
                    Err(_) => Err(ProviderError::Timeout {
                        provider: adapter.provider(),
                        seconds: timeout.as_secs(),
                    }),
                }
            }));
        }

        // Barrier: collect and merge every provider's contribution before
        // the graph is built.
        let joined = futures::future::join_all(handles).await;
        let mut records: Vec<ResourceRecord> = Vec::new();
        let mut seen: BTreeSet<ResourceId> = BTreeSet::new();
        for (provider, joined_result) in names.into_iter().zip(joined) {
            let stats = provider_stats.entry(provider.to_string()).or_default();
            let raw = match joined_result {
                Ok(Ok(raw)) => raw,
                Ok(Err(err)) => {
                    tracing::warn!(provider = %provider, error = %err, "Provider degraded to empty contribution");
                    stats.errors += 1;
                    errors.push(ScanIssue::Provider(err));
                    continue;
                }
                Err(join_err) => {
                    stats.errors += 1;
                    errors.push(ScanIssue::Provider(ProviderError::Other {
                        provider: provider.clone(),
                        message: format!("provider task failed: {join_err}"),
                    }));
                    continue;
                }
            };

            let (normalized, norm_errors) = normalize(&raw, started_at, Some(&provider));
            stats.errors += norm_errors.len();
            errors.extend(norm_errors.into_iter().map(ScanIssue::Normalization));

            for record in normalized {
                if !seen.insert(record.id.clone()) {
                    stats.errors += 1;
                    errors.push(ScanIssue::Normalization(
                        costguard_core::NormalizationError::DuplicateId {
                            id: record.id.to_string(),
                        },
                    ));
                    continue;
                }
                stats.resources += 1;
                stats.monthly_cost += record.estimated_monthly_cost;
                records.push(record);
            }
        }

        // One graph across the merged batch; cross-provider edges are
        // ordinary edges here.
        let graph = DependencyGraph::build(&records);
        errors.extend(graph.anomalies().iter().cloned().map(ScanIssue::Graph));

        let mut dispositions = BTreeMap::new();
        let mut safeties = BTreeMap::new();
        let mut auto_approved: BTreeSet<ResourceId> = BTreeSet::new();

        for record in &records {
            let safety = graph.safety(&record.id);
            let disposition = self.engine.evaluate(record, &safety);

            match disposition.action {
                DispositionAction::RequireApproval => {
                    self.ledger.propose(record.id.clone());
                }
                DispositionAction::AutoApproveDelete => {
                    auto_approved.insert(record.id.clone());
                }
                _ => {}
            }

            safeties.insert(record.id.clone(), safety);
            dispositions.insert(record.id.clone(), disposition);
        }

        let auto_delete_order = graph.deletion_order(&auto_approved);

        // Optional numeric signals; unavailability degrades to no
        // annotations.
        let signals = match &self.signals {
            Some(service) => match service.score_anomalies(&records).await {
                Ok(anomalies) => Some(ScanSignals {
                    anomalies,
                    forecasts: Default::default(),
                }),
                Err(err) => {
                    tracing::warn!(error = %err, "Signal service unavailable, continuing without annotations");
                    None
                }
            },
            None => None,
        };

        let recommendations =
            self.aggregator
                .aggregate(&records, &dispositions, &safeties, signals.as_ref());

        // Approval snapshot restricted to this batch.
        let approvals = self
            .ledger
            .snapshot()
            .into_iter()
            .filter(|(id, _)| seen.contains(id))
            .collect();

        let finished_at = chrono::Utc::now();
        tracing::info!(
            %scan_id,
            records = records.len(),
            recommendations = recommendations.len(),
            errors = errors.len(),
            "Scan complete"
        );

        ScanResult {
            scan_id,
            started_at,
            finished_at,
            records,
            dispositions,
            approvals,
            recommendations,
            auto_delete_order,
            anomalies: graph.anomalies().to_vec(),
            errors,
            provider_stats,
        }
    }
}
