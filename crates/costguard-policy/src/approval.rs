//! Approval lifecycle for resources requiring human review.
//!
//! When the policy engine assigns `RequireApproval`, the resource enters
//! this lifecycle:
//!
//! ```text
//! Proposed → PendingApproval → Approved → Executed
//!                │                │
//!                ├→ Rejected      └→ Cancelled
//!                └→ Cancelled
//! ```
//!
//! `Executed`, `Rejected`, and `Cancelled` are terminal and immutable.
//! Every transition is validated against the current state; an illegal
//! transition is rejected with [`ApprovalError::InvalidTransition`] and
//! leaves the stored state untouched. Transitions are serialized per
//! resource id — unrelated resources' approvals never contend on a lock.

use crate::error::ApprovalError;
use chrono::{DateTime, Utc};
use costguard_core::ResourceId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, RwLock};

/// Lifecycle state of an approval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    /// Created by the policy engine, not yet routed for review.
    Proposed,
    /// Waiting for a human decision.
    PendingApproval,
    Approved,
    Rejected,
    Executed,
    Cancelled,
}

impl ApprovalStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ApprovalStatus::Rejected | ApprovalStatus::Executed | ApprovalStatus::Cancelled
        )
    }
}

/// Approval record for one resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalState {
    pub resource_id: ResourceId,
    pub status: ApprovalStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Who made the approve/reject decision, when one was made.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decided_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ApprovalState {
    fn new(resource_id: ResourceId) -> Self {
        let now = Utc::now();
        Self {
            resource_id,
            status: ApprovalStatus::Proposed,
            created_at: now,
            updated_at: now,
            decided_by: None,
            reason: None,
        }
    }
}

/// In-memory store of approval states with per-resource serialization.
///
/// The outer map is read-locked only long enough to fetch the per-id
/// entry; the transition itself runs under that entry's own mutex, so
/// concurrent approve/reject calls on the same resource serialize while
/// different resources proceed independently.
#[derive(Default)]
pub struct ApprovalLedger {
    entries: RwLock<HashMap<ResourceId, Arc<Mutex<ApprovalState>>>>,
}

impl ApprovalLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a `Proposed` entry for a resource. Idempotent: an existing
    /// entry (whatever its state) is returned unchanged.
    pub fn propose(&self, resource_id: ResourceId) -> ApprovalState {
        {
            let entries = self.entries.read().unwrap();
            if let Some(entry) = entries.get(&resource_id) {
                return entry.lock().unwrap().clone();
            }
        }

        let mut entries = self.entries.write().unwrap();
        let entry = entries
            .entry(resource_id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(ApprovalState::new(resource_id))));
        entry.lock().unwrap().clone()
    }

    /// Route a proposed item for human review.
    pub fn submit(&self, resource_id: &ResourceId) -> Result<ApprovalState, ApprovalError> {
        self.transition(resource_id, ApprovalStatus::PendingApproval, None, None)
    }

    /// Approve a pending item.
    pub fn approve(
        &self,
        resource_id: &ResourceId,
        actor: impl Into<String>,
    ) -> Result<ApprovalState, ApprovalError> {
        self.transition(resource_id, ApprovalStatus::Approved, Some(actor.into()), None)
    }

    /// Reject a pending item. Terminal.
    pub fn reject(
        &self,
        resource_id: &ResourceId,
        actor: impl Into<String>,
        reason: impl Into<String>,
    ) -> Result<ApprovalState, ApprovalError> {
        self.transition(
            resource_id,
            ApprovalStatus::Rejected,
            Some(actor.into()),
            Some(reason.into()),
        )
    }

    /// Execute an approved deletion. Terminal.
    pub fn execute(&self, resource_id: &ResourceId) -> Result<ApprovalState, ApprovalError> {
        self.transition(resource_id, ApprovalStatus::Executed, None, None)
    }

    /// Cancel from any non-terminal state. Terminal.
    pub fn cancel(&self, resource_id: &ResourceId) -> Result<ApprovalState, ApprovalError> {
        self.transition(resource_id, ApprovalStatus::Cancelled, None, None)
    }

    /// Current state for a resource.
    pub fn get(&self, resource_id: &ResourceId) -> Option<ApprovalState> {
        let entries = self.entries.read().unwrap();
        entries.get(resource_id).map(|e| e.lock().unwrap().clone())
    }

    /// Items waiting on a human decision.
    pub fn list_pending(&self) -> Vec<ApprovalState> {
        let entries = self.entries.read().unwrap();
        let mut pending: Vec<ApprovalState> = entries
            .values()
            .map(|e| e.lock().unwrap().clone())
            .filter(|s| s.status == ApprovalStatus::PendingApproval)
            .collect();
        pending.sort_by(|a, b| a.resource_id.cmp(&b.resource_id));
        pending
    }

    /// Snapshot of every entry, keyed by resource id.
    pub fn snapshot(&self) -> BTreeMap<ResourceId, ApprovalState> {
        let entries = self.entries.read().unwrap();
        entries
            .iter()
            .map(|(id, e)| (id.clone(), e.lock().unwrap().clone()))
            .collect()
    }

    fn transition(
        &self,
        resource_id: &ResourceId,
        to: ApprovalStatus,
        actor: Option<String>,
        reason: Option<String>,
    ) -> Result<ApprovalState, ApprovalError> {
        let entry = {
            let entries = self.entries.read().unwrap();
            entries
                .get(resource_id)
                .cloned()
                .ok_or_else(|| ApprovalError::NotFound(resource_id.clone()))?
        };

        let mut state = entry.lock().unwrap();
        if !is_legal(state.status, to) {
            return Err(ApprovalError::InvalidTransition {
                resource_id: resource_id.clone(),
                from: state.status,
                attempted: to,
            });
        }

        state.status = to;
        state.updated_at = Utc::now();
        if actor.is_some() {
            state.decided_by = actor;
        }
        if reason.is_some() {
            state.reason = reason;
        }

        tracing::info!(
            resource = %state.resource_id,
            status = ?state.status,
            decided_by = state.decided_by.as_deref().unwrap_or("-"),
            "Approval transition"
        );

        Ok(state.clone())
    }
}

fn is_legal(from: ApprovalStatus, to: ApprovalStatus) -> bool {
    use ApprovalStatus::*;
    matches!(
        (from, to),
        (Proposed, PendingApproval)
            | (PendingApproval, Approved)
            | (PendingApproval, Rejected)
            | (Approved, Executed)
            | (Proposed, Cancelled)
            | (PendingApproval, Cancelled)
            | (Approved, Cancelled)
    )
}
