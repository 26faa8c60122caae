//! Policy verdicts.

use serde::{Deserialize, Serialize};

/// The engine's classification of a resource's deletion eligibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispositionAction {
    AutoApproveDelete,
    RequireApproval,
    Exempt,
    Keep,
}

impl DispositionAction {
    /// Dispositions that produce work: something may be deleted.
    pub fn is_actionable(&self) -> bool {
        matches!(
            self,
            DispositionAction::AutoApproveDelete | DispositionAction::RequireApproval
        )
    }
}

/// Per-resource policy verdict: the action, the rule that produced it, and
/// a human-readable justification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Disposition {
    pub action: DispositionAction,

    /// Id of the matching rule; absent for the default `Keep`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule_id: Option<String>,

    pub justification: String,

    /// The graph safety override forced this disposition down from an
    /// auto-approved delete.
    #[serde(default)]
    pub downgraded: bool,
}

impl Disposition {
    /// The default verdict when no rule matches.
    pub fn keep() -> Self {
        Self {
            action: DispositionAction::Keep,
            rule_id: None,
            justification: "no policy rule matched".to_string(),
            downgraded: false,
        }
    }
}
