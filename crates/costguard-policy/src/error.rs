//! Error types for policy evaluation and approval transitions.

use crate::approval::ApprovalStatus;
use costguard_core::ResourceId;

/// Fatal policy errors.
///
/// The only scan-aborting condition in the whole core: a rule set that
/// cannot be parsed at all means no resource could be classified.
#[derive(Debug, thiserror::Error)]
pub enum PolicyError {
    #[error("invalid rule set: {0}")]
    InvalidRuleSet(String),

    #[error("failed to read rule file '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// A malformed rule. Fatal to that rule only: the rule is disabled, the
/// error is collected for operator attention, and evaluation proceeds —
/// records only this rule would have matched fall through to `Keep`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, serde::Serialize, serde::Deserialize)]
#[error("rule '{rule_id}' is malformed and was disabled: {message}")]
pub struct PolicyEvaluationError {
    pub rule_id: String,
    pub message: String,
}

/// Errors from the approval transition API.
///
/// An invalid transition leaves the stored state unchanged.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApprovalError {
    #[error("no approval state for resource '{0}'")]
    NotFound(ResourceId),

    #[error("invalid transition for resource '{resource_id}': {from:?} -> {attempted:?}")]
    InvalidTransition {
        resource_id: ResourceId,
        from: ApprovalStatus,
        attempted: ApprovalStatus,
    },
}
