//! Rule model and rule-set loading.
//!
//! A rule set is an ordered list of declarative rules. Order is the sole
//! priority signal: evaluation walks the list top to bottom and the first
//! matching enabled rule wins. Loaders must preserve file order — serde
//! keeps YAML sequence order, so an unchanged file reloads identically.

use crate::error::PolicyError;
use crate::predicate::Predicate;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// What a matching rule asks for. `Keep` is not an action a rule can
/// request; it is the engine's default when nothing matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleAction {
    /// Deletion may proceed without human review (subject to the graph
    /// safety override).
    AutoApproveDelete,
    /// Deletion requires a human decision.
    RequireApproval,
    /// Operator override: never touch this resource, even when the graph
    /// flags it.
    Exempt,
}

/// One governance rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    /// Stable identifier, referenced by dispositions and audit output.
    pub id: String,

    #[serde(default)]
    pub description: String,

    /// Condition over the resource record.
    pub when: Predicate,

    pub action: RuleAction,

    /// Disabled rules stay in the file but never match.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

/// Ordered rule set, as loaded from a YAML rule file:
///
/// ```yaml
/// rules:
///   - id: old-disks
///     description: Unattached disks older than 90 days
///     when:
///       all:
///         - resource_type_in: [disk]
///         - age_days_at_least: 90
///     action: auto_approve_delete
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuleSet {
    #[serde(default)]
    pub rules: Vec<Rule>,
}

impl RuleSet {
    /// Parse a rule set from YAML. A structurally unparseable document is
    /// fatal — no resource could be classified against it.
    pub fn from_yaml(contents: &str) -> Result<Self, PolicyError> {
        serde_yaml::from_str(contents).map_err(|e| PolicyError::InvalidRuleSet(e.to_string()))
    }

    /// Load a rule set from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, PolicyError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| PolicyError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml(&contents)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
