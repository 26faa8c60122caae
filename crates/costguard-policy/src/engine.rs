//! Policy evaluation engine.
//!
//! `evaluate` is a pure function of `(record, safety verdict)`: no I/O, no
//! shared mutable state, identical inputs always produce the identical
//! disposition. Evaluation may therefore run concurrently across records
//! against the same engine.

use crate::disposition::{Disposition, DispositionAction};
use crate::error::{PolicyError, PolicyEvaluationError};
use crate::rules::{Rule, RuleAction, RuleSet};
use costguard_core::ResourceRecord;
use costguard_graph::SafetyVerdict;
use regex::Regex;
use std::collections::HashMap;

/// Evaluates an ordered rule set against resource records.
pub struct PolicyEngine {
    /// Enabled, well-formed rules in priority order.
    rules: Vec<Rule>,
    /// Compiled `tag_matches` patterns, keyed by pattern source.
    patterns: HashMap<String, Regex>,
    /// Rules disabled at construction because they were malformed.
    rejected: Vec<PolicyEvaluationError>,
}

impl PolicyEngine {
    /// Build an engine from a rule set.
    ///
    /// Every `tag_matches` pattern is compiled here. A rule whose pattern
    /// fails to compile is malformed — fatal to that rule only: it is
    /// dropped, logged, and reported via [`rejected_rules`]. Records only
    /// that rule would have matched fall through to `Keep`.
    ///
    /// [`rejected_rules`]: PolicyEngine::rejected_rules
    pub fn new(rule_set: RuleSet) -> Self {
        let mut rules = Vec::new();
        let mut patterns = HashMap::new();
        let mut rejected = Vec::new();

        for rule in rule_set.rules {
            if !rule.enabled {
                continue;
            }

            let mut rule_patterns = Vec::new();
            rule.when.patterns(&mut rule_patterns);

            let mut malformed = None;
            for pattern in &rule_patterns {
                if patterns.contains_key(pattern) {
                    continue;
                }
                match Regex::new(pattern) {
                    Ok(re) => {
                        patterns.insert(pattern.clone(), re);
                    }
                    Err(e) => {
                        malformed = Some(format!("invalid pattern '{pattern}': {e}"));
                        break;
                    }
                }
            }

            if let Some(message) = malformed {
                tracing::error!(rule = %rule.id, %message, "Disabling malformed rule");
                rejected.push(PolicyEvaluationError {
                    rule_id: rule.id,
                    message,
                });
                continue;
            }

            rules.push(rule);
        }

        Self {
            rules,
            patterns,
            rejected,
        }
    }

    /// Parse a YAML rule file and build an engine from it.
    pub fn from_yaml(contents: &str) -> Result<Self, PolicyError> {
        Ok(Self::new(RuleSet::from_yaml(contents)?))
    }

    /// Rules disabled at construction, for operator attention.
    pub fn rejected_rules(&self) -> &[PolicyEvaluationError] {
        &self.rejected
    }

    /// Number of active rules.
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Classify one resource.
    ///
    /// The first matching rule in list order wins; no match means `Keep`.
    /// Two overrides sit on top of the rule outcome:
    ///
    /// - `Exempt` short-circuits everything, including unsafe flags — it
    ///   is the explicit operator override.
    /// - If the graph says the resource is unsafe (live dependents, cycle
    ///   membership, or unresolved external references), an
    ///   `AutoApproveDelete` outcome is downgraded to `RequireApproval`.
    ///   The override only ever moves a verdict toward human review,
    ///   never past it.
    pub fn evaluate(&self, record: &ResourceRecord, safety: &SafetyVerdict) -> Disposition {
        for rule in &self.rules {
            if !rule.when.eval(record, &self.patterns) {
                continue;
            }

            tracing::debug!(rule = %rule.id, resource = %record.id, "Rule matched");

            let justification = if rule.description.is_empty() {
                format!("matched rule '{}'", rule.id)
            } else {
                format!("matched rule '{}': {}", rule.id, rule.description)
            };

            return match rule.action {
                RuleAction::Exempt => Disposition {
                    action: DispositionAction::Exempt,
                    rule_id: Some(rule.id.clone()),
                    justification,
                    downgraded: false,
                },
                RuleAction::RequireApproval => Disposition {
                    action: DispositionAction::RequireApproval,
                    rule_id: Some(rule.id.clone()),
                    justification,
                    downgraded: false,
                },
                RuleAction::AutoApproveDelete => {
                    if safety.safe {
                        Disposition {
                            action: DispositionAction::AutoApproveDelete,
                            rule_id: Some(rule.id.clone()),
                            justification,
                            downgraded: false,
                        }
                    } else {
                        Disposition {
                            action: DispositionAction::RequireApproval,
                            rule_id: Some(rule.id.clone()),
                            justification: format!(
                                "{justification}; deletion not safe ({}), downgraded to approval",
                                unsafe_reason(safety)
                            ),
                            downgraded: true,
                        }
                    }
                }
            };
        }

        Disposition::keep()
    }
}

fn unsafe_reason(safety: &SafetyVerdict) -> String {
    let mut reasons = Vec::new();
    if !safety.dependents.is_empty() {
        reasons.push(format!("{} live dependent(s)", safety.dependents.len()));
    }
    if safety.in_cycle {
        reasons.push("member of a dependency cycle".to_string());
    }
    if !safety.external_dependencies.is_empty() {
        reasons.push(format!(
            "{} unresolved external dependency(ies)",
            safety.external_dependencies.len()
        ));
    }
    if reasons.is_empty() {
        reasons.push("unsafe".to_string());
    }
    reasons.join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use costguard_core::{CloudProvider, ResourceId, ResourceStatus, Severity};

    fn record(resource_type: &str, age_days: u32) -> ResourceRecord {
        ResourceRecord {
            id: ResourceId::new(CloudProvider::Azure, format!("{resource_type}-1")),
            provider: CloudProvider::Azure,
            resource_type: resource_type.to_string(),
            name: format!("{resource_type}-1"),
            region: "eastus".to_string(),
            tags: Default::default(),
            created_at: None,
            last_used_at: None,
            age_days,
            estimated_monthly_cost: 10.0,
            size_gb: 0.0,
            status: ResourceStatus::InUse,
            severity: Severity::Medium,
            depends_on: Default::default(),
            raw_metadata: serde_json::Value::Null,
        }
    }

    fn safe() -> SafetyVerdict {
        SafetyVerdict {
            safe: true,
            dependents: Vec::new(),
            in_cycle: false,
            external_dependencies: Vec::new(),
        }
    }

    fn unsafe_with_dependent() -> SafetyVerdict {
        SafetyVerdict {
            safe: false,
            dependents: vec![ResourceId::new(CloudProvider::Azure, "vm-1")],
            in_cycle: false,
            external_dependencies: Vec::new(),
        }
    }

    fn engine(yaml: &str) -> PolicyEngine {
        PolicyEngine::from_yaml(yaml).unwrap()
    }

    const BASIC: &str = r#"
rules:
  - id: old-disks
    when:
      all:
        - resource_type_in: [disk]
        - age_days_at_least: 90
    action: auto_approve_delete
"#;

    #[test]
    fn first_matching_rule_wins() {
        let e = engine(
            r#"
rules:
  - id: first
    when:
      resource_type_in: [disk]
    action: require_approval
  - id: second
    when:
      resource_type_in: [disk]
    action: auto_approve_delete
"#,
        );
        let d = e.evaluate(&record("disk", 100), &safe());
        assert_eq!(d.rule_id.as_deref(), Some("first"));
        assert_eq!(d.action, DispositionAction::RequireApproval);
    }

    #[test]
    fn no_match_defaults_to_keep() {
        let e = engine(BASIC);
        let d = e.evaluate(&record("snapshot", 100), &safe());
        assert_eq!(d.action, DispositionAction::Keep);
        assert!(d.rule_id.is_none());
    }

    #[test]
    fn safe_auto_approve_stays_auto_approved() {
        let e = engine(BASIC);
        let d = e.evaluate(&record("disk", 120), &safe());
        assert_eq!(d.action, DispositionAction::AutoApproveDelete);
        assert!(!d.downgraded);
    }

    #[test]
    fn unsafe_auto_approve_downgrades_to_require_approval() {
        let e = engine(BASIC);
        let d = e.evaluate(&record("disk", 120), &unsafe_with_dependent());
        assert_eq!(d.action, DispositionAction::RequireApproval);
        assert!(d.downgraded);
        assert!(d.justification.contains("1 live dependent(s)"));
    }

    #[test]
    fn cycle_membership_downgrades_auto_approve() {
        let e = engine(BASIC);
        let verdict = SafetyVerdict {
            safe: false,
            dependents: Vec::new(),
            in_cycle: true,
            external_dependencies: Vec::new(),
        };
        let d = e.evaluate(&record("disk", 120), &verdict);
        assert_eq!(d.action, DispositionAction::RequireApproval);
    }

    #[test]
    fn exempt_wins_over_unsafe_graph() {
        let e = engine(
            r#"
rules:
  - id: hold
    when:
      resource_type_in: [disk]
    action: exempt
"#,
        );
        let d = e.evaluate(&record("disk", 120), &unsafe_with_dependent());
        assert_eq!(d.action, DispositionAction::Exempt);
        assert!(!d.downgraded);
    }

    #[test]
    fn disabled_rule_never_matches() {
        let e = engine(
            r#"
rules:
  - id: off
    when:
      resource_type_in: [disk]
    action: auto_approve_delete
    enabled: false
"#,
        );
        assert_eq!(e.rule_count(), 0);
        let d = e.evaluate(&record("disk", 120), &safe());
        assert_eq!(d.action, DispositionAction::Keep);
    }

    #[test]
    fn malformed_pattern_disables_only_that_rule() {
        let e = engine(
            r#"
rules:
  - id: broken
    when:
      tag_matches:
        key: env
        pattern: "("
    action: auto_approve_delete
  - id: old-disks
    when:
      resource_type_in: [disk]
    action: require_approval
"#,
        );
        assert_eq!(e.rule_count(), 1);
        assert_eq!(e.rejected_rules().len(), 1);
        assert_eq!(e.rejected_rules()[0].rule_id, "broken");

        // The surviving rule still evaluates.
        let d = e.evaluate(&record("disk", 10), &safe());
        assert_eq!(d.rule_id.as_deref(), Some("old-disks"));

        // A record only the broken rule would have matched keeps.
        let d = e.evaluate(&record("snapshot", 10), &safe());
        assert_eq!(d.action, DispositionAction::Keep);
    }

    #[test]
    fn evaluation_is_deterministic() {
        let e = engine(BASIC);
        let r = record("disk", 120);
        let first = e.evaluate(&r, &safe());
        for _ in 0..10 {
            let again = e.evaluate(&r, &safe());
            assert_eq!(again.action, first.action);
            assert_eq!(again.rule_id, first.rule_id);
            assert_eq!(again.justification, first.justification);
        }
    }
}
