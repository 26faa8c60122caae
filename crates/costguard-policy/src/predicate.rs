//! Declarative predicates over resource record fields.
//!
//! A [`Predicate`] is the condition half of a policy rule, expressed as a
//! small AST that serializes naturally in YAML:
//!
//! ```yaml
//! when:
//!   all:
//!     - resource_type_in: [disk, snapshot]
//!     - age_days_at_least: 90
//!     - not:
//!         tag_exists: keep
//! ```

use costguard_core::ResourceRecord;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Condition over a single resource record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Predicate {
    /// Every child predicate must hold.
    All(Vec<Predicate>),
    /// At least one child predicate must hold.
    Any(Vec<Predicate>),
    Not(Box<Predicate>),

    AgeDaysAtLeast(u32),
    AgeDaysBelow(u32),
    MonthlyCostAtLeast(f64),
    MonthlyCostBelow(f64),

    ResourceTypeIn(Vec<String>),
    ProviderIn(Vec<String>),
    RegionIn(Vec<String>),
    StatusIs(String),

    TagEquals { key: String, value: String },
    TagExists(String),
    TagMissing(String),
    /// Tag value matches a regular expression. The pattern is compiled at
    /// engine construction; a pattern that fails to compile disables the
    /// owning rule.
    TagMatches { key: String, pattern: String },
}

impl Predicate {
    /// Evaluate against a record. `patterns` maps every `TagMatches`
    /// pattern in the owning rule set to its compiled regex; a pattern
    /// missing from the map evaluates to false (the owning rule should
    /// already have been disabled).
    pub fn eval(&self, record: &ResourceRecord, patterns: &HashMap<String, Regex>) -> bool {
        match self {
            Predicate::All(children) => children.iter().all(|p| p.eval(record, patterns)),
            Predicate::Any(children) => children.iter().any(|p| p.eval(record, patterns)),
            Predicate::Not(child) => !child.eval(record, patterns),

            Predicate::AgeDaysAtLeast(days) => record.age_days >= *days,
            Predicate::AgeDaysBelow(days) => record.age_days < *days,
            Predicate::MonthlyCostAtLeast(cost) => record.estimated_monthly_cost >= *cost,
            Predicate::MonthlyCostBelow(cost) => record.estimated_monthly_cost < *cost,

            Predicate::ResourceTypeIn(types) => types.iter().any(|t| t == &record.resource_type),
            Predicate::ProviderIn(providers) => {
                providers.iter().any(|p| p == record.provider.as_str())
            }
            Predicate::RegionIn(regions) => regions.iter().any(|r| r == &record.region),
            Predicate::StatusIs(status) => status == record.status.as_str(),

            Predicate::TagEquals { key, value } => {
                record.tags.get(key).is_some_and(|v| v == value)
            }
            Predicate::TagExists(key) => record.tags.contains_key(key),
            Predicate::TagMissing(key) => !record.tags.contains_key(key),
            Predicate::TagMatches { key, pattern } => match patterns.get(pattern) {
                Some(re) => record.tags.get(key).is_some_and(|v| re.is_match(v)),
                None => false,
            },
        }
    }

    /// Collect every `TagMatches` pattern in this predicate tree.
    pub fn patterns(&self, out: &mut Vec<String>) {
        match self {
            Predicate::All(children) | Predicate::Any(children) => {
                for child in children {
                    child.patterns(out);
                }
            }
            Predicate::Not(child) => child.patterns(out),
            Predicate::TagMatches { pattern, .. } => out.push(pattern.clone()),
            _ => {}
        }
    }
}
