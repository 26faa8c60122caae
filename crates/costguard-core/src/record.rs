//! Canonical resource schema.
//!
//! Every provider adapter emits [`RawResourceRecord`]s; the normalizer
//! turns them into immutable [`ResourceRecord`]s keyed by a composite
//! [`ResourceId`]. Dependency edges point from dependent to dependency:
//! a record's `depends_on` lists the resources it requires to remain
//! functional.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

/// Supported cloud providers. Open for extension via `Other`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CloudProvider {
    Azure,
    Aws,
    Gcp,
    Other(String),
}

impl CloudProvider {
    pub fn as_str(&self) -> &str {
        match self {
            CloudProvider::Azure => "azure",
            CloudProvider::Aws => "aws",
            CloudProvider::Gcp => "gcp",
            CloudProvider::Other(name) => name,
        }
    }

    /// Whether `token` names one of the built-in providers.
    ///
    /// Used when parsing dependency references: only a known provider
    /// prefix is treated as a cross-provider reference, so native ids
    /// containing `:` (ARNs and the like) are not misparsed.
    pub fn is_known(token: &str) -> bool {
        matches!(token, "azure" | "aws" | "gcp")
    }
}

impl FromStr for CloudProvider {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "azure" => CloudProvider::Azure,
            "aws" => CloudProvider::Aws,
            "gcp" => CloudProvider::Gcp,
            other => CloudProvider::Other(other.to_string()),
        })
    }
}

impl fmt::Display for CloudProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for CloudProvider {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for CloudProvider {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(s.parse().expect("provider parsing is infallible"))
    }
}

/// Composite resource key: `(provider, native_id)`, globally unique within
/// a scan batch.
///
/// Serializes as the string `provider:native_id` so it can key JSON maps.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResourceId {
    pub provider: CloudProvider,
    pub native_id: String,
}

impl ResourceId {
    pub fn new(provider: CloudProvider, native_id: impl Into<String>) -> Self {
        Self {
            provider,
            native_id: native_id.into(),
        }
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.provider, self.native_id)
    }
}

impl FromStr for ResourceId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (provider, native_id) = s
            .split_once(':')
            .ok_or_else(|| format!("resource id '{s}' is missing a provider prefix"))?;
        if native_id.is_empty() {
            return Err(format!("resource id '{s}' has an empty native id"));
        }
        Ok(ResourceId::new(
            provider.parse().expect("provider parsing is infallible"),
            native_id,
        ))
    }
}

impl Serialize for ResourceId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for ResourceId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(D::Error::custom)
    }
}

/// Provider-reported status of a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ResourceStatus {
    /// The owning/parent resource no longer exists; the provider confirmed
    /// this resource persists on its own.
    Orphaned,
    Idle,
    Zombie,
    Unattached,
    Empty,
    Oversized,
    #[default]
    InUse,
}

impl ResourceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceStatus::Orphaned => "orphaned",
            ResourceStatus::Idle => "idle",
            ResourceStatus::Zombie => "zombie",
            ResourceStatus::Unattached => "unattached",
            ResourceStatus::Empty => "empty",
            ResourceStatus::Oversized => "oversized",
            ResourceStatus::InUse => "in_use",
        }
    }

    /// Parse a provider-supplied status string. Unknown values map to
    /// `InUse` (the conservative default for deletion decisions).
    pub fn parse_lenient(s: &str) -> Self {
        match s {
            "orphaned" => ResourceStatus::Orphaned,
            "idle" => ResourceStatus::Idle,
            "zombie" => ResourceStatus::Zombie,
            "unattached" => ResourceStatus::Unattached,
            "empty" => ResourceStatus::Empty,
            "oversized" => ResourceStatus::Oversized,
            "in_use" => ResourceStatus::InUse,
            other => {
                tracing::warn!(status = other, "Unknown resource status, treating as in_use");
                ResourceStatus::InUse
            }
        }
    }
}

/// Severity of the cost waste, derived from the estimated monthly cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Thresholds: >=100 critical, >=50 high, >=10 medium, >0 low, else info.
    pub fn from_monthly_cost(cost: f64) -> Self {
        if cost >= 100.0 {
            Severity::Critical
        } else if cost >= 50.0 {
            Severity::High
        } else if cost >= 10.0 {
            Severity::Medium
        } else if cost > 0.0 {
            Severity::Low
        } else {
            Severity::Info
        }
    }
}

/// Canonical, normalized representation of a cloud resource.
///
/// Immutable once produced by the normalizer. `depends_on` ids resolve to
/// records in the same scan batch or are flagged by the graph builder as
/// external dependencies — never silently dropped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceRecord {
    pub id: ResourceId,
    pub provider: CloudProvider,
    pub resource_type: String,
    pub name: String,
    pub region: String,

    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_used_at: Option<chrono::DateTime<chrono::Utc>>,
    /// Derived from `created_at` vs. scan time; clamped to zero under
    /// clock skew.
    pub age_days: u32,

    pub estimated_monthly_cost: f64,
    #[serde(default)]
    pub size_gb: f64,
    #[serde(default)]
    pub status: ResourceStatus,
    pub severity: Severity,

    #[serde(default)]
    pub depends_on: BTreeSet<ResourceId>,

    /// Opaque provider payload, passed through untouched.
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub raw_metadata: serde_json::Value,
}

impl ResourceRecord {
    /// Provider-confirmed orphan: the graph builder relaxes the
    /// external-dependency safety rule for these.
    pub fn is_confirmed_orphan(&self) -> bool {
        self.status == ResourceStatus::Orphaned
    }

    pub fn estimated_annual_cost(&self) -> f64 {
        self.estimated_monthly_cost * 12.0
    }
}

/// Provider-shaped inventory record, before normalization.
///
/// Everything is optional or loose: adapters pass through whatever the
/// provider API returned and the normalizer decides what is usable.
/// `depends_on` entries are native ids; a `provider:` prefix with a known
/// provider name marks a cross-provider reference.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawResourceRecord {
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub native_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub resource_type: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub last_used_at: Option<String>,
    #[serde(default)]
    pub size_gb: Option<f64>,
    #[serde(default)]
    pub estimated_monthly_cost: Option<f64>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    #[serde(default)]
    pub depends_on: Vec<String>,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resource_id_display_and_parse_round_trip() {
        let id = ResourceId::new(CloudProvider::Azure, "sub1/rg/disk-1");
        let s = id.to_string();
        assert_eq!(s, "azure:sub1/rg/disk-1");
        assert_eq!(s.parse::<ResourceId>().unwrap(), id);
    }

    #[test]
    fn resource_id_parse_keeps_colons_in_native_id() {
        let id: ResourceId = "aws:arn:aws:ec2:vol-123".parse().unwrap();
        assert_eq!(id.provider, CloudProvider::Aws);
        assert_eq!(id.native_id, "arn:aws:ec2:vol-123");
    }

    #[test]
    fn resource_id_serializes_as_string() {
        let id = ResourceId::new(CloudProvider::Gcp, "disk-9");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"gcp:disk-9\"");
    }

    #[test]
    fn unknown_provider_becomes_other() {
        let p: CloudProvider = "oci".parse().unwrap();
        assert_eq!(p, CloudProvider::Other("oci".to_string()));
        assert_eq!(p.as_str(), "oci");
    }

    #[test]
    fn severity_thresholds_match_cost_bands() {
        assert_eq!(Severity::from_monthly_cost(150.0), Severity::Critical);
        assert_eq!(Severity::from_monthly_cost(100.0), Severity::Critical);
        assert_eq!(Severity::from_monthly_cost(75.0), Severity::High);
        assert_eq!(Severity::from_monthly_cost(25.0), Severity::Medium);
        assert_eq!(Severity::from_monthly_cost(2.5), Severity::Low);
        assert_eq!(Severity::from_monthly_cost(0.0), Severity::Info);
    }

    #[test]
    fn lenient_status_parsing_defaults_to_in_use() {
        assert_eq!(ResourceStatus::parse_lenient("orphaned"), ResourceStatus::Orphaned);
        assert_eq!(ResourceStatus::parse_lenient("weird"), ResourceStatus::InUse);
    }
}
