//! Configuration types for Costguard.
//!
//! Configuration is loaded from a single YAML file (`costguard.yaml`) and
//! combined into one [`CostguardConfig`] structure shared by the runtime
//! and the CLI. Policy rules live in their own file (see
//! `costguard-policy`); this module only records where to find them.

pub mod policy;
pub mod providers;
pub mod scan;
pub mod signals;

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub use policy::PolicyFileConfig;
pub use providers::ProviderConfig;
pub use scan::ScanConfig;
pub use signals::SignalsConfig;

/// Complete Costguard configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CostguardConfig {
    /// Project name.
    #[serde(default)]
    pub project: Option<String>,

    /// Scan behavior (timeouts, resource-type filter).
    #[serde(default)]
    pub scan: ScanConfig,

    /// Policy rule file location.
    #[serde(default)]
    pub policy: PolicyFileConfig,

    /// Optional numeric signal service.
    #[serde(default)]
    pub signals: SignalsConfig,

    /// Provider inventory sources.
    #[serde(default)]
    pub providers: Vec<ProviderConfig>,
}

impl CostguardConfig {
    /// Load configuration from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml(&contents)
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(contents: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(contents).map_err(ConfigError::Parse)
    }
}

/// Errors raised while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let cfg = CostguardConfig::from_yaml("{}").unwrap();
        assert_eq!(cfg.scan.provider_timeout_secs, 60);
        assert!(cfg.scan.resource_types.is_empty());
        assert!(!cfg.signals.enabled);
        assert!(cfg.providers.is_empty());
    }

    #[test]
    fn full_config_round_trips() {
        let yaml = r#"
project: prod-cleanup
scan:
  provider_timeout_secs: 30
  resource_types: [disk, snapshot]
policy:
  rules_file: policies.yaml
signals:
  enabled: true
providers:
  - provider: azure
    inventory: inventories/azure.json
  - provider: aws
    inventory: inventories/aws.json
    enabled: false
"#;
        let cfg = CostguardConfig::from_yaml(yaml).unwrap();
        assert_eq!(cfg.project.as_deref(), Some("prod-cleanup"));
        assert_eq!(cfg.scan.provider_timeout_secs, 30);
        assert_eq!(cfg.scan.resource_types, vec!["disk", "snapshot"]);
        assert_eq!(cfg.policy.rules_file, "policies.yaml");
        assert!(cfg.signals.enabled);
        assert_eq!(cfg.providers.len(), 2);
        assert!(cfg.providers[0].enabled);
        assert!(!cfg.providers[1].enabled);
    }

    #[test]
    fn malformed_yaml_is_a_parse_error() {
        let err = CostguardConfig::from_yaml("scan: [not, a, map]").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn load_reads_from_disk_and_reports_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("costguard.yaml");
        std::fs::write(&path, "project: loaded-from-disk\n").unwrap();

        let cfg = CostguardConfig::load(&path).unwrap();
        assert_eq!(cfg.project.as_deref(), Some("loaded-from-disk"));

        let err = CostguardConfig::load(dir.path().join("missing.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
