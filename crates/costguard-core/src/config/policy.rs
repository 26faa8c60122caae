//! Policy rule file location.

use serde::{Deserialize, Serialize};

/// Where to load the policy rule set from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyFileConfig {
    /// Path to the YAML rule file, relative to the config file's directory
    /// unless absolute.
    #[serde(default = "default_rules_file")]
    pub rules_file: String,
}

impl Default for PolicyFileConfig {
    fn default() -> Self {
        Self {
            rules_file: default_rules_file(),
        }
    }
}

fn default_rules_file() -> String {
    "policies.yaml".to_string()
}
