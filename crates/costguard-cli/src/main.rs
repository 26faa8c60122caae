use clap::{Parser, Subcommand, ValueEnum};
use costguard_adapter_file::FileInventoryProvider;
use costguard_core::CostguardConfig;
use costguard_policy::{ApprovalLedger, PolicyEngine, RuleSet};
use costguard_runtime::{GovernanceOrchestrator, ResourceTypeFilter, ScanResult};

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "costguard", version, about = "Multi-cloud cost governance")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a governance scan over the configured inventories.
    Scan {
        /// Path to costguard.yaml
        #[arg(long, default_value = "costguard.yaml")]
        config: PathBuf,

        /// Override the rule file from the config
        #[arg(long)]
        rules: Option<PathBuf>,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Parse and validate a policy rule file.
    Check {
        /// Path to the rule file
        rules: PathBuf,
    },

    /// Initialize a Costguard project with starter config and policies.
    Init {
        /// Output directory
        #[arg(default_value = ".")]
        dir: PathBuf,

        /// Overwrite existing files
        #[arg(long, default_value_t = false)]
        force: bool,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let cli = Cli::parse();

    match cli.cmd {
        Command::Scan {
            config,
            rules,
            format,
        } => run_scan(&config, rules.as_deref(), format).await?,

        Command::Check { rules } => run_check(&rules)?,

        Command::Init { dir, force } => run_init(&dir, force)?,
    }

    Ok(())
}

// -----------------------------
// scan
// -----------------------------

async fn run_scan(
    config_path: &Path,
    rules_override: Option<&Path>,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let cfg = CostguardConfig::load(config_path)?;
    let base_dir = config_path.parent().unwrap_or_else(|| Path::new("."));

    let rules_path = match rules_override {
        Some(p) => p.to_path_buf(),
        None => resolve(base_dir, &cfg.policy.rules_file),
    };

    let rule_set = RuleSet::load(&rules_path)?;
    let engine = Arc::new(PolicyEngine::new(rule_set));
    for rejected in engine.rejected_rules() {
        eprintln!("warning: {rejected}");
    }

    if cfg.signals.enabled {
        tracing::warn!(
            "signals.enabled is set but no signal service is linked into the CLI; \
             scanning without anomaly annotations"
        );
    }

    let ledger = Arc::new(ApprovalLedger::new());
    let mut orchestrator = GovernanceOrchestrator::new(engine, ledger)
        .with_provider_timeout(Duration::from_secs(cfg.scan.provider_timeout_secs))
        .with_filter(ResourceTypeFilter {
            types: cfg.scan.resource_types.clone(),
        });

    let mut configured = 0usize;
    for provider_cfg in &cfg.providers {
        if !provider_cfg.enabled {
            continue;
        }
        let Some(inventory) = &provider_cfg.inventory else {
            tracing::warn!(
                provider = %provider_cfg.provider,
                "Provider has no inventory path, skipping"
            );
            continue;
        };
        let provider = provider_cfg
            .provider
            .parse()
            .expect("provider parsing is infallible");
        orchestrator = orchestrator.with_provider(Arc::new(FileInventoryProvider::new(
            provider,
            resolve(base_dir, inventory),
        )));
        configured += 1;
    }

    if configured == 0 {
        return Err(anyhow::anyhow!(
            "No providers configured. Add a 'providers' section to {} (see `costguard init`).",
            config_path.display()
        ));
    }

    let result = orchestrator.run_scan().await;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
        OutputFormat::Text => print_summary(&result),
    }

    Ok(())
}

fn print_summary(result: &ScanResult) {
    println!("Scan {}", result.scan_id);
    println!(
        "Resources: {}   monthly cost: ${:.2}",
        result.records.len(),
        result.total_monthly_cost()
    );

    println!("Providers:");
    for (name, stats) in &result.provider_stats {
        println!(
            "  - {:<8} resources={:<5} cost=${:<10.2} errors={}",
            name, stats.resources, stats.monthly_cost, stats.errors
        );
    }

    println!("Dispositions:");
    for (action, count) in result.disposition_counts() {
        println!("  - {action:<20} {count}");
    }

    if !result.recommendations.is_empty() {
        println!(
            "Recommendations ({}), ${:.2}/yr if all executed:",
            result.recommendations.len(),
            result.total_annual_savings()
        );
        for rec in result.recommendations.iter().take(10) {
            println!(
                "  - {:<40} {:>10.2}/yr  effort={:<6} risk={:<6} {}",
                rec.resource_id.to_string(),
                rec.estimated_annual_savings,
                format!("{:?}", rec.effort).to_lowercase(),
                format!("{:?}", rec.risk).to_lowercase(),
                rec.justification
            );
        }
        if result.recommendations.len() > 10 {
            println!("  ... and {} more", result.recommendations.len() - 10);
        }
    }

    if !result.auto_delete_order.is_empty() {
        println!("Auto-approved deletion order (leaves first):");
        for id in &result.auto_delete_order {
            println!("  - {id}");
        }
    }

    if !result.errors.is_empty() {
        println!("Errors ({}):", result.errors.len());
        for err in &result.errors {
            println!("  - {err}");
        }
    }
}

// -----------------------------
// check
// -----------------------------

fn run_check(rules_path: &Path) -> anyhow::Result<()> {
    let rule_set = RuleSet::load(rules_path)?;
    let total = rule_set.len();
    let engine = PolicyEngine::new(rule_set);

    println!("Rule file: {}", rules_path.display());
    println!("  - rules:    {total}");
    println!("  - active:   {}", engine.rule_count());
    println!("  - rejected: {}", engine.rejected_rules().len());

    if !engine.rejected_rules().is_empty() {
        for rejected in engine.rejected_rules() {
            println!("  ✖ {rejected}");
        }
        return Err(anyhow::anyhow!(
            "{} malformed rule(s)",
            engine.rejected_rules().len()
        ));
    }

    println!("✔ Rule file is valid.");
    Ok(())
}

// -----------------------------
// init
// -----------------------------

fn run_init(dir: &Path, force: bool) -> anyhow::Result<()> {
    fs::create_dir_all(dir)?;
    fs::create_dir_all(dir.join("inventories"))?;

    let config_path = dir.join("costguard.yaml");
    let policies_path = dir.join("policies.yaml");
    let inventory_path = dir.join("inventories").join("azure.json");
    let readme_path = dir.join("README.md");

    for path in [&config_path, &policies_path] {
        if path.exists() && !force {
            return Err(anyhow::anyhow!(
                "{} already exists. Use --force to overwrite.",
                path.display()
            ));
        }
    }

    let config_yaml = r#"# Costguard project config
project: my-cleanup

scan:
  provider_timeout_secs: 60
  # Restrict scanned resource types; empty means all.
  resource_types: []

policy:
  rules_file: policies.yaml

signals:
  enabled: false

providers:
  - provider: azure
    inventory: inventories/azure.json
"#;
    fs::write(&config_path, config_yaml)?;

    let policies_yaml = r#"# Costguard governance rules.
# Order matters: the first matching rule wins.
rules:
  - id: operator-hold
    description: Never touch resources tagged keep
    when:
      tag_exists: keep
    action: exempt

  - id: orphaned-snapshots
    description: Provider-confirmed orphaned snapshots older than 30 days
    when:
      all:
        - resource_type_in: [snapshot]
        - status_is: orphaned
        - age_days_at_least: 30
    action: auto_approve_delete

  - id: old-unattached-disks
    description: Unattached disks older than 90 days need a human decision
    when:
      all:
        - resource_type_in: [disk]
        - status_is: unattached
        - age_days_at_least: 90
    action: require_approval
"#;
    fs::write(&policies_path, policies_yaml)?;

    if !inventory_path.exists() || force {
        let sample = r#"[
  {
    "native_id": "snap-0001",
    "resource_type": "snapshot",
    "region": "eastus",
    "estimated_monthly_cost": 4.2,
    "created_at": "2024-06-01T00:00:00Z",
    "status": "orphaned"
  },
  {
    "native_id": "disk-0001",
    "resource_type": "disk",
    "region": "eastus",
    "estimated_monthly_cost": 18.0,
    "created_at": "2024-01-15T00:00:00Z",
    "status": "unattached",
    "tags": {"env": "dev"}
  }
]
"#;
        fs::write(&inventory_path, sample)?;
    }

    let readme = r#"# Costguard project

## Files
- `costguard.yaml` : scan, policy, and provider configuration
- `policies.yaml`  : governance rules (ordered; first match wins)
- `inventories/`   : JSON inventory files served by the file adapter

## Next steps
1) Validate the rules:
   - `costguard check policies.yaml`
2) Run a scan:
   - `costguard scan`
3) Machine-readable output:
   - `costguard scan --format json`
"#;
    if !readme_path.exists() || force {
        fs::write(&readme_path, readme)?;
    }

    println!("Initialized Costguard project at: {}", dir.display());
    println!("Wrote config:    {}", config_path.display());
    println!("Wrote policies:  {}", policies_path.display());
    println!("Wrote inventory: {}", inventory_path.display());
    Ok(())
}

// -----------------------------
// helpers
// -----------------------------

fn resolve(base: &Path, path: &str) -> PathBuf {
    let p = PathBuf::from(path);
    if p.is_absolute() { p } else { base.join(p) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_then_check_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        run_init(dir.path(), false).unwrap();

        assert!(dir.path().join("costguard.yaml").exists());
        assert!(dir.path().join("policies.yaml").exists());
        run_check(&dir.path().join("policies.yaml")).unwrap();
    }

    #[test]
    fn init_refuses_to_overwrite_without_force() {
        let dir = tempfile::tempdir().unwrap();
        run_init(dir.path(), false).unwrap();
        assert!(run_init(dir.path(), false).is_err());
        run_init(dir.path(), true).unwrap();
    }

    #[tokio::test]
    async fn scan_runs_against_initialized_project() {
        let dir = tempfile::tempdir().unwrap();
        run_init(dir.path(), false).unwrap();

        run_scan(
            &dir.path().join("costguard.yaml"),
            None,
            OutputFormat::Json,
        )
        .await
        .unwrap();
    }
}
