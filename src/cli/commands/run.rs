//! `converge run`: converge the configured HTTP target.

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use crate::adapters::target::HttpTargetAdapter;
use crate::domain::models::Config;
use crate::infrastructure::config::ConfigLoader;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Attempt budget (overrides controller.max_attempts)
    #[arg(short, long)]
    pub max_attempts: Option<u32>,

    /// Migration runner base URL (overrides target.base_url)
    #[arg(long)]
    pub base_url: Option<String>,

    /// Directory for JSON run reports (overrides audit.report_dir)
    #[arg(long, value_name = "DIR")]
    pub report_dir: Option<PathBuf>,

    /// Do not write JSON run reports
    #[arg(long, conflicts_with = "report_dir")]
    pub no_report: bool,

    /// Per-call timeout in milliseconds (overrides controller.per_attempt_timeout_ms)
    #[arg(long)]
    pub timeout_ms: Option<u64>,
}

impl RunArgs {
    fn apply_to(&self, config: &mut Config) {
        if let Some(max_attempts) = self.max_attempts {
            config.controller.max_attempts = max_attempts;
        }
        if let Some(ref base_url) = self.base_url {
            config.target.base_url.clone_from(base_url);
        }
        if let Some(ref report_dir) = self.report_dir {
            config.audit.report_dir.clone_from(report_dir);
            config.audit.enabled = true;
        }
        if self.no_report {
            config.audit.enabled = false;
        }
        if let Some(timeout_ms) = self.timeout_ms {
            config.controller.per_attempt_timeout_ms = timeout_ms;
        }
    }
}

pub async fn execute(args: RunArgs, mut config: Config, json_mode: bool) -> Result<()> {
    args.apply_to(&mut config);
    ConfigLoader::validate(&config)?;
    ConfigLoader::validate_target(&config)?;

    let adapter =
        HttpTargetAdapter::new(&config.target).context("Failed to build HTTP client")?;
    info!(base_url = %adapter.base_url(), "starting convergence run");

    let report_dir = config.audit.enabled.then(|| config.audit.report_dir.clone());
    let output = super::converge(
        Arc::new(adapter),
        &config,
        config.backoff.clone(),
        report_dir.as_deref(),
    )
    .await?;

    super::finish(&output, json_mode)
}
