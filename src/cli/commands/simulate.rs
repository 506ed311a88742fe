//! `converge simulate`: converge an in-process scripted target.
//!
//! Useful for rehearsing controller settings without a live runner.

use anyhow::{bail, Result};
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;

use crate::adapters::target::{ScriptStep, ScriptedTargetAdapter};
use crate::domain::models::{BackoffConfig, Config, OutcomeKind};
use crate::infrastructure::config::ConfigLoader;

#[derive(Args, Debug)]
pub struct SimulateArgs {
    /// Number of pending items the target starts with
    #[arg(short, long, default_value = "5")]
    pub pending: u64,

    /// Apply responses in order (comma-separated). Outcome kinds, plus
    /// `fail` for a transport failure and `hang` for a call that never returns.
    /// Once exhausted, every apply succeeds.
    #[arg(short, long, value_delimiter = ',')]
    pub script: Vec<String>,

    /// Honour configured backoff delays instead of skipping them
    #[arg(long)]
    pub realtime: bool,

    /// Attempt budget (overrides controller.max_attempts)
    #[arg(short, long)]
    pub max_attempts: Option<u32>,

    /// Per-call timeout in milliseconds (overrides controller.per_attempt_timeout_ms)
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Write JSON run reports to this directory
    #[arg(long, value_name = "DIR")]
    pub report_dir: Option<PathBuf>,
}

/// Parse one `--script` entry.
pub fn parse_step(raw: &str) -> Result<ScriptStep> {
    match raw.trim().to_lowercase().as_str() {
        "fail" => Ok(ScriptStep::fail("simulated transport failure")),
        "hang" => Ok(ScriptStep::Hang),
        other => match OutcomeKind::parse_str(other) {
            Some(kind) => Ok(ScriptStep::outcome(kind)),
            None => bail!(
                "Unknown script step '{raw}'. Expected one of: success, transient, terminal, \
                 rate_limited, indeterminate, fail, hang"
            ),
        },
    }
}

pub async fn execute(args: SimulateArgs, mut config: Config, json_mode: bool) -> Result<()> {
    if let Some(max_attempts) = args.max_attempts {
        config.controller.max_attempts = max_attempts;
    }
    if let Some(timeout_ms) = args.timeout_ms {
        config.controller.per_attempt_timeout_ms = timeout_ms;
    }
    ConfigLoader::validate(&config)?;

    let steps = args
        .script
        .iter()
        .map(|raw| parse_step(raw))
        .collect::<Result<Vec<_>>>()?;
    let adapter = ScriptedTargetAdapter::new(args.pending).with_script(steps);

    let backoff = if args.realtime {
        config.backoff.clone()
    } else {
        BackoffConfig::immediate()
    };

    let output = super::converge(
        Arc::new(adapter),
        &config,
        backoff,
        args.report_dir.as_deref(),
    )
    .await?;

    super::finish(&output, json_mode)
}
