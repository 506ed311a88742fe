//! CLI command implementations.

pub mod classify;
pub mod config;
pub mod run;
pub mod simulate;

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::warn;
use uuid::Uuid;

use crate::adapters::audit::{CompositeAuditRecorder, InMemoryAuditRecorder, JsonReportRecorder};
use crate::cli::display::{
    colorize_outcome, colorize_stop_reason, count_or_dash, format_ms, list_table, render_list,
    truncate_ellipsis, DetailView,
};
use crate::cli::output::CommandOutput;
use crate::domain::models::{AttemptRecord, BackoffConfig, Config, ConvergenceResult};
use crate::domain::ports::TargetAdapter;
use crate::services::{ConvergenceController, SignalClassifier, StandardBackoff};

const MESSAGE_WIDTH: usize = 60;

/// Result of a convergence run together with its attempt log.
#[derive(Debug, Serialize)]
pub struct ConvergenceOutput {
    pub adapter: String,
    pub result: ConvergenceResult,
    pub attempts: Vec<AttemptRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<PathBuf>,
}

impl CommandOutput for ConvergenceOutput {
    fn to_human(&self) -> String {
        let mut table = list_table(&["#", "item", "outcome", "before", "after", "waited", "message"]);
        for record in &self.attempts {
            table.add_row(vec![
                record.attempt_number.to_string(),
                record.item_label.clone(),
                colorize_outcome(record.kind()).to_string(),
                record.pending_before.to_string(),
                count_or_dash(record.pending_after),
                format_ms(record.waited_ms),
                truncate_ellipsis(&record.outcome.message, MESSAGE_WIDTH),
            ]);
        }

        let result = &self.result;
        let duration_ms = u64::try_from(result.duration().num_milliseconds()).unwrap_or(0);
        let report = self.report.as_ref().map(|p| p.display().to_string());
        let summary = DetailView::new(&format!("Convergence run {}", result.run_id))
            .field("adapter", &self.adapter)
            .field("stop reason", colorize_stop_reason(result.stop_reason))
            .field("converged", result.converged)
            .field("attempts used", result.attempts_used)
            .field("applied", result.total_applied)
            .field("unconfirmed", result.unconfirmed_applies)
            .field("final pending", count_or_dash(result.final_pending_count))
            .field("duration", format_ms(duration_ms))
            .field_opt("detail", result.detail.as_deref())
            .field_opt("report", report.as_deref())
            .render();

        format!(
            "{}\n\n{summary}",
            render_list("attempt", table, self.attempts.len())
        )
    }
}

/// Build the controller stack around `adapter`, run it to completion and
/// collect the attempt log.
///
/// Ctrl-C cancels the run; the partial result is still returned.
pub(crate) async fn converge(
    adapter: Arc<dyn TargetAdapter>,
    config: &Config,
    backoff: BackoffConfig,
    report_dir: Option<&Path>,
) -> Result<ConvergenceOutput> {
    let run_id = Uuid::new_v4();
    let classifier = SignalClassifier::from_config(&config.classifier)
        .context("Failed to compile classifier patterns")?;

    let memory = InMemoryAuditRecorder::new();
    let mut recorder = CompositeAuditRecorder::new().with(Arc::new(memory.clone()));
    let mut report = None;
    if let Some(dir) = report_dir {
        let json_report = JsonReportRecorder::new(dir, run_id)
            .await
            .with_context(|| format!("Failed to prepare report directory {}", dir.display()))?;
        report = Some(json_report.summary_path().to_path_buf());
        recorder = recorder.with(Arc::new(json_report));
    }

    let adapter_name = adapter.name().to_string();
    let controller = ConvergenceController::new(
        adapter,
        Arc::new(classifier),
        Arc::new(StandardBackoff::new(backoff)),
        Arc::new(recorder),
        config.controller.clone(),
    );

    let cancel = CancellationToken::new();
    let interrupt = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupt received, cancelling convergence run");
                cancel.cancel();
            }
        })
    };

    let result = controller.run_with_id(run_id, cancel).await;
    interrupt.abort();

    Ok(ConvergenceOutput {
        adapter: adapter_name,
        result,
        attempts: memory.records().await,
        report,
    })
}

/// Print `output` and turn anything short of convergence into an error.
pub(crate) fn finish(output: &ConvergenceOutput, json_mode: bool) -> Result<()> {
    crate::cli::output::output(output, json_mode);
    let result = &output.result;
    if result.converged {
        Ok(())
    } else {
        anyhow::bail!(
            "did not converge: {} ({} pending)",
            result.stop_reason,
            count_or_dash(result.final_pending_count)
        )
    }
}
