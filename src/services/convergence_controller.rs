//! Convergence controller.
//!
//! Drives the pending count of a target to zero, one item at a time:
//!
//! ```text
//! observe -> [zero? stop] -> [budget spent? stop] -> select one -> apply
//!         -> classify -> wait per backoff -> re-observe -> record -> loop
//! ```
//!
//! Only adapter faults and terminal outcomes end a run early. Transient and
//! indeterminate outcomes are retried within `max_attempts`; rate limits are
//! waited out without touching the budget, up to
//! `max_consecutive_rate_limits` in a row.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::domain::errors::{AdapterError, AdapterResult};
use crate::domain::models::{
    ApplyOutcome, AttemptRecord, ControllerConfig, ConvergenceResult, ObservedState, OutcomeKind,
    PendingItem, StopReason,
};
use crate::domain::ports::{AuditRecorder, BackoffPolicy, OutcomeClassifier, TargetAdapter};

/// Mutable bookkeeping owned by a single `run` invocation.
struct RunState {
    run_id: Uuid,
    started_at: DateTime<Utc>,
    records: Vec<AttemptRecord>,
    attempts_used: u32,
    consecutive_rate_limits: u32,
    last_pending: Option<u64>,
}

impl RunState {
    fn new(run_id: Uuid) -> Self {
        Self {
            run_id,
            started_at: Utc::now(),
            records: Vec::new(),
            attempts_used: 0,
            consecutive_rate_limits: 0,
            last_pending: None,
        }
    }

    fn next_attempt_number(&self) -> u32 {
        u32::try_from(self.records.len()).unwrap_or(u32::MAX).saturating_add(1)
    }

    fn observed(&mut self, state: ObservedState) -> ObservedState {
        self.last_pending = Some(state.pending_count);
        state
    }
}

/// Reconciliation loop that applies pending items until none remain.
///
/// The controller holds no state between runs; each call to [`run`](Self::run)
/// starts from a fresh observation. Runs against the same target must be
/// serialized by the caller.
pub struct ConvergenceController {
    adapter: Arc<dyn TargetAdapter>,
    classifier: Arc<dyn OutcomeClassifier>,
    backoff: Arc<dyn BackoffPolicy>,
    recorder: Arc<dyn AuditRecorder>,
    config: ControllerConfig,
}

impl ConvergenceController {
    pub fn new(
        adapter: Arc<dyn TargetAdapter>,
        classifier: Arc<dyn OutcomeClassifier>,
        backoff: Arc<dyn BackoffPolicy>,
        recorder: Arc<dyn AuditRecorder>,
        config: ControllerConfig,
    ) -> Self {
        Self {
            adapter,
            classifier,
            backoff,
            recorder,
            config,
        }
    }

    pub const fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// Run the loop to completion and return the verdict.
    ///
    /// Never fails: every way a run can end is described by the returned
    /// [`ConvergenceResult`]. `cancel` is checked at the top of every
    /// iteration and interrupts backoff waits.
    pub async fn run(&self, cancel: CancellationToken) -> ConvergenceResult {
        self.run_with_id(Uuid::new_v4(), cancel).await
    }

    /// Like [`run`](Self::run), under a caller-chosen run id so that
    /// recorders created up front can name their output after it.
    pub async fn run_with_id(&self, run_id: Uuid, cancel: CancellationToken) -> ConvergenceResult {
        let mut run = RunState::new(run_id);
        let span = info_span!(
            "convergence_run",
            run_id = %run.run_id,
            adapter = self.adapter.name(),
            max_attempts = self.config.max_attempts,
        );

        async {
            let (stop_reason, detail) = self.drive(&mut run, &cancel).await;

            let result = ConvergenceResult::from_records(
                run.run_id,
                &run.records,
                run.attempts_used,
                run.last_pending,
                stop_reason,
                detail,
                run.started_at,
            );

            if let Err(err) = self.recorder.finalize(&result).await {
                warn!(error = %err, "failed to record convergence result");
            }

            info!(
                stop_reason = %result.stop_reason,
                converged = result.converged,
                attempts_used = result.attempts_used,
                total_applied = result.total_applied,
                unconfirmed_applies = result.unconfirmed_applies,
                final_pending = ?result.final_pending_count,
                "convergence run finished"
            );

            result
        }
        .instrument(span)
        .await
    }

    /// The state machine proper. Returns why it stopped.
    async fn drive(
        &self,
        run: &mut RunState,
        cancel: &CancellationToken,
    ) -> (StopReason, Option<String>) {
        let mut carried: Option<ObservedState> = None;
        let mut first_iteration = true;

        loop {
            if cancel.is_cancelled() {
                return (
                    StopReason::Cancelled,
                    Some("run cancelled by caller".to_string()),
                );
            }

            let state = match carried.take() {
                Some(state) => state,
                None => match self.observe().await {
                    Ok(state) => run.observed(state),
                    Err(err) => return (StopReason::AdapterUnavailable, Some(err.to_string())),
                },
            };

            let skip_zero_check = first_iteration && !self.config.initial_pending_check;
            first_iteration = false;

            if state.is_converged() && !skip_zero_check {
                return (StopReason::Converged, None);
            }

            if run.attempts_used >= self.config.max_attempts {
                return (
                    StopReason::AttemptBudgetExhausted,
                    Some(format!(
                        "{} attempts used with {} item(s) still pending",
                        run.attempts_used, state.pending_count
                    )),
                );
            }

            let selected = match self.select().await {
                Ok(item) => Ok(item),
                Err(AdapterError::NoSelectableItem(_)) if state.is_converged() => {
                    return (StopReason::Converged, None);
                }
                Err(err @ AdapterError::NoSelectableItem(_)) => {
                    return (StopReason::TerminalFailure, Some(err.to_string()));
                }
                Err(err) => Err(err),
            };

            let label = selected
                .as_ref()
                .map(|item| item.label.clone())
                .unwrap_or_default();
            let mut record =
                AttemptRecord::begin(run.next_attempt_number(), label, state.pending_count);

            let outcome = match selected {
                Ok(item) => self.apply(&item).await,
                Err(err) => ApplyOutcome::new(OutcomeKind::Indeterminate, err.to_string()),
            };
            let kind = outcome.kind;
            record.outcome = outcome;

            if kind.consumes_budget() {
                run.attempts_used += 1;
                run.consecutive_rate_limits = 0;
            } else {
                run.consecutive_rate_limits += 1;
            }

            let stop_now = match kind {
                OutcomeKind::TerminalFailure => Some(format!(
                    "terminal failure on attempt {}: {}",
                    record.attempt_number, record.outcome.message
                )),
                OutcomeKind::RateLimited
                    if run.consecutive_rate_limits > self.config.max_consecutive_rate_limits =>
                {
                    Some(format!(
                        "rate limited {} consecutive times (limit {})",
                        run.consecutive_rate_limits, self.config.max_consecutive_rate_limits
                    ))
                }
                _ => None,
            };

            if let Some(detail) = stop_now {
                // Best effort: the run ends regardless of whether this observation works.
                if let Ok(after) = self.observe().await {
                    record.pending_after = Some(run.observed(after).pending_count);
                }
                self.append(run, record).await;
                return (StopReason::TerminalFailure, Some(detail));
            }

            let wait = self.backoff.compute_wait(kind, run.attempts_used);
            record.waited_ms = duration_ms(pause(wait, cancel).await);

            if cancel.is_cancelled() {
                // Best effort, so the final pending count reflects this attempt.
                if let Ok(after) = self.observe().await {
                    record.pending_after = Some(run.observed(after).pending_count);
                }
                self.append(run, record).await;
                continue;
            }

            match self.observe().await {
                Ok(after) => {
                    let after = run.observed(after);
                    record.pending_after = Some(after.pending_count);
                    if kind == OutcomeKind::Success && !record.is_confirmed_apply() {
                        warn!(
                            attempt = record.attempt_number,
                            item = %record.item_label,
                            pending_before = record.pending_before,
                            pending_after = after.pending_count,
                            "apply reported success but pending count did not decrease"
                        );
                    }
                    self.append(run, record).await;
                    carried = Some(after);
                }
                Err(err) => {
                    self.append(run, record).await;
                    return (StopReason::AdapterUnavailable, Some(err.to_string()));
                }
            }
        }
    }

    async fn observe(&self) -> AdapterResult<ObservedState> {
        let timeout = self.config.per_attempt_timeout();
        bounded(timeout, self.adapter.observe())
            .await
            .unwrap_or_else(|| {
                Err(AdapterError::ObserveFailed(format!(
                    "observe timed out after {}ms",
                    timeout.as_millis()
                )))
            })
    }

    async fn select(&self) -> AdapterResult<PendingItem> {
        let timeout = self.config.per_attempt_timeout();
        bounded(timeout, self.adapter.select_next())
            .await
            .unwrap_or_else(|| {
                Err(AdapterError::ApplyFailed(format!(
                    "select timed out after {}ms",
                    timeout.as_millis()
                )))
            })
    }

    /// Apply one item and classify the result. Adapter faults become `Indeterminate`.
    async fn apply(&self, item: &PendingItem) -> ApplyOutcome {
        let timeout = self.config.per_attempt_timeout();
        debug!(item = %item.display_label(), "applying item");

        let signal = bounded(timeout, self.adapter.apply_next(item))
            .await
            .unwrap_or_else(|| {
                Err(AdapterError::ApplyFailed(format!(
                    "apply timed out after {}ms",
                    timeout.as_millis()
                )))
            });

        match signal {
            Ok(signal) => ApplyOutcome::new(self.classifier.classify(&signal), signal.summary()),
            Err(err) => ApplyOutcome::new(OutcomeKind::Indeterminate, err.to_string()),
        }
    }

    async fn append(&self, run: &mut RunState, record: AttemptRecord) {
        info!(
            attempt = record.attempt_number,
            item = %record.item_label,
            outcome = %record.outcome.kind,
            pending_before = record.pending_before,
            pending_after = ?record.pending_after,
            waited_ms = record.waited_ms,
            attempts_used = run.attempts_used,
            "attempt recorded"
        );

        if let Err(err) = self.recorder.append(&record).await {
            warn!(
                attempt = record.attempt_number,
                error = %err,
                "failed to record attempt"
            );
        }
        run.records.push(record);
    }
}

/// Await `fut` for at most `timeout`; `None` means it timed out.
async fn bounded<T, F>(timeout: Duration, fut: F) -> Option<T>
where
    F: Future<Output = T>,
{
    tokio::time::timeout(timeout, fut).await.ok()
}

/// Sleep for `wait`, returning early on cancellation. Returns the time actually waited.
async fn pause(wait: Duration, cancel: &CancellationToken) -> Duration {
    if wait.is_zero() {
        return Duration::ZERO;
    }
    let started = Instant::now();
    tokio::select! {
        () = tokio::time::sleep(wait) => {}
        () = cancel.cancelled() => {
            debug!("backoff wait interrupted by cancellation");
        }
    }
    started.elapsed()
}

fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
