//! Audit trail types produced by a convergence run.
//!
//! A run yields an ordered sequence of [`AttemptRecord`]s and exactly one
//! [`ConvergenceResult`] derived from them once every record is final.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::outcome::{ApplyOutcome, OutcomeKind};

/// One row of the audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptRecord {
    /// 1-based sequence number over every apply call in the run, rate-limited ones included.
    pub attempt_number: u32,
    /// Label of the item the attempt targeted.
    pub item_label: String,
    pub pending_before: u64,
    pub outcome: ApplyOutcome,
    /// Pending count observed after the attempt; `None` when that observation failed.
    pub pending_after: Option<u64>,
    /// Time slept after the attempt before re-observing.
    pub waited_ms: u64,
    /// When the apply call was issued.
    pub timestamp: DateTime<Utc>,
}

impl AttemptRecord {
    /// Open a record just before the apply call. Outcome and counts are filled in later.
    pub fn begin(attempt_number: u32, item_label: impl Into<String>, pending_before: u64) -> Self {
        Self {
            attempt_number,
            item_label: item_label.into(),
            pending_before,
            outcome: ApplyOutcome::new(OutcomeKind::Indeterminate, ""),
            pending_after: None,
            waited_ms: 0,
            timestamp: Utc::now(),
        }
    }

    pub fn kind(&self) -> OutcomeKind {
        self.outcome.kind
    }

    /// A `Success` whose follow-up observation showed fewer pending items.
    pub fn is_confirmed_apply(&self) -> bool {
        self.kind() == OutcomeKind::Success
            && self
                .pending_after
                .is_some_and(|after| after < self.pending_before)
    }
}

/// Why a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The observed pending count reached zero.
    Converged,
    /// A terminal outcome, a missing selectable item, or too many consecutive rate limits.
    TerminalFailure,
    /// `max_attempts` attempts were used without converging.
    AttemptBudgetExhausted,
    /// The target could not be observed.
    AdapterUnavailable,
    /// The caller cancelled the run.
    Cancelled,
}

impl StopReason {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Converged => "converged",
            Self::TerminalFailure => "terminal_failure",
            Self::AttemptBudgetExhausted => "attempt_budget_exhausted",
            Self::AdapterUnavailable => "adapter_unavailable",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Final verdict of a run. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConvergenceResult {
    pub run_id: Uuid,
    /// Last pending count observed; `None` if the target was never observed.
    pub final_pending_count: Option<u64>,
    /// `Success` attempts confirmed by a lower pending count afterwards.
    pub total_applied: u32,
    /// `Success` attempts the next observation did not confirm.
    #[serde(default)]
    pub unconfirmed_applies: u32,
    /// Attempts charged against the budget (rate-limited attempts are free).
    pub attempts_used: u32,
    pub converged: bool,
    pub stop_reason: StopReason,
    /// Explanation of the stop when it was not a plain convergence.
    pub detail: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl ConvergenceResult {
    /// Build the verdict from the finished record sequence.
    pub fn from_records(
        run_id: Uuid,
        records: &[AttemptRecord],
        attempts_used: u32,
        final_pending_count: Option<u64>,
        stop_reason: StopReason,
        detail: Option<String>,
        started_at: DateTime<Utc>,
    ) -> Self {
        let (confirmed, unconfirmed): (Vec<_>, Vec<_>) = records
            .iter()
            .filter(|r| r.kind() == OutcomeKind::Success)
            .partition(|r| r.is_confirmed_apply());

        Self {
            run_id,
            final_pending_count,
            total_applied: u32::try_from(confirmed.len()).unwrap_or(u32::MAX),
            unconfirmed_applies: u32::try_from(unconfirmed.len()).unwrap_or(u32::MAX),
            attempts_used,
            converged: final_pending_count == Some(0),
            stop_reason,
            detail,
            started_at,
            finished_at: Utc::now(),
        }
    }

    /// Wall-clock time the run took.
    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}
