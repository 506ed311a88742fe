use std::time::Duration;

use crate::domain::models::OutcomeKind;

/// Computes how long to wait after an attempt before re-observing.
pub trait BackoffPolicy: Send + Sync {
    /// `attempts_used` is the budget already consumed, including the attempt
    /// that produced `kind` when that kind consumes budget.
    fn compute_wait(&self, kind: OutcomeKind, attempts_used: u32) -> Duration;
}
