//! Scripted in-process target for testing and simulation.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Mutex;

use crate::domain::errors::{AdapterError, AdapterResult};
use crate::domain::models::{ObservedState, OutcomeKind, PendingItem, RawSignal};
use crate::domain::ports::TargetAdapter;

/// What the scripted target does on one apply call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptStep {
    /// Return `signal`; when `applies` is set, one pending item moves to applied.
    Respond { signal: RawSignal, applies: bool },
    /// Fail the apply call before any signal is produced.
    Fail(String),
    /// Never return. Exercises the per-attempt timeout.
    Hang,
}

impl ScriptStep {
    pub const fn respond(signal: RawSignal, applies: bool) -> Self {
        Self::Respond { signal, applies }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self::Fail(message.into())
    }

    /// A canonical response that the default classifier maps to `kind`.
    pub fn outcome(kind: OutcomeKind) -> Self {
        match kind {
            OutcomeKind::Success => {
                Self::respond(RawSignal::text("Migration applied successfully"), true)
            }
            OutcomeKind::TransientFailure => Self::respond(
                RawSignal::text("Edge Function returned a non-2xx status code (502)"),
                false,
            ),
            OutcomeKind::TerminalFailure => Self::respond(
                RawSignal::text("Failed to run sql query: function exec_sql does not exist"),
                false,
            ),
            OutcomeKind::RateLimited => {
                Self::respond(RawSignal::text("Rate limit exceeded, try again later"), false)
            }
            OutcomeKind::Indeterminate => Self::respond(RawSignal::None, false),
        }
    }
}

#[derive(Debug)]
struct ScriptedState {
    pending: u64,
    applied: u64,
    steps: VecDeque<ScriptStep>,
    select_steps: VecDeque<ScriptStep>,
    applied_labels: Vec<String>,
}

/// In-process target whose apply responses follow a script.
///
/// Starts with `pending` items. Each `Respond { applies: true }` step moves one
/// item from pending to applied. Once the script runs out every apply succeeds.
pub struct ScriptedTargetAdapter {
    state: Mutex<ScriptedState>,
    observe_failure_at: Option<usize>,
    selectable: bool,
    observe_calls: AtomicUsize,
    select_calls: AtomicUsize,
    apply_calls: AtomicUsize,
}

impl ScriptedTargetAdapter {
    pub fn new(pending: u64) -> Self {
        Self {
            state: Mutex::new(ScriptedState {
                pending,
                applied: 0,
                steps: VecDeque::new(),
                select_steps: VecDeque::new(),
                applied_labels: Vec::new(),
            }),
            observe_failure_at: None,
            selectable: true,
            observe_calls: AtomicUsize::new(0),
            select_calls: AtomicUsize::new(0),
            apply_calls: AtomicUsize::new(0),
        }
    }

    /// Replace the apply script.
    #[must_use]
    pub fn with_script(mut self, steps: impl IntoIterator<Item = ScriptStep>) -> Self {
        self.state.get_mut().steps = steps.into_iter().collect();
        self
    }

    /// Script by outcome kind using canonical responses.
    #[must_use]
    pub fn with_outcomes(self, kinds: impl IntoIterator<Item = OutcomeKind>) -> Self {
        self.with_script(kinds.into_iter().map(ScriptStep::outcome))
    }

    /// Script the first `select_next()` calls.
    ///
    /// `Fail` returns a transport error and `Hang` never returns. A `Respond`
    /// step selects normally. Once the script runs out selection is normal.
    #[must_use]
    pub fn with_select_script(mut self, steps: impl IntoIterator<Item = ScriptStep>) -> Self {
        self.state.get_mut().select_steps = steps.into_iter().collect();
        self
    }

    /// Make every `observe()` from the `call_index`-th (0-based) onwards fail.
    #[must_use]
    pub const fn with_observe_failure_at(mut self, call_index: usize) -> Self {
        self.observe_failure_at = Some(call_index);
        self
    }

    /// Report pending items that can never be selected.
    #[must_use]
    pub const fn without_selectable_items(mut self) -> Self {
        self.selectable = false;
        self
    }

    pub fn observe_calls(&self) -> usize {
        self.observe_calls.load(Ordering::SeqCst)
    }

    pub fn select_calls(&self) -> usize {
        self.select_calls.load(Ordering::SeqCst)
    }

    pub fn apply_calls(&self) -> usize {
        self.apply_calls.load(Ordering::SeqCst)
    }

    /// Labels of items that were applied, in order.
    pub async fn applied_labels(&self) -> Vec<String> {
        self.state.lock().await.applied_labels.clone()
    }
}

#[async_trait]
impl TargetAdapter for ScriptedTargetAdapter {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn observe(&self) -> AdapterResult<ObservedState> {
        let call = self.observe_calls.fetch_add(1, Ordering::SeqCst);
        if self.observe_failure_at.is_some_and(|at| call >= at) {
            return Err(AdapterError::ObserveFailed(format!(
                "scripted observe failure on call {call}"
            )));
        }
        let state = self.state.lock().await;
        Ok(ObservedState::new(state.pending, state.applied))
    }

    async fn select_next(&self) -> AdapterResult<PendingItem> {
        self.select_calls.fetch_add(1, Ordering::SeqCst);
        let step = self.state.lock().await.select_steps.pop_front();
        match step {
            Some(ScriptStep::Fail(message)) => return Err(AdapterError::ApplyFailed(message)),
            Some(ScriptStep::Hang) => {
                std::future::pending::<()>().await;
                return Err(AdapterError::ApplyFailed("unreachable".to_string()));
            }
            Some(ScriptStep::Respond { .. }) | None => {}
        }

        let state = self.state.lock().await;
        if !self.selectable || state.pending == 0 {
            return Err(AdapterError::NoSelectableItem(format!(
                "{} pending but none selectable",
                state.pending
            )));
        }
        Ok(PendingItem::new(format!("{:04}_migration", state.applied + 1)))
    }

    async fn apply_next(&self, item: &PendingItem) -> AdapterResult<RawSignal> {
        self.apply_calls.fetch_add(1, Ordering::SeqCst);
        let step = {
            let mut state = self.state.lock().await;
            state
                .steps
                .pop_front()
                .unwrap_or_else(|| ScriptStep::outcome(OutcomeKind::Success))
        };

        match step {
            ScriptStep::Respond { signal, applies } => {
                if applies {
                    let mut state = self.state.lock().await;
                    if state.pending > 0 {
                        state.pending -= 1;
                        state.applied += 1;
                        state.applied_labels.push(item.label.clone());
                    }
                }
                Ok(signal)
            }
            ScriptStep::Fail(message) => Err(AdapterError::ApplyFailed(message)),
            ScriptStep::Hang => {
                std::future::pending::<()>().await;
                Err(AdapterError::ApplyFailed("unreachable".to_string()))
            }
        }
    }
}
