//! Outcome and stop-reason color mapping for CLI output.

use console::{style, StyledObject};

use crate::domain::models::{OutcomeKind, StopReason};

/// Returns a colored outcome kind.
///
/// Green: success. Yellow: transient. Magenta: rate limited. Red: terminal.
/// Dim: indeterminate.
pub fn colorize_outcome(kind: OutcomeKind) -> StyledObject<&'static str> {
    let text = style(kind.as_str());
    match kind {
        OutcomeKind::Success => text.green(),
        OutcomeKind::TransientFailure => text.yellow(),
        OutcomeKind::RateLimited => text.magenta(),
        OutcomeKind::TerminalFailure => text.red().bold(),
        OutcomeKind::Indeterminate => text.dim(),
    }
}

/// Returns a colored stop reason.
pub fn colorize_stop_reason(reason: StopReason) -> StyledObject<&'static str> {
    let text = style(reason.as_str());
    match reason {
        StopReason::Converged => text.green().bold(),
        StopReason::AttemptBudgetExhausted => text.yellow().bold(),
        StopReason::Cancelled => text.dim(),
        StopReason::TerminalFailure | StopReason::AdapterUnavailable => text.red().bold(),
    }
}

/// Styled label for detail views (bold + dimmed colon).
pub fn label(name: &str) -> String {
    format!("{}{}", style(name).bold(), style(":").dim())
}
