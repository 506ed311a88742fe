//! Signal classification for apply attempts.
//!
//! Every apply call yields a raw signal: banner text, an HTTP status with a
//! body, or nothing at all. [`SignalClassifier`] turns that into one
//! [`OutcomeKind`] using status-code ranges and configurable case-insensitive
//! patterns. When several kinds match, the highest priority wins:
//!
//! `RateLimited > TerminalFailure > TransientFailure > Success > Indeterminate`
//!
//! Rate limiting is checked first because throttling responses usually carry
//! generic "error" text as well.

use regex::{RegexSet, RegexSetBuilder};

use crate::domain::models::{ClassifierConfig, OutcomeKind, RawSignal};
use crate::domain::ports::OutcomeClassifier;

/// Pattern- and status-code-based outcome classifier.
#[derive(Debug, Clone)]
pub struct SignalClassifier {
    rate_limited: RegexSet,
    terminal: RegexSet,
    transient: RegexSet,
    success: RegexSet,
}

impl SignalClassifier {
    /// Compile the pattern sets from configuration.
    pub fn from_config(config: &ClassifierConfig) -> Result<Self, regex::Error> {
        Ok(Self {
            rate_limited: compile(&config.rate_limited)?,
            terminal: compile(&config.terminal)?,
            transient: compile(&config.transient)?,
            success: compile(&config.success)?,
        })
    }

    fn patterns_for(&self, kind: OutcomeKind) -> Option<&RegexSet> {
        match kind {
            OutcomeKind::RateLimited => Some(&self.rate_limited),
            OutcomeKind::TerminalFailure => Some(&self.terminal),
            OutcomeKind::TransientFailure => Some(&self.transient),
            OutcomeKind::Success => Some(&self.success),
            OutcomeKind::Indeterminate => None,
        }
    }

    fn text_kind(&self, text: &str) -> Option<OutcomeKind> {
        if text.trim().is_empty() {
            return None;
        }
        OutcomeKind::BY_PRIORITY.into_iter().find(|kind| {
            self.patterns_for(*kind)
                .is_some_and(|set| set.is_match(text))
        })
    }
}

impl Default for SignalClassifier {
    fn default() -> Self {
        // Built-in patterns are static and known to compile.
        Self::from_config(&ClassifierConfig::default())
            .unwrap_or_else(|err| unreachable!("default classifier patterns are invalid: {err}"))
    }
}

impl OutcomeClassifier for SignalClassifier {
    fn classify(&self, signal: &RawSignal) -> OutcomeKind {
        let from_status = signal.status_code().and_then(status_kind);
        let from_text = self.text_kind(signal.body());

        from_status
            .into_iter()
            .chain(from_text)
            .max()
            .unwrap_or(OutcomeKind::Indeterminate)
    }
}

/// Outcome implied by an HTTP-style status code alone.
pub const fn status_kind(code: u16) -> Option<OutcomeKind> {
    match code {
        429 => Some(OutcomeKind::RateLimited),
        400 | 401 | 403 | 404 | 405 | 409 | 410 | 422 | 501 => Some(OutcomeKind::TerminalFailure),
        408 | 500..=599 => Some(OutcomeKind::TransientFailure),
        200..=299 => Some(OutcomeKind::Success),
        _ => None,
    }
}

fn compile(patterns: &[String]) -> Result<RegexSet, regex::Error> {
    RegexSetBuilder::new(patterns).case_insensitive(true).build()
}
