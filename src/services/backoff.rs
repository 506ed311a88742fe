use std::time::Duration;

use crate::domain::models::{BackoffConfig, BackoffStrategy, OutcomeKind};
use crate::domain::ports::BackoffPolicy;

/// Backoff policy driven by [`BackoffConfig`].
///
/// Transient and indeterminate outcomes wait `base * attempts` (linear) or
/// `base * 2^(attempts-1)` (exponential), capped at `max_delay_ms`. Rate
/// limits wait a separate fixed delay, successes a short fixed pause, and
/// terminal failures not at all.
#[derive(Debug, Clone)]
pub struct StandardBackoff {
    config: BackoffConfig,
}

impl StandardBackoff {
    pub const fn new(config: BackoffConfig) -> Self {
        Self { config }
    }

    pub const fn config(&self) -> &BackoffConfig {
        &self.config
    }

    fn retry_delay_ms(&self, attempts_used: u32) -> u64 {
        let attempts = attempts_used.max(1);
        let raw = match self.config.strategy {
            BackoffStrategy::Linear => self.config.base_delay_ms.saturating_mul(u64::from(attempts)),
            BackoffStrategy::Exponential => self
                .config
                .base_delay_ms
                .saturating_mul(2_u64.saturating_pow(attempts - 1)),
        };
        raw.min(self.config.max_delay_ms)
    }
}

impl Default for StandardBackoff {
    fn default() -> Self {
        Self::new(BackoffConfig::default())
    }
}

impl BackoffPolicy for StandardBackoff {
    fn compute_wait(&self, kind: OutcomeKind, attempts_used: u32) -> Duration {
        let ms = match kind {
            OutcomeKind::Success => self.config.success_pause_ms,
            OutcomeKind::TerminalFailure => 0,
            OutcomeKind::RateLimited => self.config.rate_limit_delay_ms,
            OutcomeKind::TransientFailure | OutcomeKind::Indeterminate => {
                self.retry_delay_ms(attempts_used)
            }
        };
        Duration::from_millis(ms)
    }
}
