use crate::domain::models::{OutcomeKind, RawSignal};

/// Maps an adapter's raw signal to exactly one outcome kind.
pub trait OutcomeClassifier: Send + Sync {
    fn classify(&self, signal: &RawSignal) -> OutcomeKind;
}
