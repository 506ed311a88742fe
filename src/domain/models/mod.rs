pub mod attempt;
pub mod config;
pub mod outcome;
pub mod state;

pub use attempt::{AttemptRecord, ConvergenceResult, StopReason};
pub use config::{
    AuditConfig, BackoffConfig, BackoffStrategy, ClassifierConfig, Config, ControllerConfig,
    LogFormat, LoggingConfig, RotationPolicy, TargetConfig,
};
pub use outcome::{ApplyOutcome, OutcomeKind, RawSignal};
pub use state::{ObservedState, PendingItem};
