//! Port trait definitions (Hexagonal Architecture)
//!
//! The controller depends only on these traits:
//! - TargetAdapter: observe and apply against the remote system
//! - AuditRecorder: persist attempt records and the final verdict
//! - OutcomeClassifier: map raw signals to outcome kinds
//! - BackoffPolicy: decide how long to wait between attempts
//!
//! Concrete implementations live in `adapters` and `services`.

pub mod audit_recorder;
pub mod backoff_policy;
pub mod outcome_classifier;
pub mod target_adapter;

pub use audit_recorder::AuditRecorder;
pub use backoff_policy::BackoffPolicy;
pub use outcome_classifier::OutcomeClassifier;
pub use target_adapter::TargetAdapter;
