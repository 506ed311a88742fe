//! migrate-converge - Migration Convergence Controller
//!
//! Drives a remote migration target from "N items pending" to "zero pending",
//! one item per attempt, classifying every response and backing off according
//! to what went wrong.
//!
//! # Architecture
//!
//! This crate follows Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): Models, errors and the ports the controller depends on
//! - **Service Layer** (`services`): The convergence loop, outcome classifier and backoff policy
//! - **Adapters** (`adapters`): Target adapters (HTTP, scripted) and audit recorders
//! - **Infrastructure Layer** (`infrastructure`): Configuration and logging
//! - **CLI Layer** (`cli`): The `converge` command-line interface
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use migrate_converge::adapters::audit::InMemoryAuditRecorder;
//! use migrate_converge::adapters::target::ScriptedTargetAdapter;
//! use migrate_converge::services::{ConvergenceController, SignalClassifier, StandardBackoff};
//! use tokio_util::sync::CancellationToken;
//!
//! let controller = ConvergenceController::new(
//!     Arc::new(ScriptedTargetAdapter::new(3)),
//!     Arc::new(SignalClassifier::default()),
//!     Arc::new(StandardBackoff::default()),
//!     Arc::new(InMemoryAuditRecorder::new()),
//!     Default::default(),
//! );
//! let result = controller.run(CancellationToken::new()).await;
//! assert!(result.converged);
//! ```

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::errors::{AdapterError, RecorderError};
pub use domain::models::{
    ApplyOutcome, AttemptRecord, Config, ControllerConfig, ConvergenceResult, ObservedState,
    OutcomeKind, PendingItem, RawSignal, StopReason,
};
pub use domain::ports::{AuditRecorder, BackoffPolicy, OutcomeClassifier, TargetAdapter};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{ConvergenceController, SignalClassifier, StandardBackoff};
