//! Domain errors for the convergence controller.

use thiserror::Error;

/// Failures raised by a target adapter.
///
/// These are genuine faults, distinct from the outcome kinds the classifier
/// produces. The controller decides per variant whether the run continues.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AdapterError {
    /// `observe()` could not return a state at all. Fatal to the run.
    #[error("Failed to observe target state: {0}")]
    ObserveFailed(String),

    /// `apply_next()` failed before producing a classifiable signal.
    #[error("Apply call failed before producing a signal: {0}")]
    ApplyFailed(String),

    /// The target reports pending work but no concrete item could be selected.
    #[error("No selectable item: {0}")]
    NoSelectableItem(String),
}

pub type AdapterResult<T> = Result<T, AdapterError>;

/// Failures raised by an audit recorder.
#[derive(Debug, Error)]
pub enum RecorderError {
    #[error("Audit I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Audit serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type RecorderResult<T> = Result<T, RecorderError>;
