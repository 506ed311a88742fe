//! Audit recorder port.

use async_trait::async_trait;

use crate::domain::errors::RecorderResult;
use crate::domain::models::{AttemptRecord, ConvergenceResult};

/// Sink for the audit trail of a run.
///
/// Storage format is entirely the recorder's concern. The controller calls
/// `append` once per finished attempt, in attempt order, and `finalize`
/// exactly once at the end of the run.
#[async_trait]
pub trait AuditRecorder: Send + Sync {
    async fn append(&self, record: &AttemptRecord) -> RecorderResult<()>;

    async fn finalize(&self, result: &ConvergenceResult) -> RecorderResult<()>;
}
