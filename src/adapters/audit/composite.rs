//! Fan-out recorder.

use async_trait::async_trait;
use std::sync::Arc;

use crate::domain::errors::RecorderResult;
use crate::domain::models::{AttemptRecord, ConvergenceResult};
use crate::domain::ports::AuditRecorder;

/// Forwards to every inner recorder in order.
///
/// All recorders are called even when an earlier one fails; the first error
/// is returned.
#[derive(Default)]
pub struct CompositeAuditRecorder {
    recorders: Vec<Arc<dyn AuditRecorder>>,
}

impl CompositeAuditRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, recorder: Arc<dyn AuditRecorder>) -> Self {
        self.recorders.push(recorder);
        self
    }

    pub fn len(&self) -> usize {
        self.recorders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recorders.is_empty()
    }
}

#[async_trait]
impl AuditRecorder for CompositeAuditRecorder {
    async fn append(&self, record: &AttemptRecord) -> RecorderResult<()> {
        let mut first_err = None;
        for recorder in &self.recorders {
            if let Err(err) = recorder.append(record).await {
                first_err.get_or_insert(err);
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    async fn finalize(&self, result: &ConvergenceResult) -> RecorderResult<()> {
        let mut first_err = None;
        for recorder in &self.recorders {
            if let Err(err) = recorder.finalize(result).await {
                first_err.get_or_insert(err);
            }
        }
        first_err.map_or(Ok(()), Err)
    }
}
