//! In-memory audit recorder.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::errors::RecorderResult;
use crate::domain::models::{AttemptRecord, ConvergenceResult};
use crate::domain::ports::AuditRecorder;

#[derive(Debug, Default)]
struct Recorded {
    records: Vec<AttemptRecord>,
    result: Option<ConvergenceResult>,
}

/// Keeps every record and the final result in memory.
///
/// Cheap to clone; clones share the same storage.
#[derive(Debug, Clone, Default)]
pub struct InMemoryAuditRecorder {
    inner: Arc<RwLock<Recorded>>,
}

impl InMemoryAuditRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// All appended records, in append order.
    pub async fn records(&self) -> Vec<AttemptRecord> {
        self.inner.read().await.records.clone()
    }

    /// The finalized result, if the run has ended.
    pub async fn result(&self) -> Option<ConvergenceResult> {
        self.inner.read().await.result.clone()
    }
}

#[async_trait]
impl AuditRecorder for InMemoryAuditRecorder {
    async fn append(&self, record: &AttemptRecord) -> RecorderResult<()> {
        self.inner.write().await.records.push(record.clone());
        Ok(())
    }

    async fn finalize(&self, result: &ConvergenceResult) -> RecorderResult<()> {
        self.inner.write().await.result = Some(result.clone());
        Ok(())
    }
}
