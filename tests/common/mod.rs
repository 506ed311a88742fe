//! Common test utilities for integration tests
//!
//! Shared fixtures for building controllers around scripted targets and
//! recorders that capture what the controller reported.

#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use migrate_converge::adapters::audit::InMemoryAuditRecorder;
use migrate_converge::domain::errors::{RecorderError, RecorderResult};
use migrate_converge::domain::models::{
    AttemptRecord, BackoffConfig, ControllerConfig, ConvergenceResult, OutcomeKind,
};
use migrate_converge::domain::ports::{AuditRecorder, TargetAdapter};
use migrate_converge::services::{ConvergenceController, SignalClassifier, StandardBackoff};

/// Setup test logging
///
/// Initializes tracing subscriber for test output.
pub fn setup_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// Build a controller with the default classifier.
pub fn controller(
    adapter: Arc<dyn TargetAdapter>,
    recorder: Arc<dyn AuditRecorder>,
    config: ControllerConfig,
    backoff: BackoffConfig,
) -> ConvergenceController {
    ConvergenceController::new(
        adapter,
        Arc::new(SignalClassifier::default()),
        Arc::new(StandardBackoff::new(backoff)),
        recorder,
        config,
    )
}

/// Controller with zero backoff delays and default controller settings.
pub fn immediate_controller(
    adapter: Arc<dyn TargetAdapter>,
    recorder: &InMemoryAuditRecorder,
) -> ConvergenceController {
    controller(
        adapter,
        Arc::new(recorder.clone()),
        ControllerConfig::default(),
        BackoffConfig::immediate(),
    )
}

pub fn kinds(records: &[AttemptRecord]) -> Vec<OutcomeKind> {
    records.iter().map(AttemptRecord::kind).collect()
}

/// Records the sequence of recorder calls.
#[derive(Default)]
pub struct CallLog {
    pub calls: Mutex<Vec<String>>,
}

#[async_trait]
impl AuditRecorder for CallLog {
    async fn append(&self, record: &AttemptRecord) -> RecorderResult<()> {
        self.calls
            .lock()
            .await
            .push(format!("append:{}", record.attempt_number));
        Ok(())
    }

    async fn finalize(&self, result: &ConvergenceResult) -> RecorderResult<()> {
        self.calls
            .lock()
            .await
            .push(format!("finalize:{}", result.stop_reason));
        Ok(())
    }
}

/// A recorder whose storage is always broken.
pub struct FailingRecorder;

#[async_trait]
impl AuditRecorder for FailingRecorder {
    async fn append(&self, _record: &AttemptRecord) -> RecorderResult<()> {
        Err(RecorderError::Io(std::io::Error::other("read-only file system")))
    }

    async fn finalize(&self, _result: &ConvergenceResult) -> RecorderResult<()> {
        Err(RecorderError::Io(std::io::Error::other("read-only file system")))
    }
}
