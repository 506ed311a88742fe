//! JSON report recorder.
//!
//! Writes one report pair per run into a directory:
//! - `<run_id>.attempts.jsonl`: one attempt record per line, appended as the run goes
//! - `<run_id>.summary.json`: the final result, written once

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use crate::domain::errors::RecorderResult;
use crate::domain::models::{AttemptRecord, ConvergenceResult};
use crate::domain::ports::AuditRecorder;

/// Durable audit trail for one convergence run.
pub struct JsonReportRecorder {
    attempts_path: PathBuf,
    summary_path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonReportRecorder {
    /// Create the report directory if needed. Files are created on first write.
    pub async fn new(report_dir: impl AsRef<Path>, run_id: Uuid) -> RecorderResult<Self> {
        let report_dir = report_dir.as_ref();
        fs::create_dir_all(report_dir).await?;

        Ok(Self {
            attempts_path: report_dir.join(format!("{run_id}.attempts.jsonl")),
            summary_path: report_dir.join(format!("{run_id}.summary.json")),
            write_lock: Mutex::new(()),
        })
    }

    pub fn attempts_path(&self) -> &Path {
        &self.attempts_path
    }

    pub fn summary_path(&self) -> &Path {
        &self.summary_path
    }
}

#[async_trait]
impl AuditRecorder for JsonReportRecorder {
    async fn append(&self, record: &AttemptRecord) -> RecorderResult<()> {
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');

        let _guard = self.write_lock.lock().await;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.attempts_path)
            .await?;
        file.write_all(&line).await?;
        file.flush().await?;
        Ok(())
    }

    async fn finalize(&self, result: &ConvergenceResult) -> RecorderResult<()> {
        let json = serde_json::to_vec_pretty(result)?;

        let _guard = self.write_lock.lock().await;
        fs::write(&self.summary_path, json).await?;
        debug!(path = %self.summary_path.display(), "wrote convergence summary");
        Ok(())
    }
}
