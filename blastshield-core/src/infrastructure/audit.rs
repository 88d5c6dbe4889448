//! Append-only JSON-lines audit sink
//!
//! Each line is one `AuditEntry` plus a UTC timestamp. Writes are
//! best-effort: a failed append is logged and never fails the scan.

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tracing::{debug, error};

use crate::domain::AuditEntry;

/// Audit persistence errors.
#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("Failed to write audit record: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to serialize audit record: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Audit sink interface.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn append(&self, entry: &AuditEntry) -> Result<(), AuditError>;
}

#[derive(Serialize)]
struct AuditRecord<'a> {
    timestamp: String,
    #[serde(flatten)]
    entry: &'a AuditEntry,
}

/// File-backed sink writing newline-delimited JSON.
pub struct JsonlAuditSink {
    log_path: PathBuf,
}

impl JsonlAuditSink {
    pub fn new(log_path: impl Into<PathBuf>) -> Self {
        Self {
            log_path: log_path.into(),
        }
    }
}

#[async_trait]
impl AuditSink for JsonlAuditSink {
    async fn append(&self, entry: &AuditEntry) -> Result<(), AuditError> {
        let record = AuditRecord {
            timestamp: Utc::now().to_rfc3339(),
            entry,
        };
        let mut line = serde_json::to_string(&record)?;
        line.push('\n');

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;

        debug!(scan_id = %entry.scan_id, path = %self.log_path.display(), "Audit entry appended");
        Ok(())
    }
}

/// Sink that drops entries; used in tests and embedded deployments.
pub struct NoopAuditSink;

#[async_trait]
impl AuditSink for NoopAuditSink {
    async fn append(&self, _entry: &AuditEntry) -> Result<(), AuditError> {
        Ok(())
    }
}

/// Append an entry, downgrading any failure to a log line. The audit trail
/// must never fail a scan.
pub async fn append_best_effort(sink: &dyn AuditSink, entry: &AuditEntry) {
    if let Err(e) = sink.append(entry).await {
        error!(scan_id = %entry.scan_id, error = %e, "Audit append failed");
    }
}
