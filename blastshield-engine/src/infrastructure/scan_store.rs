//! In-memory background scan store
//!
//! Keyed by scan id with a bounded record lifetime. Status transitions are
//! monotonic: a terminal record never moves again, and stale updates from
//! a cancelled task cannot resurrect it.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::domain::entities::ScanStatus;
use crate::domain::report::{ScanReport, ScanStatusResponse};

struct ScanRecord {
    status: ScanStatus,
    progress: f32,
    report: Option<ScanReport>,
    error: Option<String>,
    created_at: Instant,
    cancel: CancellationToken,
}

pub struct InMemoryScanStore {
    records: RwLock<HashMap<String, ScanRecord>>,
    ttl: Duration,
}

impl InMemoryScanStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// Register a queued scan and hand back its cancellation token.
    pub async fn insert_queued(&self, scan_id: &str) -> CancellationToken {
        let token = CancellationToken::new();
        let mut records = self.records.write().await;
        prune(&mut records, self.ttl);
        records.insert(
            scan_id.to_string(),
            ScanRecord {
                status: ScanStatus::Queued,
                progress: 0.0,
                report: None,
                error: None,
                created_at: Instant::now(),
                cancel: token.clone(),
            },
        );
        token
    }

    pub async fn set_running(&self, scan_id: &str) {
        self.transition(scan_id, ScanStatus::Running, None, None).await;
    }

    pub async fn set_progress(&self, scan_id: &str, progress: f32) {
        let mut records = self.records.write().await;
        if let Some(record) = records.get_mut(scan_id) {
            if !record.status.is_terminal() {
                record.progress = progress.clamp(0.0, 1.0);
            }
        }
    }

    pub async fn complete(&self, scan_id: &str, report: ScanReport) {
        self.transition(scan_id, ScanStatus::Complete, Some(report), None)
            .await;
    }

    pub async fn fail(&self, scan_id: &str, error: String) {
        self.transition(scan_id, ScanStatus::Failed, None, Some(error))
            .await;
    }

    async fn transition(
        &self,
        scan_id: &str,
        status: ScanStatus,
        report: Option<ScanReport>,
        error: Option<String>,
    ) {
        let mut records = self.records.write().await;
        let Some(record) = records.get_mut(scan_id) else {
            return;
        };
        if record.status.is_terminal() || status.rank() < record.status.rank() {
            debug!(scan_id, from = %record.status, to = %status, "Ignoring non-monotonic transition");
            return;
        }
        record.status = status;
        if status.is_terminal() {
            record.progress = 1.0;
        }
        if report.is_some() {
            record.report = report;
        }
        if error.is_some() {
            record.error = error;
        }
    }

    /// Snapshot a record for the status operation.
    pub async fn get(&self, scan_id: &str) -> Option<ScanStatusResponse> {
        let records = self.records.read().await;
        records.get(scan_id).map(|record| ScanStatusResponse {
            scan_id: scan_id.to_string(),
            status: record.status,
            progress: record.progress,
            report: record.report.clone(),
            error: record.error.clone(),
        })
    }

    /// Cancel a queued/running scan. Returns false if the scan is unknown
    /// or already terminal.
    pub async fn cancel(&self, scan_id: &str) -> bool {
        let records = self.records.read().await;
        match records.get(scan_id) {
            Some(record) if !record.status.is_terminal() => {
                record.cancel.cancel();
                true
            }
            _ => false,
        }
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }
}

fn prune(records: &mut HashMap<String, ScanRecord>, ttl: Duration) {
    records.retain(|_, record| record.created_at.elapsed() < ttl);
}
