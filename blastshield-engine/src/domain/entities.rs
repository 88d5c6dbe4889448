//! Scan lifecycle

use serde::{Deserialize, Serialize};

/// Lifecycle state of a background scan. Transitions are monotonic:
/// queued -> running -> complete | failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanStatus {
    Queued,
    Running,
    Complete,
    Failed,
}

impl ScanStatus {
    /// Rank used to enforce monotonic transitions.
    pub fn rank(&self) -> u8 {
        match self {
            ScanStatus::Queued => 0,
            ScanStatus::Running => 1,
            ScanStatus::Complete => 2,
            ScanStatus::Failed => 2,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ScanStatus::Complete | ScanStatus::Failed)
    }
}

impl std::fmt::Display for ScanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ScanStatus::Queued => "queued",
            ScanStatus::Running => "running",
            ScanStatus::Complete => "complete",
            ScanStatus::Failed => "failed",
        };
        write!(f, "{s}")
    }
}
