//! Audit trail domain model
//!
//! One entry is appended per completed scan. The entry is intentionally
//! free of source content: counts, score, LLM usage and timing only.

use serde::{Deserialize, Serialize};

/// Audit metadata for a single scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub scan_id: String,
    pub files_scanned: usize,
    pub violations_found: usize,
    pub risk_score: u32,
    pub llm_invoked: bool,
    #[serde(default)]
    pub llm_tokens_used: u32,
    #[serde(default)]
    pub duration_ms: f64,
    #[serde(default = "default_true")]
    pub deterministic_only: bool,
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_serialization() {
        let entry = AuditEntry {
            scan_id: "abc12345".to_string(),
            files_scanned: 3,
            violations_found: 2,
            risk_score: 50,
            llm_invoked: false,
            llm_tokens_used: 0,
            duration_ms: 12.5,
            deterministic_only: true,
        };

        let json = serde_json::to_string(&entry).unwrap();
        assert!(json.contains("\"scan_id\":\"abc12345\""));
        assert!(json.contains("\"deterministic_only\":true"));

        let restored: AuditEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.risk_score, 50);
    }
}
