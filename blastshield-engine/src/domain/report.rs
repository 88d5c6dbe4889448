//! Host-facing request and report payloads
//!
//! Field names here are part of the wire contract consumed by the editor
//! extension and the PR workflow; the camelCase outliers (`riskScore`,
//! `testImpact`) are pinned for compatibility with the legacy API.

use serde::{Deserialize, Serialize};

use blastshield_analysis::domain::RiskBreakdown;
use blastshield_core::domain::AuditEntry;

use super::entities::ScanStatus;

/// A single file submitted for scanning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileInput {
    pub path: String,
    pub content: String,
}

/// Scan mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanMode {
    #[default]
    Full,
    Pr,
}

/// Request body for the scan and pr-scan operations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanRequest {
    #[serde(default)]
    pub files: Vec<FileInput>,
    #[serde(default)]
    pub scan_mode: ScanMode,
    /// Deprecated: single combined code string. Accepted for
    /// back-compatibility and converted to one `FileInput`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub combined: Option<String>,
}

/// A code patch suggestion targeting a specific line range.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Patch {
    pub file: String,
    pub start_line: u32,
    pub end_line: u32,
    pub new_code: String,
}

/// A single reported issue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    pub id: String,
    pub severity: String,
    pub file: String,
    pub line: u32,
    pub rule_id: String,
    /// Short issue title
    pub issue: String,
    pub explanation: String,
    pub risk: String,
    pub evidence: Vec<String>,
    #[serde(default)]
    pub patches: Vec<Patch>,
    #[serde(rename = "testImpact", default)]
    pub test_impact: Vec<String>,
}

/// Full scan report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanReport {
    pub issues: Vec<Issue>,
    #[serde(rename = "riskScore")]
    pub risk_score: u32,
    pub risk_breakdown: RiskBreakdown,
    pub summary: String,
    pub llm_used: bool,
    pub deterministic_only: bool,
    pub audit: AuditEntry,
}

/// Top-level response for scan operations. `report` is `None` when the
/// scan went to the background; the caller polls by `scan_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanResponse {
    pub message: String,
    pub scan_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<ScanReport>,
}

/// Response for polling a background scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanStatusResponse {
    pub scan_id: String,
    pub status: ScanStatus,
    pub progress: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<ScanReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Health probe payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub model: String,
    pub version: String,
    pub engine: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_field_names_are_contract() {
        let report = ScanReport {
            issues: vec![Issue {
                id: "dangerous_eval-1".to_string(),
                severity: "critical".to_string(),
                file: "a.py".to_string(),
                line: 2,
                rule_id: "dangerous_eval".to_string(),
                issue: "title".to_string(),
                explanation: "explained".to_string(),
                risk: "risky".to_string(),
                evidence: vec![],
                patches: vec![],
                test_impact: vec![],
            }],
            risk_score: 50,
            risk_breakdown: RiskBreakdown::empty(),
            summary: "summary".to_string(),
            llm_used: false,
            deterministic_only: true,
            audit: AuditEntry {
                scan_id: "x".to_string(),
                files_scanned: 1,
                violations_found: 1,
                risk_score: 50,
                llm_invoked: false,
                llm_tokens_used: 0,
                duration_ms: 1.0,
                deterministic_only: true,
            },
        };

        let json = serde_json::to_value(&report).unwrap();
        assert!(json.get("riskScore").is_some());
        assert!(json.get("risk_score").is_none());
        assert!(json["issues"][0].get("testImpact").is_some());
    }

    #[test]
    fn test_scan_request_defaults() {
        let request: ScanRequest = serde_json::from_str(r#"{"files": []}"#).unwrap();
        assert_eq!(request.scan_mode, ScanMode::Full);
        assert!(request.combined.is_none());

        let legacy: ScanRequest =
            serde_json::from_str(r#"{"combined": "def f(): pass"}"#).unwrap();
        assert!(legacy.files.is_empty());
        assert!(legacy.combined.is_some());
    }
}
