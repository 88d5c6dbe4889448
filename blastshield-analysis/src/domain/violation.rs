//! Rule violations and rule-engine results

use serde::{Deserialize, Serialize};

/// Violation severity. Ordering is by weight, critical first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

impl Severity {
    /// Base weight used by the risk scorer.
    pub fn base_weight(&self) -> u32 {
        match self {
            Severity::Critical => 10,
            Severity::High => 7,
            Severity::Medium => 4,
            Severity::Low => 1,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single deterministic finding. The atomic unit consumed by the scorer,
/// the refiner and the report assembler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleViolation {
    pub rule_id: String,
    pub severity: Severity,
    pub file: String,
    pub line: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_line: Option<u32>,
    pub title: String,
    pub description: String,
    /// Ordered evidence chain, reconstructable from deterministic inputs
    pub evidence: Vec<String>,
    #[serde(default)]
    pub affected_function: String,
    /// Call-graph node id, or empty with `unresolved = true`
    #[serde(default)]
    pub graph_node_id: String,
    /// Set when the violation could not be anchored to a graph node
    #[serde(default)]
    pub unresolved: bool,
}

impl RuleViolation {
    pub fn end_line_or_line(&self) -> u32 {
        self.end_line.unwrap_or(self.line)
    }
}

/// Result of running the full rule bank over a file set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuleResult {
    pub violations: Vec<RuleViolation>,
    pub rules_executed: Vec<String>,
    pub total_files_scanned: usize,
    pub scan_duration_ms: f64,
}

impl RuleResult {
    pub fn has_critical(&self) -> bool {
        self.violations.iter().any(|v| v.severity == Severity::Critical)
    }
}
