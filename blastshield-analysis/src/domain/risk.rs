//! Explainable risk score breakdown
//!
//! Every factor of every violation is recorded so the user-facing score is
//! reconstructable from the breakdown alone.

use serde::{Deserialize, Serialize};

/// How a single violation contributes to the total score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViolationContribution {
    pub rule_id: String,
    pub severity: String,
    pub file: String,
    pub line: u32,
    pub base_weight: u32,
    pub blast_radius_factor: f64,
    pub state_mutation_factor: f64,
    pub test_failure_factor: f64,
    pub async_boundary_factor: f64,
    pub total_factor: f64,
    pub weighted_score: f64,
}

/// Full explainable breakdown of the risk score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskBreakdown {
    /// Final risk score, 0-100
    pub total_score: u32,
    pub max_possible_score: f64,
    pub violation_contributions: Vec<ViolationContribution>,
    pub formula: String,
    pub summary: String,
}

impl RiskBreakdown {
    pub fn empty() -> Self {
        Self {
            total_score: 0,
            max_possible_score: 0.0,
            violation_contributions: Vec::new(),
            formula: FORMULA.to_string(),
            summary: "No violations detected. Risk score is 0.".to_string(),
        }
    }
}

pub(crate) const FORMULA: &str = "risk = round_half_even(sum(base_weight * factors) / max_possible * 100)";

/// Severity bucket of a total score. Total on [0, 100].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SeverityBucket {
    Low,
    Medium,
    High,
    Critical,
}

impl SeverityBucket {
    pub fn as_str(&self) -> &'static str {
        match self {
            SeverityBucket::Low => "Low",
            SeverityBucket::Medium => "Medium",
            SeverityBucket::High => "High",
            SeverityBucket::Critical => "Critical",
        }
    }
}

impl std::fmt::Display for SeverityBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Bucket a total score: [0,20] Low, (20,50] Medium, (50,80] High,
/// (80,100] Critical.
pub fn severity_bucket(total: u32) -> SeverityBucket {
    match total {
        0..=20 => SeverityBucket::Low,
        21..=50 => SeverityBucket::Medium,
        51..=80 => SeverityBucket::High,
        _ => SeverityBucket::Critical,
    }
}
