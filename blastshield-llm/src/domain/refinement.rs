//! Typed refinement model for validated LLM output
//!
//! Mandatory fields are plain (non-`Option`, non-defaulted) so that a
//! missing field fails deserialization and triggers the fallback path.

use serde::{Deserialize, Serialize};

/// A patch suggestion tied to a deterministic violation's line envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatchSuggestion {
    pub file: String,
    pub start_line: u32,
    pub end_line: u32,
    pub new_code: String,
    #[serde(default)]
    pub rationale: String,
}

/// Refined prose for a single deterministic violation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefinedExplanation {
    pub violation_rule_id: String,
    pub natural_language_explanation: String,
    pub production_risk_summary: String,
    #[serde(default)]
    pub patch_suggestions: Vec<PatchSuggestion>,
}

/// The complete validated refinement for one scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmRefinement {
    pub explanations: Vec<RefinedExplanation>,
    #[serde(default)]
    pub blast_impact_summary: String,
    #[serde(default)]
    pub overall_recommendation: String,
}

impl LlmRefinement {
    /// Explanation for a rule id, if present.
    pub fn explanation_for(&self, rule_id: &str) -> Option<&RefinedExplanation> {
        self.explanations
            .iter()
            .find(|e| e.violation_rule_id == rule_id)
    }
}
