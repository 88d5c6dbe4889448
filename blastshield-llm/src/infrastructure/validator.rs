//! Strict response validation
//!
//! The whole response is rejected - triggering fallback - if any single
//! check fails: a file outside the scan input, a patch outside the
//! violation's line envelope, a hallucinated rule id, a schema mismatch,
//! or a missing mandatory field. Partial acceptance is deliberately not
//! supported: all-or-nothing is what keeps the issue set deterministic.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::Value;
use tracing::warn;

use blastshield_analysis::domain::RuleViolation;

use crate::domain::LlmRefinement;

/// Patch line tolerance around a violation's range.
pub const LINE_TOLERANCE: u32 = 5;

/// Result of validating one LLM response.
#[derive(Debug)]
pub struct ValidationOutcome {
    pub valid: bool,
    pub errors: Vec<String>,
    pub refinement: Option<LlmRefinement>,
}

impl ValidationOutcome {
    fn rejected(errors: Vec<String>) -> Self {
        Self {
            valid: false,
            errors,
            refinement: None,
        }
    }
}

/// Validate a parsed response against the deterministic violation set.
pub fn validate_refinement(
    parsed: &Value,
    file_whitelist: &BTreeSet<String>,
    violations: &[RuleViolation],
) -> ValidationOutcome {
    // Schema and mandatory fields via typed deserialization.
    let refinement: LlmRefinement = match serde_json::from_value(parsed.clone()) {
        Ok(refinement) => refinement,
        Err(e) => {
            let outcome =
                ValidationOutcome::rejected(vec![format!("schema validation failed: {e}")]);
            warn!(errors = ?outcome.errors, "LLM response rejected");
            return outcome;
        }
    };

    let valid_rule_ids: BTreeSet<&str> = violations.iter().map(|v| v.rule_id.as_str()).collect();
    let mut ranges_by_rule: BTreeMap<&str, Vec<(u32, u32)>> = BTreeMap::new();
    for violation in violations {
        ranges_by_rule
            .entry(violation.rule_id.as_str())
            .or_default()
            .push((violation.line, violation.end_line_or_line()));
    }

    let mut errors = Vec::new();

    for explanation in &refinement.explanations {
        // The rule id must exist in the deterministic output.
        if !valid_rule_ids.contains(explanation.violation_rule_id.as_str()) {
            errors.push(format!(
                "hallucinated rule_id '{}' not in deterministic output",
                explanation.violation_rule_id
            ));
            continue;
        }

        for patch in &explanation.patch_suggestions {
            // The file must be in the scan input.
            if !file_whitelist.contains(&patch.file) {
                errors.push(format!(
                    "patch references file '{}' not in scan input",
                    patch.file
                ));
            }

            // The patch must sit inside the +/-5-line envelope of a
            // violation with the matching rule id.
            let ranges = ranges_by_rule
                .get(explanation.violation_rule_id.as_str())
                .map(|r| r.as_slice())
                .unwrap_or(&[]);
            let in_envelope = ranges.iter().any(|(start, end)| {
                patch.start_line >= start.saturating_sub(LINE_TOLERANCE)
                    && patch.end_line <= end + LINE_TOLERANCE
            });
            if !in_envelope {
                errors.push(format!(
                    "patch range {}-{} in '{}' is outside the violation envelope for '{}'",
                    patch.start_line, patch.end_line, patch.file, explanation.violation_rule_id
                ));
            }
        }
    }

    if errors.is_empty() {
        ValidationOutcome {
            valid: true,
            errors,
            refinement: Some(refinement),
        }
    } else {
        warn!(error_count = errors.len(), errors = ?errors, "LLM response rejected");
        ValidationOutcome::rejected(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blastshield_analysis::domain::Severity;
    use serde_json::json;

    fn violation(rule_id: &str, file: &str, line: u32) -> RuleViolation {
        RuleViolation {
            rule_id: rule_id.to_string(),
            severity: Severity::Critical,
            file: file.to_string(),
            line,
            end_line: None,
            title: String::new(),
            description: String::new(),
            evidence: vec![],
            affected_function: String::new(),
            graph_node_id: String::new(),
            unresolved: true,
        }
    }

    fn whitelist() -> BTreeSet<String> {
        ["a.py".to_string()].into_iter().collect()
    }

    fn response(file: &str, start: u32, end: u32) -> Value {
        json!({
            "explanations": [{
                "violation_rule_id": "dangerous_eval",
                "natural_language_explanation": "explained",
                "production_risk_summary": "risky",
                "patch_suggestions": [{
                    "file": file,
                    "start_line": start,
                    "end_line": end,
                    "new_code": "safe code"
                }]
            }]
        })
    }

    #[test]
    fn test_valid_response_accepted() {
        let violations = vec![violation("dangerous_eval", "a.py", 7)];
        let outcome = validate_refinement(&response("a.py", 6, 8), &whitelist(), &violations);
        assert!(outcome.valid);
        assert!(outcome.refinement.is_some());
    }

    #[test]
    fn test_patch_outside_envelope_rejected() {
        let violations = vec![violation("dangerous_eval", "a.py", 7)];
        let outcome = validate_refinement(&response("a.py", 50, 52), &whitelist(), &violations);
        assert!(!outcome.valid);
        assert!(outcome.errors[0].contains("outside the violation envelope"));
    }

    #[test]
    fn test_unknown_file_rejected() {
        let violations = vec![violation("dangerous_eval", "a.py", 7)];
        let outcome = validate_refinement(&response("evil.py", 6, 8), &whitelist(), &violations);
        assert!(!outcome.valid);
        assert!(outcome.errors.iter().any(|e| e.contains("evil.py")));
    }

    #[test]
    fn test_hallucinated_rule_id_rejected() {
        let violations = vec![violation("unsanitized_io", "a.py", 7)];
        let outcome = validate_refinement(&response("a.py", 6, 8), &whitelist(), &violations);
        assert!(!outcome.valid);
        assert!(outcome.errors[0].contains("hallucinated rule_id"));
    }

    #[test]
    fn test_schema_mismatch_rejected() {
        let violations = vec![violation("dangerous_eval", "a.py", 7)];
        let bad = json!({ "explanations": [{ "violation_rule_id": "dangerous_eval" }] });
        let outcome = validate_refinement(&bad, &whitelist(), &violations);
        assert!(!outcome.valid);
        assert!(outcome.errors[0].contains("schema validation failed"));
    }

    #[test]
    fn test_envelope_respects_line_floor() {
        // Violation at line 2: the envelope floor saturates at 0.
        let violations = vec![violation("dangerous_eval", "a.py", 2)];
        let outcome = validate_refinement(&response("a.py", 1, 3), &whitelist(), &violations);
        assert!(outcome.valid);
    }
}
