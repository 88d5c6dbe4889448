//! Explainable risk scoring
//!
//! risk = round_half_even( sum(base_weight * factors) / max_possible * 100 )
//!
//! where factors = 1.0
//!   + 0.3 * clamp(blast_radius / max_graph_depth, 0, 1)
//!   + 0.2 * [node mutates shared state]
//!   + 0.3 * [test failure present]
//!   + 0.2 * [async boundary crossing]
//!
//! and max_possible = sum(base_weight * 2.0), the theoretical factor
//! ceiling. Every term lands in the breakdown so the score is
//! reconstructable. Rounding is half-to-even for cross-platform
//! determinism.

use std::collections::BTreeSet;

use tracing::debug;

use crate::domain::{
    CallGraph, FlowFacts, RiskBreakdown, RuleViolation, ViolationContribution,
};
use crate::domain::risk::FORMULA;

/// Rules whose finding is itself an async-boundary defect, independent of
/// the anchored node's edges.
const ASYNC_RULES: [&str; 3] = ["missing_await", "blocking_io_in_async", "race_condition"];

pub struct RiskScorer {
    max_graph_depth: usize,
}

impl RiskScorer {
    pub fn new(max_graph_depth: usize) -> Self {
        Self {
            max_graph_depth: max_graph_depth.max(1),
        }
    }

    /// Compute the breakdown for a scan. Violation order in the breakdown
    /// matches rule-engine emission order.
    pub fn score(
        &self,
        violations: &[RuleViolation],
        graph: &CallGraph,
        flow: &FlowFacts,
        test_failures: &BTreeSet<String>,
    ) -> RiskBreakdown {
        if violations.is_empty() {
            return RiskBreakdown::empty();
        }

        let mut contributions = Vec::with_capacity(violations.len());
        let mut total_weighted = 0.0;

        for violation in violations {
            let base_weight = violation.severity.base_weight();

            let blast_radius = if violation.graph_node_id.is_empty() {
                0
            } else {
                graph.blast_radius(&violation.graph_node_id, self.max_graph_depth)
            };
            let blast_ratio = (blast_radius as f64 / self.max_graph_depth as f64).clamp(0.0, 1.0);
            let blast_factor = 0.3 * blast_ratio;

            let mutates_state = !violation.graph_node_id.is_empty()
                && (flow.mutates_shared_state(&violation.graph_node_id)
                    || graph
                        .nodes
                        .get(&violation.graph_node_id)
                        .map(|n| !n.writes_shared_state.is_empty())
                        .unwrap_or(false));
            let state_factor = if mutates_state { 0.2 } else { 0.0 };

            let test_factor = if test_failures.contains(&violation.graph_node_id) {
                0.3
            } else {
                0.0
            };

            let crosses_boundary = ASYNC_RULES.contains(&violation.rule_id.as_str())
                || (!violation.graph_node_id.is_empty()
                    && graph.crosses_async_boundary(&violation.graph_node_id));
            let async_factor = if crosses_boundary { 0.2 } else { 0.0 };

            let total_factor = 1.0 + blast_factor + state_factor + test_factor + async_factor;
            let weighted_score = base_weight as f64 * total_factor;
            total_weighted += weighted_score;

            contributions.push(ViolationContribution {
                rule_id: violation.rule_id.clone(),
                severity: violation.severity.to_string(),
                file: violation.file.clone(),
                line: violation.line,
                base_weight,
                blast_radius_factor: round4(blast_factor),
                state_mutation_factor: round4(state_factor),
                test_failure_factor: round4(test_factor),
                async_boundary_factor: round4(async_factor),
                total_factor: round4(total_factor),
                weighted_score: round4(weighted_score),
            });
        }

        let max_possible: f64 = violations
            .iter()
            .map(|v| v.severity.base_weight() as f64 * 2.0)
            .sum();
        let raw = total_weighted / max_possible * 100.0;
        let total_score = round_half_even(raw).clamp(0, 100) as u32;

        let summary = build_summary(total_score, violations);
        debug!(total_score, violations = violations.len(), "Risk score computed");

        RiskBreakdown {
            total_score,
            max_possible_score: round2(max_possible),
            violation_contributions: contributions,
            formula: FORMULA.to_string(),
            summary,
        }
    }
}

fn build_summary(total_score: u32, violations: &[RuleViolation]) -> String {
    let count_of = |s: &str| {
        violations
            .iter()
            .filter(|v| v.severity.as_str() == s)
            .count()
    };
    let mut parts = Vec::new();
    for severity in ["critical", "high", "medium", "low"] {
        let count = count_of(severity);
        if count > 0 {
            parts.push(format!("{count} {severity}"));
        }
    }

    format!(
        "Risk score {total_score}/100 based on {} violation(s) ({}). Weighted by blast radius, \
         state mutation impact, test failures, and async boundary crossings.",
        violations.len(),
        parts.join(", ")
    )
}

/// Banker's rounding on a non-negative score.
fn round_half_even(value: f64) -> i64 {
    let floor = value.floor();
    let diff = value - floor;
    if (diff - 0.5).abs() < 1e-9 {
        let floor_int = floor as i64;
        if floor_int % 2 == 0 {
            floor_int
        } else {
            floor_int + 1
        }
    } else {
        value.round() as i64
    }
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{severity_bucket, Severity, SeverityBucket};
    use proptest::prelude::*;

    fn violation(rule_id: &str, severity: Severity, node: &str) -> RuleViolation {
        RuleViolation {
            rule_id: rule_id.to_string(),
            severity,
            file: "a.py".to_string(),
            line: 2,
            end_line: None,
            title: String::new(),
            description: String::new(),
            evidence: vec![],
            affected_function: String::new(),
            graph_node_id: node.to_string(),
            unresolved: node.is_empty(),
        }
    }

    #[test]
    fn test_empty_violations_score_zero() {
        let scorer = RiskScorer::new(10);
        let breakdown = scorer.score(&[], &CallGraph::new(), &FlowFacts::default(), &BTreeSet::new());
        assert_eq!(breakdown.total_score, 0);
        assert!(breakdown.violation_contributions.is_empty());
    }

    #[test]
    fn test_single_critical_isolated_node_scores_fifty() {
        // One critical violation with radius 0 and no factors:
        // round(10 * 1.0 / 20 * 100) = 50, bucket Medium.
        let scorer = RiskScorer::new(10);
        let violations = vec![violation("dangerous_eval", Severity::Critical, "")];
        let breakdown = scorer.score(
            &violations,
            &CallGraph::new(),
            &FlowFacts::default(),
            &BTreeSet::new(),
        );
        // dangerous_eval is not an async rule; no factors apply.
        assert_eq!(breakdown.total_score, 50);
        assert_eq!(severity_bucket(breakdown.total_score), SeverityBucket::Medium);
        let contribution = &breakdown.violation_contributions[0];
        assert_eq!(contribution.base_weight, 10);
        assert_eq!(contribution.total_factor, 1.0);
        assert_eq!(contribution.weighted_score, 10.0);
        assert_eq!(breakdown.max_possible_score, 20.0);
    }

    #[test]
    fn test_async_rule_gets_boundary_factor() {
        let scorer = RiskScorer::new(10);
        let violations = vec![violation("missing_await", Severity::High, "")];
        let breakdown = scorer.score(
            &violations,
            &CallGraph::new(),
            &FlowFacts::default(),
            &BTreeSet::new(),
        );
        assert_eq!(breakdown.violation_contributions[0].async_boundary_factor, 0.2);
        // 7 * 1.2 / 14 * 100 = 60
        assert_eq!(breakdown.total_score, 60);
    }

    #[test]
    fn test_test_failure_factor() {
        let scorer = RiskScorer::new(10);
        let violations = vec![violation("unsanitized_io", Severity::High, "a.py::run")];
        let mut failures = BTreeSet::new();
        failures.insert("a.py::run".to_string());
        let breakdown = scorer.score(
            &violations,
            &CallGraph::new(),
            &FlowFacts::default(),
            &failures,
        );
        assert_eq!(breakdown.violation_contributions[0].test_failure_factor, 0.3);
    }

    #[test]
    fn test_score_capped_at_100() {
        let scorer = RiskScorer::new(1);
        // All factors maxed cannot exceed the cap by construction, but the
        // clamp also guards pathological float behaviour.
        let violations: Vec<RuleViolation> = (0..5)
            .map(|_| violation("race_condition", Severity::Critical, ""))
            .collect();
        let breakdown = scorer.score(
            &violations,
            &CallGraph::new(),
            &FlowFacts::default(),
            &BTreeSet::new(),
        );
        assert!(breakdown.total_score <= 100);
    }

    #[test]
    fn test_round_half_even() {
        assert_eq!(round_half_even(0.5), 0);
        assert_eq!(round_half_even(1.5), 2);
        assert_eq!(round_half_even(2.5), 2);
        assert_eq!(round_half_even(3.5), 4);
        assert_eq!(round_half_even(2.4), 2);
        assert_eq!(round_half_even(2.6), 3);
    }

    #[test]
    fn test_breakdown_order_matches_input() {
        let scorer = RiskScorer::new(10);
        let violations = vec![
            violation("race_condition", Severity::Critical, ""),
            violation("shared_mutable_state", Severity::Medium, ""),
        ];
        let breakdown = scorer.score(
            &violations,
            &CallGraph::new(),
            &FlowFacts::default(),
            &BTreeSet::new(),
        );
        assert_eq!(breakdown.violation_contributions[0].rule_id, "race_condition");
        assert_eq!(
            breakdown.violation_contributions[1].rule_id,
            "shared_mutable_state"
        );
    }

    proptest! {
        // Adding a violation never decreases the relative weighted sum
        // beyond the cap, and the score stays in range.
        #[test]
        fn test_score_always_in_range(count in 1usize..20) {
            let scorer = RiskScorer::new(10);
            let violations: Vec<RuleViolation> = (0..count)
                .map(|i| {
                    let severity = match i % 4 {
                        0 => Severity::Critical,
                        1 => Severity::High,
                        2 => Severity::Medium,
                        _ => Severity::Low,
                    };
                    violation("unsanitized_io", severity, "")
                })
                .collect();
            let breakdown = scorer.score(
                &violations,
                &CallGraph::new(),
                &FlowFacts::default(),
                &BTreeSet::new(),
            );
            prop_assert!(breakdown.total_score <= 100);
            prop_assert_eq!(breakdown.violation_contributions.len(), count);
        }
    }
}
