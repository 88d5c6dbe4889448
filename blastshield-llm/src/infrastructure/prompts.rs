//! Structured prompt construction
//!
//! The refiner never sees raw source. It receives the serialized
//! deterministic violations, the call-graph subgraph around them, the flow
//! facts they rest on, the risk breakdown, and the file-path whitelist,
//! under fixed instructions that forbid inventing anything.

use std::collections::BTreeSet;

use serde_json::json;

use blastshield_analysis::domain::{CallGraph, FlowFacts, RiskBreakdown, RuleViolation};

pub const SYSTEM_PROMPT: &str = "\
You are BlastShield AI, an assistant that explains deterministic code analysis findings.

You MUST NOT invent new issues. You ONLY explain and suggest patches for the violations already detected by the deterministic engine.

You receive:
1. A list of rule violations (detected deterministically - these are FACTS)
2. A call graph subgraph showing affected functions and their relationships
3. Data-flow facts and test failure results
4. A risk scoring breakdown

Your task:
- For each violation, write a clear natural language explanation
- Suggest minimal, targeted code patches (only for the affected lines)
- Summarize the overall blast impact

STRICT RULES:
- ONLY reference files from the provided file whitelist
- Patches must target ONLY the violation line range (plus/minus 5 lines max)
- NEVER invent new violations or rule ids not in the input
- NEVER reference functions or classes not in the subgraph
- Output STRICT JSON matching this schema:

{
  \"explanations\": [
    {
      \"violation_rule_id\": \"exact rule_id from input\",
      \"natural_language_explanation\": \"...\",
      \"production_risk_summary\": \"...\",
      \"patch_suggestions\": [
        {
          \"file\": \"exact file path from whitelist\",
          \"start_line\": 0,
          \"end_line\": 0,
          \"new_code\": \"replacement code\",
          \"rationale\": \"why this patch fixes the issue\"
        }
      ]
    }
  ],
  \"blast_impact_summary\": \"overall impact paragraph\",
  \"overall_recommendation\": \"ship/hold/rollback recommendation\"
}";

pub struct PromptBuilder;

impl PromptBuilder {
    /// Compose the user prompt from deterministic facts.
    pub fn build_refinement_prompt(
        violations: &[RuleViolation],
        graph: &CallGraph,
        flow: &FlowFacts,
        breakdown: &RiskBreakdown,
        file_whitelist: &BTreeSet<String>,
        test_failures_json: &str,
        subgraph_hops: usize,
    ) -> String {
        let violations_json = serde_json::to_string_pretty(&json!(violations
            .iter()
            .map(|v| {
                json!({
                    "rule_id": v.rule_id,
                    "severity": v.severity.as_str(),
                    "file": v.file,
                    "line": v.line,
                    "end_line": v.end_line_or_line(),
                    "title": v.title,
                    "description": v.description,
                    "evidence": v.evidence,
                    "affected_function": v.affected_function,
                })
            })
            .collect::<Vec<_>>()))
        .unwrap_or_else(|_| "[]".to_string());

        let seed: BTreeSet<String> = violations
            .iter()
            .filter(|v| !v.graph_node_id.is_empty())
            .map(|v| v.graph_node_id.clone())
            .collect();
        let subgraph = graph.affected_subgraph(&seed, subgraph_hops);
        let subgraph_json =
            serde_json::to_string_pretty(&subgraph).unwrap_or_else(|_| "{}".to_string());

        let relevant_flow: Vec<_> = seed
            .iter()
            .filter_map(|id| flow.get(id).map(|f| json!({ "node": id, "facts": f })))
            .collect();
        let flow_json =
            serde_json::to_string_pretty(&relevant_flow).unwrap_or_else(|_| "[]".to_string());

        let breakdown_json =
            serde_json::to_string_pretty(breakdown).unwrap_or_else(|_| "{}".to_string());
        let whitelist_json = serde_json::to_string(&file_whitelist.iter().collect::<Vec<_>>())
            .unwrap_or_else(|_| "[]".to_string());

        format!(
            "=== DETERMINISTIC VIOLATIONS (FACTS - do not invent more) ===\n{violations_json}\n\n\
             === CALL GRAPH SUBGRAPH ===\n{subgraph_json}\n\n\
             === DATA FLOW FACTS ===\n{flow_json}\n\n\
             === TEST FAILURES ===\n{test_failures_json}\n\n\
             === RISK BREAKDOWN ===\n{breakdown_json}\n\n\
             === VALID FILE PATHS (whitelist) ===\n{whitelist_json}\n\n\
             Respond with STRICT JSON only. No markdown, no comments, no text outside JSON.\n"
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blastshield_analysis::domain::Severity;

    #[test]
    fn test_prompt_contains_facts_not_source() {
        let violations = vec![RuleViolation {
            rule_id: "dangerous_eval".to_string(),
            severity: Severity::Critical,
            file: "a.py".to_string(),
            line: 2,
            end_line: None,
            title: "Dangerous 'eval()' with non-literal argument".to_string(),
            description: "eval of dynamic input".to_string(),
            evidence: vec!["call to 'eval' at line 2".to_string()],
            affected_function: "run".to_string(),
            graph_node_id: "a.py::run".to_string(),
            unresolved: false,
        }];
        let whitelist: BTreeSet<String> = ["a.py".to_string()].into_iter().collect();
        let breakdown = RiskBreakdown::empty();

        let prompt = PromptBuilder::build_refinement_prompt(
            &violations,
            &CallGraph::new(),
            &FlowFacts::default(),
            &breakdown,
            &whitelist,
            "[]",
            1,
        );

        assert!(prompt.contains("dangerous_eval"));
        assert!(prompt.contains("a.py"));
        assert!(prompt.contains("VALID FILE PATHS"));
        // No raw source anywhere in the prompt.
        assert!(!prompt.contains("return eval(x)"));
    }
}
