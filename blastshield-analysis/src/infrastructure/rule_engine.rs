//! Rule engine
//!
//! Runs the rule bank in registration order over the full file set.
//! Synthetic violations (unparseable or unsupported files) come first, then
//! each rule's output sorted by `(file, line)`. A rule failing internally
//! is downgraded to a `rule_error` violation; it never fails the scan.

use std::collections::BTreeMap;
use std::time::Instant;

use tracing::{info, warn};

use blastshield_core::config::AnalysisConfig;

use crate::domain::{CallGraph, FlowFacts, ModuleAst, RuleResult, RuleViolation, Severity};
use crate::infrastructure::rules::{default_rules, Rule, RuleContext};

pub struct RuleEngine {
    rules: Vec<Box<dyn Rule>>,
}

impl RuleEngine {
    pub fn new() -> Self {
        Self {
            rules: default_rules(),
        }
    }

    pub fn with_rules(rules: Vec<Box<dyn Rule>>) -> Self {
        Self { rules }
    }

    pub fn run(
        &self,
        modules: &BTreeMap<String, ModuleAst>,
        graph: &CallGraph,
        flow: &FlowFacts,
        config: &AnalysisConfig,
    ) -> RuleResult {
        let start = Instant::now();
        let mut violations = synthetic_violations(modules);
        let mut rules_executed = Vec::with_capacity(self.rules.len());

        let ctx = RuleContext {
            modules,
            graph,
            flow,
            config,
        };

        for rule in &self.rules {
            rules_executed.push(rule.id().to_string());
            match rule.check(&ctx) {
                Ok(mut found) => {
                    found.sort_by(|a, b| (a.file.as_str(), a.line).cmp(&(b.file.as_str(), b.line)));
                    violations.extend(found);
                }
                Err(e) => {
                    warn!(rule = rule.id(), error = %e, "Rule failed internally");
                    let file = modules.keys().next().cloned().unwrap_or_default();
                    violations.push(RuleViolation {
                        rule_id: "rule_error".to_string(),
                        severity: Severity::Low,
                        file,
                        line: 0,
                        end_line: None,
                        title: format!("Rule '{}' internal error", rule.id()),
                        description: format!("Rule execution failed: {e}"),
                        evidence: vec![format!("rule '{}' raised: {e}", rule.id())],
                        affected_function: String::new(),
                        graph_node_id: String::new(),
                        unresolved: true,
                    });
                }
            }
        }

        let result = RuleResult {
            violations,
            rules_executed,
            total_files_scanned: modules.len(),
            scan_duration_ms: start.elapsed().as_secs_f64() * 1000.0,
        };
        info!(
            violations = result.violations.len(),
            files = result.total_files_scanned,
            "Rule engine pass complete"
        );
        result
    }
}

impl Default for RuleEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// One low-severity marker per unparseable or unsupported file, in path
/// order, ahead of the detection rules.
fn synthetic_violations(modules: &BTreeMap<String, ModuleAst>) -> Vec<RuleViolation> {
    let mut out = Vec::new();
    for (path, module) in modules {
        if !module.language.is_supported() {
            out.push(RuleViolation {
                rule_id: "unsupported_language".to_string(),
                severity: Severity::Low,
                file: path.clone(),
                line: 1,
                end_line: None,
                title: format!("Unsupported source language '{}'", module.language),
                description: format!(
                    "'{path}' is {} source; only Python is analysed. The file was skipped.",
                    module.language
                ),
                evidence: vec![format!("detected language: {}", module.language)],
                affected_function: String::new(),
                graph_node_id: String::new(),
                unresolved: true,
            });
        } else if module.parse_error {
            let detail = module
                .parse_error_detail
                .clone()
                .unwrap_or_else(|| "syntax error".to_string());
            out.push(RuleViolation {
                rule_id: "parse_error".to_string(),
                severity: Severity::Low,
                file: path.clone(),
                line: 1,
                end_line: None,
                title: format!("Parse error in '{path}'"),
                description: format!("The file could not be parsed ({detail}) and was skipped."),
                evidence: vec![detail],
                affected_function: String::new(),
                graph_node_id: String::new(),
                unresolved: true,
            });
        }
    }
    out
}
