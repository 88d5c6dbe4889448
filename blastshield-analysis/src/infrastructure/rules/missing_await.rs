//! Async call sites whose result is never awaited

use crate::domain::{RuleViolation, Severity, EXTERNAL_NODE};

use super::{split_node_id, Rule, RuleContext, RuleError};

pub struct MissingAwait;

impl Rule for MissingAwait {
    fn id(&self) -> &'static str {
        "missing_await"
    }

    /// Fires for every edge where an async caller invokes an async callee
    /// without `await`: the coroutine is created and silently dropped.
    fn check(&self, ctx: &RuleContext<'_>) -> Result<Vec<RuleViolation>, RuleError> {
        let mut violations = Vec::new();

        for edge in &ctx.graph.edges {
            if edge.awaited || edge.target == EXTERNAL_NODE {
                continue;
            }
            let Some(caller) = ctx.graph.nodes.get(&edge.source) else {
                continue;
            };
            let Some(callee) = ctx.graph.nodes.get(&edge.target) else {
                continue;
            };
            if !caller.is_async || !callee.is_async {
                continue;
            }

            let (module, caller_name) = split_node_id(&edge.source);
            let callee_name = split_node_id(&edge.target).1;

            violations.push(RuleViolation {
                rule_id: self.id().to_string(),
                severity: Severity::High,
                file: module.to_string(),
                line: edge.line,
                end_line: None,
                title: format!("Async function '{callee_name}' called without await"),
                description: format!(
                    "In async function '{caller_name}', '{callee_name}' is called without \
                     'await'. The coroutine object is created but never scheduled, so the \
                     operation silently does not happen."
                ),
                evidence: vec![
                    format!("caller '{caller_name}' is async"),
                    format!("callee '{callee_name}' is async"),
                    format!("call at line {} is not awaited", edge.line),
                ],
                affected_function: caller_name.to_string(),
                graph_node_id: edge.source.clone(),
                unresolved: false,
            });
        }

        Ok(violations)
    }
}
