//! Shared state written concurrently from async contexts

use crate::domain::{RuleViolation, Severity};

use super::{split_node_id, Rule, RuleContext, RuleError};

pub struct RaceCondition;

impl Rule for RaceCondition {
    fn id(&self) -> &'static str {
        "race_condition"
    }

    /// Fires when a shared-state entry has two or more writers that run in
    /// async contexts (async functions, or functions reachable from async
    /// entry points), or when a multi-writer set overlaps the functions
    /// crossing an async boundary.
    fn check(&self, ctx: &RuleContext<'_>) -> Result<Vec<RuleViolation>, RuleError> {
        let async_reachable = ctx.graph.reachable_from_async_entry_points();
        let boundary_crossers = ctx.graph.async_boundary_crossers();

        let mut violations = Vec::new();
        for (state_key, access) in &ctx.graph.shared_state {
            if access.writers.len() < 2 {
                continue;
            }

            let async_writers: Vec<&String> = access
                .writers
                .iter()
                .filter(|id| {
                    ctx.graph.nodes.get(*id).map(|n| n.is_async).unwrap_or(false)
                        || async_reachable.contains(*id)
                })
                .collect();

            let crossing_writers: Vec<&String> = access
                .writers
                .iter()
                .filter(|id| boundary_crossers.contains(*id))
                .collect();

            if async_writers.len() < 2 && crossing_writers.is_empty() {
                continue;
            }

            let (module, var_name) = split_node_id(state_key);
            let writer_names: Vec<&str> = access
                .writers
                .iter()
                .map(|id| split_node_id(id).1)
                .collect();
            let anchor = async_writers
                .first()
                .copied()
                .or_else(|| access.writers.iter().next())
                .cloned()
                .unwrap_or_default();

            violations.push(RuleViolation {
                rule_id: self.id().to_string(),
                severity: Severity::Critical,
                file: module.to_string(),
                line: access.line,
                end_line: None,
                title: format!("Race condition: '{var_name}' written by multiple async contexts"),
                description: format!(
                    "Module-level {} '{var_name}' is written by {} functions ({}) that execute \
                     in concurrent async contexts. Without synchronization, interleaved writes \
                     will corrupt the shared value non-deterministically.",
                    access.container.label(),
                    access.writers.len(),
                    writer_names.join(", "),
                ),
                evidence: vec![
                    format!(
                        "shared mutable variable '{var_name}' ({}) defined at line {}",
                        access.container.label(),
                        access.line
                    ),
                    format!("writers: {}", writer_names.join(", ")),
                    format!(
                        "{} writer(s) run in async contexts",
                        async_writers.len().max(crossing_writers.len())
                    ),
                    "no synchronization primitive detected".to_string(),
                ],
                affected_function: split_node_id(&anchor).1.to_string(),
                graph_node_id: anchor,
                unresolved: false,
            });
        }

        Ok(violations)
    }
}
