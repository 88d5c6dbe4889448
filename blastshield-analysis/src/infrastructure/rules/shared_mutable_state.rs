//! Module-level mutable containers with writers

use crate::domain::{RuleViolation, Severity};

use super::{split_node_id, Rule, RuleContext, RuleError};

pub struct SharedMutableState;

impl Rule for SharedMutableState {
    fn id(&self) -> &'static str {
        "shared_mutable_state"
    }

    /// Fires for any module-level mutable container with at least one
    /// writer function, regardless of whether a race is provable.
    fn check(&self, ctx: &RuleContext<'_>) -> Result<Vec<RuleViolation>, RuleError> {
        let mut violations = Vec::new();

        for (state_key, access) in &ctx.graph.shared_state {
            if access.writers.is_empty() {
                continue;
            }
            let (module, var_name) = split_node_id(state_key);
            let writer_names: Vec<&str> = access
                .writers
                .iter()
                .map(|id| split_node_id(id).1)
                .collect();
            let reader_names: Vec<&str> = access
                .readers
                .iter()
                .map(|id| split_node_id(id).1)
                .collect();
            let anchor = access.writers.iter().next().cloned().unwrap_or_default();

            let mut evidence = vec![
                format!(
                    "module-level {} '{var_name}' defined at line {}",
                    access.container.label(),
                    access.line
                ),
                format!("written by: {}", writer_names.join(", ")),
            ];
            if !reader_names.is_empty() {
                evidence.push(format!("read by: {}", reader_names.join(", ")));
            }

            violations.push(RuleViolation {
                rule_id: self.id().to_string(),
                severity: Severity::Medium,
                file: module.to_string(),
                line: access.line,
                end_line: None,
                title: format!(
                    "Shared mutable state: '{var_name}' written by {} function(s)",
                    access.writers.len()
                ),
                description: format!(
                    "Module-level {} '{var_name}' is mutated by {}. Shared mutable state \
                     couples functions implicitly and is unsafe under concurrent access.",
                    access.container.label(),
                    writer_names.join(", "),
                ),
                evidence,
                affected_function: split_node_id(&anchor).1.to_string(),
                graph_node_id: anchor,
                unresolved: false,
            });
        }

        Ok(violations)
    }
}
