//! Tainted parameter flow into filesystem/system/subprocess sinks

use crate::domain::{RuleViolation, Severity};

use super::{split_node_id, Rule, RuleContext, RuleError};

/// Sinks already owned by `dangerous_eval`; this rule covers the I/O side.
const EVAL_SINKS: [&str; 4] = ["eval", "exec", "compile", "__import__"];

pub struct UnsanitizedIo;

impl Rule for UnsanitizedIo {
    fn id(&self) -> &'static str {
        "unsanitized_io"
    }

    /// Fires for every tainted-sink flow fact targeting an I/O sink with no
    /// sanitiser interposed between the parameter and the call.
    fn check(&self, ctx: &RuleContext<'_>) -> Result<Vec<RuleViolation>, RuleError> {
        let mut violations = Vec::new();

        for (node_id, flow) in &ctx.flow.functions {
            for sink in &flow.tainted_sinks {
                if EVAL_SINKS.contains(&sink.sink.as_str()) {
                    continue;
                }
                let (module, function) = split_node_id(node_id);

                let mut evidence = vec![format!("parameter `{}` is unsanitised", sink.parameter)];
                if let Some(alias) = &sink.via_alias {
                    evidence.push(format!("aliased as `{alias}`"));
                }
                evidence.push(format!(
                    "flows to call site `{}({})` at line {}",
                    sink.sink,
                    sink.via_alias.as_deref().unwrap_or(&sink.parameter),
                    sink.line
                ));
                evidence.push("no sanitiser interposed".to_string());

                violations.push(RuleViolation {
                    rule_id: self.id().to_string(),
                    severity: Severity::High,
                    file: module.to_string(),
                    line: sink.line,
                    end_line: None,
                    title: format!("Unsanitised input reaches '{}()'", sink.sink),
                    description: format!(
                        "In function '{function}', parameter '{}' flows into '{}()' without \
                         validation. This enables path traversal, command injection, or \
                         arbitrary file operations.",
                        sink.parameter, sink.sink
                    ),
                    evidence,
                    affected_function: function.to_string(),
                    graph_node_id: node_id.clone(),
                    unresolved: false,
                });
            }
        }

        Ok(violations)
    }
}
