//! Retry loops hammering I/O sinks without growing backoff

use crate::domain::{CallSite, RuleViolation, Severity};

use super::{Rule, RuleContext, RuleError};

pub struct RetryWithoutBackoff;

impl Rule for RetryWithoutBackoff {
    fn id(&self) -> &'static str {
        "retry_without_backoff"
    }

    /// Fires for loops that call a known I/O sink and either contain no
    /// sleep equivalent at all, or only sleeps with constant arguments
    /// (no growth between attempts).
    fn check(&self, ctx: &RuleContext<'_>) -> Result<Vec<RuleViolation>, RuleError> {
        let mut violations = Vec::new();

        for (module_path, module) in ctx.modules {
            for func in module.all_functions() {
                for loop_summary in &func.loops {
                    let network_call = loop_summary
                        .calls
                        .iter()
                        .find(|c| is_network_sink(c, ctx));
                    let Some(network_call) = network_call else {
                        continue;
                    };

                    let sleeps: Vec<&CallSite> = loop_summary
                        .calls
                        .iter()
                        .filter(|c| {
                            ctx.config.sleep_equivalents.iter().any(|s| *s == c.callee)
                        })
                        .collect();

                    let constant_only = !sleeps.is_empty()
                        && sleeps
                            .iter()
                            .all(|s| s.arguments.iter().all(|a| a.is_constant()));

                    if !sleeps.is_empty() && !constant_only {
                        continue;
                    }

                    let (title, backoff_fact) = if sleeps.is_empty() {
                        (
                            format!(
                                "Retry loop without backoff calling '{}'",
                                network_call.callee
                            ),
                            "no sleep equivalent found in loop body".to_string(),
                        )
                    } else {
                        (
                            format!(
                                "Retry loop with constant backoff calling '{}'",
                                network_call.callee
                            ),
                            "sleep argument is constant; the delay never grows".to_string(),
                        )
                    };

                    violations.push(RuleViolation {
                        rule_id: self.id().to_string(),
                        severity: Severity::Medium,
                        file: module_path.clone(),
                        line: loop_summary.line,
                        end_line: None,
                        title,
                        description: format!(
                            "In function '{}', a loop calls '{}' and retries without \
                             exponential backoff. On failure this hammers the target at \
                             full speed and amplifies outages.",
                            func.name, network_call.callee
                        ),
                        evidence: vec![
                            format!("loop at line {}", loop_summary.line),
                            format!(
                                "I/O call `{}` at line {}",
                                network_call.callee, network_call.line
                            ),
                            backoff_fact,
                        ],
                        affected_function: func.qualified_name.clone(),
                        graph_node_id: format!("{module_path}::{}", func.qualified_name),
                        unresolved: false,
                    });
                }
            }
        }

        Ok(violations)
    }
}

fn is_network_sink(call: &CallSite, ctx: &RuleContext<'_>) -> bool {
    ctx.config
        .network_sinks
        .iter()
        .any(|s| *s == call.callee || call.callee.ends_with(&format!(".{s}")))
}
