//! Blocking calls inside async functions

use crate::domain::{RuleViolation, Severity};

use super::{Rule, RuleContext, RuleError};

pub struct BlockingIoInAsync;

impl Rule for BlockingIoInAsync {
    fn id(&self) -> &'static str {
        "blocking_io_in_async"
    }

    /// Fires for calls to configured blocking sinks inside async functions.
    /// Each sink carries its async replacement, which is surfaced in the
    /// description and evidence.
    fn check(&self, ctx: &RuleContext<'_>) -> Result<Vec<RuleViolation>, RuleError> {
        let mut violations = Vec::new();

        for (module_path, module) in ctx.modules {
            for func in module.all_functions() {
                if !func.is_async {
                    continue;
                }
                for call in &func.calls {
                    let Some((_, suggestion)) = ctx
                        .config
                        .blocking_sinks
                        .iter()
                        .find(|(sink, _)| *sink == call.callee)
                    else {
                        continue;
                    };

                    violations.push(RuleViolation {
                        rule_id: self.id().to_string(),
                        severity: Severity::High,
                        file: module_path.clone(),
                        line: call.line,
                        end_line: None,
                        title: format!(
                            "Blocking '{}()' inside async function '{}'",
                            call.callee, func.name
                        ),
                        description: format!(
                            "'{}()' is a synchronous blocking call inside async function \
                             '{}'. It stalls the event loop and every concurrent task with \
                             it. Fix: {suggestion}.",
                            call.callee, func.name
                        ),
                        evidence: vec![
                            format!("async function '{}'", func.qualified_name),
                            format!("blocking call `{}` at line {}", call.callee, call.line),
                            format!("replacement: {suggestion}"),
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
