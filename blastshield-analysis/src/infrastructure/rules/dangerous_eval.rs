//! Dynamic code execution with non-literal input

use std::collections::BTreeSet;

use crate::domain::{RuleViolation, Severity};

use super::{Rule, RuleContext, RuleError};

const DANGEROUS_FUNCTIONS: [&str; 4] = ["eval", "exec", "compile", "__import__"];

pub struct DangerousEval;

impl Rule for DangerousEval {
    fn id(&self) -> &'static str {
        "dangerous_eval"
    }

    /// Fires when `eval`/`exec`/`compile`/`__import__` is called with
    /// anything other than a plain string literal, or with no arguments at
    /// all. A parameter flowing in is called out explicitly in the evidence.
    fn check(&self, ctx: &RuleContext<'_>) -> Result<Vec<RuleViolation>, RuleError> {
        let mut violations = Vec::new();

        for (module_path, module) in ctx.modules {
            for func in module.all_functions() {
                let params: BTreeSet<&str> = func.parameter_names().into_iter().collect();

                for call in &func.calls {
                    if !DANGEROUS_FUNCTIONS.contains(&call.callee.as_str()) {
                        continue;
                    }
                    let all_literal = !call.arguments.is_empty()
                        && call.arguments.iter().all(|a| a.is_string_literal);
                    if all_literal {
                        continue;
                    }

                    let tainted_params: Vec<&String> = call
                        .arguments
                        .iter()
                        .flat_map(|a| a.identifiers.iter())
                        .filter(|i| params.contains(i.as_str()))
                        .collect();

                    let mut evidence = vec![
                        format!("call to '{}' at line {}", call.callee, call.line),
                        if call.arguments.is_empty() {
                            "called with no arguments".to_string()
                        } else {
                            "argument is not a literal string".to_string()
                        },
                    ];
                    for param in &tainted_params {
                        evidence.push(format!(
                            "parameter `{param}` flows into '{}()' unchecked",
                            call.callee
                        ));
                    }

                    violations.push(RuleViolation {
                        rule_id: self.id().to_string(),
                        severity: Severity::Critical,
                        file: module_path.clone(),
                        line: call.line,
                        end_line: None,
                        title: format!("Dangerous '{}()' with non-literal argument", call.callee),
                        description: format!(
                            "In function '{}', '{}()' is called with a dynamic argument. \
                             Anyone who controls the input can execute arbitrary code in \
                             this process.",
                            func.name, call.callee
                        ),
                        evidence,
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
