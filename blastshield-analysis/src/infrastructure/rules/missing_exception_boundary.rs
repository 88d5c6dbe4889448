//! Entry points without a usable exception boundary

use crate::domain::{RuleViolation, Severity};

use super::{Rule, RuleContext, RuleError};

pub struct MissingExceptionBoundary;

impl Rule for MissingExceptionBoundary {
    fn id(&self) -> &'static str {
        "missing_exception_boundary"
    }

    /// Fires for entry-point functions whose top-level body has no
    /// `try`/`except`, or whose handlers are bare `except` blocks that
    /// re-raise nothing (swallowing every failure).
    fn check(&self, ctx: &RuleContext<'_>) -> Result<Vec<RuleViolation>, RuleError> {
        let mut violations = Vec::new();

        for (module_path, module) in ctx.modules {
            for func in module.all_functions() {
                let node_id = format!("{module_path}::{}", func.qualified_name);
                if !ctx.graph.entry_points.contains(&node_id) {
                    continue;
                }

                let missing_boundary = !func.exceptions.has_top_level_try;
                let swallows_everything = !func.exceptions.handlers.is_empty()
                    && func
                        .exceptions
                        .handlers
                        .iter()
                        .all(|h| h.is_bare && !h.has_reraise);

                if !missing_boundary && !swallows_everything {
                    continue;
                }

                let (title, detail, fact) = if missing_boundary {
                    (
                        format!("Missing exception boundary in entry point '{}'", func.name),
                        "has no try/except around its body. Unhandled exceptions propagate \
                         to the framework, leaking stack traces or killing workers."
                            .to_string(),
                        "no top-level try/except in function body".to_string(),
                    )
                } else {
                    (
                        format!("Bare exception handler in entry point '{}'", func.name),
                        "catches every exception with a bare handler and re-raises nothing, \
                         hiding failures from callers and operators."
                            .to_string(),
                        "all handlers are bare 'except:' with no re-raise".to_string(),
                    )
                };

                violations.push(RuleViolation {
                    rule_id: self.id().to_string(),
                    severity: Severity::Medium,
                    file: module_path.clone(),
                    line: func.line,
                    end_line: Some(func.end_line),
                    title,
                    description: format!("Entry point '{}' {detail}", func.name),
                    evidence: vec![
                        format!(
                            "'{}' is an entry point (decorators: {})",
                            func.name,
                            if func.decorators.is_empty() {
                                "none".to_string()
                            } else {
                                func.decorators.join(", ")
                            }
                        ),
                        fact,
                    ],
                    affected_function: func.qualified_name.clone(),
                    graph_node_id: node_id,
                    unresolved: false,
                });
            }
        }

        Ok(violations)
    }
}
