//! Intra-procedural data-flow analysis
//!
//! Path-insensitive. Produces per-function facts the rules consume:
//! nullable returns against declared annotations, tainted parameter flow
//! into configured sinks (direct use or simple alias, minus sanitised
//! flows), and shared-container mutation.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use blastshield_core::config::AnalysisConfig;

use crate::domain::{FlowFacts, FunctionDef, FunctionFlow, ModuleAst, TaintedSink};
use crate::infrastructure::call_graph::node_id;

/// Analyze all modules; facts are keyed by graph node id.
pub fn analyze_data_flow(
    modules: &BTreeMap<String, ModuleAst>,
    config: &AnalysisConfig,
) -> FlowFacts {
    let mut facts = FlowFacts::default();

    for (module_path, module) in modules {
        let mutable_names: BTreeSet<&str> = module
            .mutable_containers()
            .iter()
            .map(|a| a.name.as_str())
            .collect();

        for func in module.all_functions() {
            let flow = analyze_function(func, &mutable_names, config);
            if !flow.is_empty() {
                facts
                    .functions
                    .insert(node_id(module_path, &func.qualified_name), flow);
            }
        }
    }

    debug!(functions_with_facts = facts.functions.len(), "Data flow analysis complete");
    facts
}

fn analyze_function(
    func: &FunctionDef,
    mutable_names: &BTreeSet<&str>,
    config: &AnalysisConfig,
) -> FunctionFlow {
    FunctionFlow {
        nullable_return: has_nullable_return(func),
        tainted_sinks: find_tainted_sinks(func, config),
        mutated_containers: func
            .writes_globals
            .iter()
            .filter(|w| mutable_names.contains(w.as_str()))
            .cloned()
            .collect(),
    }
}

/// Declared non-optional return, but a path yields `None`: a bare/`None`
/// return, or no return statement at all (end-of-body fall-through).
fn has_nullable_return(func: &FunctionDef) -> bool {
    let Some(annotation) = func.return_annotation.as_deref() else {
        return false;
    };
    if annotation_allows_none(annotation) {
        return false;
    }
    !func.returns.has_return || func.returns.has_bare_or_none_return
}

fn annotation_allows_none(annotation: &str) -> bool {
    annotation == "None"
        || annotation == "NoneType"
        || annotation.contains("Optional")
        || annotation.contains("| None")
        || annotation.contains("None |")
}

fn find_tainted_sinks(func: &FunctionDef, config: &AnalysisConfig) -> Vec<TaintedSink> {
    let params: BTreeSet<&str> = func.parameter_names().into_iter().collect();
    if params.is_empty() {
        return Vec::new();
    }

    // Simple aliases: `x = param` taints x; `x = sanitize(param)` clears it.
    let mut alias_of: BTreeMap<&str, &str> = BTreeMap::new();
    let mut sanitized: BTreeSet<&str> = BTreeSet::new();
    for binding in &func.local_bindings {
        if let Some(source) = binding.source_identifier.as_deref() {
            let origin = alias_of.get(source).copied().or_else(|| {
                params.contains(source).then_some(source)
            });
            if let Some(origin) = origin {
                alias_of.insert(binding.name.as_str(), origin);
            }
        } else if let Some(call) = binding.via_call.as_deref() {
            let touches_param = binding
                .call_arguments
                .iter()
                .any(|a| params.contains(a.as_str()) || alias_of.contains_key(a.as_str()));
            if touches_param && is_sanitizer(call, config) {
                sanitized.insert(binding.name.as_str());
            } else if touches_param {
                // Derived value keeps the taint of its first tainted input.
                let origin = binding
                    .call_arguments
                    .iter()
                    .find_map(|a| {
                        alias_of
                            .get(a.as_str())
                            .copied()
                            .or_else(|| params.contains(a.as_str()).then_some(a.as_str()))
                    });
                if let Some(origin) = origin {
                    alias_of.insert(binding.name.as_str(), origin);
                }
            }
        }
    }

    let mut sinks = Vec::new();
    for call in &func.calls {
        if !is_sink(&call.callee, config) {
            continue;
        }
        for argument in &call.arguments {
            let arg_sanitized = argument
                .nested_calls
                .iter()
                .any(|c| is_sanitizer(c, config));
            if arg_sanitized {
                continue;
            }
            for identifier in &argument.identifiers {
                if sanitized.contains(identifier.as_str()) {
                    continue;
                }
                if params.contains(identifier.as_str()) {
                    sinks.push(TaintedSink {
                        parameter: identifier.clone(),
                        sink: call.callee.clone(),
                        line: call.line,
                        via_alias: None,
                    });
                } else if let Some(origin) = alias_of.get(identifier.as_str()) {
                    sinks.push(TaintedSink {
                        parameter: (*origin).to_string(),
                        sink: call.callee.clone(),
                        line: call.line,
                        via_alias: Some(identifier.clone()),
                    });
                }
            }
        }
    }
    sinks
}

fn is_sink(callee: &str, config: &AnalysisConfig) -> bool {
    config.taint_sinks.iter().any(|s| s == callee)
}

fn is_sanitizer(callee: &str, config: &AnalysisConfig) -> bool {
    config.sanitizers.iter().any(|s| s == callee)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SourceFile;
    use crate::infrastructure::extractor::PythonExtractor;

    fn flow_for(source: &str) -> FlowFacts {
        let config = AnalysisConfig::default();
        let mut extractor = PythonExtractor::new(config.clone()).unwrap();
        let module = extractor.extract(&SourceFile::new("t.py", source));
        let mut modules = BTreeMap::new();
        modules.insert("t.py".to_string(), module);
        analyze_data_flow(&modules, &config)
    }

    #[test]
    fn test_direct_taint() {
        let facts = flow_for("def run(cmd):\n    os.system(cmd)\n");
        let flow = facts.get("t.py::run").unwrap();
        assert_eq!(flow.tainted_sinks.len(), 1);
        assert_eq!(flow.tainted_sinks[0].parameter, "cmd");
        assert_eq!(flow.tainted_sinks[0].sink, "os.system");
        assert_eq!(flow.tainted_sinks[0].line, 2);
    }

    #[test]
    fn test_alias_taint() {
        let facts = flow_for("def run(cmd):\n    c = cmd\n    os.system(c)\n");
        let flow = facts.get("t.py::run").unwrap();
        assert_eq!(flow.tainted_sinks.len(), 1);
        assert_eq!(flow.tainted_sinks[0].parameter, "cmd");
        assert_eq!(flow.tainted_sinks[0].via_alias.as_deref(), Some("c"));
    }

    #[test]
    fn test_sanitizer_clears_taint() {
        let facts = flow_for("def run(cmd):\n    safe = shlex.quote(cmd)\n    os.system(safe)\n");
        assert!(facts.get("t.py::run").is_none());
    }

    #[test]
    fn test_inline_sanitizer_clears_taint() {
        let facts = flow_for("def read(path):\n    open(os.path.basename(path))\n");
        assert!(facts.get("t.py::read").is_none());
    }

    #[test]
    fn test_nullable_return() {
        let facts = flow_for("def lookup(k) -> str:\n    if k:\n        return 'v'\n    return None\n");
        assert!(facts.get("t.py::lookup").unwrap().nullable_return);

        let clean = flow_for("def lookup(k) -> str:\n    return 'v'\n");
        assert!(clean.get("t.py::lookup").is_none());

        let optional = flow_for("def lookup(k) -> Optional[str]:\n    return None\n");
        assert!(optional.get("t.py::lookup").is_none());
    }

    #[test]
    fn test_fall_through_nullable() {
        let facts = flow_for("def compute(x) -> int:\n    x + 1\n");
        assert!(facts.get("t.py::compute").unwrap().nullable_return);
    }

    #[test]
    fn test_shared_container_mutation() {
        let facts = flow_for("state = {}\n\ndef put(k):\n    state[k] = 1\n");
        let flow = facts.get("t.py::put").unwrap();
        assert_eq!(flow.mutated_containers, vec!["state".to_string()]);
        assert!(facts.mutates_shared_state("t.py::put"));
    }
}
