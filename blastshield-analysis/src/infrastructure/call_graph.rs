//! Call-graph construction
//!
//! Composes per-file module models into an inter-module graph. Call sites
//! resolve against same-module definitions first, then through import
//! aliases; anything else becomes an edge to the `external` sentinel.

use std::collections::BTreeMap;

use tracing::debug;

use blastshield_core::config::AnalysisConfig;

use crate::domain::{
    CallGraph, CallGraphEdge, CallGraphNode, CallSite, CallType, FunctionDef, ModuleAst,
    SharedStateAccess, EXTERNAL_NODE,
};

pub fn node_id(module: &str, function: &str) -> String {
    format!("{module}::{function}")
}

/// Build the call graph for a set of parsed modules.
pub fn build_call_graph(
    modules: &BTreeMap<String, ModuleAst>,
    config: &AnalysisConfig,
) -> CallGraph {
    let mut graph = CallGraph::new();

    // Short name -> node ids, for cross-module resolution.
    let mut name_to_nodes: BTreeMap<String, Vec<String>> = BTreeMap::new();

    // Phase 1: nodes.
    for (module_path, module) in modules {
        for func in module.all_functions() {
            let id = node_id(module_path, &func.qualified_name);
            let node = CallGraphNode {
                id: id.clone(),
                module: module_path.clone(),
                function: func.qualified_name.clone(),
                is_async: func.is_async,
                is_entry_point: is_entry_point(func, config),
                reads_shared_state: func.reads_globals.clone(),
                writes_shared_state: func.writes_globals.clone(),
                line: func.line,
            };
            if node.is_entry_point {
                graph.entry_points.insert(id.clone());
            }
            graph.nodes.insert(id.clone(), node);

            name_to_nodes
                .entry(func.qualified_name.clone())
                .or_default()
                .push(id.clone());
            if func.qualified_name != func.name {
                name_to_nodes.entry(func.name.clone()).or_default().push(id);
            }
        }
    }

    // Phase 2: edges.
    let mut external_referenced = false;
    for (module_path, module) in modules {
        let import_map = build_import_map(module);

        for func in module.all_functions() {
            let caller_id = node_id(module_path, &func.qualified_name);
            let caller_async = func.is_async;

            for call in &func.calls {
                let resolved = resolve_callee(
                    call,
                    module_path,
                    &name_to_nodes,
                    &import_map,
                    modules,
                    &graph,
                );

                match resolved {
                    Some((target_id, call_type)) => {
                        let callee_async = graph
                            .nodes
                            .get(&target_id)
                            .map(|n| n.is_async)
                            .unwrap_or(false);
                        graph.edges.push(CallGraphEdge {
                            source: caller_id.clone(),
                            target: target_id,
                            call_type,
                            awaited: call.awaited,
                            async_boundary_crossing: caller_async != callee_async
                                || (caller_async && !call.awaited),
                            line: call.line,
                        });
                    }
                    None => {
                        external_referenced = true;
                        graph.edges.push(CallGraphEdge {
                            source: caller_id.clone(),
                            target: EXTERNAL_NODE.to_string(),
                            call_type: CallType::External,
                            awaited: call.awaited,
                            async_boundary_crossing: caller_async && !call.awaited,
                            line: call.line,
                        });
                    }
                }
            }
        }
    }

    if external_referenced {
        graph.nodes.insert(
            EXTERNAL_NODE.to_string(),
            CallGraphNode {
                id: EXTERNAL_NODE.to_string(),
                module: String::new(),
                function: EXTERNAL_NODE.to_string(),
                is_async: false,
                is_entry_point: false,
                reads_shared_state: vec![],
                writes_shared_state: vec![],
                line: 0,
            },
        );
    }

    // Phase 3: shared-state map over module-level mutable containers.
    for (module_path, module) in modules {
        for assignment in module.mutable_containers() {
            let key = node_id(module_path, &assignment.name);
            let mut access = SharedStateAccess {
                container: assignment.container.clone(),
                line: assignment.line,
                ..Default::default()
            };
            for func in module.all_functions() {
                let func_id = node_id(module_path, &func.qualified_name);
                if func.writes_globals.iter().any(|w| w == &assignment.name) {
                    access.writers.insert(func_id.clone());
                }
                if func.reads_globals.iter().any(|r| r == &assignment.name) {
                    access.readers.insert(func_id);
                }
            }
            graph.shared_state.insert(key, access);
        }
    }

    debug!(
        nodes = graph.nodes.len(),
        edges = graph.edges.len(),
        entry_points = graph.entry_points.len(),
        shared_state = graph.shared_state.len(),
        "Call graph built"
    );
    graph
}

fn is_entry_point(func: &FunctionDef, config: &AnalysisConfig) -> bool {
    if func.name == "main" || func.name == "__main__" {
        return true;
    }
    func.decorators.iter().any(|d| {
        let lowered = d.to_lowercase();
        config.entry_decorators.iter().any(|e| *e == lowered)
    })
}

/// Import binding name -> target module, for this module.
fn build_import_map(module: &ModuleAst) -> BTreeMap<String, String> {
    let mut map = BTreeMap::new();
    for import in &module.imports {
        if import.is_from_import {
            for name in &import.names {
                map.insert(name.clone(), import.module.clone());
            }
        } else {
            let binding = import.alias.clone().unwrap_or_else(|| import.module.clone());
            map.insert(binding, import.module.clone());
        }
    }
    map
}

/// Resolve a call site to a node id, if it refers to anything in the
/// scanned set.
fn resolve_callee(
    call: &CallSite,
    current_module: &str,
    name_to_nodes: &BTreeMap<String, Vec<String>>,
    import_map: &BTreeMap<String, String>,
    modules: &BTreeMap<String, ModuleAst>,
    graph: &CallGraph,
) -> Option<(String, CallType)> {
    // 1. Name as written, same module preferred.
    if let Some(candidates) = name_to_nodes.get(&call.callee) {
        if let Some(id) = pick_candidate(candidates, current_module, graph) {
            let call_type = if graph.nodes.get(&id).map(|n| n.module.as_str()) == Some(current_module)
            {
                CallType::Direct
            } else {
                CallType::Import
            };
            return Some((id, call_type));
        }
    }

    if let Some((head, tail)) = call.callee.split_once('.') {
        let last = call.callee.rsplit('.').next().unwrap_or(tail);

        // 2. Through a resolved import: binding.func -> module::func.
        if let Some(imported_module) = import_map.get(head) {
            for path in modules.keys() {
                if module_matches(imported_module, path) {
                    let target = node_id(path, last);
                    if graph.nodes.contains_key(&target) {
                        return Some((target, CallType::Import));
                    }
                }
            }
        }

        // 3. Method call on self: resolve within the same module's classes.
        if head == "self" {
            if let Some(candidates) = name_to_nodes.get(last) {
                if let Some(id) = pick_candidate(candidates, current_module, graph) {
                    if graph.nodes.get(&id).map(|n| n.module.as_str()) == Some(current_module) {
                        return Some((id, CallType::Direct));
                    }
                }
            }
        }

        // 4. From-imported name called with module prefix intact.
        if let Some(candidates) = name_to_nodes.get(last) {
            if import_map.contains_key(last) {
                if let Some(id) = pick_candidate(candidates, current_module, graph) {
                    return Some((id, CallType::Import));
                }
            }
        }
    }

    None
}

fn pick_candidate(candidates: &[String], current_module: &str, graph: &CallGraph) -> Option<String> {
    let same_module: Vec<&String> = candidates
        .iter()
        .filter(|id| graph.nodes.get(*id).map(|n| n.module.as_str()) == Some(current_module))
        .collect();
    if let Some(first) = same_module.first() {
        return Some((*first).clone());
    }
    let mut sorted: Vec<&String> = candidates.iter().collect();
    sorted.sort();
    sorted.first().map(|s| (*s).clone())
}

/// Whether a module name (as written in an import) matches a file path.
fn module_matches(module_name: &str, file_path: &str) -> bool {
    let normalized = file_path
        .trim_end_matches(".py")
        .replace(['/', '\\'], ".");
    normalized == module_name
        || normalized.ends_with(&format!(".{module_name}"))
        || module_name == file_path
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SourceFile;
    use crate::infrastructure::extractor::PythonExtractor;

    fn parse_all(files: &[(&str, &str)]) -> BTreeMap<String, ModuleAst> {
        let mut extractor = PythonExtractor::new(AnalysisConfig::default()).unwrap();
        files
            .iter()
            .map(|(path, content)| {
                (
                    path.to_string(),
                    extractor.extract(&SourceFile::new(*path, *content)),
                )
            })
            .collect()
    }

    #[test]
    fn test_same_module_resolution() {
        let modules = parse_all(&[(
            "app.py",
            "def helper():\n    pass\n\ndef main():\n    helper()\n",
        )]);
        let graph = build_call_graph(&modules, &AnalysisConfig::default());

        assert!(graph.nodes.contains_key("app.py::helper"));
        assert!(graph.entry_points.contains("app.py::main"));
        assert!(graph
            .edges
            .iter()
            .any(|e| e.source == "app.py::main" && e.target == "app.py::helper"));
    }

    #[test]
    fn test_cross_module_resolution_via_from_import() {
        let modules = parse_all(&[
            ("utils.py", "def helper():\n    pass\n"),
            ("app.py", "from utils import helper\n\ndef main():\n    helper()\n"),
        ]);
        let graph = build_call_graph(&modules, &AnalysisConfig::default());
        let edge = graph
            .edges
            .iter()
            .find(|e| e.source == "app.py::main" && e.target == "utils.py::helper")
            .expect("cross-module edge");
        assert_eq!(edge.call_type, CallType::Import);
    }

    #[test]
    fn test_unresolved_call_goes_external() {
        let modules = parse_all(&[("app.py", "def main():\n    os.remove('x')\n")]);
        let graph = build_call_graph(&modules, &AnalysisConfig::default());
        assert!(graph.nodes.contains_key(EXTERNAL_NODE));
        assert!(graph
            .edges
            .iter()
            .any(|e| e.source == "app.py::main" && e.target == EXTERNAL_NODE));
        // External edges do not extend blast radius.
        assert_eq!(graph.blast_radius("app.py::main", 10), 0);
    }

    #[test]
    fn test_async_boundary_flags() {
        let modules = parse_all(&[(
            "a.py",
            "async def worker():\n    pass\n\nasync def caller():\n    worker()\n\nasync def good():\n    await worker()\n",
        )]);
        let graph = build_call_graph(&modules, &AnalysisConfig::default());

        let unawaited = graph
            .edges
            .iter()
            .find(|e| e.source == "a.py::caller" && e.target == "a.py::worker")
            .unwrap();
        assert!(!unawaited.awaited);
        assert!(unawaited.async_boundary_crossing);

        let awaited = graph
            .edges
            .iter()
            .find(|e| e.source == "a.py::good" && e.target == "a.py::worker")
            .unwrap();
        assert!(awaited.awaited);
        assert!(!awaited.async_boundary_crossing);
    }

    #[test]
    fn test_shared_state_map() {
        let modules = parse_all(&[(
            "state.py",
            "cache = {}\n\ndef put(k, v):\n    cache[k] = v\n\ndef get(k):\n    return cache.get(k)\n",
        )]);
        let graph = build_call_graph(&modules, &AnalysisConfig::default());
        let access = graph.shared_state.get("state.py::cache").expect("shared state entry");
        assert!(access.writers.contains("state.py::put"));
        assert!(access.readers.contains("state.py::get"));
    }

    #[test]
    fn test_route_decorator_is_entry_point() {
        let modules = parse_all(&[(
            "api.py",
            "@router.get\nasync def list_items():\n    pass\n",
        )]);
        let graph = build_call_graph(&modules, &AnalysisConfig::default());
        assert!(graph.entry_points.contains("api.py::list_items"));
    }
}
