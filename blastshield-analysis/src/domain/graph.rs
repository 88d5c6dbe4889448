//! Inter-procedural call graph
//!
//! One node per function, keyed by `module::function`. Unresolved call
//! sites point at the `external` sentinel and are terminal for depth
//! computations. All containers are ordered so traversal is deterministic.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use serde::{Deserialize, Serialize};

use super::ast::ContainerKind;

/// Sentinel node id for call sites that resolve to nothing in the scanned set.
pub const EXTERNAL_NODE: &str = "external";

/// Type of a call edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallType {
    Direct,
    Import,
    External,
}

/// A node in the call graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallGraphNode {
    /// `module::function`
    pub id: String,
    pub module: String,
    pub function: String,
    pub is_async: bool,
    /// True for web-route handlers and `main`
    pub is_entry_point: bool,
    pub reads_shared_state: Vec<String>,
    pub writes_shared_state: Vec<String>,
    pub line: u32,
}

/// A directed edge (caller -> callee).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallGraphEdge {
    pub source: String,
    pub target: String,
    pub call_type: CallType,
    pub awaited: bool,
    /// True when the edge crosses a sync/async boundary, or the caller is
    /// async and the call is not awaited
    pub async_boundary_crossing: bool,
    pub line: u32,
}

/// Readers and writers of one module-level mutable container.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SharedStateAccess {
    pub readers: BTreeSet<String>,
    pub writers: BTreeSet<String>,
    pub container: ContainerKind,
    pub line: u32,
}

/// Complete call graph for one scan.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CallGraph {
    pub nodes: BTreeMap<String, CallGraphNode>,
    pub edges: Vec<CallGraphEdge>,
    pub entry_points: BTreeSet<String>,
    /// `module::variable` -> access sets
    pub shared_state: BTreeMap<String, SharedStateAccess>,
}

impl CallGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Direct callees of a node, in edge insertion order.
    pub fn neighbors(&self, node_id: &str) -> Vec<&str> {
        self.edges
            .iter()
            .filter(|e| e.source == node_id)
            .map(|e| e.target.as_str())
            .collect()
    }

    /// Direct callers of a node.
    pub fn callers(&self, node_id: &str) -> Vec<&str> {
        self.edges
            .iter()
            .filter(|e| e.target == node_id)
            .map(|e| e.source.as_str())
            .collect()
    }

    /// Blast radius: maximum BFS depth reached through outgoing edges,
    /// bounded by `max_depth`. Cycles are permitted; revisits are skipped.
    /// Edges into the `external` sentinel are terminal and do not extend
    /// the depth.
    pub fn blast_radius(&self, node_id: &str, max_depth: usize) -> usize {
        if !self.nodes.contains_key(node_id) {
            return 0;
        }

        let mut visited: BTreeSet<&str> = BTreeSet::new();
        let mut queue: VecDeque<(&str, usize)> = VecDeque::new();
        visited.insert(node_id);
        queue.push_back((node_id, 0));
        let mut deepest = 0;

        while let Some((current, depth)) = queue.pop_front() {
            deepest = deepest.max(depth);
            if depth >= max_depth {
                continue;
            }
            for next in self.neighbors(current) {
                if next == EXTERNAL_NODE {
                    continue;
                }
                if visited.insert(next) {
                    queue.push_back((next, depth + 1));
                }
            }
        }

        deepest
    }

    /// Maximum blast radius over all nodes, with the same depth bound.
    pub fn max_observed_depth(&self, max_depth: usize) -> usize {
        self.nodes
            .keys()
            .map(|id| self.blast_radius(id, max_depth))
            .max()
            .unwrap_or(0)
    }

    /// Nodes reachable from `start` through outgoing edges (includes `start`).
    pub fn reachable_from(&self, start: &str) -> BTreeSet<String> {
        let mut visited: BTreeSet<String> = BTreeSet::new();
        let mut queue: VecDeque<String> = VecDeque::new();
        queue.push_back(start.to_string());
        while let Some(current) = queue.pop_front() {
            if visited.insert(current.clone()) {
                for next in self.neighbors(&current) {
                    if !visited.contains(next) {
                        queue.push_back(next.to_string());
                    }
                }
            }
        }
        visited
    }

    /// All nodes reachable from async entry points.
    pub fn reachable_from_async_entry_points(&self) -> BTreeSet<String> {
        let mut reachable = BTreeSet::new();
        for entry in &self.entry_points {
            let is_async = self.nodes.get(entry).map(|n| n.is_async).unwrap_or(false);
            if is_async {
                reachable.extend(self.reachable_from(entry));
            }
        }
        reachable
    }

    /// Node ids with at least one incident async-boundary-crossing edge.
    pub fn async_boundary_crossers(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        for edge in &self.edges {
            if edge.async_boundary_crossing {
                out.insert(edge.source.clone());
                out.insert(edge.target.clone());
            }
        }
        out
    }

    /// Whether a node has any incident async-boundary-crossing edge.
    pub fn crosses_async_boundary(&self, node_id: &str) -> bool {
        self.edges
            .iter()
            .any(|e| e.async_boundary_crossing && (e.source == node_id || e.target == node_id))
    }

    /// Subgraph containing only the given nodes and edges between them.
    pub fn subgraph(&self, node_ids: &BTreeSet<String>) -> CallGraph {
        let nodes = self
            .nodes
            .iter()
            .filter(|(id, _)| node_ids.contains(*id))
            .map(|(id, n)| (id.clone(), n.clone()))
            .collect();
        let edges = self
            .edges
            .iter()
            .filter(|e| node_ids.contains(&e.source) && node_ids.contains(&e.target))
            .cloned()
            .collect();
        CallGraph {
            nodes,
            edges,
            entry_points: self
                .entry_points
                .iter()
                .filter(|id| node_ids.contains(*id))
                .cloned()
                .collect(),
            shared_state: BTreeMap::new(),
        }
    }

    /// Subgraph around the given nodes, expanded by `hops` in both directions.
    pub fn affected_subgraph(&self, seed: &BTreeSet<String>, hops: usize) -> CallGraph {
        let mut expanded: BTreeSet<String> = seed.clone();
        let mut frontier: BTreeSet<String> = seed.clone();
        for _ in 0..hops {
            let mut next: BTreeSet<String> = BTreeSet::new();
            for id in &frontier {
                next.extend(self.neighbors(id).into_iter().map(String::from));
                next.extend(self.callers(id).into_iter().map(String::from));
            }
            frontier = next.difference(&expanded).cloned().collect();
            expanded.extend(frontier.iter().cloned());
        }
        self.subgraph(&expanded)
    }
}
