//! Intra-procedural data-flow facts
//!
//! Path-insensitive, per function: nullable returns, tainted parameter
//! flow into configured sinks, and shared-container mutation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A parameter flowing into a dangerous sink without an intervening sanitiser.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaintedSink {
    /// Parameter that carries the taint
    pub parameter: String,
    /// Sink call name as written (`os.system`, `open`, ...)
    pub sink: String,
    pub line: u32,
    /// Set when the flow goes through a simple alias (`x = param`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub via_alias: Option<String>,
}

/// Flow facts for a single function.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FunctionFlow {
    /// Declared non-optional return but a path yields `None`
    pub nullable_return: bool,
    pub tainted_sinks: Vec<TaintedSink>,
    /// Module-level mutable containers mutated by this function
    pub mutated_containers: Vec<String>,
}

impl FunctionFlow {
    pub fn is_empty(&self) -> bool {
        !self.nullable_return && self.tainted_sinks.is_empty() && self.mutated_containers.is_empty()
    }
}

/// Flow facts for the whole scan, keyed by graph node id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FlowFacts {
    pub functions: BTreeMap<String, FunctionFlow>,
}

impl FlowFacts {
    pub fn get(&self, node_id: &str) -> Option<&FunctionFlow> {
        self.functions.get(node_id)
    }

    /// Whether the node mutates module-level shared state.
    pub fn mutates_shared_state(&self, node_id: &str) -> bool {
        self.functions
            .get(node_id)
            .map(|f| !f.mutated_containers.is_empty())
            .unwrap_or(false)
    }
}
