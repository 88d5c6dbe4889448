//! Harness application layer

pub mod generator;

pub use generator::generate_edge_cases;

use std::collections::BTreeSet;

use tracing::{debug, info};

use blastshield_analysis::domain::{ImportStmt, ModuleAst};
use blastshield_core::config::HarnessConfig;

use crate::domain::TestResult;
use crate::infrastructure::process::run_case;

/// Libraries whose presence marks a module as network-touching. Such
/// modules are skipped unless the deployment explicitly opts in.
const NETWORK_MODULES: [&str; 8] = [
    "requests", "httpx", "aiohttp", "urllib", "urllib3", "socket", "http", "websockets",
];

pub struct TestHarness {
    config: HarnessConfig,
}

impl TestHarness {
    pub fn new(config: HarnessConfig) -> Self {
        Self { config }
    }

    /// Run edge cases for every eligible top-level function of a module.
    /// `source` is the module's full content; each case executes in its own
    /// subordinate process.
    pub async fn run_module(&self, module: &ModuleAst, source: &str) -> Vec<TestResult> {
        if !self.config.enabled {
            return Vec::new();
        }
        if !self.config.allow_network && touches_network(&module.imports) {
            debug!(module = %module.module_id, "Skipping network-touching module");
            return Vec::new();
        }

        let mut results = Vec::new();
        for func in &module.functions {
            if func.parameters.len() > self.config.max_params {
                continue;
            }
            for case in generate_edge_cases(func) {
                let result = run_case(&case, source, self.config.timeout_s).await;
                results.push(result);
            }
        }

        let failed = results.iter().filter(|r| !r.passed).count();
        info!(
            module = %module.module_id,
            cases = results.len(),
            failed,
            "Harness pass complete"
        );
        results
    }
}

fn touches_network(imports: &[ImportStmt]) -> bool {
    imports.iter().any(|import| {
        let root = import.module.split('.').next().unwrap_or("");
        NETWORK_MODULES.contains(&root)
    })
}

/// Graph node ids (within `module_id`) of functions with at least one
/// failing case.
pub fn failed_function_nodes(module_id: &str, results: &[TestResult]) -> BTreeSet<String> {
    results
        .iter()
        .filter(|r| !r.passed)
        .map(|r| format!("{module_id}::{}", r.function_name))
        .collect()
}
