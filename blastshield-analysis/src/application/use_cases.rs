//! Deterministic analysis use case
//!
//! Parse (through the cache) -> call graph -> data flow -> rules. The call
//! graph is fully constructed before any rule runs, and modules are keyed
//! by path so the whole pass is order-independent in its inputs.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, instrument};

use blastshield_core::config::AnalysisConfig;

use crate::domain::{CallGraph, FlowFacts, ModuleAst, RuleResult, SourceFile};
use crate::infrastructure::{
    analyze_data_flow, build_call_graph, ExtractError, FileCacheService, PythonExtractor,
    RuleEngine,
};

/// Everything the deterministic core produces for one scan.
#[derive(Debug, Clone)]
pub struct DeterministicAnalysis {
    pub modules: BTreeMap<String, ModuleAst>,
    pub graph: CallGraph,
    pub flow: FlowFacts,
    pub rule_result: RuleResult,
    /// Paths served from the cache without re-parsing
    pub cache_hits: Vec<String>,
}

pub struct AnalyzeFilesUseCase {
    cache: Arc<dyn FileCacheService>,
    config: AnalysisConfig,
    rule_engine: RuleEngine,
}

impl AnalyzeFilesUseCase {
    pub fn new(cache: Arc<dyn FileCacheService>, config: AnalysisConfig) -> Self {
        Self {
            cache,
            config,
            rule_engine: RuleEngine::new(),
        }
    }

    /// Run the full deterministic pipeline over a file set.
    #[instrument(skip(self, files), fields(files = files.len()))]
    pub async fn execute(&self, files: &[SourceFile]) -> Result<DeterministicAnalysis, ExtractError> {
        let mut extractor = PythonExtractor::new(self.config.clone())?;

        let mut modules: BTreeMap<String, ModuleAst> = BTreeMap::new();
        let mut cache_hits = Vec::new();

        for file in files {
            if let Some(cached) = self.cache.get(&file.path, &file.content).await {
                debug!(path = %file.path, "Reusing cached module");
                modules.insert(file.path.clone(), cached.module);
                cache_hits.push(file.path.clone());
            } else {
                let module = extractor.extract(file);
                modules.insert(file.path.clone(), module);
            }
        }

        let graph = build_call_graph(&modules, &self.config);
        let flow = analyze_data_flow(&modules, &self.config);
        let rule_result = self.rule_engine.run(&modules, &graph, &flow, &self.config);

        // Refresh the cache with this pass's per-file results.
        for file in files {
            if let Some(module) = modules.get(&file.path) {
                let file_violations = rule_result
                    .violations
                    .iter()
                    .filter(|v| v.file == file.path)
                    .cloned()
                    .collect();
                self.cache
                    .put(&file.path, &file.content, module.clone(), file_violations)
                    .await;
            }
        }

        Ok(DeterministicAnalysis {
            modules,
            graph,
            flow,
            rule_result,
            cache_hits,
        })
    }
}
