//! Infrastructure implementations for the analysis stages

pub mod call_graph;
pub mod data_flow;
pub mod extractor;
pub mod file_cache;
pub mod risk_scorer;
pub mod rule_engine;
pub mod rules;

pub use call_graph::{build_call_graph, node_id};
pub use data_flow::analyze_data_flow;
pub use extractor::{ExtractError, PythonExtractor};
pub use file_cache::{hash_content, CachedAnalysis, FileCacheService, InMemoryFileCache};
pub use risk_scorer::RiskScorer;
pub use rule_engine::RuleEngine;
