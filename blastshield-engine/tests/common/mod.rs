//! Shared test helpers for engine integration tests

pub mod mocks;

use std::sync::Arc;
use std::time::Duration;

use blastshield_analysis::infrastructure::InMemoryFileCache;
use blastshield_core::config::Config;
use blastshield_core::infrastructure::NoopAuditSink;
use blastshield_engine::{FileInput, ScanEngine, ScanRequest};
use blastshield_llm::application::RefineViolationsUseCase;

use self::mocks::MockCompletionClient;

/// Engine with no LLM client: deterministic-only.
pub fn deterministic_engine() -> ScanEngine {
    deterministic_engine_with(Config::default())
}

pub fn deterministic_engine_with(config: Config) -> ScanEngine {
    let cache = Arc::new(InMemoryFileCache::new(Duration::from_secs(300)));
    ScanEngine::new(config, cache, None, Arc::new(NoopAuditSink))
}

/// Engine whose refiner always answers with the given content.
pub fn engine_with_llm(content: &str) -> ScanEngine {
    let config = Config::default();
    let cache = Arc::new(InMemoryFileCache::new(Duration::from_secs(300)));
    let client = Arc::new(MockCompletionClient::new(content));
    let refiner = Arc::new(RefineViolationsUseCase::new(
        client,
        config.llm.clone(),
        config.analysis.subgraph_hops,
    ));
    ScanEngine::new(config, cache, Some(refiner), Arc::new(NoopAuditSink))
}

pub fn request(files: &[(&str, &str)]) -> ScanRequest {
    ScanRequest {
        files: files
            .iter()
            .map(|(path, content)| FileInput {
                path: path.to_string(),
                content: content.to_string(),
            })
            .collect(),
        ..Default::default()
    }
}
