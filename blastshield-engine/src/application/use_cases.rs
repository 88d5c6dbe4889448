//! Host-facing operations
//!
//! `ScanEngine` is the only type the HTTP host talks to. It validates
//! requests, decides inline versus background execution, and serves the
//! status/cancel/health operations. Only request validation errors ever
//! reach the caller; everything downstream recovers locally.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use uuid::Uuid;

use blastshield_analysis::domain::SourceFile;
use blastshield_analysis::infrastructure::{FileCacheService, InMemoryFileCache};
use blastshield_core::config::Config;
use blastshield_core::infrastructure::audit::{AuditSink, JsonlAuditSink};
use blastshield_llm::application::RefineViolationsUseCase;
use blastshield_llm::domain::CompletionClient;
use blastshield_llm::infrastructure::{GroqClient, ResilientClient};

use crate::application::pipeline::{PipelineError, ScanPipeline};
use crate::domain::report::{
    FileInput, HealthResponse, ScanMode, ScanRequest, ScanResponse, ScanStatusResponse,
};
use crate::infrastructure::InMemoryScanStore;

/// Request-level failures. Machine-readable codes for the transport layer;
/// the message is a short English sentence for humans.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("No files were provided to scan.")]
    EmptyFileSet,
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("The scan could not be completed.")]
    Internal(String),
}

impl EngineError {
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::EmptyFileSet => "empty_file_set",
            EngineError::InvalidRequest(_) => "invalid_request",
            EngineError::Internal(_) => "internal_error",
        }
    }
}

pub struct ScanEngine {
    config: Config,
    pipeline: Arc<ScanPipeline>,
    store: Arc<InMemoryScanStore>,
    model: String,
}

impl ScanEngine {
    /// Wire the engine from configuration: in-memory cache, JSONL audit
    /// sink, and - when credentials exist - the resilient Groq refiner.
    pub fn from_config(config: Config) -> Self {
        let cache: Arc<dyn FileCacheService> =
            Arc::new(InMemoryFileCache::new(config.cache.ttl()));
        let audit: Arc<dyn AuditSink> = Arc::new(JsonlAuditSink::new(&config.audit.log_path));

        let refiner = config.llm.api_key.as_ref().and_then(|api_key| {
            match GroqClient::new(api_key.clone(), config.llm.model.clone(), config.llm.timeout()) {
                Ok(client) => {
                    let resilient: Arc<dyn CompletionClient> = Arc::new(ResilientClient::new(
                        Arc::new(client),
                        config.llm.timeout(),
                        config.llm.max_retries,
                    ));
                    Some(Arc::new(RefineViolationsUseCase::new(
                        resilient,
                        config.llm.clone(),
                        config.analysis.subgraph_hops,
                    )))
                }
                Err(e) => {
                    error!(error = %e, "Failed to build LLM client; running deterministic-only");
                    None
                }
            }
        });

        Self::new(config, cache, refiner, audit)
    }

    /// Full dependency injection, used by tests and embedding hosts.
    pub fn new(
        config: Config,
        cache: Arc<dyn FileCacheService>,
        refiner: Option<Arc<RefineViolationsUseCase>>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        let model = config.llm.model.clone();
        let store = Arc::new(InMemoryScanStore::new(Duration::from_secs(
            config.scan.scan_result_ttl_s,
        )));
        let pipeline = Arc::new(ScanPipeline::new(config.clone(), cache, refiner, audit));
        Self {
            config,
            pipeline,
            store,
            model,
        }
    }

    /// Scan operation. Runs inline below the background threshold,
    /// otherwise queues and returns immediately with the scan id.
    pub async fn scan(&self, request: ScanRequest) -> Result<ScanResponse, EngineError> {
        let mode = request.scan_mode;
        let (files, skipped) = self.validate(request)?;
        let scan_id = new_scan_id();

        let background = mode == ScanMode::Full
            && files.len() > self.config.scan.background_file_threshold;

        if background {
            info!(scan_id = %scan_id, files = files.len(), "Dispatching background scan");
            let cancel = self.store.insert_queued(&scan_id).await;
            self.spawn_background(scan_id.clone(), files, skipped, mode, cancel);
            return Ok(ScanResponse {
                message: "scan_queued".to_string(),
                scan_id,
                report: None,
            });
        }

        let report = self
            .pipeline
            .run(&scan_id, files, skipped, mode, CancellationToken::new(), &|_| {})
            .await
            .map_err(|e| EngineError::Internal(e.to_string()))?;

        Ok(ScanResponse {
            message: "scan_complete".to_string(),
            scan_id,
            report: Some(report),
        })
    }

    /// PR scan: always inline, PR-framed summary.
    pub async fn pr_scan(&self, mut request: ScanRequest) -> Result<ScanResponse, EngineError> {
        request.scan_mode = ScanMode::Pr;
        self.scan(request).await
    }

    /// Status of a background scan, if known.
    pub async fn status(&self, scan_id: &str) -> Option<ScanStatusResponse> {
        self.store.get(scan_id).await
    }

    /// Cancel a queued or running background scan.
    pub async fn cancel(&self, scan_id: &str) -> bool {
        self.store.cancel(scan_id).await
    }

    /// Health probe.
    pub fn health(&self) -> HealthResponse {
        HealthResponse {
            status: "ok".to_string(),
            model: self.model.clone(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            engine: "blastshield-engine".to_string(),
        }
    }

    /// Validate a request: legacy conversion, the empty-set check, and the
    /// per-file size cap (oversize files become non-fatal skip markers).
    fn validate(
        &self,
        request: ScanRequest,
    ) -> Result<(Vec<SourceFile>, Vec<String>), EngineError> {
        let mut inputs = request.files;
        if inputs.is_empty() {
            if let Some(combined) = request.combined {
                if !combined.trim().is_empty() {
                    inputs.push(FileInput {
                        path: "combined.py".to_string(),
                        content: combined,
                    });
                }
            }
        }
        if inputs.is_empty() {
            return Err(EngineError::EmptyFileSet);
        }

        let mut files = Vec::new();
        let mut skipped = Vec::new();
        for input in inputs {
            if input.path.trim().is_empty() {
                return Err(EngineError::InvalidRequest(
                    "A file entry is missing its path.".to_string(),
                ));
            }
            if input.content.len() > self.config.scan.max_file_size_bytes {
                skipped.push(input.path);
            } else {
                files.push(SourceFile::new(input.path, input.content));
            }
        }

        if files.is_empty() && skipped.is_empty() {
            return Err(EngineError::EmptyFileSet);
        }
        Ok((files, skipped))
    }

    fn spawn_background(
        &self,
        scan_id: String,
        files: Vec<SourceFile>,
        skipped: Vec<String>,
        mode: ScanMode,
        cancel: CancellationToken,
    ) {
        let pipeline = self.pipeline.clone();
        let store = self.store.clone();

        tokio::spawn(async move {
            store.set_running(&scan_id).await;
            let progress_store = store.clone();
            let progress_id = scan_id.clone();
            let progress = move |value: f32| {
                let store = progress_store.clone();
                let scan_id = progress_id.clone();
                tokio::spawn(async move {
                    store.set_progress(&scan_id, value).await;
                });
            };

            match pipeline
                .run(&scan_id, files, skipped, mode, cancel, &progress)
                .await
            {
                Ok(report) => store.complete(&scan_id, report).await,
                Err(PipelineError::Cancelled) => {
                    info!(scan_id = %scan_id, "Background scan cancelled");
                    store.fail(&scan_id, "Scan was cancelled.".to_string()).await;
                }
                Err(e) => {
                    error!(scan_id = %scan_id, error = %e, "Background scan failed");
                    store.fail(&scan_id, e.to_string()).await;
                }
            }
        });
    }
}

fn new_scan_id() -> String {
    Uuid::new_v4().to_string()[..8].to_string()
}
