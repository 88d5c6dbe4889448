//! The staged scan pipeline
//!
//! parse (cached) -> call graph -> data flow -> rules -> harness ->
//! score -> optional LLM refinement -> report assembly -> audit.
//!
//! Cancellation is honoured at stage boundaries; an in-flight LLM call is
//! raced against the token and simply discarded on cancel. LLM failure of
//! any kind reverts to template fallback and never fails the scan.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Instant;

use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use blastshield_analysis::application::{AnalyzeFilesUseCase, DeterministicAnalysis};
use blastshield_analysis::domain::{
    RiskBreakdown, RuleViolation, Severity, SourceFile,
};
use blastshield_analysis::infrastructure::{FileCacheService, RiskScorer};
use blastshield_core::config::Config;
use blastshield_core::domain::AuditEntry;
use blastshield_core::infrastructure::audit::{append_best_effort, AuditSink};
use blastshield_harness::application::failed_function_nodes;
use blastshield_harness::TestHarness;
use blastshield_llm::application::{RefineViolationsUseCase, RefinementInput, TokenBudget};
use blastshield_llm::domain::LlmRefinement;
use blastshield_llm::infrastructure::template_for;

use crate::domain::report::{Issue, Patch, ScanMode, ScanReport};

/// Pipeline failure. Everything recoverable is handled inside; only
/// cancellation and an unusable parser frontend surface.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Scan cancelled")]
    Cancelled,
    #[error("Analysis failed: {0}")]
    Analysis(String),
}

pub type ProgressFn = dyn Fn(f32) + Send + Sync;

pub struct ScanPipeline {
    config: Config,
    analyze: AnalyzeFilesUseCase,
    refiner: Option<Arc<RefineViolationsUseCase>>,
    harness: TestHarness,
    audit: Arc<dyn AuditSink>,
}

impl ScanPipeline {
    pub fn new(
        config: Config,
        cache: Arc<dyn FileCacheService>,
        refiner: Option<Arc<RefineViolationsUseCase>>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        let analyze = AnalyzeFilesUseCase::new(cache, config.analysis.clone());
        let harness = TestHarness::new(config.harness.clone());
        Self {
            config,
            analyze,
            refiner,
            harness,
            audit,
        }
    }

    /// Execute the full pipeline for one scan.
    #[instrument(skip(self, files, skipped, cancel, progress), fields(scan_id = %scan_id, files = files.len()))]
    pub async fn run(
        &self,
        scan_id: &str,
        files: Vec<SourceFile>,
        skipped: Vec<String>,
        mode: ScanMode,
        cancel: CancellationToken,
        progress: &ProgressFn,
    ) -> Result<ScanReport, PipelineError> {
        let start = Instant::now();
        info!(mode = ?mode, "Scan starting");

        // Stage 1-4: deterministic core.
        check_cancel(&cancel)?;
        progress(0.1);
        let analysis = self
            .analyze
            .execute(&files)
            .await
            .map_err(|e| PipelineError::Analysis(e.to_string()))?;
        progress(0.6);

        let mut violations = skipped_file_violations(&skipped);
        violations.extend(analysis.rule_result.violations.clone());

        // Stage 5: optional harness.
        check_cancel(&cancel)?;
        let test_failures = self.run_harness(&analysis, &files, &cancel).await?;
        let test_failures_json = serde_json::to_string(&test_failures).unwrap_or_else(|_| "[]".to_string());
        progress(0.7);

        // Stage 6: risk scoring.
        check_cancel(&cancel)?;
        let scorer = RiskScorer::new(self.config.analysis.max_graph_depth);
        let breakdown = scorer.score(&violations, &analysis.graph, &analysis.flow, &test_failures);
        progress(0.8);
        info!(risk_score = breakdown.total_score, violations = violations.len(), "Deterministic core complete");

        // Stage 7: gated LLM refinement.
        let whitelist: BTreeSet<String> = files.iter().map(|f| f.path.clone()).collect();
        let (refinement, llm_tokens) = self
            .maybe_refine(&violations, &analysis, &breakdown, &whitelist, &test_failures_json, &cancel)
            .await?;
        let llm_used = refinement.is_some();
        progress(0.95);

        // Stage 8: assembly.
        let issues = assemble_issues(&violations, refinement.as_ref());
        let summary = match mode {
            ScanMode::Pr => format!("PR Analysis: {}", breakdown.summary),
            ScanMode::Full => breakdown.summary.clone(),
        };

        let audit = AuditEntry {
            scan_id: scan_id.to_string(),
            files_scanned: files.len(),
            violations_found: violations.len(),
            risk_score: breakdown.total_score,
            llm_invoked: llm_used,
            llm_tokens_used: llm_tokens,
            duration_ms: start.elapsed().as_secs_f64() * 1000.0,
            deterministic_only: !llm_used,
        };
        append_best_effort(self.audit.as_ref(), &audit).await;

        info!(
            issues = issues.len(),
            risk_score = breakdown.total_score,
            llm_used,
            duration_ms = audit.duration_ms as u64,
            "Scan complete"
        );

        Ok(ScanReport {
            issues,
            risk_score: breakdown.total_score,
            risk_breakdown: breakdown,
            summary,
            llm_used,
            deterministic_only: !llm_used,
            audit,
        })
    }

    async fn run_harness(
        &self,
        analysis: &DeterministicAnalysis,
        files: &[SourceFile],
        cancel: &CancellationToken,
    ) -> Result<BTreeSet<String>, PipelineError> {
        if !self.config.harness.enabled {
            return Ok(BTreeSet::new());
        }

        let sources: BTreeMap<&str, &str> = files
            .iter()
            .map(|f| (f.path.as_str(), f.content.as_str()))
            .collect();

        let mut failed = BTreeSet::new();
        for (path, module) in &analysis.modules {
            check_cancel(cancel)?;
            let Some(source) = sources.get(path.as_str()) else {
                continue;
            };
            let results = self.harness.run_module(module, source).await;
            failed.extend(failed_function_nodes(path, &results));
        }
        Ok(failed)
    }

    async fn maybe_refine(
        &self,
        violations: &[RuleViolation],
        analysis: &DeterministicAnalysis,
        breakdown: &RiskBreakdown,
        whitelist: &BTreeSet<String>,
        test_failures_json: &str,
        cancel: &CancellationToken,
    ) -> Result<(Option<LlmRefinement>, u32), PipelineError> {
        let Some(refiner) = &self.refiner else {
            return Ok((None, 0));
        };
        let has_critical = violations.iter().any(|v| v.severity == Severity::Critical);
        let gated_in = !violations.is_empty()
            && (breakdown.total_score >= self.config.llm.risk_threshold || has_critical);
        if !gated_in {
            info!(
                risk_score = breakdown.total_score,
                threshold = self.config.llm.risk_threshold,
                "Refiner gated off; deterministic-only output"
            );
            return Ok((None, 0));
        }

        let budget = TokenBudget::new(self.config.llm.max_tokens_per_scan);
        let input = RefinementInput {
            violations,
            graph: &analysis.graph,
            flow: &analysis.flow,
            breakdown,
            file_whitelist: whitelist,
            test_failures_json,
        };

        // A cancelled call is simply discarded.
        let outcome = tokio::select! {
            outcome = refiner.execute(input, &budget) => outcome,
            _ = cancel.cancelled() => return Err(PipelineError::Cancelled),
        };

        if outcome.invoked && outcome.refinement.is_none() {
            warn!("Refinement failed or was rejected; using fallback explanations");
        }
        Ok((outcome.refinement, outcome.tokens_used))
    }
}

fn check_cancel(cancel: &CancellationToken) -> Result<(), PipelineError> {
    if cancel.is_cancelled() {
        Err(PipelineError::Cancelled)
    } else {
        Ok(())
    }
}

/// Non-fatal markers for oversize files excluded from analysis.
fn skipped_file_violations(skipped: &[String]) -> Vec<RuleViolation> {
    let mut sorted: Vec<&String> = skipped.iter().collect();
    sorted.sort();
    sorted
        .into_iter()
        .map(|path| RuleViolation {
            rule_id: "file_skipped".to_string(),
            severity: Severity::Low,
            file: path.clone(),
            line: 1,
            end_line: None,
            title: format!("File '{path}' skipped (size limit)"),
            description: format!(
                "'{path}' exceeds the per-file size limit and was excluded from analysis."
            ),
            evidence: vec!["file exceeds max_file_size_bytes".to_string()],
            affected_function: String::new(),
            graph_node_id: String::new(),
            unresolved: true,
        })
        .collect()
}

/// Merge deterministic violations with validated refinement prose, or fall
/// back to templates. The issue list mirrors the violation order exactly.
fn assemble_issues(violations: &[RuleViolation], refinement: Option<&LlmRefinement>) -> Vec<Issue> {
    violations
        .iter()
        .enumerate()
        .map(|(index, violation)| {
            let template = template_for(&violation.rule_id);
            let refined = refinement.and_then(|r| r.explanation_for(&violation.rule_id));

            let (explanation, risk, patches) = match refined {
                Some(refined) => (
                    refined.natural_language_explanation.clone(),
                    refined.production_risk_summary.clone(),
                    refined
                        .patch_suggestions
                        .iter()
                        .map(|p| Patch {
                            file: p.file.clone(),
                            start_line: p.start_line,
                            end_line: p.end_line,
                            new_code: p.new_code.clone(),
                        })
                        .collect(),
                ),
                None => (
                    violation.description.clone(),
                    template.risk.to_string(),
                    vec![Patch {
                        file: violation.file.clone(),
                        start_line: violation.line,
                        end_line: violation.end_line_or_line(),
                        new_code: format!("# TODO: {}", template.patch_hint),
                    }],
                ),
            };

            Issue {
                id: format!("{}-{}", violation.rule_id, index + 1),
                severity: violation.severity.to_string(),
                file: violation.file.clone(),
                line: violation.line,
                rule_id: violation.rule_id.clone(),
                issue: violation.title.clone(),
                explanation,
                risk,
                evidence: violation.evidence.clone(),
                patches,
                test_impact: vec![],
            }
        })
        .collect()
}
