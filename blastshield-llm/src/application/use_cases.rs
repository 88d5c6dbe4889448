//! Refinement use case
//!
//! Composes the structured prompt, enforces the per-scan token budget,
//! dispatches the completion, and validates the result. Every failure mode
//! maps to `None`: the caller falls back to templates and the scan never
//! fails because of the refiner.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use tracing::{info, instrument, warn};

use blastshield_analysis::domain::{CallGraph, FlowFacts, RiskBreakdown, RuleViolation};
use blastshield_core::config::LlmConfig;

use crate::domain::{CompletionClient, CompletionRequest, LlmRefinement};
use crate::infrastructure::prompts::{PromptBuilder, SYSTEM_PROMPT};
use crate::infrastructure::response_parser::ResponseParser;
use crate::infrastructure::validator::validate_refinement;

/// Per-scan token budget. Exhaustion suppresses further calls; it is not
/// an error.
pub struct TokenBudget {
    limit: u32,
    used: AtomicU32,
}

impl TokenBudget {
    pub fn new(limit: u32) -> Self {
        Self {
            limit,
            used: AtomicU32::new(0),
        }
    }

    pub fn record(&self, tokens: u32) {
        self.used.fetch_add(tokens, Ordering::SeqCst);
    }

    pub fn used(&self) -> u32 {
        self.used.load(Ordering::SeqCst)
    }

    pub fn exhausted(&self) -> bool {
        self.used() >= self.limit
    }
}

/// Deterministic facts handed to the refiner.
pub struct RefinementInput<'a> {
    pub violations: &'a [RuleViolation],
    pub graph: &'a CallGraph,
    pub flow: &'a FlowFacts,
    pub breakdown: &'a RiskBreakdown,
    pub file_whitelist: &'a BTreeSet<String>,
    pub test_failures_json: &'a str,
}

/// What the refiner produced for a scan.
#[derive(Debug, Default)]
pub struct RefinementOutcome {
    /// Validated refinement, or `None` on any failure (fallback applies)
    pub refinement: Option<LlmRefinement>,
    pub tokens_used: u32,
    /// Whether a completion call was actually dispatched
    pub invoked: bool,
}

pub struct RefineViolationsUseCase {
    client: Arc<dyn CompletionClient>,
    config: LlmConfig,
    subgraph_hops: usize,
}

impl RefineViolationsUseCase {
    pub fn new(client: Arc<dyn CompletionClient>, config: LlmConfig, subgraph_hops: usize) -> Self {
        Self {
            client,
            config,
            subgraph_hops,
        }
    }

    pub fn model(&self) -> &str {
        self.client.model()
    }

    /// Run one refinement pass. Never propagates an error.
    #[instrument(skip(self, input, budget), fields(violations = input.violations.len()))]
    pub async fn execute(
        &self,
        input: RefinementInput<'_>,
        budget: &TokenBudget,
    ) -> RefinementOutcome {
        if input.violations.is_empty() {
            return RefinementOutcome::default();
        }
        if budget.exhausted() {
            info!("Token budget exhausted; skipping refinement");
            return RefinementOutcome::default();
        }

        let prompt = PromptBuilder::build_refinement_prompt(
            input.violations,
            input.graph,
            input.flow,
            input.breakdown,
            input.file_whitelist,
            input.test_failures_json,
            self.subgraph_hops,
        );

        let request = CompletionRequest::new()
            .with_system(SYSTEM_PROMPT)
            .with_user(prompt)
            .with_model(self.config.model.clone())
            .with_temperature(self.config.temperature)
            .with_max_tokens(self.config.max_tokens_per_scan);

        let response = match self.client.complete(request).await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "Refinement call failed; falling back");
                return RefinementOutcome {
                    refinement: None,
                    tokens_used: 0,
                    invoked: true,
                };
            }
        };

        let tokens_used = response.usage.total_tokens;
        budget.record(tokens_used);

        let parsed: serde_json::Value = match ResponseParser::parse_json(&response.content) {
            Ok(value) => value,
            Err(e) => {
                warn!(error = %e, "Refinement response was not JSON; falling back");
                return RefinementOutcome {
                    refinement: None,
                    tokens_used,
                    invoked: true,
                };
            }
        };

        let outcome = validate_refinement(&parsed, input.file_whitelist, input.violations);
        if !outcome.valid {
            warn!(errors = ?outcome.errors, "Refinement rejected by validator; falling back");
            return RefinementOutcome {
                refinement: None,
                tokens_used,
                invoked: true,
            };
        }

        info!(tokens_used, "Refinement validated");
        RefinementOutcome {
            refinement: outcome.refinement,
            tokens_used,
            invoked: true,
        }
    }
}
