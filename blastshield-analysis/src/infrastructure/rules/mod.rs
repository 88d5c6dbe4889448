//! Deterministic rule bank
//!
//! A rule is a pure function over extracted facts: `(modules, call graph,
//! flow facts) -> violations`. Rules never touch wall-clock, RNG, the
//! environment, or raw source text, and never mutate their inputs. They are
//! registered in a fixed order; the engine sorts each rule's output by
//! `(file, line)` so reports are reproducible regardless of how the scan
//! was parallelised.

mod blocking_io_in_async;
mod dangerous_eval;
mod missing_await;
mod missing_exception_boundary;
mod race_condition;
mod retry_without_backoff;
mod shared_mutable_state;
mod unsanitized_io;

use std::collections::BTreeMap;

use blastshield_core::config::AnalysisConfig;

use crate::domain::{CallGraph, FlowFacts, ModuleAst, RuleViolation};

pub use blocking_io_in_async::BlockingIoInAsync;
pub use dangerous_eval::DangerousEval;
pub use missing_await::MissingAwait;
pub use missing_exception_boundary::MissingExceptionBoundary;
pub use race_condition::RaceCondition;
pub use retry_without_backoff::RetryWithoutBackoff;
pub use shared_mutable_state::SharedMutableState;
pub use unsanitized_io::UnsanitizedIo;

/// Immutable inputs shared by every rule.
pub struct RuleContext<'a> {
    pub modules: &'a BTreeMap<String, ModuleAst>,
    pub graph: &'a CallGraph,
    pub flow: &'a FlowFacts,
    pub config: &'a AnalysisConfig,
}

/// Internal rule failure. Caught by the engine and downgraded to a
/// `rule_error` violation; a broken rule never fails a scan.
#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    #[error("{0}")]
    Internal(String),
}

/// A deterministic detection rule.
pub trait Rule: Send + Sync {
    fn id(&self) -> &'static str;
    fn check(&self, ctx: &RuleContext<'_>) -> Result<Vec<RuleViolation>, RuleError>;
}

/// The rule bank in registration order. The order is part of the report
/// contract: violations are emitted grouped by rule in this sequence.
pub fn default_rules() -> Vec<Box<dyn Rule>> {
    vec![
        Box::new(RaceCondition),
        Box::new(MissingAwait),
        Box::new(DangerousEval),
        Box::new(UnsanitizedIo),
        Box::new(SharedMutableState),
        Box::new(MissingExceptionBoundary),
        Box::new(RetryWithoutBackoff),
        Box::new(BlockingIoInAsync),
    ]
}

/// Split a `module::member` graph key into its parts.
pub(crate) fn split_node_id(id: &str) -> (&str, &str) {
    id.split_once("::").unwrap_or((id, id))
}
