//! Analysis domain model
//!
//! Immutable entities produced by the pipeline stages. Downstream stages
//! attach new entities rather than mutating upstream ones.

pub mod ast;
pub mod flow;
pub mod graph;
pub mod risk;
pub mod violation;

pub use ast::{
    ArgumentInfo, CallSite, ClassDef, ContainerKind, ExceptionHandler, ExceptionSummary,
    FunctionDef, ImportStmt, LocalBinding, LoopSummary, ModuleAssignment, ModuleAst, Parameter,
    ReturnSummary, SourceFile, SourceLanguage,
};
pub use flow::{FlowFacts, FunctionFlow, TaintedSink};
pub use graph::{CallGraph, CallGraphEdge, CallGraphNode, CallType, SharedStateAccess, EXTERNAL_NODE};
pub use risk::{severity_bucket, RiskBreakdown, SeverityBucket, ViolationContribution};
pub use violation::{RuleResult, RuleViolation, Severity};
