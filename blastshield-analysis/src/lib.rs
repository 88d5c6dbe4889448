//! BlastShield analysis - deterministic static analysis core
//!
//! Stages: AST extraction, call-graph construction, data-flow facts, the
//! deterministic rule bank, and the explainable risk scorer. Every stage is
//! a pure function over immutable inputs; the per-file cache is the only
//! stateful component.

pub mod application;
pub mod domain;
pub mod infrastructure;
