//! BlastShield LLM - optional refinement stage
//!
//! The refiner receives structured deterministic facts, never raw source,
//! and its output is validated all-or-nothing against the deterministic
//! violation set so hallucinations cannot leak into a report.

pub mod application;
pub mod domain;
pub mod infrastructure;
