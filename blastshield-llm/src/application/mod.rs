//! Application layer for the refinement stage

pub mod use_cases;

pub use use_cases::{RefineViolationsUseCase, RefinementInput, RefinementOutcome, TokenBudget};
