//! Application layer for the deterministic analysis core

pub mod use_cases;

pub use use_cases::{AnalyzeFilesUseCase, DeterministicAnalysis};
