//! BlastShield engine - the scan orchestrator
//!
//! Wires the deterministic core, the optional harness and the optional
//! LLM refiner into the staged pipeline, and exposes the four operations
//! the HTTP host consumes: scan, pr-scan, status, health.

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::{EngineError, ScanEngine};
pub use domain::report::{
    FileInput, HealthResponse, Issue, Patch, ScanMode, ScanReport, ScanRequest, ScanResponse,
    ScanStatusResponse,
};
