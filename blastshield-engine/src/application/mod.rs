//! Engine application layer

pub mod pipeline;
pub mod use_cases;

pub use pipeline::{PipelineError, ScanPipeline};
pub use use_cases::{EngineError, ScanEngine};
