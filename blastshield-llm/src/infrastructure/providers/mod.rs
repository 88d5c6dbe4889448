//! Completion providers

pub mod groq;
pub mod resilient;

pub use groq::GroqClient;
pub use resilient::ResilientClient;
