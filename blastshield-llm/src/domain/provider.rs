//! The completion capability
//!
//! The engine only ever sees `Arc<dyn CompletionClient>`; provider details
//! (Groq today, anything OpenAI-compatible tomorrow) stay behind it.

use async_trait::async_trait;

use crate::domain::error::LlmError;
use crate::domain::messages::{CompletionRequest, CompletionResponse};

/// Capability for generating completions.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Generate a completion.
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError>;

    /// Default model identifier for this client.
    fn model(&self) -> &str;
}
