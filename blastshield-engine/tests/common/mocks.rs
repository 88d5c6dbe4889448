//! Mock completion client for exercising the refinement path

use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;

use blastshield_llm::domain::{
    CompletionClient, CompletionRequest, CompletionResponse, LlmError, Usage,
};

/// Returns a fixed response body and counts invocations.
pub struct MockCompletionClient {
    content: String,
    pub calls: AtomicU32,
}

impl MockCompletionClient {
    pub fn new(content: &str) -> Self {
        Self {
            content: content.to_string(),
            calls: AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl CompletionClient for MockCompletionClient {
    async fn complete(&self, _request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(CompletionResponse {
            content: self.content.clone(),
            model: "mock".to_string(),
            usage: Usage {
                prompt_tokens: 100,
                completion_tokens: 50,
                total_tokens: 150,
            },
        })
    }

    fn model(&self) -> &str {
        "mock"
    }
}
