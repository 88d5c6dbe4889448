//! Retry/timeout decorator for completion clients
//!
//! Wraps any `CompletionClient` with a per-call timeout and exponential
//! backoff (1s -> 2s -> 4s) on retryable errors. Non-retryable errors
//! surface immediately.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::domain::{CompletionClient, CompletionRequest, CompletionResponse, LlmError};

pub struct ResilientClient {
    inner: Arc<dyn CompletionClient>,
    timeout: Duration,
    max_retries: u32,
}

impl ResilientClient {
    pub fn new(inner: Arc<dyn CompletionClient>, timeout: Duration, max_retries: u32) -> Self {
        Self {
            inner,
            timeout,
            max_retries: max_retries.max(1),
        }
    }

    fn backoff_delay(attempt: u32) -> Duration {
        Duration::from_secs(1u64 << attempt.min(6))
    }
}

#[async_trait]
impl CompletionClient for ResilientClient {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let mut last_error = None;

        for attempt in 0..self.max_retries {
            let result = tokio::time::timeout(self.timeout, self.inner.complete(request.clone()))
                .await
                .map_err(|_| LlmError::Timeout {
                    seconds: self.timeout.as_secs(),
                })
                .and_then(|inner| inner);

            match result {
                Ok(response) => return Ok(response),
                Err(e) if e.is_retryable() && attempt + 1 < self.max_retries => {
                    let delay = e
                        .retry_after()
                        .unwrap_or_else(|| Self::backoff_delay(attempt));
                    warn!(
                        attempt = attempt + 1,
                        max = self.max_retries,
                        delay_s = delay.as_secs(),
                        error = %e,
                        "Completion failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    last_error = Some(e);
                }
                Err(e) => {
                    debug!(error = %e, "Completion failed without retry");
                    return Err(e);
                }
            }
        }

        Err(last_error.unwrap_or(LlmError::ServiceUnavailable("retries exhausted".to_string())))
    }

    fn model(&self) -> &str {
        self.inner.model()
    }
}
