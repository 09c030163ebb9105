use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use super::{Completion, CompletionClient, LlmError};

/// Bounded retry with exponential backoff around a single-shot client.
///
/// Transient failures are retried up to `max_attempts` calls in total. A rate
/// limit that outlasts the budget is reported as `LlmError::Quota`.
pub struct RetryingClient<C> {
    inner: C,
    max_attempts: u32,
}

impl<C: CompletionClient> RetryingClient<C> {
    pub fn new(inner: C, max_attempts: u32) -> Self {
        Self {
            inner,
            max_attempts: max_attempts.max(1),
        }
    }
}

/// Delay before retry `attempt` (1-based): 1s, 2s, 4s, ...
fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_millis(1000 * (1 << (attempt.saturating_sub(1)).min(6)))
}

#[async_trait]
impl<C: CompletionClient> CompletionClient for RetryingClient<C> {
    async fn complete(&self, prompt: &str) -> Result<Completion, LlmError> {
        let mut attempt = 1;
        loop {
            match self.inner.complete(prompt).await {
                Ok(completion) => return Ok(completion),
                Err(err) if err.is_transient() && attempt < self.max_attempts => {
                    let delay = backoff_delay(attempt);
                    warn!(
                        "LLM call attempt {attempt} failed ({err}), retrying after {}ms...",
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) if err.is_rate_limited() => {
                    return Err(LlmError::Quota { attempts: attempt })
                }
                Err(err) => return Err(err),
            }
        }
    }

    fn model(&self) -> &str {
        self.inner.model()
    }
}
