use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Result type for LLM operations
pub type LLMResult<T> = anyhow::Result<T>;

/// What a provider can do, used for logging and request sizing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderCharacteristics {
    /// Context window in tokens
    pub max_tokens: usize,
    /// Typical latency in milliseconds
    pub avg_latency_ms: u64,
    pub rpm_limit: Option<u64>,
    pub supports_streaming: bool,
}

/// Sampling parameters for one request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Temperature for sampling (0.0 to 2.0)
    pub temperature: f32,
    pub max_tokens: Option<usize>,
    pub top_p: Option<f32>,
    pub stop: Option<Vec<String>>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: Some(3000),
            top_p: None,
            stop: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageRole::System => write!(f, "system"),
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMResponse {
    /// Generated text content
    pub content: String,
    pub total_tokens: Option<usize>,
    pub prompt_tokens: Option<usize>,
    pub completion_tokens: Option<usize>,
    /// Finish reason (e.g., "stop", "length")
    pub finish_reason: Option<String>,
    /// Model that produced the answer
    pub model: String,
}

/// Exponential backoff for HTTP providers: `base_delay`, then twice that, and so on.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Retries after the first failed attempt
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    /// Delay before retry number `retry` (1-based).
    pub fn delay(&self, retry: u32) -> Duration {
        let factor = 1u32 << retry.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(factor)
    }

    /// Runs `op` until it succeeds or the retries run out; the last error is returned as is.
    pub async fn run<T, F, Fut>(&self, provider: &str, mut op: F) -> LLMResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = LLMResult<T>>,
    {
        let mut retry = 0;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if retry < self.max_retries => {
                    retry += 1;
                    let delay = self.delay(retry);
                    warn!(
                        provider,
                        attempt = retry,
                        of = self.max_retries + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "LLM request failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Main trait for LLM providers
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Chat completion over a message history
    async fn generate_chat(
        &self,
        messages: &[Message],
        config: &GenerationConfig,
    ) -> LLMResult<LLMResponse>;

    /// Check if the provider is configured and reachable
    async fn is_available(&self) -> bool;

    fn provider_name(&self) -> &str;

    fn model_name(&self) -> &str;

    fn characteristics(&self) -> ProviderCharacteristics;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn delay_doubles_from_the_base() {
        let policy = RetryPolicy::new(3, Duration::from_secs(1));
        assert_eq!(policy.delay(1), Duration::from_secs(1));
        assert_eq!(policy.delay(2), Duration::from_secs(2));
        assert_eq!(policy.delay(3), Duration::from_secs(4));
    }

    #[tokio::test]
    async fn run_stops_after_max_retries() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let policy = RetryPolicy::new(2, Duration::from_millis(1));
        let result: LLMResult<()> = policy
            .run("test", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(anyhow::anyhow!("down"))
            })
            .await;
        assert_eq!(result.unwrap_err().to_string(), "down");
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }
}
