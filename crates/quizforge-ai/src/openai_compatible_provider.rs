use crate::llm_provider::*;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for OpenAI and OpenAI-compatible chat endpoints (Ollama, LM Studio, vLLM...)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAICompatibleConfig {
    /// Base URL for the API (e.g., "https://api.openai.com/v1")
    pub base_url: String,
    pub model: String,
    pub context_window: usize,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Retries after the first failed attempt
    pub max_retries: u32,
    /// First backoff delay; doubles on every further attempt
    pub retry_backoff_ms: u64,
    /// Optional API key (hosted endpoints need it, local ones usually don't)
    #[serde(default, skip_serializing)]
    pub api_key: Option<SecretString>,
    /// Provider name for logs
    pub provider_name: String,
}

impl Default for OpenAICompatibleConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4".to_string(),
            context_window: 128_000,
            timeout_secs: 120,
            max_retries: 3,
            retry_backoff_ms: 1000,
            api_key: None,
            provider_name: "openai".to_string(),
        }
    }
}

impl OpenAICompatibleConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries, Duration::from_millis(self.retry_backoff_ms))
    }
}

pub struct OpenAICompatibleProvider {
    config: OpenAICompatibleConfig,
    client: Client,
}

impl OpenAICompatibleProvider {
    pub fn new(config: OpenAICompatibleConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { config, client })
    }

    async fn send_request(
        &self,
        messages: &[Message],
        config: &GenerationConfig,
    ) -> Result<ChatCompletionsResponse> {
        self.config
            .retry_policy()
            .run(&self.config.provider_name, || {
                self.try_chat_completions_request(messages, config)
            })
            .await
    }

    async fn try_chat_completions_request(
        &self,
        messages: &[Message],
        config: &GenerationConfig,
    ) -> Result<ChatCompletionsResponse> {
        let request = ChatCompletionsRequest {
            model: self.config.model.clone(),
            messages: messages
                .iter()
                .map(|m| ChatMessage {
                    role: m.role.to_string(),
                    content: m.content.clone(),
                })
                .collect(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            top_p: config.top_p,
            stop: config.stop.clone(),
        };

        let mut request_builder = self
            .client
            .post(format!("{}/chat/completions", self.config.base_url))
            .header("Content-Type", "application/json")
            .json(&request);

        if let Some(api_key) = &self.config.api_key {
            request_builder =
                request_builder.bearer_auth(api_key.expose_secret());
        }

        let response = request_builder.send().await.context(format!(
            "Failed to send request to {} at {}",
            self.config.provider_name, self.config.base_url
        ))?;

        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());

            return Err(anyhow!(
                "{} API error ({}): {}",
                self.config.provider_name,
                status,
                error_text
            ));
        }

        response.json().await.context(format!(
            "Failed to parse {} chat completions response",
            self.config.provider_name
        ))
    }
}

#[async_trait]
impl LLMProvider for OpenAICompatibleProvider {
    async fn generate_chat(
        &self,
        messages: &[Message],
        config: &GenerationConfig,
    ) -> LLMResult<LLMResponse> {
        let response = self.send_request(messages, config).await?;
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("No choices in response"))?;

        Ok(LLMResponse {
            content: choice.message.content,
            total_tokens: response.usage.as_ref().map(|u| u.total_tokens),
            prompt_tokens: response.usage.as_ref().map(|u| u.prompt_tokens),
            completion_tokens: response.usage.as_ref().map(|u| u.completion_tokens),
            finish_reason: choice.finish_reason,
            model: response.model.unwrap_or_else(|| self.config.model.clone()),
        })
    }

    async fn is_available(&self) -> bool {
        let mut request = self.client.get(format!("{}/models", self.config.base_url));
        if let Some(api_key) = &self.config.api_key {
            request = request.bearer_auth(api_key.expose_secret());
        }
        matches!(request.send().await, Ok(r) if r.status().is_success())
    }

    fn provider_name(&self) -> &str {
        &self.config.provider_name
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }

    fn characteristics(&self) -> ProviderCharacteristics {
        ProviderCharacteristics {
            max_tokens: self.config.context_window,
            avg_latency_ms: 3000,
            rpm_limit: None,
            supports_streaming: false,
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionsRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop: Option<Vec<String>>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionsResponse {
    #[serde(default)]
    model: Option<String>,
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    prompt_tokens: usize,
    completion_tokens: usize,
    total_tokens: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::State, http::HeaderMap, http::StatusCode, routing::post, Json, Router};
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Serves `/chat/completions`, failing the first `failures` calls with a 500.
    async fn mock_endpoint(failures: usize) -> (String, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let app = Router::new()
            .route(
                "/chat/completions",
                post(
                    move |State(calls): State<Arc<AtomicUsize>>,
                          headers: HeaderMap,
                          Json(body): Json<Value>| async move {
                        let n = calls.fetch_add(1, Ordering::SeqCst);
                        if n < failures {
                            return (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"error": "boom"})));
                        }
                        let auth = headers
                            .get("authorization")
                            .and_then(|v| v.to_str().ok())
                            .unwrap_or_default()
                            .to_string();
                        let reply = format!("{}|{}", auth, body["messages"][1]["content"].as_str().unwrap_or_default());
                        (
                            StatusCode::OK,
                            Json(json!({
                                "model": body["model"],
                                "choices": [{"message": {"role": "assistant", "content": reply}, "finish_reason": "stop"}],
                                "usage": {"prompt_tokens": 3, "completion_tokens": 4, "total_tokens": 7}
                            })),
                        )
                    },
                ),
            )
            .with_state(calls.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{}", addr), calls)
    }

    fn provider(base_url: String, retries: u32) -> OpenAICompatibleProvider {
        let mut config = OpenAICompatibleConfig {
            base_url,
            model: "test-model".into(),
            provider_name: "mock".into(),
            ..Default::default()
        };
        config.api_key = Some("sk-test".into());
        config.max_retries = retries;
        config.retry_backoff_ms = 1;
        OpenAICompatibleProvider::new(config).unwrap()
    }

    #[test]
    fn default_retry_policy_starts_at_one_second() {
        let policy = OpenAICompatibleConfig::default().retry_policy();
        assert_eq!(policy.max_retries, 3);
        assert_eq!(policy.delay(3), Duration::from_secs(4));
    }

    #[tokio::test]
    async fn sends_bearer_key_and_reads_first_choice() {
        let (url, calls) = mock_endpoint(0).await;
        let llm = provider(url, 0);
        let messages = [Message::system("sys"), Message::user("make questions")];
        let response = llm
            .generate_chat(&messages, &GenerationConfig::default())
            .await
            .unwrap();
        assert_eq!(response.content, "Bearer sk-test|make questions");
        assert_eq!(response.model, "test-model");
        assert_eq!(response.total_tokens, Some(7));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_server_errors() {
        let (url, calls) = mock_endpoint(2).await;
        let llm = provider(url.clone(), 3);
        let messages = [Message::system("sys"), Message::user("again")];
        assert!(llm.generate_chat(&messages, &GenerationConfig::default()).await.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 3);

        let (url, _) = mock_endpoint(5).await;
        let llm = provider(url, 1);
        let err = llm
            .generate_chat(&messages, &GenerationConfig::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("500"));
    }
}
