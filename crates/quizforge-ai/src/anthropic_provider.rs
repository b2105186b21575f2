use crate::llm_provider::*;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const ANTHROPIC_API_BASE: &str = "https://api.anthropic.com/v1";
const DEFAULT_MODEL: &str = "claude-3-5-sonnet-20241022";
const API_VERSION: &str = "2023-06-01";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnthropicConfig {
    #[serde(default, skip_serializing)]
    pub api_key: SecretString,
    pub model: String,
    /// Overridable so tests can point at a local endpoint
    pub base_url: String,
    pub context_window: usize,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

impl Default for AnthropicConfig {
    fn default() -> Self {
        Self {
            api_key: SecretString::default(),
            model: DEFAULT_MODEL.to_string(),
            base_url: ANTHROPIC_API_BASE.to_string(),
            context_window: 200_000,
            timeout_secs: 120,
            max_retries: 3,
        }
    }
}

/// Anthropic Messages API provider
pub struct AnthropicProvider {
    config: AnthropicConfig,
    client: Client,
}

impl AnthropicProvider {
    pub fn new(config: AnthropicConfig) -> Result<Self> {
        if config.api_key.expose_secret().is_empty() {
            return Err(anyhow!(
                "Anthropic API key is required. Set ANTHROPIC_API_KEY environment variable."
            ));
        }

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
    ) -> Result<AnthropicResponse> {
        RetryPolicy::new(self.config.max_retries, Duration::from_secs(1))
            .run("anthropic", || self.try_request(messages, config))
            .await
    }

    fn build_request(&self, messages: &[Message], config: &GenerationConfig) -> AnthropicRequest {
        AnthropicRequest {
            model: self.config.model.clone(),
            messages: messages
                .iter()
                .filter(|m| m.role != MessageRole::System)
                .map(|m| AnthropicMessage {
                    role: m.role.to_string(),
                    content: m.content.clone(),
                })
                .collect(),
            system: messages
                .iter()
                .find(|m| m.role == MessageRole::System)
                .map(|m| m.content.clone()),
            max_tokens: config.max_tokens.unwrap_or(4096),
            temperature: Some(config.temperature),
            top_p: config.top_p,
            stop_sequences: config.stop.clone(),
        }
    }

    async fn try_request(
        &self,
        messages: &[Message],
        config: &GenerationConfig,
    ) -> Result<AnthropicResponse> {
        let response = self
            .client
            .post(format!("{}/messages", self.config.base_url))
            .header("x-api-key", self.config.api_key.expose_secret())
            .header("anthropic-version", API_VERSION)
            .header("content-type", "application/json")
            .json(&self.build_request(messages, config))
            .send()
            .await
            .context("Failed to send request to Anthropic API")?;

        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());

            return Err(anyhow!("Anthropic API error ({}): {}", status, error_text));
        }

        response
            .json::<AnthropicResponse>()
            .await
            .context("Failed to parse Anthropic API response")
    }
}

#[async_trait]
impl LLMProvider for AnthropicProvider {
    async fn generate_chat(
        &self,
        messages: &[Message],
        config: &GenerationConfig,
    ) -> LLMResult<LLMResponse> {
        let response = self.send_request(messages, config).await?;

        let content = response
            .content
            .iter()
            .filter(|c| c.content_type == "text")
            .filter_map(|c| c.text.as_deref())
            .collect::<String>();

        Ok(LLMResponse {
            content,
            total_tokens: Some(response.usage.input_tokens + response.usage.output_tokens),
            prompt_tokens: Some(response.usage.input_tokens),
            completion_tokens: Some(response.usage.output_tokens),
            finish_reason: response.stop_reason,
            model: response.model,
        })
    }

    async fn is_available(&self) -> bool {
        let config = GenerationConfig {
            max_tokens: Some(1),
            ..Default::default()
        };
        self.generate_chat(&[Message::user("ping")], &config)
            .await
            .is_ok()
    }

    fn provider_name(&self) -> &str {
        "anthropic"
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }

    fn characteristics(&self) -> ProviderCharacteristics {
        ProviderCharacteristics {
            max_tokens: self.config.context_window,
            avg_latency_ms: 2000,
            rpm_limit: Some(50),
            supports_streaming: false,
        }
    }
}

#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    messages: Vec<AnthropicMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    max_tokens: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop_sequences: Option<Vec<String>>,
}

#[derive(Debug, Serialize, Deserialize)]
struct AnthropicMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<ContentBlock>,
    model: String,
    #[serde(default)]
    stop_reason: Option<String>,
    usage: Usage,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    content_type: String,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    input_tokens: usize,
    output_tokens: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_creation_requires_api_key() {
        assert!(AnthropicProvider::new(AnthropicConfig::default()).is_err());
    }

    #[test]
    fn system_message_moves_to_top_level() {
        let provider = AnthropicProvider::new(AnthropicConfig {
            api_key: "key".into(),
            ..Default::default()
        })
        .unwrap();
        let request = provider.build_request(
            &[Message::system("be precise"), Message::user("questions please")],
            &GenerationConfig::default(),
        );
        assert_eq!(request.system.as_deref(), Some("be precise"));
        assert_eq!(request.messages.len(), 1);
        assert_eq!(request.messages[0].role, "user");
        assert_eq!(request.max_tokens, 3000);
    }
}
