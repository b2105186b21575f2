use crate::llm_provider::*;
use crate::openai_compatible_provider::{OpenAICompatibleConfig, OpenAICompatibleProvider};
use anyhow::{anyhow, Result};
use quizforge_core::config_manager::LLMConfig;
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;

#[cfg(feature = "anthropic")]
use crate::anthropic_provider::{AnthropicConfig, AnthropicProvider};

/// Factory for creating LLM providers based on configuration
pub struct LLMProviderFactory;

impl LLMProviderFactory {
    pub fn create_from_config(config: &LLMConfig) -> Result<Arc<dyn LLMProvider>> {
        let provider_name = config.provider.to_lowercase();

        match provider_name.as_str() {
            "openai" => Self::create_openai_provider(config),
            "openai-compatible" | "ollama" => {
                Self::create_openai_compatible_provider(config, &provider_name)
            }
            #[cfg(feature = "anthropic")]
            "anthropic" => Self::create_anthropic_provider(config),
            _ => Err(anyhow!(
                "Unsupported LLM provider: {}. Available providers: {}",
                provider_name,
                Self::supported_providers().join(", ")
            )),
        }
    }

    fn compatible_config(config: &LLMConfig, provider_name: &str) -> OpenAICompatibleConfig {
        OpenAICompatibleConfig {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            timeout_secs: config.timeout_secs,
            max_retries: config.max_retries,
            api_key: config.api_key.clone(),
            provider_name: provider_name.to_string(),
            ..Default::default()
        }
    }

    fn create_openai_provider(config: &LLMConfig) -> Result<Arc<dyn LLMProvider>> {
        let api_key = config
            .api_key
            .clone()
            .or_else(|| std::env::var("OPENAI_API_KEY").ok().map(SecretString::from))
            .filter(|k| !k.expose_secret().is_empty())
            .ok_or_else(|| {
                anyhow!(
                    "OpenAI API key not found. Set 'llm.api_key' in config \
                     or OPENAI_API_KEY environment variable"
                )
            })?;

        let mut openai_config = Self::compatible_config(config, "openai");
        openai_config.api_key = Some(api_key);
        Ok(Arc::new(OpenAICompatibleProvider::new(openai_config)?))
    }

    /// Any endpoint speaking the chat completions protocol; the key is optional.
    fn create_openai_compatible_provider(
        config: &LLMConfig,
        provider_name: &str,
    ) -> Result<Arc<dyn LLMProvider>> {
        if config.model.trim().is_empty() {
            return Err(anyhow!("Model name is required for OpenAI-compatible provider"));
        }
        Ok(Arc::new(OpenAICompatibleProvider::new(
            Self::compatible_config(config, provider_name),
        )?))
    }

    #[cfg(feature = "anthropic")]
    fn create_anthropic_provider(config: &LLMConfig) -> Result<Arc<dyn LLMProvider>> {
        let api_key = config
            .anthropic_api_key
            .clone()
            .or_else(|| std::env::var("ANTHROPIC_API_KEY").ok().map(SecretString::from))
            .ok_or_else(|| {
                anyhow!(
                    "Anthropic API key not found. Set 'llm.anthropic_api_key' in config \
                     or ANTHROPIC_API_KEY environment variable"
                )
            })?;

        let anthropic_config = AnthropicConfig {
            api_key,
            model: config.model.clone(),
            timeout_secs: config.timeout_secs,
            max_retries: config.max_retries,
            ..Default::default()
        };

        Ok(Arc::new(AnthropicProvider::new(anthropic_config)?))
    }

    /// Providers compiled into this build
    pub fn supported_providers() -> Vec<&'static str> {
        #[allow(unused_mut)]
        let mut providers = vec!["openai", "openai-compatible", "ollama"];

        #[cfg(feature = "anthropic")]
        providers.push("anthropic");

        providers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supported_providers() {
        let providers = LLMProviderFactory::supported_providers();
        assert!(providers.contains(&"openai"));
        assert!(providers.contains(&"openai-compatible"));
    }

    #[test]
    fn test_openai_provider_creation() {
        let config = LLMConfig {
            provider: "OpenAI".to_string(),
            api_key: Some("sk-test".into()),
            ..Default::default()
        };

        let provider = LLMProviderFactory::create_from_config(&config).unwrap();
        assert_eq!(provider.provider_name(), "openai");
        assert_eq!(provider.model_name(), "gpt-4");
    }

    #[test]
    fn test_compatible_provider_needs_no_key() {
        let config = LLMConfig {
            provider: "openai-compatible".to_string(),
            base_url: "http://localhost:11434/v1/".to_string(),
            model: "llama3".to_string(),
            api_key: None,
            ..Default::default()
        };

        let provider = LLMProviderFactory::create_from_config(&config).unwrap();
        assert_eq!(provider.provider_name(), "openai-compatible");
        assert_eq!(provider.model_name(), "llama3");
    }

    #[test]
    fn test_unknown_provider() {
        let config = LLMConfig {
            provider: "carrier-pigeon".to_string(),
            ..Default::default()
        };

        let err = LLMProviderFactory::create_from_config(&config)
            .err()
            .unwrap()
            .to_string();
        assert!(err.contains("Unsupported LLM provider: carrier-pigeon"));
    }
}
