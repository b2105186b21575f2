pub mod generator;
pub mod llm_factory;
pub mod llm_provider;
pub mod openai_compatible_provider;
pub mod parse;
pub mod prompt;

// Cloud LLM providers
#[cfg(feature = "anthropic")]
pub mod anthropic_provider;

pub use generator::{
    GenerationError, GenerationReport, GenerationRequest, QuestionGenerator, RegenerationRequest,
};
pub use llm_factory::LLMProviderFactory;
pub use llm_provider::*;
pub use openai_compatible_provider::{OpenAICompatibleConfig, OpenAICompatibleProvider};
pub use parse::QuestionDraft;
pub use prompt::{render, subject_template, BuiltinTemplate, PromptContext, PromptError};
