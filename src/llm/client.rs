use crate::config::Config;
use crate::llm::prompt::Prompt;
use crate::llm::RequestError;
use crate::ScribeError;

use super::providers::anthropic::AnthropicClient;
use super::providers::openai::OpenAiCompatibleClient;

/// Sends one prompt to a hosted model and returns the raw response text
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, prompt: &Prompt) -> Result<String, RequestError>;

    /// Model identifier, for logs and status lines
    fn model(&self) -> &str;
}

/// Create an LLM client based on configuration
pub fn create_client(config: &Config) -> Result<Box<dyn LlmClient>, ScribeError> {
    let llm = &config.llm;
    let api_key = std::env::var(&llm.api_key_env)
        .ok()
        .filter(|key| !key.trim().is_empty())
        .ok_or_else(|| {
            ScribeError::Config(format!(
                "API key not found in environment variable: {}",
                llm.api_key_env
            ))
        })?;

    let http = reqwest::Client::builder()
        .timeout(llm.timeout())
        .build()
        .map_err(|e| ScribeError::Config(format!("Failed to build HTTP client: {}", e)))?;

    match llm.provider.as_str() {
        "groq" | "openai" => {
            let base_url = llm.base_url.clone().unwrap_or_else(|| {
                if llm.provider == "groq" {
                    OpenAiCompatibleClient::GROQ_BASE_URL.to_string()
                } else {
                    OpenAiCompatibleClient::OPENAI_BASE_URL.to_string()
                }
            });
            Ok(Box::new(OpenAiCompatibleClient::new(
                http,
                base_url,
                api_key,
                llm.model.clone(),
                llm.max_tokens,
            )))
        }
        "anthropic" => {
            let base_url = llm
                .base_url
                .clone()
                .unwrap_or_else(|| AnthropicClient::BASE_URL.to_string());
            Ok(Box::new(AnthropicClient::new(
                http,
                base_url,
                api_key,
                llm.model.clone(),
                llm.max_tokens,
            )))
        }
        provider => Err(ScribeError::Config(format!(
            "Unsupported LLM provider: {}",
            provider
        ))),
    }
}

// Re-export async_trait for providers
pub use async_trait::async_trait;
