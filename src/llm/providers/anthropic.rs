use crate::llm::client::{async_trait, LlmClient};
use crate::llm::prompt::Prompt;
use crate::llm::RequestError;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use super::error_from_response;

pub struct AnthropicClient {
    base_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    client: reqwest::Client,
}

impl AnthropicClient {
    pub const BASE_URL: &'static str = "https://api.anthropic.com";

    pub fn new(
        client: reqwest::Client,
        base_url: String,
        api_key: String,
        model: String,
        max_tokens: u32,
    ) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model,
            max_tokens,
            client,
        }
    }
}

#[derive(Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    system: &'a str,
    messages: Vec<Message<'a>>,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct AnthropicResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
}

fn extract_text(response: AnthropicResponse) -> Result<String, RequestError> {
    let text = response
        .content
        .into_iter()
        .filter_map(|block| block.text)
        .collect::<Vec<_>>()
        .join("");

    if text.trim().is_empty() {
        Err(RequestError::MalformedResponse("Empty response from API".to_string()))
    } else {
        Ok(text)
    }
}

#[async_trait]
impl LlmClient for AnthropicClient {
    async fn complete(&self, prompt: &Prompt) -> Result<String, RequestError> {
        let request = AnthropicRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            temperature: prompt.temperature,
            system: &prompt.system,
            messages: vec![Message {
                role: "user",
                content: &prompt.user,
            }],
        };

        tracing::info!(model = %self.model, operation = %prompt.kind, "Sending messages request");
        let started = Instant::now();

        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await?;

        tracing::info!(
            status = response.status().as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Messages request finished"
        );

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let api_response: AnthropicResponse = response
            .json()
            .await
            .map_err(|e| RequestError::MalformedResponse(e.to_string()))?;

        extract_text(api_response)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_text_joins_blocks() {
        let body: AnthropicResponse = serde_json::from_str(
            r###"{"content": [{"type": "text", "text": "## Program "}, {"type": "text", "text": "Name"}]}"###,
        )
        .unwrap();
        assert_eq!(extract_text(body).unwrap(), "## Program Name");
    }

    #[test]
    fn test_empty_content_is_malformed() {
        let body: AnthropicResponse = serde_json::from_str(r#"{"content": []}"#).unwrap();
        assert!(matches!(
            extract_text(body),
            Err(RequestError::MalformedResponse(_))
        ));
    }
}
