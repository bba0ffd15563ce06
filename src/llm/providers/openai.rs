use crate::llm::client::{async_trait, LlmClient};
use crate::llm::prompt::Prompt;
use crate::llm::RequestError;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use super::error_from_response;

/// Client for OpenAI-compatible `/chat/completions` endpoints (Groq, OpenAI)
pub struct OpenAiCompatibleClient {
    base_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    client: reqwest::Client,
}

impl OpenAiCompatibleClient {
    pub const GROQ_BASE_URL: &'static str = "https://api.groq.com/openai/v1";
    pub const OPENAI_BASE_URL: &'static str = "https://api.openai.com/v1";

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

    fn build_request<'a>(&'a self, prompt: &'a Prompt) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            messages: vec![
                Message {
                    role: "system",
                    content: &prompt.system,
                },
                Message {
                    role: "user",
                    content: &prompt.user,
                },
            ],
            temperature: prompt.temperature,
            max_tokens: self.max_tokens,
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

fn extract_text(response: ChatResponse) -> Result<String, RequestError> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .filter(|text| !text.trim().is_empty())
        .ok_or_else(|| RequestError::MalformedResponse("Empty response from API".to_string()))
}

#[async_trait]
impl LlmClient for OpenAiCompatibleClient {
    async fn complete(&self, prompt: &Prompt) -> Result<String, RequestError> {
        let url = format!("{}/chat/completions", self.base_url);
        tracing::info!(
            model = %self.model,
            operation = %prompt.kind,
            "Sending chat completion request"
        );

        let started = Instant::now();
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .header("content-type", "application/json")
            .json(&self.build_request(prompt))
            .send()
            .await?;

        tracing::info!(
            status = response.status().as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Chat completion request finished"
        );

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| RequestError::MalformedResponse(e.to_string()))?;

        extract_text(body)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::OperationKind;

    #[test]
    fn test_request_body_shape() {
        let client = OpenAiCompatibleClient::new(
            reqwest::Client::new(),
            "https://api.groq.com/openai/v1/".to_string(),
            "key".to_string(),
            "llama3-8b-8192".to_string(),
            4000,
        );
        let prompt = Prompt::new(OperationKind::GenerateTests, "sys", "usr");

        let body = serde_json::to_value(client.build_request(&prompt)).unwrap();
        assert_eq!(body["model"], "llama3-8b-8192");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "usr");
        assert_eq!(body["max_tokens"], 4000);
        assert_eq!(client.base_url, "https://api.groq.com/openai/v1");
    }

    #[test]
    fn test_extract_text() {
        let body: ChatResponse = serde_json::from_str(
            r###"{"choices": [{"message": {"role": "assistant", "content": "## Program Name\nX1"}}]}"###,
        )
        .unwrap();
        assert_eq!(extract_text(body).unwrap(), "## Program Name\nX1");

        let empty: ChatResponse = serde_json::from_str(r#"{"choices": []}"#).unwrap();
        assert!(matches!(
            extract_text(empty),
            Err(RequestError::MalformedResponse(_))
        ));
    }
}
