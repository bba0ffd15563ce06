pub mod anthropic;
pub mod openai;

use crate::llm::RequestError;

/// Turn a non-success response into a classified error
pub(crate) async fn error_from_response(response: reqwest::Response) -> RequestError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    tracing::warn!(status, body = %truncate(&body, 300), "LLM API returned an error status");
    RequestError::from_status(status, truncate(&body, 1000))
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max_chars).collect();
        format!("{}…", cut)
    }
}
