use crate::config::{ChunkingConfig, Config};
use crate::intake::SourceFile;
use crate::llm::chunk::{chunk_source, estimate_tokens};
use crate::llm::prompt::{extraction_prompt, review_prompt, test_generation_prompt};
use crate::llm::{complete_with_retry, LlmClient, Prompt, RequestError, RetryPolicy};
use crate::model::{BusinessLogic, TestScript};
use crate::parser::{merge_business_logic, parse_business_logic, parse_test_script, ParseError};
use crate::Result;

/// Result of business logic extraction
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub record: BusinessLogic,
    /// One response per source chunk, in chunk order
    pub raw_responses: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TestGeneration {
    pub script: TestScript,
    pub raw_response: String,
}

/// Runs the LLM-backed stages: one request at a time, each awaited before the next
pub struct Analyzer {
    client: Box<dyn LlmClient>,
    retry: RetryPolicy,
    chunking: ChunkingConfig,
    temperature: Option<f32>,
}

impl Analyzer {
    pub fn new(
        client: Box<dyn LlmClient>,
        retry: RetryPolicy,
        chunking: ChunkingConfig,
        temperature: Option<f32>,
    ) -> Self {
        Self {
            client,
            retry,
            chunking,
            temperature,
        }
    }

    pub fn from_config(client: Box<dyn LlmClient>, config: &Config) -> Self {
        Self::new(
            client,
            config.retry.policy(),
            config.chunking.clone(),
            config.llm.temperature,
        )
    }

    pub fn model(&self) -> &str {
        self.client.model()
    }

    async fn complete(&self, prompt: Prompt) -> std::result::Result<String, RequestError> {
        let prompt = prompt.with_temperature(self.temperature);
        tracing::debug!(
            operation = %prompt.kind,
            temperature = prompt.temperature,
            est_tokens = estimate_tokens(&prompt.user, self.chunking.chars_per_token),
            "Sending prompt"
        );
        complete_with_retry(self.client.as_ref(), &self.retry, &prompt).await
    }

    /// Extract business logic, chunking the source when it exceeds the token budget.
    ///
    /// Any failed chunk fails the whole extraction; no partial record is returned.
    pub async fn extract(&self, source: &SourceFile) -> Result<Extraction> {
        let defaults = BusinessLogic::new(source.program_name(), source.info.program_type);
        let chunks = chunk_source(&source.content, self.chunking.max_chunk_chars());
        let chunk_count = chunks.len();

        tracing::info!(
            filename = %source.filename,
            chunks = chunk_count,
            est_tokens = estimate_tokens(&source.content, self.chunking.chars_per_token),
            "Starting business logic extraction"
        );

        let mut parts = Vec::with_capacity(chunk_count);
        let mut raw_responses = Vec::with_capacity(chunk_count);

        for (index, chunk) in chunks.iter().enumerate() {
            let prompt = extraction_prompt(chunk, &source.info, index, chunk_count);
            let raw = self.complete(prompt).await?;
            let part = parse_business_logic(&raw, &defaults)?;
            tracing::debug!(
                chunk = index + 1,
                chunks = chunk_count,
                summary = %part.summary(),
                "Parsed chunk"
            );
            parts.push(part);
            raw_responses.push(raw);
        }

        let record = merge_business_logic(parts);
        tracing::info!(
            program = %record.program_name,
            summary = %record.summary(),
            "Extraction complete"
        );

        Ok(Extraction {
            record,
            raw_responses,
        })
    }

    pub async fn generate_tests(&self, logic: &BusinessLogic) -> Result<TestGeneration> {
        let prompt = test_generation_prompt(logic, self.chunking.max_chunk_chars());
        let raw = self.complete(prompt).await?;
        let script = parse_test_script(&raw, &logic.program_name)?;

        tracing::info!(
            program = %logic.program_name,
            test_cases = script.test_cases.len(),
            "Generated test script"
        );
        Ok(TestGeneration {
            script,
            raw_response: raw,
        })
    }

    /// Ask the model for consistency findings on an edited record
    pub async fn review(&self, logic: &BusinessLogic) -> Result<String> {
        let raw = self.complete(review_prompt(logic)).await?;
        let findings = raw.trim();
        if findings.is_empty() {
            return Err(ParseError::EmptyResponse.into());
        }
        Ok(findings.to_string())
    }
}
