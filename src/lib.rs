pub mod config;
pub mod export;
pub mod intake;
pub mod llm;
pub mod model;
pub mod parser;
pub mod pipeline;
pub mod tui;

pub use config::Config;
pub use model::{BusinessLogic, ProgramType, TestScript};
pub use pipeline::{Analyzer, Session, Step};

use export::ExportError;
use intake::InputValidationError;
use llm::RequestError;
use model::EditError;
use parser::ParseError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScribeError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input file: {0}")]
    InputValidation(#[from] InputValidationError),

    #[error("LLM request failed: {0}")]
    Request(#[from] RequestError),

    #[error("Could not parse LLM response: {0}")]
    Parse(#[from] ParseError),

    #[error("Invalid edit: {0}")]
    Edit(#[from] EditError),

    #[error("Export failed: {0}")]
    Export(#[from] ExportError),

    #[error("Workflow error: {0}")]
    Workflow(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ScribeError {
    /// Pipeline stage the error surfaced from, as shown to the user
    pub fn stage(&self) -> &'static str {
        match self {
            ScribeError::Config(_) => "Configuration",
            ScribeError::InputValidation(_) | ScribeError::Io(_) => "Upload",
            ScribeError::Request(_) | ScribeError::Parse(_) | ScribeError::Json(_) => {
                "LLM analysis"
            }
            ScribeError::Edit(_) => "Validation",
            ScribeError::Export(_) => "Export",
            ScribeError::Workflow(_) => "Workflow",
        }
    }

    /// Suggested remedy for the user
    pub fn remedy(&self) -> &'static str {
        match self {
            ScribeError::Config(_) => {
                "Check the config file and that the API key environment variable is set."
            }
            ScribeError::InputValidation(_) => {
                "Re-upload a supported source file within the size limit."
            }
            ScribeError::Io(_) => "Check the file path and permissions, then re-upload.",
            ScribeError::Request(RequestError::Authentication { .. }) => "Check the API key.",
            ScribeError::Request(err) if err.is_transient() => {
                "The service is busy or unreachable; retry in a moment."
            }
            ScribeError::Request(_) => "Check the model name and request settings, then retry.",
            ScribeError::Parse(_) | ScribeError::Json(_) => {
                "Retry the step; the model returned an unexpected format."
            }
            ScribeError::Edit(_) => "Correct the field and apply the edits again.",
            ScribeError::Export(_) => "Check that the output directory exists and is writable.",
            ScribeError::Workflow(_) => "Complete the previous step first.",
        }
    }

    /// One-line message naming the failed stage and the remedy
    pub fn user_message(&self) -> String {
        format!("{} failed: {}. {}", self.stage(), self, self.remedy())
    }
}

pub type Result<T> = std::result::Result<T, ScribeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_names_stage_and_remedy() {
        let err = ScribeError::Request(RequestError::Authentication {
            status: 401,
            message: "invalid api key".to_string(),
        });
        let msg = err.user_message();
        assert!(msg.starts_with("LLM analysis failed"));
        assert!(msg.contains("Check the API key."));
    }

    #[test]
    fn test_transient_request_suggests_retry() {
        let err = ScribeError::Request(RequestError::Timeout);
        assert!(err.remedy().contains("retry"));
    }

    #[test]
    fn test_input_validation_suggests_reupload() {
        let err = ScribeError::InputValidation(InputValidationError::Empty("a.cbl".to_string()));
        assert_eq!(err.stage(), "Upload");
        assert!(err.remedy().contains("Re-upload"));
    }
}
