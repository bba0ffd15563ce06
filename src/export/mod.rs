pub mod document;
mod docx;
mod markdown;

pub use self::docx::render_docx;
pub use document::{business_logic_document, test_script_document, Block, DocumentModel};
pub use markdown::render_markdown;

use crate::config::ExportFormat;
use crate::model::{BusinessLogic, TestScript};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("could not write document: {0}")]
    Io(#[from] std::io::Error),

    #[error("document generation failed: {0}")]
    Docx(String),
}

/// Which record a document is built from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    BusinessLogic,
    TestScript,
}

impl ArtifactKind {
    fn file_suffix(&self) -> &'static str {
        match self {
            ArtifactKind::BusinessLogic => "Business_Logic",
            ArtifactKind::TestScript => "Test_Script",
        }
    }
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Docx => "docx",
            ExportFormat::Markdown => "md",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedDocument {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Program name reduced to characters that are safe in a file name
fn sanitize_program_name(program_name: &str) -> String {
    let cleaned: String = program_name
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_matches('_');

    if cleaned.is_empty() {
        "Unnamed_Program".to_string()
    } else {
        cleaned.to_string()
    }
}

/// `<program>_Business_Logic.docx`, `<program>_Test_Script.md`, ...
pub fn export_filename(program_name: &str, kind: ArtifactKind, format: ExportFormat) -> String {
    format!(
        "{}_{}.{}",
        sanitize_program_name(program_name),
        kind.file_suffix(),
        format.extension()
    )
}

/// Render a laid-out document in `format`
pub fn export_record(
    document: &DocumentModel,
    program_name: &str,
    kind: ArtifactKind,
    format: ExportFormat,
) -> Result<ExportedDocument, ExportError> {
    let bytes = match format {
        ExportFormat::Docx => render_docx(document)?,
        ExportFormat::Markdown => render_markdown(document).into_bytes(),
    };
    let filename = export_filename(program_name, kind, format);

    tracing::info!(filename = %filename, bytes = bytes.len(), "Rendered export document");
    Ok(ExportedDocument { filename, bytes })
}

pub fn export_business_logic(
    logic: &BusinessLogic,
    format: ExportFormat,
) -> Result<ExportedDocument, ExportError> {
    let document = business_logic_document(logic);
    export_record(&document, &logic.program_name, ArtifactKind::BusinessLogic, format)
}

pub fn export_test_script(
    script: &TestScript,
    format: ExportFormat,
) -> Result<ExportedDocument, ExportError> {
    let document = test_script_document(script);
    export_record(&document, &script.program_name, ArtifactKind::TestScript, format)
}

/// Write an exported document into `dir`, creating the directory if needed
pub fn write_to_dir(dir: &Path, document: &ExportedDocument) -> Result<PathBuf, ExportError> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(&document.filename);
    std::fs::write(&path, &document.bytes)?;
    tracing::info!(path = %path.display(), "Wrote export document");
    Ok(path)
}
