mod cache;
mod program;

pub use cache::SourceCache;
pub use program::{detect_program_type, extract_program_info, ProgramInfo};

use crate::config::IntakeConfig;
use crate::ScribeError;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InputValidationError {
    #[error("{filename}: unsupported file extension '.{extension}' (allowed: {allowed})")]
    UnsupportedExtension {
        filename: String,
        extension: String,
        allowed: String,
    },

    #[error("{filename}: file has no extension (allowed: {allowed})")]
    MissingExtension { filename: String, allowed: String },

    #[error("{filename}: file is {size_bytes} bytes, maximum is {max_bytes} bytes")]
    TooLarge {
        filename: String,
        size_bytes: u64,
        max_bytes: u64,
    },

    #[error("{0}: file is empty")]
    Empty(String),
}

/// An uploaded source program held for the current session
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub filename: String,
    pub cached_path: PathBuf,
    pub content: String,
    pub info: ProgramInfo,
}

impl SourceFile {
    /// Program name from PROGRAM-ID, falling back to the file stem
    pub fn program_name(&self) -> String {
        self.info.program_id.clone().unwrap_or_else(|| {
            Path::new(&self.filename)
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_else(|| self.filename.clone())
        })
    }
}

/// Check extension allow-list, emptiness and size limit
pub fn validate_upload(
    filename: &str,
    bytes: &[u8],
    config: &IntakeConfig,
) -> Result<(), InputValidationError> {
    let allowed = config
        .allowed_extensions
        .iter()
        .map(|e| format!(".{}", e.trim_start_matches('.')))
        .collect::<Vec<_>>()
        .join(", ");

    let extension = Path::new(filename)
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .ok_or_else(|| InputValidationError::MissingExtension {
            filename: filename.to_string(),
            allowed: allowed.clone(),
        })?;

    let is_allowed = config
        .allowed_extensions
        .iter()
        .any(|e| e.trim_start_matches('.').eq_ignore_ascii_case(&extension));
    if !is_allowed {
        return Err(InputValidationError::UnsupportedExtension {
            filename: filename.to_string(),
            extension,
            allowed,
        });
    }

    if bytes.is_empty() {
        return Err(InputValidationError::Empty(filename.to_string()));
    }

    let size_bytes = bytes.len() as u64;
    let max_bytes = config.max_file_size_bytes();
    if size_bytes > max_bytes {
        return Err(InputValidationError::TooLarge {
            filename: filename.to_string(),
            size_bytes,
            max_bytes,
        });
    }

    Ok(())
}

/// Validate uploaded bytes, store them in the transient cache and decode them
pub fn accept_upload(
    filename: &str,
    bytes: &[u8],
    config: &IntakeConfig,
) -> Result<SourceFile, ScribeError> {
    if let Err(err) = validate_upload(filename, bytes, config) {
        tracing::warn!(filename, error = %err, "Rejected upload");
        return Err(err.into());
    }

    let cache = SourceCache::new(&config.cache_dir)?;
    let cached_path = cache.store(filename, bytes)?;
    let content = String::from_utf8_lossy(bytes).to_string();
    let info = extract_program_info(&content);

    tracing::info!(
        filename,
        size_bytes = bytes.len(),
        program_id = info.program_id.as_deref().unwrap_or("-"),
        program_type = %info.program_type,
        "Accepted upload"
    );

    Ok(SourceFile {
        filename: filename.to_string(),
        cached_path,
        content,
        info,
    })
}

/// Read a file from disk (expanding `~`) and accept it as an upload
pub fn upload_from_path(path: &str, config: &IntakeConfig) -> Result<SourceFile, ScribeError> {
    let expanded = shellexpand::tilde(path.trim()).to_string();
    let path = PathBuf::from(expanded);
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());

    // Check the size before reading the whole file into memory
    let metadata = std::fs::metadata(&path)?;
    if metadata.len() > config.max_file_size_bytes() {
        return Err(InputValidationError::TooLarge {
            filename,
            size_bytes: metadata.len(),
            max_bytes: config.max_file_size_bytes(),
        }
        .into());
    }

    let bytes = std::fs::read(&path)?;
    accept_upload(&filename, &bytes, config)
}
