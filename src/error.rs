//! Error types for the semantic indexing pipeline.
//!
//! Structured error enums via thiserror. Policy is local recovery: a bad
//! file, capture, or call site never aborts the project; only startup
//! problems (malformed or missing query patterns) and cancellation are
//! project-fatal.

use crate::types::FilePath;
use thiserror::Error;

/// Project-level errors surfaced by the driver.
#[derive(Error, Debug)]
pub enum IndexError {
    #[error("Unsupported language '{language}'. Supported languages: javascript, typescript, python, rust")]
    UnsupportedLanguage { language: String },

    #[error("Failed to parse '{path}': {reason}")]
    ParseFailure { path: FilePath, reason: String },

    #[error("Invalid query pattern for {language}: {reason}")]
    InvalidQueryPattern { language: String, reason: String },

    #[error("Query pattern file not found for language '{language}'")]
    QueryFileNotFound { language: String },

    #[error("Import '{imported_name}' in '{path}' could not be resolved")]
    UnresolvedImport {
        path: FilePath,
        imported_name: String,
    },

    #[error("Internal inconsistency: {reason}")]
    Internal { reason: String },

    #[error("Indexing was cancelled")]
    Cancelled,

    #[error("Invalid configuration: {reason}")]
    ConfigError { reason: String },
}

impl IndexError {
    /// Whether this error aborts the whole project or only the file it
    /// occurred in.
    pub fn is_project_fatal(&self) -> bool {
        matches!(
            self,
            IndexError::InvalidQueryPattern { .. }
                | IndexError::QueryFileNotFound { .. }
                | IndexError::Cancelled
                | IndexError::ConfigError { .. }
        )
    }

    /// Static recovery guidance for the fatal kinds.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            Self::InvalidQueryPattern { .. } | Self::QueryFileNotFound { .. } => vec![
                "The bundled query patterns are validated at startup; a failure here means a corrupted install",
                "Reinstall the crate or restore the queries/ directory",
            ],
            Self::UnsupportedLanguage { .. } => vec![
                "Only javascript, typescript, python, and rust sources can be indexed",
                "Remove the file from the input set or map its extension to a supported language",
            ],
            Self::ParseFailure { .. } => vec![
                "The file was skipped; check that it is valid source and not a binary or template",
            ],
            Self::ConfigError { .. } => vec![
                "Check semgraph.toml and SEMGRAPH_-prefixed environment variables for typos",
            ],
            _ => vec![],
        }
    }
}

/// Errors from the parsing layer (tree-sitter and query handling).
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Failed to initialize {language} grammar: {reason}")]
    GrammarInit { language: String, reason: String },

    #[error("Parser produced no tree for '{path}'")]
    NoTree { path: FilePath },

    #[error("Malformed capture '{capture_name}': {reason}")]
    MalformedCapture {
        capture_name: String,
        reason: String,
    },

    #[error("Invalid UTF-8 in source text")]
    InvalidUtf8,
}

pub type IndexResult<T> = Result<T, IndexError>;
pub type ParseResult<T> = Result<T, ParseError>;
