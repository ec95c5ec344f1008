use std::path::PathBuf;
use thiserror::Error;

/// Structural problems found while scanning a field-group document.
///
/// Line numbers are 1-based.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LocatorError {
    #[error("marker {marker} not found in {file}")]
    MarkerNotFound { file: PathBuf, marker: &'static str },

    #[error("layouts in {file} at line {line} is not an open mapping: {content}")]
    NotAMapping {
        file: PathBuf,
        line: usize,
        content: String,
    },

    #[error("could not read layout label in {file} at line {line}: {content}")]
    MalformedLabel {
        file: PathBuf,
        line: usize,
        content: String,
    },

    #[error("layouts mapping opened at line {line} in {file} is never closed")]
    Unterminated { file: PathBuf, line: usize },

    #[error("unbalanced brace in {file} at line {line}: {content}")]
    Unbalanced {
        file: PathBuf,
        line: usize,
        content: String,
    },

    #[error("layout {key} would not land directly under layouts in {file}")]
    Misplaced { file: PathBuf, key: String },
}

#[derive(Error, Debug)]
pub enum FieldGroupError {
    #[error("failed to read field group {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write field group {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("field group {path} is not valid JSON: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("field group {path} has no fields[0].layouts mapping")]
    MissingLayouts { path: PathBuf },

    #[error("corrupt field group: {0}")]
    Corrupt(#[from] LocatorError),
}
