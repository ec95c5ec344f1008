use crate::lines::LineStoreError;
use crate::safety::SafetyError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PatchError {
    #[error("File not available for modification: {file}")]
    Unavailable { file: PathBuf },

    #[error("Refusing to modify {file}: {source}")]
    Unsafe { file: PathBuf, source: SafetyError },

    #[error("There was an issue reading a file: {0}")]
    Read(LineStoreError),

    #[error("There was an issue updating a file: {0}")]
    Write(LineStoreError),
}
