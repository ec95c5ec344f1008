use crate::manifest::ManifestError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("Block not found: {block}")]
    NotFound { block: String },

    #[error("failed to save archive {path}: {source}")]
    Save {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to open archive {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid archive {path}: {source}")]
    Zip {
        path: PathBuf,
        source: zip::result::ZipError,
    },

    #[error("archive {path} has no manifest.json")]
    MissingManifest { path: PathBuf },

    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error("archive {path} contains an entry outside the project: {name}")]
    UnsafeEntry { path: PathBuf, name: String },

    #[error("failed to extract {path}: {source}")]
    Extract {
        path: PathBuf,
        source: std::io::Error,
    },
}
