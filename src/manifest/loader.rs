use crate::manifest::schema::{PackageManifest, ValidationError};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub enum ManifestError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Json {
        path: Option<PathBuf>,
        source: serde_json::Error,
    },
    Validation {
        path: Option<PathBuf>,
        source: ValidationError,
    },
}

impl ManifestError {
    /// Attach the file (or archive) the manifest came from.
    pub fn with_path(self, path: &Path) -> Self {
        let path = path.to_path_buf();
        match self {
            ManifestError::Io { .. } => self,
            ManifestError::Json { path: None, source } => ManifestError::Json {
                path: Some(path),
                source,
            },
            ManifestError::Validation { path: None, source } => ManifestError::Validation {
                path: Some(path),
                source,
            },
            other => other,
        }
    }
}

impl fmt::Display for ManifestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ManifestError::Io { path, source } => {
                write!(f, "failed to read manifest from {}: {}", path.display(), source)
            }
            ManifestError::Json { path, source } => match path {
                Some(path) => write!(
                    f,
                    "failed to parse manifest JSON ({}): {}",
                    path.display(),
                    source
                ),
                None => write!(f, "failed to parse manifest JSON: {}", source),
            },
            ManifestError::Validation { path, source } => match path {
                Some(path) => write!(f, "invalid manifest ({}): {}", path.display(), source),
                None => write!(f, "invalid manifest: {}", source),
            },
        }
    }
}

impl std::error::Error for ManifestError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ManifestError::Io { source, .. } => Some(source),
            ManifestError::Json { source, .. } => Some(source),
            ManifestError::Validation { source, .. } => Some(source),
        }
    }
}

pub fn load_from_str(input: &str) -> Result<PackageManifest, ManifestError> {
    let manifest: PackageManifest = serde_json::from_str(input)
        .map_err(|source| ManifestError::Json { path: None, source })?;
    manifest
        .validate()
        .map_err(|source| ManifestError::Validation { path: None, source })?;
    Ok(manifest)
}

pub fn load_from_path(path: impl AsRef<Path>) -> Result<PackageManifest, ManifestError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| ManifestError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    load_from_str(&contents).map_err(|error| error.with_path(path))
}
