//! Containment of manifest destinations.
//!
//! An archive manifest names the theme files it edits, and those names come
//! from the download server. Each one is resolved against the theme root
//! and accepted only if it is relative and its canonical form, with every
//! symlink followed, is inside the theme and outside `.git`. A link planted
//! in the theme therefore cannot redirect an edit elsewhere.

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct ProjectGuard {
    /// Canonical theme root
    root: PathBuf,
    git_dir: Option<PathBuf>,
}

#[derive(Error, Debug)]
pub enum SafetyError {
    #[error("{path} is absolute; destinations must be relative to the theme")]
    Absolute { path: PathBuf },

    #[error("{path} resolves outside the theme at {root}")]
    Escapes { path: PathBuf, root: PathBuf },

    #[error("{path} is inside version control metadata")]
    VersionControl { path: PathBuf },

    #[error("could not resolve {path}: {source}")]
    Resolve { path: PathBuf, source: io::Error },
}

impl SafetyError {
    /// The destination does not exist, as opposed to pointing somewhere it
    /// must not.
    pub fn is_missing(&self) -> bool {
        matches!(self, SafetyError::Resolve { source, .. } if source.kind() == io::ErrorKind::NotFound)
    }
}

impl ProjectGuard {
    pub fn new(root: impl AsRef<Path>) -> Result<Self, SafetyError> {
        let root = canonical(root.as_ref())?;
        let git_dir = root.join(".git").canonicalize().ok();
        Ok(Self { root, git_dir })
    }

    /// Canonical path of the manifest destination `destination`.
    pub fn resolve_destination(&self, destination: impl AsRef<Path>) -> Result<PathBuf, SafetyError> {
        let destination = destination.as_ref();
        if destination.is_absolute() || destination.has_root() {
            return Err(SafetyError::Absolute {
                path: destination.to_path_buf(),
            });
        }

        let resolved = canonical(&self.root.join(destination))?;

        if !resolved.starts_with(&self.root) {
            return Err(SafetyError::Escapes {
                path: resolved,
                root: self.root.clone(),
            });
        }
        if let Some(git_dir) = &self.git_dir {
            if resolved.starts_with(git_dir) {
                return Err(SafetyError::VersionControl { path: resolved });
            }
        }

        Ok(resolved)
    }

    pub fn project_root(&self) -> &Path {
        &self.root
    }
}

fn canonical(path: &Path) -> Result<PathBuf, SafetyError> {
    path.canonicalize().map_err(|source| SafetyError::Resolve {
        path: path.to_path_buf(),
        source,
    })
}
