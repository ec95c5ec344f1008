//! Declarative theme file modifications.
//!
//! A manifest maps destination paths to directives. All directives for one
//! path are applied to a single in-memory [`LineStore`] and the file is
//! written back at most once, and only when something changed.

pub mod directive;
pub mod engine;
pub mod errors;

pub use directive::{Directive, FileModification, Mode, Modification, StructuredDirective};
pub use engine::{apply, DirectiveOutcome, PatchReport, Severity};
pub use errors::PatchError;

use crate::lines::{LineStore, LineStoreError};
use crate::safety::ProjectGuard;
use std::fmt;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Result of patching one destination file.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "PatchResult should be checked for success/failure"]
pub enum PatchResult {
    /// At least one directive changed the file and it was written back
    Applied {
        file: PathBuf,
        outcomes: Vec<DirectiveOutcome>,
        before: String,
        after: String,
    },
    /// No directive changed the file; nothing was written
    Unchanged {
        file: PathBuf,
        outcomes: Vec<DirectiveOutcome>,
    },
}

impl PatchResult {
    pub fn file(&self) -> &PathBuf {
        match self {
            PatchResult::Applied { file, .. } | PatchResult::Unchanged { file, .. } => file,
        }
    }

    pub fn outcomes(&self) -> &[DirectiveOutcome] {
        match self {
            PatchResult::Applied { outcomes, .. } | PatchResult::Unchanged { outcomes, .. } => {
                outcomes
            }
        }
    }
}

impl fmt::Display for PatchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatchResult::Applied { file, .. } => write!(f, "Modified {}", file.display()),
            PatchResult::Unchanged { file, .. } => write!(f, "No changes to {}", file.display()),
        }
    }
}

/// Apply every file modification in manifest order.
///
/// Failures are per file: an unavailable, unsafe, or unwritable file is
/// reported and the remaining files are still processed.
pub fn apply_modifications(
    guard: &ProjectGuard,
    modifications: &[FileModification],
) -> Vec<(String, Result<PatchResult, PatchError>)> {
    modifications
        .iter()
        .map(|modification| {
            let result = patch_file(guard, modification);
            (modification.path.clone(), result)
        })
        .collect()
}

/// Apply one destination file's directives and write it back if changed.
pub fn patch_file(
    guard: &ProjectGuard,
    modification: &FileModification,
) -> Result<PatchResult, PatchError> {
    let file = match guard.resolve_destination(&modification.path) {
        Ok(file) => file,
        Err(e) if e.is_missing() => {
            warn!(path = %modification.path, "File not available for modification");
            return Err(PatchError::Unavailable {
                file: guard.project_root().join(&modification.path),
            });
        }
        Err(source) => {
            warn!(path = %modification.path, error = %source, "Rejected modification path");
            return Err(PatchError::Unsafe {
                file: PathBuf::from(&modification.path),
                source,
            });
        }
    };

    let mut lines = LineStore::load(&file).map_err(|e| match e {
        LineStoreError::Read { ref source, .. }
            if source.kind() == std::io::ErrorKind::NotFound =>
        {
            PatchError::Unavailable { file: file.clone() }
        }
        other => PatchError::Read(other),
    })?;
    let before = lines.to_string();

    let report = apply(&mut lines, &modification.directives);
    log_outcomes(&modification.path, &report.outcomes);

    if !report.modified {
        debug!(path = %modification.path, "No modification made");
        return Ok(PatchResult::Unchanged {
            file,
            outcomes: report.outcomes,
        });
    }

    if let Err(e) = lines.write(&file) {
        warn!(path = %modification.path, error = %e, "There was an issue updating file");
        return Err(PatchError::Write(e));
    }

    Ok(PatchResult::Applied {
        file,
        outcomes: report.outcomes,
        before,
        after: lines.to_string(),
    })
}

fn log_outcomes(path: &str, outcomes: &[DirectiveOutcome]) {
    for outcome in outcomes {
        match outcome.severity() {
            Severity::Warning => warn!(path, "{outcome}"),
            Severity::Info => info!(path, "{outcome}"),
            Severity::Quiet => debug!(path, "{outcome}"),
        }
    }
}
