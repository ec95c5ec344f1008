//! Install orchestration.
//!
//! One archive at a time: read manifest → duplicate check → extract →
//! splice layout → patch theme files → clean up. Archives are strictly
//! sequential because each install re-reads the field-group document the
//! previous one wrote.

use crate::archive::{self, ArchiveError};
use crate::fieldgroup::{self, FieldGroupError, Placement};
use crate::layout::LayoutBlock;
use crate::manifest::PackageManifest;
use crate::patch::{self, PatchError, PatchResult};
use crate::safety::{ProjectGuard, SafetyError};
use crate::settings::{Settings, SettingsError};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum InstallError {
    #[error("This directory doesn't contain an Arcadia theme: {0}")]
    NotAThemeProject(PathBuf),

    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error(transparent)]
    Safety(#[from] SafetyError),

    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error(transparent)]
    FieldGroup(#[from] FieldGroupError),
}

/// Terminal state of one archive.
#[derive(Debug)]
#[must_use = "InstallOutcome should be reported"]
pub enum InstallOutcome {
    Installed(InstallReport),
    /// A layout with the manifest's key is already present
    AlreadyInstalled { name: String },
}

/// What a successful install changed.
#[derive(Debug)]
pub struct InstallReport {
    /// Display name of the installed block
    pub name: String,
    pub field_group: PathBuf,
    /// A failed write of the field group is kept here so the theme files
    /// are still patched
    pub placement: Result<Placement, FieldGroupError>,
    pub extracted: Vec<PathBuf>,
    /// Per destination file, in manifest order
    pub modifications: Vec<(String, Result<PatchResult, PatchError>)>,
}

/// Installs block archives into one theme project.
#[derive(Debug, Clone)]
pub struct Installer {
    guard: ProjectGuard,
    settings: Settings,
}

impl Installer {
    /// Open the project at `project_root`, loading its settings.
    pub fn open(project_root: impl AsRef<Path>) -> Result<Self, InstallError> {
        let guard = ProjectGuard::new(project_root)?;
        let settings = Settings::load(guard.project_root())?;
        Self::with_settings(guard, settings)
    }

    pub fn with_settings(guard: ProjectGuard, settings: Settings) -> Result<Self, InstallError> {
        if !settings.is_theme_project(guard.project_root()) {
            return Err(InstallError::NotAThemeProject(
                guard.project_root().to_path_buf(),
            ));
        }
        Ok(Self { guard, settings })
    }

    pub fn project_root(&self) -> &Path {
        self.guard.project_root()
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Download `block` into the project root and install it.
    pub fn install_block(&self, block: &str) -> Result<InstallOutcome, InstallError> {
        let archive =
            archive::download(&self.settings.download_url, block, self.project_root())?;
        self.install_archive(&archive)
    }

    /// Archives already present in the project root.
    pub fn pending_archives(&self) -> Result<Vec<PathBuf>, InstallError> {
        Ok(archive::catalog(self.project_root())?)
    }

    /// Install a downloaded archive. The archive is removed afterwards unless
    /// a fatal error stops the install first.
    pub fn install_archive(&self, archive_path: &Path) -> Result<InstallOutcome, InstallError> {
        let manifest = archive::read_manifest(archive_path)?;
        let target = self.settings.target(manifest.contents);
        let field_group = self
            .settings
            .field_group_path(self.project_root(), manifest.contents);

        if fieldgroup::is_installed(&field_group, &manifest.key)? {
            warn!(name = %manifest.name, "Block has already been installed");
            cleanup(archive_path);
            return Ok(InstallOutcome::AlreadyInstalled {
                name: manifest.name,
            });
        }

        let extracted = archive::extract(archive_path, self.project_root())?;

        let block = LayoutBlock::generate(&manifest);
        let timestamp = chrono::Utc::now().timestamp();
        let placement = recoverable(fieldgroup::insert_layout(
            &field_group,
            &block,
            &target.terminal_label,
            timestamp,
        ))?;
        match &placement {
            Ok(_) => info!(name = %manifest.name, key = block.key(), "Layout added to field group"),
            Err(e) => warn!(name = %manifest.name, error = %e, "Layout not written"),
        }

        let modifications = patch::apply_modifications(&self.guard, &manifest.modifications);

        cleanup(archive_path);

        let PackageManifest { name, .. } = manifest;
        Ok(InstallOutcome::Installed(InstallReport {
            name,
            field_group,
            placement,
            extracted,
            modifications,
        }))
    }
}

/// Keep a failed field-group write for the report; every other field-group
/// error aborts the archive.
fn recoverable(
    result: Result<Placement, FieldGroupError>,
) -> Result<Result<Placement, FieldGroupError>, FieldGroupError> {
    match result {
        Ok(placement) => Ok(Ok(placement)),
        Err(e @ FieldGroupError::Write { .. }) => Ok(Err(e)),
        Err(e) => Err(e),
    }
}

fn cleanup(archive_path: &Path) {
    match fs::remove_file(archive_path) {
        Ok(()) => debug!(path = %archive_path.display(), "Archive removed"),
        Err(e) => warn!(path = %archive_path.display(), error = %e, "Could not remove archive"),
    }
}
