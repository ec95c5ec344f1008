//! Update check and in-place self-update.
//!
//! The update endpoint answers `?version=&os=&arch=` with either an empty
//! body (up to date) or the download URL of a newer build.

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Version of the running binary.
pub const CURRENT_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Error, Debug)]
pub enum UpdateError {
    #[error("could not locate the running executable: {0}")]
    Executable(std::io::Error),

    #[error("update download failed: {0}")]
    Download(#[from] reqwest::Error),

    #[error("update server returned HTTP {0}")]
    Status(reqwest::StatusCode),

    #[error("failed to install update at {path}: {source}")]
    Install {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Executable names involved in a swap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutablePaths {
    pub current: PathBuf,
    pub staged: PathBuf,
    pub previous: PathBuf,
}

impl ExecutablePaths {
    pub fn in_dir(dir: &Path) -> Self {
        let ext = std::env::consts::EXE_SUFFIX;
        Self {
            current: dir.join(format!("arc{ext}")),
            staged: dir.join(format!("arc-new{ext}")),
            previous: dir.join(format!("arc-old{ext}")),
        }
    }

    pub fn for_running_binary() -> Result<Self, UpdateError> {
        let exe = std::env::current_exe().map_err(UpdateError::Executable)?;
        let dir = exe.parent().unwrap_or_else(|| Path::new("."));
        Ok(Self::in_dir(dir))
    }
}

/// Ask the update endpoint whether a newer build exists.
///
/// Returns the download URL when one does. Every failure is treated as "no
/// update" so an offline machine can still install blocks.
pub fn check_for_update(update_url: &str, current_version: &str) -> Option<String> {
    let client = reqwest::blocking::Client::builder()
        .timeout(std::time::Duration::from_secs(5))
        .build()
        .ok()?;
    let response = client
        .get(update_url)
        .query(&[
            ("version", current_version),
            ("os", std::env::consts::OS),
            ("arch", std::env::consts::ARCH),
        ])
        .send()
        .map_err(|e| debug!(error = %e, "Update check failed"))
        .ok()?;

    if response.status() != reqwest::StatusCode::OK {
        return None;
    }

    let body = response.text().ok()?;
    parse_update_response(&body)
}

/// Interpret an update check body: blank means up to date.
pub fn parse_update_response(body: &str) -> Option<String> {
    let url = body.trim();
    if url.is_empty() {
        None
    } else {
        Some(url.to_string())
    }
}

/// Download `url` and swap it in for the running executable.
///
/// The current binary is renamed to `arc-old` rather than deleted since it
/// may still be running; [`cleanup_previous`] removes it on the next start.
pub fn apply_update(url: &str, paths: &ExecutablePaths) -> Result<(), UpdateError> {
    let mut response = reqwest::blocking::get(url)?;
    if !response.status().is_success() {
        return Err(UpdateError::Status(response.status()));
    }

    let staged_err = |source| UpdateError::Install {
        path: paths.staged.clone(),
        source,
    };

    let mut staged = fs::File::create(&paths.staged).map_err(staged_err)?;
    response.copy_to(&mut staged)?;
    drop(staged);

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&paths.staged, fs::Permissions::from_mode(0o755))
            .map_err(staged_err)?;
    }

    swap_executables(paths)
}

/// Move `current` aside to `previous` and promote `staged` to `current`.
pub fn swap_executables(paths: &ExecutablePaths) -> Result<(), UpdateError> {
    fs::rename(&paths.current, &paths.previous).map_err(|source| UpdateError::Install {
        path: paths.current.clone(),
        source,
    })?;
    fs::rename(&paths.staged, &paths.current).map_err(|source| UpdateError::Install {
        path: paths.staged.clone(),
        source,
    })?;
    Ok(())
}

/// Remove the executable left behind by a previous update, if any.
pub fn cleanup_previous(paths: &ExecutablePaths) {
    if paths.previous.exists() {
        match fs::remove_file(&paths.previous) {
            Ok(()) => debug!(path = %paths.previous.display(), "Removed previous executable"),
            Err(e) => debug!(error = %e, "Could not remove previous executable"),
        }
    }
}
