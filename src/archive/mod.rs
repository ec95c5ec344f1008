//! Block archive retrieval and unpacking.
//!
//! A block archive is a ZIP with a `manifest.json` at its root; every other
//! entry is theme content laid out relative to the project root.

pub mod errors;

pub use errors::ArchiveError;

use crate::manifest::{self, PackageManifest, MANIFEST_FILE};
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;
use zip::ZipArchive;

/// Local file name for a downloaded block.
pub fn archive_file_name(block: &str) -> String {
    format!("{block}.zip")
}

/// Download `block` from `base_url` into `dest_dir`.
///
/// The body is staged in a tempfile and only renamed into place once the
/// whole archive has been received. Any transport failure or non-200 status
/// is reported as [`ArchiveError::NotFound`].
pub fn download(base_url: &str, block: &str, dest_dir: &Path) -> Result<PathBuf, ArchiveError> {
    let not_found = || ArchiveError::NotFound {
        block: block.to_string(),
    };

    let client = reqwest::blocking::Client::builder()
        .user_agent(concat!("arc/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| {
            debug!(error = %e, "Failed to build HTTP client");
            not_found()
        })?;

    let mut response = client
        .get(base_url)
        .query(&[("target", block)])
        .send()
        .map_err(|e| {
            debug!(block, error = %e, "Download request failed");
            not_found()
        })?;

    if response.status() != reqwest::StatusCode::OK {
        debug!(block, status = %response.status(), "Download rejected");
        return Err(not_found());
    }

    let path = dest_dir.join(archive_file_name(block));
    let save_err = |source| ArchiveError::Save {
        path: path.clone(),
        source,
    };

    let mut staged = tempfile::NamedTempFile::new_in(dest_dir).map_err(save_err)?;
    response.copy_to(staged.as_file_mut()).map_err(|e| {
        debug!(block, error = %e, "Download interrupted");
        not_found()
    })?;
    staged.as_file_mut().flush().map_err(save_err)?;
    staged.persist(&path).map_err(|e| save_err(e.error))?;

    debug!(block, path = %path.display(), "Archive downloaded");
    Ok(path)
}

fn open(path: &Path) -> Result<ZipArchive<File>, ArchiveError> {
    let file = File::open(path).map_err(|source| ArchiveError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    ZipArchive::new(file).map_err(|source| ArchiveError::Zip {
        path: path.to_path_buf(),
        source,
    })
}

/// Read and validate the manifest without unpacking anything to disk.
pub fn read_manifest(path: &Path) -> Result<PackageManifest, ArchiveError> {
    let mut archive = open(path)?;
    let mut entry = archive.by_name(MANIFEST_FILE).map_err(|source| match source {
        zip::result::ZipError::FileNotFound => ArchiveError::MissingManifest {
            path: path.to_path_buf(),
        },
        source => ArchiveError::Zip {
            path: path.to_path_buf(),
            source,
        },
    })?;

    let mut contents = String::new();
    entry
        .read_to_string(&mut contents)
        .map_err(|source| ArchiveError::Open {
            path: path.to_path_buf(),
            source,
        })?;

    manifest::load_from_str(&contents)
        .map_err(|e| ArchiveError::Manifest(e.with_path(path)))
}

/// Unpack every entry except the manifest under `dest_root`.
///
/// Entries whose names would land outside `dest_root` abort the extraction.
/// Returns the written files in archive order.
pub fn extract(path: &Path, dest_root: &Path) -> Result<Vec<PathBuf>, ArchiveError> {
    let mut archive = open(path)?;
    let mut written = Vec::new();

    for index in 0..archive.len() {
        let mut entry = archive.by_index(index).map_err(|source| ArchiveError::Zip {
            path: path.to_path_buf(),
            source,
        })?;

        if entry.name() == MANIFEST_FILE {
            continue;
        }

        let relative = entry
            .enclosed_name()
            .ok_or_else(|| ArchiveError::UnsafeEntry {
                path: path.to_path_buf(),
                name: entry.name().to_string(),
            })?;
        let target = dest_root.join(relative);
        let extract_err = |source| ArchiveError::Extract {
            path: target.clone(),
            source,
        };

        if entry.is_dir() {
            fs::create_dir_all(&target).map_err(extract_err)?;
            continue;
        }

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(extract_err)?;
        }
        let mut out = File::create(&target).map_err(extract_err)?;
        io::copy(&mut entry, &mut out).map_err(extract_err)?;

        #[cfg(unix)]
        if let Some(mode) = entry.unix_mode() {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&target, fs::Permissions::from_mode(mode & 0o777))
                .map_err(extract_err)?;
        }

        written.push(target);
    }

    debug!(archive = %path.display(), files = written.len(), "Archive extracted");
    Ok(written)
}

/// Whether the file at `path` is a ZIP carrying a manifest.
pub fn contains_manifest(path: &Path) -> bool {
    match open(path) {
        Ok(archive) => archive.file_names().any(|name| name == MANIFEST_FILE),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Skipping unreadable archive");
            false
        }
    }
}

/// Block archives sitting directly in `dir`, sorted by path.
pub fn catalog(dir: &Path) -> Result<Vec<PathBuf>, ArchiveError> {
    let mut archives = Vec::new();

    for entry in WalkDir::new(dir).max_depth(1) {
        let entry = entry.map_err(|e| ArchiveError::Open {
            path: dir.to_path_buf(),
            source: e.into(),
        })?;
        if entry.file_type().is_file()
            && entry.path().extension().and_then(|s| s.to_str()) == Some("zip")
            && contains_manifest(entry.path())
        {
            archives.push(entry.path().to_path_buf());
        }
    }

    archives.sort();
    Ok(archives)
}
