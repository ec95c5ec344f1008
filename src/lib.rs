//! Arc: block installer for Arcadia themes
//!
//! Installs packaged content blocks into an Arcadia WordPress theme. Each
//! block arrives as a ZIP archive carrying a `manifest.json` and theme files.
//!
//! # Architecture
//!
//! Installing a block touches two kinds of text, both edited as lines:
//!
//! - The ACF field-group JSON, where a generated layout entry is spliced into
//!   the `"layouts"` mapping in label order ([`fieldgroup`]). The document is
//!   never re-serialized, so its formatting survives untouched.
//! - Arbitrary theme files named by the manifest, edited by substring-anchored
//!   directives ([`patch`]).
//!
//! Both sit on [`lines::LineStore`], which preserves line endings and writes
//! atomically.
//!
//! # Safety
//!
//! - Modification paths are confined to the project root ([`safety`])
//! - Archive entries escaping the project are rejected
//! - Atomic file writes (tempfile + fsync + rename)
//! - A file is written at most once per install, and only if it changed
//!
//! # Example
//!
//! ```no_run
//! use arc_installer::installer::{InstallOutcome, Installer};
//!
//! let installer = Installer::open("/path/to/theme")?;
//! for archive in installer.pending_archives()? {
//!     match installer.install_archive(&archive)? {
//!         InstallOutcome::Installed(report) => println!("{} has been installed", report.name),
//!         InstallOutcome::AlreadyInstalled { name } => println!("{name} has already been installed"),
//!     }
//! }
//! # Ok::<(), arc_installer::installer::InstallError>(())
//! ```

pub mod archive;
pub mod fieldgroup;
pub mod installer;
pub mod layout;
pub mod lines;
pub mod manifest;
pub mod patch;
pub mod safety;
pub mod settings;
pub mod update;

pub use installer::{InstallError, InstallOutcome, InstallReport, Installer};
pub use lines::LineStore;
pub use manifest::PackageManifest;
pub use patch::{Directive, FileModification, Mode, PatchError, PatchResult};
pub use safety::{ProjectGuard, SafetyError};
pub use settings::Settings;
