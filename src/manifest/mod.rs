pub mod loader;
pub mod schema;

pub use loader::{load_from_path, load_from_str, ManifestError};
pub use schema::{ContentKind, PackageManifest, ValidationError, ValidationIssue};

/// File name of the manifest inside a block archive.
pub const MANIFEST_FILE: &str = "manifest.json";
