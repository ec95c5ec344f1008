//! Project settings.
//!
//! Every value has a default matching a stock Arcadia theme. A project can
//! override them in an `arc.toml` at its root. Both endpoints can also be
//! set through the environment (`ARC_DOWNLOAD_URL`, `ARC_UPDATE_URL`).

use crate::manifest::ContentKind;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the optional settings file in the project root.
pub const SETTINGS_FILE: &str = "arc.toml";

/// Environment variable overriding [`Settings::download_url`].
pub const DOWNLOAD_URL_ENV: &str = "ARC_DOWNLOAD_URL";

/// Environment variable overriding [`Settings::update_url`].
pub const UPDATE_URL_ENV: &str = "ARC_UPDATE_URL";

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("failed to read settings from {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse settings TOML ({path}): {source}")]
    Toml {
        path: PathBuf,
        source: toml_edit::de::Error,
    },
}

/// Field-group document and terminal label used for one kind of content.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct GroupTarget {
    /// File name inside [`Settings::field_group_dir`]
    pub group_file: String,
    /// Label that always sorts last in the layouts mapping
    pub terminal_label: String,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Endpoint serving block archives (`?target=<block>`)
    pub download_url: String,
    /// Endpoint answering update checks
    pub update_url: String,
    /// File whose presence marks the directory as a theme project
    pub theme_marker: String,
    /// Directory holding the field-group JSON documents
    pub field_group_dir: String,
    pub component: GroupTarget,
    pub layout: GroupTarget,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            download_url: "https://arcadiadocs.com/download.php".to_string(),
            update_url: "https://arcadiadocs.com/check.php".to_string(),
            theme_marker: "src/scss/style.scss".to_string(),
            field_group_dir: "acf-json".to_string(),
            component: GroupTarget {
                group_file: "group_5c903f684a8ae.json".to_string(),
                terminal_label: "Widget".to_string(),
            },
            layout: GroupTarget {
                group_file: "group_572229fc5045c.json".to_string(),
                terminal_label: "Page Content (Layouts Only)".to_string(),
            },
        }
    }
}

impl Settings {
    pub fn from_toml(input: &str, path: &Path) -> Result<Self, SettingsError> {
        toml_edit::de::from_str(input).map_err(|source| SettingsError::Toml {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load `arc.toml` from `project_root` if present, then apply
    /// environment overrides.
    pub fn load(project_root: &Path) -> Result<Self, SettingsError> {
        let path = project_root.join(SETTINGS_FILE);
        let settings = if path.exists() {
            let contents = fs::read_to_string(&path).map_err(|source| SettingsError::Io {
                path: path.clone(),
                source,
            })?;
            Self::from_toml(&contents, &path)?
        } else {
            Self::default()
        };

        Ok(settings.with_env_overrides())
    }

    /// Apply `ARC_DOWNLOAD_URL` and `ARC_UPDATE_URL`; blank values are ignored.
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(url) = env_url(DOWNLOAD_URL_ENV) {
            self.download_url = url;
        }
        if let Some(url) = env_url(UPDATE_URL_ENV) {
            self.update_url = url;
        }
        self
    }

    pub fn target(&self, kind: ContentKind) -> &GroupTarget {
        match kind {
            ContentKind::Component => &self.component,
            ContentKind::Layout => &self.layout,
        }
    }

    /// Path of the field-group document for `kind` under `project_root`.
    pub fn field_group_path(&self, project_root: &Path, kind: ContentKind) -> PathBuf {
        project_root
            .join(&self.field_group_dir)
            .join(&self.target(kind).group_file)
    }

    pub fn is_theme_project(&self, project_root: &Path) -> bool {
        project_root.join(&self.theme_marker).is_file()
    }
}

fn env_url(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|url| !url.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_select_group_by_kind() {
        let settings = Settings::default();
        let root = Path::new("/theme");

        assert_eq!(
            settings.field_group_path(root, ContentKind::Component),
            PathBuf::from("/theme/acf-json/group_5c903f684a8ae.json")
        );
        assert_eq!(settings.target(ContentKind::Component).terminal_label, "Widget");
        assert_eq!(
            settings.target(ContentKind::Layout).terminal_label,
            "Page Content (Layouts Only)"
        );
    }

    #[test]
    fn test_partial_override() {
        let settings = Settings::from_toml(
            r#"
field_group_dir = "fields"

[layout]
group_file = "group_custom.json"
terminal_label = "Other"
"#,
            Path::new("arc.toml"),
        )
        .unwrap();

        assert_eq!(settings.field_group_dir, "fields");
        assert_eq!(settings.layout.group_file, "group_custom.json");
        assert_eq!(settings.component, Settings::default().component);
        assert_eq!(settings.download_url, Settings::default().download_url);
    }

    #[test]
    fn test_invalid_toml_names_file() {
        let err = Settings::from_toml("field_group_dir = [", Path::new("arc.toml")).unwrap_err();
        assert!(err.to_string().contains("arc.toml"));
    }

    #[test]
    fn test_load_without_file_uses_defaults() {
        let temp_dir = tempfile::tempdir().unwrap();
        let settings = Settings::load(temp_dir.path()).unwrap();
        assert_eq!(settings.theme_marker, "src/scss/style.scss");
        assert!(!settings.is_theme_project(temp_dir.path()));
    }
}
