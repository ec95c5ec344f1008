use crate::patch::{FileModification, Modification};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use std::fmt;

/// Which field group a package installs into.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    /// Reusable widget-style component
    Component,
    /// Page layout block (anything that is not a component)
    #[default]
    #[serde(other)]
    Layout,
}

/// The `manifest.json` shipped at the root of a block archive.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct PackageManifest {
    /// Unique block key; stored as the layout's `name`
    #[serde(default)]
    pub key: String,
    /// Human-readable name; the layout's label and sort key
    #[serde(default)]
    pub name: String,
    /// Field group cloned into the layout
    #[serde(default, rename = "acfgroup")]
    pub clone_group: String,
    #[serde(default)]
    pub contents: ContentKind,
    /// Theme file edits, in manifest order
    #[serde(default, deserialize_with = "ordered_modifications")]
    pub modifications: Vec<FileModification>,
}

impl PackageManifest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Vec::new();

        if self.key.trim().is_empty() {
            issues.push(ValidationIssue::MissingField { field: "key" });
        }
        if self.name.trim().is_empty() {
            issues.push(ValidationIssue::MissingField { field: "name" });
        }
        if self.clone_group.trim().is_empty() {
            issues.push(ValidationIssue::MissingField { field: "acfgroup" });
        }

        for modification in &self.modifications {
            if modification.path.trim().is_empty() {
                issues.push(ValidationIssue::EmptyPath);
            }
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { issues })
        }
    }
}

/// Keep the destination paths in the order the manifest lists them.
fn ordered_modifications<'de, D>(deserializer: D) -> Result<Vec<FileModification>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(map) = Option::<serde_json::Map<String, serde_json::Value>>::deserialize(deserializer)?
    else {
        return Ok(Vec::new());
    };

    map.into_iter()
        .map(|(path, value)| {
            let modification: Modification = serde_json::from_value(value).map_err(|e| {
                D::Error::custom(format!("invalid modifications for '{path}': {e}"))
            })?;
            Ok(FileModification {
                path,
                directives: modification.into_directives(),
            })
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, issue) in self.issues.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    MissingField { field: &'static str },
    EmptyPath,
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::MissingField { field } => {
                write!(f, "manifest missing required field '{field}'")
            }
            ValidationIssue::EmptyPath => write!(f, "modification with an empty file path"),
        }
    }
}
