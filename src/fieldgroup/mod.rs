//! Field-group document editing.
//!
//! Writes go through the line-based [`StructuralLocator`] so the document's
//! formatting survives untouched outside the inserted block. Reads that only
//! need to look (duplicate detection) use a regular JSON parse.

pub mod errors;
pub mod locator;

pub use errors::{FieldGroupError, LocatorError};
pub use locator::{Placement, StructuralLocator};

use crate::layout::LayoutBlock;
use crate::lines::{LineStore, LineStoreError};
use serde_json::Value;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Insert `block` into the document at `path`, refresh its `modified`
/// timestamp, and write it back.
pub fn insert_layout(
    path: &Path,
    block: &LayoutBlock,
    terminal_label: &str,
    timestamp: i64,
) -> Result<Placement, FieldGroupError> {
    let mut document = LineStore::load(path).map_err(|e| match e {
        LineStoreError::Read { path, source } | LineStoreError::Write { path, source } => {
            FieldGroupError::Read { path, source }
        }
    })?;

    let locator = StructuralLocator::new(path);
    let placement =
        locator.locate_and_insert(&mut document, &block.lines(), block.label(), terminal_label)?;
    let touched = locator.touch_modified(&mut document, timestamp);
    verify_inserted(path, &document, block.key())?;
    debug!(path = %path.display(), line = placement.line(), touched, "Layout inserted");

    document.write(path).map_err(|e| match e {
        LineStoreError::Read { path, source } | LineStoreError::Write { path, source } => {
            FieldGroupError::Write { path, source }
        }
    })?;

    Ok(placement)
}

/// Refuse to write unless the edited document still parses and carries the
/// new entry directly under `fields[0].layouts`.
fn verify_inserted(path: &Path, document: &LineStore, key: &str) -> Result<(), LocatorError> {
    let misplaced = || LocatorError::Misplaced {
        file: path.to_path_buf(),
        key: key.to_string(),
    };
    let parsed: Value = serde_json::from_str(&document.to_string()).map_err(|_| misplaced())?;
    match parsed.pointer("/fields/0/layouts").and_then(|layouts| layouts.get(key)) {
        Some(Value::Object(_)) => Ok(()),
        _ => Err(misplaced()),
    }
}

/// `name` of every entry under `fields[0].layouts`, in document order.
pub fn installed_layout_names(path: &Path) -> Result<Vec<String>, FieldGroupError> {
    let content = fs::read_to_string(path).map_err(|source| FieldGroupError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let document: Value = serde_json::from_str(&content).map_err(|source| FieldGroupError::Json {
        path: path.to_path_buf(),
        source,
    })?;

    let layouts = document
        .get("fields")
        .and_then(|fields| fields.get(0))
        .and_then(|field| field.get("layouts"))
        .ok_or_else(|| FieldGroupError::MissingLayouts {
            path: path.to_path_buf(),
        })?;

    match layouts {
        Value::Object(entries) => Ok(entries
            .values()
            .filter_map(|entry| entry.get("name").and_then(Value::as_str))
            .map(str::to_string)
            .collect()),
        // Empty layouts are serialized as an empty array
        Value::Array(entries) if entries.is_empty() => Ok(Vec::new()),
        _ => Err(FieldGroupError::MissingLayouts {
            path: path.to_path_buf(),
        }),
    }
}

/// Whether a layout named `key` already exists in the document at `path`.
pub fn is_installed(path: &Path, key: &str) -> Result<bool, FieldGroupError> {
    Ok(installed_layout_names(path)?.iter().any(|name| name == key))
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::lines::LineStore;

    /// A field-group document whose layouts carry `labels`, keyed
    /// `KEY0`, `KEY1`, ...
    pub fn document(labels: &[&str]) -> LineStore {
        let mut lines: Vec<String> = [
            "{",
            "    \"key\": \"group_572229fc5045c\",",
            "    \"title\": \"Page Content\",",
            "    \"fields\": [",
            "        {",
            "            \"key\": \"field_572229fc5045d\",",
            "            \"label\": \"Blocks\",",
            "            \"name\": \"blocks\",",
            "            \"type\": \"flexible_content\",",
            "            \"layouts\": {",
        ]
        .iter()
        .map(|line| line.to_string())
        .collect();

        for (index, label) in labels.iter().enumerate() {
            let key = format!("KEY{index}");
            let closing = if index + 1 == labels.len() { "}" } else { "}," };
            lines.extend([
                format!("                \"{key}\": {{"),
                format!("                    \"key\": \"{key}\","),
                format!("                    \"name\": \"{}\",", key.to_lowercase()),
                format!("                    \"label\": \"{label}\","),
                "                    \"display\": \"block\",".to_string(),
                "                    \"sub_fields\": [".to_string(),
                "                        {".to_string(),
                format!("                            \"key\": \"field_sub{index}\","),
                "                            \"label\": \"Content\",".to_string(),
                "                            \"type\": \"clone\",".to_string(),
                "                            \"wrapper\": {".to_string(),
                "                                \"width\": \"\"".to_string(),
                "                            }".to_string(),
                "                        }".to_string(),
                "                    ],".to_string(),
                "                    \"min\": \"\",".to_string(),
                "                    \"max\": \"\"".to_string(),
                format!("                {closing}"),
            ]);
        }

        lines.extend(
            [
                "            },",
                "            \"button_label\": \"Add Block\"",
                "        }",
                "    ],",
                "    \"active\": true,",
                "    \"modified\": 1690000000",
                "}",
            ]
            .iter()
            .map(|line| line.to_string()),
        );

        LineStore::from_lines(lines)
    }

    /// Unindented block lines in the synthesizer's shape.
    pub fn block(key: &str, label: &str) -> Vec<String> {
        vec![
            format!("\"{key}\": {{"),
            format!("    \"key\": \"{key}\","),
            format!("    \"name\": \"{}\",", key.to_lowercase()),
            format!("    \"label\": \"{label}\","),
            "    \"display\": \"block\",".to_string(),
            "    \"sub_fields\": [".to_string(),
            "        {".to_string(),
            "            \"key\": \"field_newsub\",".to_string(),
            "            \"label\": \"Content\",".to_string(),
            "            \"type\": \"clone\",".to_string(),
            "            \"wrapper\": {".to_string(),
            "                \"width\": \"\"".to_string(),
            "            },".to_string(),
            "            \"clone\": [".to_string(),
            "                \"group_clone\"".to_string(),
            "            ],".to_string(),
            "            \"prefix_label\": 0,".to_string(),
            "            \"prefix_name\": 0".to_string(),
            "        }".to_string(),
            "    ],".to_string(),
            "    \"min\": \"\",".to_string(),
            "    \"max\": \"\"".to_string(),
            "},".to_string(),
        ]
    }

    /// Labels of the layouts mapping in document order.
    pub fn entry_labels(document: &LineStore) -> Vec<String> {
        let parsed: serde_json::Value = serde_json::from_str(&document.to_string()).unwrap();
        parsed["fields"][0]["layouts"]
            .as_object()
            .unwrap()
            .values()
            .map(|entry| entry["label"].as_str().unwrap().to_string())
            .collect()
    }
}
