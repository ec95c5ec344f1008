use crate::fieldgroup::errors::LocatorError;
use crate::lines::LineStore;
use std::path::PathBuf;
use tracing::{debug, warn};

/// Key of the mapping of layout entries. Only a line that starts with it
/// opens the mapping, so a `"name": "layouts"` value is not mistaken for it.
pub const LAYOUTS_MARKER: &str = "\"layouts\"";
/// Label attribute of a layout entry.
pub const LABEL_MARKER: &str = "\"label\"";
/// Top-level timestamp scalar.
pub const MODIFIED_MARKER: &str = "\"modified\"";
/// Indentation of a layout entry inside the layouts mapping.
pub const LAYOUT_INDENT: &str = "                ";

/// Where a new layout block ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placement {
    /// Spliced in front of the entry labelled `before`, starting at `line`
    Sorted { line: usize, before: String },
    /// No entry sorted after the block, so it was appended just before the
    /// line closing the mapping
    EndOfMapping { line: usize },
}

impl Placement {
    pub fn line(&self) -> usize {
        match self {
            Placement::Sorted { line, .. } | Placement::EndOfMapping { line } => *line,
        }
    }
}

/// Line-scanning editor for field-group documents.
///
/// The document is never parsed as JSON; entries are found by tracking brace
/// depth line by line after the `"layouts"` marker. Depth 0 is the inside
/// of the layouts mapping and depth 1 the inside of one entry. With string
/// contents masked out, a line opens a level when its last non-blank
/// character is `{` and closes one when it contains `}` anywhere. The
/// mapping only counts as closed on a line indented like the marker.
/// Everything outside the touched lines is preserved byte for byte.
#[derive(Debug, Clone)]
pub struct StructuralLocator {
    file: PathBuf,
}

impl StructuralLocator {
    /// `file` is only used to give errors context.
    pub fn new(file: impl Into<PathBuf>) -> Self {
        Self { file: file.into() }
    }

    /// Splice `block` into the layouts mapping, keeping entries sorted by
    /// label.
    ///
    /// The block goes in front of the first entry whose label sorts after
    /// `sort_label` (byte-wise) or equals `terminal_label`, so the terminal
    /// entry always stays last. If neither happens before the mapping
    /// closes, the block becomes the final entry. `block` must end with
    /// `},` as produced by [`crate::layout::LayoutBlock::lines`].
    pub fn locate_and_insert(
        &self,
        document: &mut LineStore,
        block: &[String],
        sort_label: &str,
        terminal_label: &str,
    ) -> Result<Placement, LocatorError> {
        let marker_line = document
            .lines()
            .iter()
            .position(|line| line.trim_start().starts_with(LAYOUTS_MARKER))
            .ok_or_else(|| LocatorError::MarkerNotFound {
                file: self.file.clone(),
                marker: LAYOUTS_MARKER,
            })?;

        let opening = &document.lines()[marker_line];
        if !opening.trim_end().ends_with('{') {
            return Err(LocatorError::NotAMapping {
                file: self.file.clone(),
                line: marker_line + 1,
                content: opening.clone(),
            });
        }

        match self.scan(document, marker_line, sort_label, terminal_label)? {
            Scan::Before { line, label } => {
                debug!(line, before = %label, "Inserting layout before existing entry");
                document.splice_at(line, indented(block));
                Ok(Placement::Sorted {
                    line,
                    before: label,
                })
            }
            Scan::Closed { line } => {
                warn!(
                    file = %self.file.display(),
                    label = sort_label,
                    "No entry sorts after the new layout, appending it to the end of the mapping"
                );
                self.append_to_mapping(document, marker_line, line, block);
                Ok(Placement::EndOfMapping { line })
            }
        }
    }

    /// Rewrite every line containing `"modified"` to hold `timestamp`,
    /// keeping its indentation and any trailing comma. Returns the number of
    /// lines rewritten.
    pub fn touch_modified(&self, document: &mut LineStore, timestamp: i64) -> usize {
        let targets: Vec<usize> = document
            .lines()
            .iter()
            .enumerate()
            .filter(|(_, line)| line.contains(MODIFIED_MARKER))
            .map(|(index, _)| index)
            .collect();

        for &index in &targets {
            let line = &document.lines()[index];
            let indent = indentation(line);
            let comma = if line.trim_end().ends_with(',') { "," } else { "" };
            let rewritten = format!("{indent}{MODIFIED_MARKER}: {timestamp}{comma}");
            document.set(index, rewritten);
        }

        if targets.is_empty() {
            warn!(file = %self.file.display(), "No modified timestamp found");
        }
        targets.len()
    }

    fn scan(
        &self,
        document: &LineStore,
        marker_line: usize,
        sort_label: &str,
        terminal_label: &str,
    ) -> Result<Scan, LocatorError> {
        let mut depth: i64 = 0;
        let mut entry_start = marker_line + 1;
        let mapping_indent = indentation(&document.lines()[marker_line]);

        for (index, line) in document.lines().iter().enumerate().skip(marker_line + 1) {
            let shape = without_strings(line);

            if shape.trim_end().ends_with('{') {
                depth += 1;
                if depth == 1 {
                    entry_start = index;
                }
            }

            if shape.contains('}') {
                depth -= 1;
            }

            if depth < 0 {
                // Only the line aligned with the marker closes the mapping
                if indentation(line) != mapping_indent {
                    return Err(LocatorError::Unbalanced {
                        file: self.file.clone(),
                        line: index + 1,
                        content: line.clone(),
                    });
                }
                return Ok(Scan::Closed { line: index });
            }

            if depth == 1 && line.contains(LABEL_MARKER) {
                let label = extract_label(line).ok_or_else(|| LocatorError::MalformedLabel {
                    file: self.file.clone(),
                    line: index + 1,
                    content: line.clone(),
                })?;

                if sort_label < label.as_str() || label == terminal_label {
                    return Ok(Scan::Before {
                        line: entry_start,
                        label,
                    });
                }
            }
        }

        Err(LocatorError::Unterminated {
            file: self.file.clone(),
            line: marker_line + 1,
        })
    }

    /// Insert `block` as the last entry, right before the mapping's closing
    /// line at `close_line`.
    fn append_to_mapping(
        &self,
        document: &mut LineStore,
        marker_line: usize,
        close_line: usize,
        block: &[String],
    ) {
        let mut lines = indented(block);
        if let Some(last) = lines.last_mut() {
            if last.ends_with(',') {
                last.pop();
            }
        }

        // The previous last entry now needs a separator.
        let previous = (marker_line + 1..close_line)
            .rev()
            .find(|&index| !document.lines()[index].trim().is_empty());
        if let Some(previous) = previous {
            let line = &document.lines()[previous];
            if !line.trim_end().ends_with(',') {
                let trimmed_len = line.trim_end().len();
                let separated = format!("{},{}", &line[..trimmed_len], &line[trimmed_len..]);
                document.set(previous, separated);
            }
        }

        document.splice_at(close_line, lines);
    }
}

enum Scan {
    Before { line: usize, label: String },
    Closed { line: usize },
}

/// The string value of a `"label": "..."` line.
fn extract_label(line: &str) -> Option<String> {
    let (_, value) = line.split_once(':')?;
    let value = value.trim();
    let value = value.strip_suffix(',').unwrap_or(value).trim_end();
    serde_json::from_str::<String>(value).ok()
}

/// `line` with the contents of every JSON string literal removed, so braces
/// inside labels and other values do not move the depth.
fn without_strings(line: &str) -> String {
    let mut shape = String::with_capacity(line.len());
    let mut in_string = false;
    let mut escaped = false;

    for c in line.chars() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
                shape.push(c);
            }
            continue;
        }
        if c == '"' {
            in_string = true;
        }
        shape.push(c);
    }
    shape
}

fn indentation(line: &str) -> &str {
    &line[..line.len() - line.trim_start().len()]
}

fn indented(block: &[String]) -> Vec<String> {
    block
        .iter()
        .map(|line| format!("{LAYOUT_INDENT}{line}"))
        .collect()
}
