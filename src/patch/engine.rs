//! Line-level directive application.
//!
//! Every directive is evaluated against the current state of the
//! [`LineStore`], so later directives see the effects of earlier ones.
//! Matching is plain substring search; the engine knows nothing about the
//! syntax of the file it edits.

use crate::lines::LineStore;
use crate::patch::directive::{Directive, Mode, StructuredDirective};
use std::fmt;

/// Minimum similarity for a line to be offered as a "closest match" hint.
const HINT_THRESHOLD: f64 = 0.6;

/// How loudly an outcome should be reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Quiet,
    Info,
    Warning,
}

/// What happened to a single directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectiveOutcome {
    /// Code was added as the last line of the file
    Appended,
    /// Code was inserted as a new line at `line`
    Inserted { line: usize },
    /// Target was swapped for the code on `line`
    Replaced { line: usize },
    /// Target was deleted from `line`
    Removed { line: usize },
    /// Replacement code was already present on `line`
    AlreadyApplied { line: usize },
    /// No line contained the target, so the code could not be placed
    Unplaced {
        target: String,
        closest: Option<String>,
    },
    /// No line contained the target of a replacement
    NotReplaced { target: String },
    /// Target of a removal is already gone
    AlreadyAbsent { target: String },
}

impl DirectiveOutcome {
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            DirectiveOutcome::Appended
                | DirectiveOutcome::Inserted { .. }
                | DirectiveOutcome::Replaced { .. }
                | DirectiveOutcome::Removed { .. }
        )
    }

    pub fn severity(&self) -> Severity {
        match self {
            DirectiveOutcome::Unplaced { .. } => Severity::Warning,
            DirectiveOutcome::NotReplaced { .. } => Severity::Info,
            _ => Severity::Quiet,
        }
    }
}

impl fmt::Display for DirectiveOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DirectiveOutcome::Appended => write!(f, "appended to end of file"),
            DirectiveOutcome::Inserted { line } => write!(f, "inserted at line {}", line + 1),
            DirectiveOutcome::Replaced { line } => write!(f, "replaced on line {}", line + 1),
            DirectiveOutcome::Removed { line } => write!(f, "removed from line {}", line + 1),
            DirectiveOutcome::AlreadyApplied { line } => {
                write!(f, "already applied on line {}", line + 1)
            }
            DirectiveOutcome::Unplaced { target, closest } => {
                write!(f, "code could not be added, target '{target}' not found")?;
                if let Some(closest) = closest {
                    write!(f, " (closest line: '{closest}')")?;
                }
                Ok(())
            }
            DirectiveOutcome::NotReplaced { target } => {
                write!(f, "a code replacement couldn't be made, '{target}' not found")
            }
            DirectiveOutcome::AlreadyAbsent { target } => {
                write!(f, "'{target}' already absent")
            }
        }
    }
}

/// Outcomes of applying a directive list to one line store.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[must_use = "PatchReport.modified decides whether the file needs writing"]
pub struct PatchReport {
    /// One entry per directive, in application order
    pub outcomes: Vec<DirectiveOutcome>,
    /// At least one directive changed the lines
    pub modified: bool,
}

/// Apply `directives` to `lines` in order.
pub fn apply(lines: &mut LineStore, directives: &[Directive]) -> PatchReport {
    let mut report = PatchReport::default();

    for directive in directives {
        let outcome = match directive {
            Directive::Literal(code) => {
                lines.push(code.clone());
                DirectiveOutcome::Appended
            }
            Directive::Structured(structured) => apply_structured(lines, structured),
        };

        report.modified |= outcome.is_mutation();
        report.outcomes.push(outcome);
    }

    report
}

fn apply_structured(lines: &mut LineStore, directive: &StructuredDirective) -> DirectiveOutcome {
    let Some(target) = directive.target.as_deref() else {
        lines.push(directive.code.clone());
        return DirectiveOutcome::Appended;
    };
    let code = directive.code.as_str();

    // First line that either already carries the replacement or holds the
    // target wins.
    let hit = lines.lines().iter().enumerate().find_map(|(index, line)| {
        if directive.mode == Mode::Replace && !code.is_empty() && line.contains(code) {
            Some((index, true))
        } else if line.contains(target) {
            Some((index, false))
        } else {
            None
        }
    });

    match hit {
        Some((line, true)) => DirectiveOutcome::AlreadyApplied { line },
        Some((index, false)) => match directive.mode {
            Mode::Append => {
                lines.insert(index + 1, code);
                DirectiveOutcome::Inserted { line: index + 1 }
            }
            Mode::Prepend => {
                lines.insert(index, code);
                DirectiveOutcome::Inserted { line: index }
            }
            Mode::Replace => {
                let replaced = lines.lines()[index].replacen(target, code, 1);
                lines.set(index, replaced);
                DirectiveOutcome::Replaced { line: index }
            }
            Mode::Remove => {
                let removed = lines.lines()[index].replacen(target, "", 1);
                lines.set(index, removed);
                DirectiveOutcome::Removed { line: index }
            }
        },
        None => match directive.mode {
            Mode::Append | Mode::Prepend => DirectiveOutcome::Unplaced {
                target: target.to_string(),
                closest: closest_line(lines, target),
            },
            Mode::Replace => DirectiveOutcome::NotReplaced {
                target: target.to_string(),
            },
            Mode::Remove => DirectiveOutcome::AlreadyAbsent {
                target: target.to_string(),
            },
        },
    }
}

/// The trimmed line most similar to `target`, if any is close enough to be
/// a useful hint.
fn closest_line(lines: &LineStore, target: &str) -> Option<String> {
    let target = target.trim();
    lines
        .lines()
        .iter()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty())
        .map(|line| (strsim::normalized_levenshtein(target, line), line))
        .filter(|(score, _)| *score >= HINT_THRESHOLD)
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, line)| line.to_string())
}
