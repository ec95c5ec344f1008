use serde::Deserialize;

/// How a targeted directive changes the line it matches.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Insert the code as a new line after the match
    #[default]
    Append,
    /// Insert the code as a new line before the match
    Prepend,
    /// Swap the first occurrence of the target for the code
    Replace,
    /// Delete the first occurrence of the target
    Remove,
}

/// A directive with an optional search target.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct StructuredDirective {
    #[serde(default)]
    pub target: Option<String>,
    pub code: String,
    #[serde(default)]
    pub mode: Mode,
}

/// One edit instruction for a theme source file.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum Directive {
    /// Appended verbatim to the end of the file
    Literal(String),
    Structured(StructuredDirective),
}

impl Directive {
    pub fn literal(code: impl Into<String>) -> Self {
        Directive::Literal(code.into())
    }

    pub fn targeted(target: impl Into<String>, code: impl Into<String>, mode: Mode) -> Self {
        Directive::Structured(StructuredDirective {
            target: Some(target.into()),
            code: code.into(),
            mode,
        })
    }
}

/// The value stored under one destination path in a manifest's
/// `modifications` map.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum Modification {
    Literal(String),
    Single(StructuredDirective),
    Sequence(Vec<Directive>),
}

impl Modification {
    pub fn into_directives(self) -> Vec<Directive> {
        match self {
            Modification::Literal(code) => vec![Directive::Literal(code)],
            Modification::Single(directive) => vec![Directive::Structured(directive)],
            Modification::Sequence(directives) => directives,
        }
    }
}

/// All directives for one destination file, in manifest order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileModification {
    /// Path relative to the project root
    pub path: String,
    pub directives: Vec<Directive>,
}
