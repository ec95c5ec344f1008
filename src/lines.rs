use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// An in-memory, line-oriented view of one text file.
///
/// Lines are stored without terminators, each remembering the terminator it
/// was read with, so untouched lines serialize byte for byte even in files
/// mixing LF and CRLF. New lines take the file's dominant ending. The final
/// line is always terminated on output.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LineStore {
    lines: Vec<String>,
    endings: Vec<LineEnding>,
    dominant: LineEnding,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineEnding {
    #[default]
    Lf,
    CrLf,
}

impl LineEnding {
    pub fn as_str(self) -> &'static str {
        match self {
            LineEnding::Lf => "\n",
            LineEnding::CrLf => "\r\n",
        }
    }
}

#[derive(Error, Debug)]
pub enum LineStoreError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl LineStore {
    pub fn parse(content: &str) -> Self {
        let mut lines = Vec::new();
        let mut endings = Vec::new();
        let mut unterminated = false;

        for piece in content.split_inclusive('\n') {
            if let Some(line) = piece.strip_suffix("\r\n") {
                lines.push(line.to_string());
                endings.push(LineEnding::CrLf);
            } else if let Some(line) = piece.strip_suffix('\n') {
                lines.push(line.to_string());
                endings.push(LineEnding::Lf);
            } else {
                lines.push(piece.to_string());
                unterminated = true;
            }
        }

        let crlf = endings.iter().filter(|e| **e == LineEnding::CrLf).count();
        let dominant = if crlf * 2 > endings.len() {
            LineEnding::CrLf
        } else {
            LineEnding::Lf
        };
        if unterminated {
            endings.push(dominant);
        }

        Self {
            lines,
            endings,
            dominant,
        }
    }

    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let lines: Vec<String> = lines.into_iter().map(Into::into).collect();
        Self {
            endings: vec![LineEnding::Lf; lines.len()],
            lines,
            dominant: LineEnding::Lf,
        }
    }

    /// Read a file in full.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, LineStoreError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| LineStoreError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::parse(&content))
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.lines.get(index).map(String::as_str)
    }

    pub fn push(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
        self.endings.push(self.dominant);
    }

    /// Insert a line so that it ends up at `index`, shifting later lines down.
    ///
    /// # Panics
    ///
    /// Panics if `index > len`.
    pub fn insert(&mut self, index: usize, line: impl Into<String>) {
        self.lines.insert(index, line.into());
        self.endings.insert(index, self.dominant);
    }

    /// Insert a run of lines starting at `index`, preserving their order.
    pub fn splice_at<I, S>(&mut self, index: usize, lines: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let before = self.lines.len();
        self.lines
            .splice(index..index, lines.into_iter().map(Into::into));
        let added = self.lines.len() - before;
        self.endings
            .splice(index..index, std::iter::repeat(self.dominant).take(added));
    }

    /// Replace the text of one line, keeping its terminator.
    pub fn set(&mut self, index: usize, line: impl Into<String>) {
        self.lines[index] = line.into();
    }

    /// Index of the first line containing `needle`.
    pub fn find(&self, needle: &str) -> Option<usize> {
        self.lines.iter().position(|line| line.contains(needle))
    }

    /// Write the serialized store over `path`.
    ///
    /// The content goes to a sibling tempfile that is then renamed into place,
    /// so readers never see a half-written file. A symlinked `path` is
    /// resolved first and its target is replaced, not the link.
    pub fn write(&self, path: impl AsRef<Path>) -> Result<(), LineStoreError> {
        let path = path.as_ref();
        atomic_write(path, self.to_string().as_bytes()).map_err(|source| LineStoreError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl std::fmt::Display for LineStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (line, ending) in self.lines.iter().zip(&self.endings) {
            f.write_str(line)?;
            f.write_str(ending.as_str())?;
        }
        Ok(())
    }
}

fn atomic_write(path: &Path, content: &[u8]) -> std::io::Result<()> {
    let target = match fs::canonicalize(path) {
        Ok(resolved) => resolved,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => path.to_path_buf(),
        Err(e) => return Err(e),
    };
    let parent = match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut temp = tempfile::NamedTempFile::new_in(parent)?;
    temp.write_all(content)?;
    temp.as_file().sync_all()?;

    // Keep the permissions of the file being replaced.
    if let Ok(metadata) = fs::metadata(&target) {
        temp.as_file().set_permissions(metadata.permissions())?;
    }

    temp.persist(&target).map_err(|e| e.error)?;
    Ok(())
}
