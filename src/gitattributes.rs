//! Minimal `.gitattributes` editing.
//!
//! Other tools edit the same file, so every line is kept byte-for-byte and
//! only the lines grypt owns are touched. Saving an unmodified file writes
//! back exactly what was read.

use crate::error::Result;
use crate::git::FILTER_NAME;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

pub const GITATTRIBUTES: &str = ".gitattributes";

#[derive(Debug, Clone, PartialEq, Eq)]
struct Line {
    /// Everything up to the first whitespace
    pattern: String,
    raw: String,
}

impl Line {
    fn parse(raw: &str) -> Self {
        let pattern = raw.split_whitespace().next().unwrap_or_default();
        // Leading whitespace means there is no pattern at the start of the line
        let pattern = if raw.starts_with(char::is_whitespace) {
            ""
        } else {
            pattern
        };
        Self {
            pattern: pattern.to_string(),
            raw: raw.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GitAttributes {
    lines: Vec<Line>,
}

impl GitAttributes {
    pub fn parse(text: &str) -> Self {
        if text.is_empty() {
            return Self::default();
        }
        Self {
            lines: text.split('\n').map(Line::parse).collect(),
        }
    }

    /// Read `path`, treating a missing file as empty
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        match fs::read_to_string(path) {
            Ok(text) => Ok(Self::parse(&text)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(err.into()),
        }
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        fs::write(path, self.render())?;
        Ok(())
    }

    pub fn render(&self) -> String {
        self.lines
            .iter()
            .map(|line| line.raw.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Mark `path` for sealing, replacing any line with the same pattern.
    ///
    /// Existing attributes on a replaced line are not kept.
    pub fn put_entry(&mut self, path: &str) {
        let raw = format!("{path} filter={FILTER_NAME} diff={FILTER_NAME}");

        if let Some(line) = self.lines.iter_mut().find(|line| line.pattern == path) {
            line.raw = raw;
            return;
        }

        let entry = Line {
            pattern: path.to_string(),
            raw,
        };
        match self.lines.last() {
            // Keep the trailing newline at the end of the file
            Some(last) if last.raw.is_empty() => {
                let at = self.lines.len() - 1;
                self.lines.insert(at, entry);
            }
            _ => {
                self.lines.push(entry);
                self.lines.push(Line::parse(""));
            }
        }
    }

    /// Whether some line's pattern is exactly `path`
    pub fn contains(&self, path: &str) -> bool {
        self.lines.iter().any(|line| line.pattern == path)
    }

    /// Whether `path` is marked with the grypt filter
    pub fn is_sealed(&self, path: &str) -> bool {
        let filter = format!("filter={FILTER_NAME}");
        self.lines.iter().any(|line| {
            line.pattern == path && line.raw.split_whitespace().skip(1).any(|attr| attr == filter)
        })
    }
}
