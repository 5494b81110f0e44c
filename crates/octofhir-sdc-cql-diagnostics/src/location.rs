//! Source ranges reported against CQL text

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// A line/column range inside a CQL source, 1-based as reported by the translator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceRange {
    pub start_line: usize,
    pub start_char: usize,
    pub end_line: usize,
    pub end_char: usize,
}

impl SourceRange {
    pub const fn new(start_line: usize, start_char: usize, end_line: usize, end_char: usize) -> Self {
        Self {
            start_line,
            start_char,
            end_line,
            end_char,
        }
    }

    /// Create a single-position range
    pub const fn point(line: usize, column: usize) -> Self {
        Self::new(line, column, line, column)
    }

    /// Read `startLine`/`startChar`/`endLine`/`endChar` from a translator annotation.
    ///
    /// Missing end coordinates collapse to the start position. Returns `None`
    /// when the annotation carries no start line.
    pub fn from_annotation(annotation: &Value) -> Option<Self> {
        let field = |name: &str| {
            annotation
                .get(name)
                .and_then(Value::as_u64)
                .map(|v| v as usize)
        };

        let start_line = field("startLine")?;
        let start_char = field("startChar").unwrap_or(1);
        Some(Self {
            start_line,
            start_char,
            end_line: field("endLine").unwrap_or(start_line),
            end_char: field("endChar").unwrap_or(start_char),
        })
    }

    /// Check whether this range covers more than one line
    pub const fn is_multiline(&self) -> bool {
        self.end_line > self.start_line
    }
}

impl fmt::Display for SourceRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start_line == self.end_line && self.start_char == self.end_char {
            write!(f, "{}:{}", self.start_line, self.start_char)
        } else {
            write!(
                f,
                "{}:{}-{}:{}",
                self.start_line, self.start_char, self.end_line, self.end_char
            )
        }
    }
}
