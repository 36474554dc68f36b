//! File positions attached to diagnostics.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a diagnostic points: a file and, when known, a 1-based line and column.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Location {
    /// The file path as reported by the build engine.
    pub file: String,
    /// 1-based line number.
    pub line: Option<u32>,
    /// 1-based column number. Only meaningful together with `line`.
    pub column: Option<u32>,
}

impl Location {
    /// A location covering a whole file.
    pub fn file(file: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            line: None,
            column: None,
        }
    }

    /// A location at a line/column inside a file.
    pub fn at(file: impl Into<String>, line: u32, column: u32) -> Self {
        Self {
            file: file.into(),
            line: Some(line),
            column: Some(column),
        }
    }

    /// Computes the 1-based line and column of `byte_offset` in `content`.
    pub fn in_text(file: impl Into<String>, content: &str, byte_offset: usize) -> Self {
        let offset = byte_offset.min(content.len());
        let before = &content[..offset];
        let line = before.matches('\n').count() as u32 + 1;
        let line_start = before.rfind('\n').map_or(0, |p| p + 1);
        let column = before[line_start..].chars().count() as u32 + 1;
        Self::at(file, line, column)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.line, self.column) {
            (Some(line), Some(col)) => write!(f, "{}:{line}:{col}", self.file),
            (Some(line), None) => write!(f, "{}:{line}", self.file),
            _ => write!(f, "{}", self.file),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_variants() {
        assert_eq!(Location::file("a.css").to_string(), "a.css");
        assert_eq!(Location::at("a.css", 3, 7).to_string(), "a.css:3:7");
        let line_only = Location {
            file: "a.css".into(),
            line: Some(2),
            column: None,
        };
        assert_eq!(line_only.to_string(), "a.css:2");
    }

    #[test]
    fn in_text_first_line() {
        let loc = Location::in_text("a.scss", "@import 'x';", 0);
        assert_eq!((loc.line, loc.column), (Some(1), Some(1)));
    }

    #[test]
    fn in_text_later_line() {
        let text = ".a {}\n  @import 'missing';\n";
        let offset = text.find("@import").unwrap();
        let loc = Location::in_text("a.css", text, offset);
        assert_eq!((loc.line, loc.column), (Some(2), Some(3)));
    }

    #[test]
    fn in_text_clamps_offset() {
        let loc = Location::in_text("a.css", "ab", 99);
        assert_eq!((loc.line, loc.column), (Some(1), Some(3)));
    }
}
