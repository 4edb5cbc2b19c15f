//! Source positions shared by every later stage.
//!
//! A position is a (file, line, column) triple. Lines and columns are
//! 1-indexed, matching how editors and most compiler diagnostics report
//! them (LSP-style 0-indexing is deliberately not used here — this crate
//! is not an LSP server, and a column of 1 reads better in a diagnostic
//! than a column of 0).

use std::fmt;
use std::sync::Arc;

/// A source file path, interned so every token in a large file can carry
/// one without re-allocating the path string per token.
pub type FilePath = Arc<str>;

/// A single point in a source file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourcePosition {
    pub file: FilePath,
    pub line: u32,
    pub column: u32,
}

impl SourcePosition {
    pub fn new(file: FilePath, line: u32, column: u32) -> Self {
        debug_assert!(line >= 1, "SourcePosition: line must be >= 1");
        debug_assert!(column >= 1, "SourcePosition: column must be >= 1");
        SourcePosition { file, line, column }
    }

    pub fn start_of(file: FilePath) -> Self {
        SourcePosition { file, line: 1, column: 1 }
    }

    /// Advance past a single non-newline character.
    pub fn advance(&self) -> Self {
        SourcePosition { file: self.file.clone(), line: self.line, column: self.column + 1 }
    }

    /// Advance past a newline: column resets to 1, line increments.
    pub fn newline(&self) -> Self {
        SourcePosition { file: self.file.clone(), line: self.line + 1, column: 1 }
    }
}

impl fmt::Display for SourcePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(line: u32, column: u32) -> SourcePosition {
        SourcePosition::new(Arc::from("unit.j"), line, column)
    }

    #[test]
    fn newline_resets_column() {
        let p = pos(3, 7).newline();
        assert_eq!(p.line, 4);
        assert_eq!(p.column, 1);
    }

    #[test]
    fn advance_keeps_line() {
        let p = pos(1, 1).advance().advance();
        assert_eq!((p.line, p.column), (1, 3));
    }

    #[test]
    fn display_format() {
        assert_eq!(pos(10, 4).to_string(), "unit.j:10:4");
    }
}
