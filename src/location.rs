//! Source locations and interned filenames.
//!
//! Every AST node and diagnostic carries a [`SourceRange`]. Filenames are
//! interned rather than stored as owned strings so that cloning a range
//! (which happens constantly while threading locations through the
//! resolver and IR builder) stays a handful of `Copy` words.

use std::fmt;

use crate::intern::{Interner, StringId};

/// A single line/column position within a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub struct SourceLoc {
    /// 1-indexed line number.
    pub line: u32,
    /// 1-indexed column number.
    pub column: u32,
}

impl SourceLoc {
    #[must_use]
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for SourceLoc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A half-open range of source positions inside one file.
///
/// `filename` is a [`StringId`] rather than a path so that ranges remain
/// `Copy` and can be attached to every AST node without allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct SourceRange {
    pub filename: StringId,
    pub start: SourceLoc,
    pub end: SourceLoc,
}

impl SourceRange {
    #[must_use]
    pub fn new(filename: StringId, start: SourceLoc, end: SourceLoc) -> Self {
        Self { filename, start, end }
    }

    /// A placeholder range for synthesized nodes that have no source text
    /// (e.g. the foreach-hook the IR builder synthesizes for container
    /// fields, see spec.md §8 item 6).
    #[must_use]
    pub fn synthetic() -> Self {
        Self {
            filename: StringId::SYNTHETIC,
            start: SourceLoc::new(0, 0),
            end: SourceLoc::new(0, 0),
        }
    }

    #[must_use]
    pub fn is_synthetic(&self) -> bool {
        self.filename == StringId::SYNTHETIC
    }

    /// Renders `filename:line:col` using the interner to resolve the name.
    #[must_use]
    pub fn render(&self, interner: &Interner) -> String {
        if self.is_synthetic() {
            return "<synthetic>".to_owned();
        }
        format!("{}:{}", interner.resolve(self.filename), self.start)
    }
}
