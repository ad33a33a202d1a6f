//! Line/column source spans and the offset-to-position index.
//!
//! The CST works in byte offsets (`rowan::TextRange`); AST nodes and
//! diagnostics carry [`SourceSpan`]s so that later passes never need the
//! original text to report a position. Lines are 1-based, columns 0-based.

use rowan::{TextRange, TextSize};

/// Immutable line/column range attached to every AST node.
///
/// `UNKNOWN` (all zeroes) marks synthesized nodes with no textual origin;
/// since real lines are 1-based, line 0 cannot occur in parsed input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceSpan {
    pub start_line: u32,
    pub start_col: u32,
    pub end_line: u32,
    pub end_col: u32,
}

impl SourceSpan {
    pub const UNKNOWN: SourceSpan = SourceSpan {
        start_line: 0,
        start_col: 0,
        end_line: 0,
        end_col: 0,
    };

    pub fn new(start_line: u32, start_col: u32, end_line: u32, end_col: u32) -> Self {
        Self {
            start_line,
            start_col,
            end_line,
            end_col,
        }
    }

    pub fn is_unknown(&self) -> bool {
        *self == Self::UNKNOWN
    }
}

impl std::fmt::Display for SourceSpan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_unknown() {
            return write!(f, "<unknown>");
        }
        write!(
            f,
            "{}:{}-{}:{}",
            self.start_line, self.start_col, self.end_line, self.end_col
        )
    }
}

/// Maps byte offsets to line/column positions. Built once per source text.
#[derive(Debug, Clone)]
pub struct LineIndex {
    /// Byte offset of the first character of each line, line 1 first.
    line_starts: Vec<u32>,
}

impl LineIndex {
    pub fn new(source: &str) -> Self {
        let mut line_starts = vec![0];
        for (i, byte) in source.bytes().enumerate() {
            if byte == b'\n' {
                line_starts.push(i as u32 + 1);
            }
        }
        Self { line_starts }
    }

    /// 1-based line and 0-based column for a byte offset.
    pub fn line_col(&self, offset: TextSize) -> (u32, u32) {
        let offset = u32::from(offset);
        let line = self
            .line_starts
            .partition_point(|&start| start <= offset)
            .saturating_sub(1);
        (line as u32 + 1, offset - self.line_starts[line])
    }

    /// Converts a CST byte range into a line/column span.
    pub fn span(&self, range: TextRange) -> SourceSpan {
        let (start_line, start_col) = self.line_col(range.start());
        let (end_line, end_col) = self.line_col(range.end());
        SourceSpan::new(start_line, start_col, end_line, end_col)
    }
}
