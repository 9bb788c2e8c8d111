use serde::Deserialize;
use serde::Serialize;
use std::fmt;

/// Zero-based line/character position. `character` counts Unicode scalar
/// values from the start of the line.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Position {
    pub line: u32,
    pub character: u32,
}

impl Position {
    pub const fn new(line: u32, character: u32) -> Self {
        Self { line, character }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line + 1, self.character + 1)
    }
}

/// Source range from `start` to `end`, both ends inclusive for
/// [`Range::contains`]. `end` is the position just past the last character.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Range {
    pub const fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// True when `start <= position <= end`, so a cursor placed right after
    /// the last character still hits the symbol.
    pub fn contains(&self, position: Position) -> bool {
        self.start <= position && position <= self.end
    }

    pub fn line_count(&self) -> u32 {
        self.end.line.saturating_sub(self.start.line) + 1
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// Maps byte offsets of a source text to [`Position`]s.
pub(crate) struct LineIndex<'a> {
    text: &'a str,
    line_starts: Vec<usize>,
}

impl<'a> LineIndex<'a> {
    pub(crate) fn new(text: &'a str) -> Self {
        let mut line_starts = vec![0];
        for (idx, byte) in text.bytes().enumerate() {
            if byte == b'\n' {
                line_starts.push(idx + 1);
            }
        }
        Self { text, line_starts }
    }

    /// Converts a tree-sitter row/byte-column pair into a character position.
    pub(crate) fn position(&self, row: usize, byte_column: usize) -> Position {
        let Some(&line_start) = self.line_starts.get(row) else {
            return Position::new(row as u32, byte_column as u32);
        };
        let end = (line_start + byte_column).min(self.text.len());
        let character = self
            .text
            .get(line_start..end)
            .map(|prefix| prefix.chars().count())
            .unwrap_or(byte_column);
        Position::new(row as u32, character as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn range_contains_is_inclusive_at_both_ends() {
        let range = Range::new(Position::new(2, 4), Position::new(5, 1));
        assert!(range.contains(Position::new(2, 4)));
        assert!(range.contains(Position::new(3, 0)));
        assert!(range.contains(Position::new(5, 1)));
        assert!(!range.contains(Position::new(2, 3)));
        assert!(!range.contains(Position::new(5, 2)));
    }

    #[test]
    fn line_index_counts_characters_not_bytes() {
        let text = "let a = 1;\nlet é = \"ü\"; call()\n";
        let index = LineIndex::new(text);
        let byte_column = "let é = \"ü\"; ".len();
        assert_eq!(index.position(1, byte_column), Position::new(1, 13));
        assert_eq!(index.position(0, 4), Position::new(0, 4));
    }

    #[test]
    fn display_is_one_based() {
        assert_eq!(Position::new(0, 0).to_string(), "1:1");
    }
}
