//! Position & anchor index.
//!
//! A [`Rope`] over the LF-normalized document text. Every line break occupies exactly one char
//! offset, so offsets stay independent of how each line is terminated on disk. The rope keeps
//! its line-length prefix sums in its internal B-tree, which makes both conversions O(log N) and
//! an edit cost proportional to the edited span rather than to the document.

use crate::position::Position;
use ropey::{Rope, RopeSlice};

/// Rope-backed logical line index.
#[derive(Debug, Clone)]
pub struct LineIndex {
    rope: Rope,
}

impl LineIndex {
    /// Create an empty index (one empty line).
    pub fn new() -> Self {
        Self { rope: Rope::new() }
    }

    /// Build an index from LF-normalized text.
    pub fn from_text(text: &str) -> Self {
        Self {
            rope: Rope::from_str(text),
        }
    }

    /// Underlying rope.
    pub fn rope(&self) -> &Rope {
        &self.rope
    }

    /// Number of lines (always at least 1).
    pub fn line_count(&self) -> usize {
        self.rope.len_lines()
    }

    /// Total document length in chars (each break counts as one).
    pub fn char_count(&self) -> usize {
        self.rope.len_chars()
    }

    /// Char offset of the first character of `line`; clamps to the document end.
    pub fn line_start(&self, line: usize) -> usize {
        if line >= self.rope.len_lines() {
            return self.rope.len_chars();
        }
        self.rope.line_to_char(line)
    }

    /// Length of `line` in chars, excluding its break. Out-of-range lines have length 0.
    pub fn line_len(&self, line: usize) -> usize {
        let line_count = self.rope.len_lines();
        if line >= line_count {
            return 0;
        }
        let start = self.rope.line_to_char(line);
        if line + 1 < line_count {
            self.rope.line_to_char(line + 1) - start - 1
        } else {
            self.rope.len_chars() - start
        }
    }

    /// Convert a char offset to a position. Offsets past the end clamp to the end.
    pub fn offset_to_position(&self, offset: usize) -> Position {
        let offset = offset.min(self.rope.len_chars());
        let line = self.rope.char_to_line(offset);
        Position::new(line, offset - self.rope.line_to_char(line))
    }

    /// Convert a position to a char offset. Lines and columns clamp to the document.
    pub fn position_to_offset(&self, position: Position) -> usize {
        if position.line >= self.rope.len_lines() {
            return self.rope.len_chars();
        }
        self.line_start(position.line) + position.column.min(self.line_len(position.line))
    }

    /// Returns `true` if `position` addresses an existing line and column.
    pub fn is_valid_position(&self, position: Position) -> bool {
        position.line < self.rope.len_lines() && position.column <= self.line_len(position.line)
    }

    /// Insert LF-normalized text at a (clamped) char offset.
    pub fn insert(&mut self, offset: usize, text: &str) {
        let offset = offset.min(self.rope.len_chars());
        self.rope.insert(offset, text);
    }

    /// Remove `len` chars starting at a (clamped) char offset.
    pub fn delete(&mut self, start: usize, len: usize) {
        let start = start.min(self.rope.len_chars());
        let end = start.saturating_add(len).min(self.rope.len_chars());
        if start < end {
            self.rope.remove(start..end);
        }
    }

    /// Character at `offset`, if any.
    pub fn char_at(&self, offset: usize) -> Option<char> {
        (offset < self.rope.len_chars()).then(|| self.rope.char(offset))
    }

    /// Slice `[start, end)` (clamped).
    pub fn slice(&self, start: usize, end: usize) -> RopeSlice<'_> {
        let len = self.rope.len_chars();
        let end = end.min(len);
        let start = start.min(end);
        self.rope.slice(start..end)
    }

    /// Text of `[start, end)` (clamped) with breaks rendered as `'\n'`.
    pub fn text_in_range(&self, start: usize, end: usize) -> String {
        self.slice(start, end).to_string()
    }

    /// Text of `line` without its break.
    pub fn line_text(&self, line: usize) -> Option<String> {
        if line >= self.rope.len_lines() {
            return None;
        }
        let start = self.rope.line_to_char(line);
        Some(self.rope.slice(start..start + self.line_len(line)).to_string())
    }

    /// Complete LF-normalized text.
    pub fn text(&self) -> String {
        self.rope.to_string()
    }
}

impl Default for LineIndex {
    fn default() -> Self {
        Self::new()
    }
}
