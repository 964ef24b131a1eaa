//! Edit deltas and the position remap contract.
//!
//! Every buffer mutation is described by exactly one [`EditDelta`], expressed in char offsets of
//! the pre-edit document. All position-bearing state (carets, markers, fold headers, hidden
//! lines, indicators, token ranges) is remapped through the same delta before any query can
//! observe the edited buffer.
//!
//! Offset rule, for a delta at offset `s` removing `r` chars and inserting `i` chars:
//!
//! - `o < s` stays `o`
//! - `s <= o < s + r` collapses to `s`
//! - `o >= s + r` becomes `o + i - r`

use crate::position::Position;

/// A single normalized buffer edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditDelta {
    /// Start of the edit in the pre-edit document.
    pub start: Position,
    /// Char offset of `start`.
    pub start_offset: usize,
    /// End of the removed range in the pre-edit document.
    pub removed_end: Position,
    /// Removed text, breaks rendered as `'\n'`.
    pub removed_text: String,
    /// Inserted text, breaks rendered as `'\n'`.
    pub inserted_text: String,
    /// Buffer version after the edit.
    pub version: u64,
    removed_len: usize,
    inserted_len: usize,
    inserted_breaks: usize,
}

impl EditDelta {
    /// Build a delta from its pre-edit coordinates and LF-normalized payloads.
    pub fn new(
        start: Position,
        start_offset: usize,
        removed_end: Position,
        removed_text: String,
        inserted_text: String,
        version: u64,
    ) -> Self {
        let removed_len = removed_text.chars().count();
        let inserted_len = inserted_text.chars().count();
        let inserted_breaks = inserted_text.matches('\n').count();
        Self {
            start,
            start_offset,
            removed_end,
            removed_text,
            inserted_text,
            version,
            removed_len,
            inserted_len,
            inserted_breaks,
        }
    }

    /// Number of removed chars.
    pub fn removed_len(&self) -> usize {
        self.removed_len
    }

    /// Number of inserted chars.
    pub fn inserted_len(&self) -> usize {
        self.inserted_len
    }

    /// Exclusive end offset of the removed range (pre-edit).
    pub fn removed_end_offset(&self) -> usize {
        self.start_offset + self.removed_len
    }

    /// Exclusive end offset of the inserted text (post-edit).
    pub fn inserted_end_offset(&self) -> usize {
        self.start_offset + self.inserted_len
    }

    /// Number of line breaks inserted.
    pub fn inserted_breaks(&self) -> usize {
        self.inserted_breaks
    }

    /// Number of line breaks removed.
    pub fn removed_breaks(&self) -> usize {
        self.removed_end.line - self.start.line
    }

    /// Net change in line count.
    pub fn line_delta(&self) -> isize {
        self.inserted_breaks as isize - self.removed_breaks() as isize
    }

    /// Returns `true` if the delta neither removes nor inserts anything.
    pub fn is_noop(&self) -> bool {
        self.removed_len == 0 && self.inserted_len == 0
    }

    /// Remap a pre-edit char offset.
    pub fn remap_offset(&self, offset: usize) -> usize {
        remap_offset(offset, self.start_offset, self.removed_len, self.inserted_len)
    }

    /// Remap a pre-edit line index. Lines whose break was removed yield `None`.
    ///
    /// When the edit starts at column 0 the line holding the end of the removed range survives
    /// (and moves after any inserted lines); otherwise the start line survives.
    pub fn remap_line(&self, line: usize) -> Option<usize> {
        let l0 = self.start.line;
        let l1 = self.removed_end.line;
        let k = self.inserted_breaks;

        if line < l0 {
            return Some(line);
        }
        if line > l1 {
            return Some(line + k - (l1 - l0));
        }
        if self.start.column == 0 {
            (line == l1).then_some(l0 + k)
        } else {
            (line == l0).then_some(l0)
        }
    }

    /// Like [`EditDelta::remap_line`], but removed lines collapse onto the line where the
    /// edit ends, which keeps the mapping monotonic.
    pub fn remap_line_clamped(&self, line: usize) -> usize {
        self.remap_line(line)
            .unwrap_or(self.start.line + self.inserted_breaks)
    }

    /// Returns `true` if the delta touches text on `line` (pre-edit).
    pub fn touches_line(&self, line: usize) -> bool {
        (self.start.line..=self.removed_end.line).contains(&line)
    }
}

/// Apply the remap rule to one offset.
pub fn remap_offset(offset: usize, start: usize, removed_len: usize, inserted_len: usize) -> usize {
    if offset < start {
        offset
    } else if offset < start + removed_len {
        start
    } else {
        offset + inserted_len - removed_len
    }
}

/// A structure holding position-bearing state that must follow buffer edits.
///
/// The buffer publishes every normalized delta to its consumers before returning from the edit,
/// so a consumer never observes post-edit text with pre-edit positions.
pub trait RemapConsumer {
    /// Remap stored positions through `delta`.
    fn apply_delta(&mut self, delta: &EditDelta);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delta(
        start: (usize, usize),
        start_offset: usize,
        end: (usize, usize),
        removed: &str,
        inserted: &str,
    ) -> EditDelta {
        EditDelta::new(
            start.into(),
            start_offset,
            end.into(),
            removed.to_string(),
            inserted.to_string(),
            1,
        )
    }

    #[test]
    fn test_remap_offset_rule() {
        // remove 3 chars at 5, insert 1
        assert_eq!(remap_offset(4, 5, 3, 1), 4);
        assert_eq!(remap_offset(5, 5, 3, 1), 5);
        assert_eq!(remap_offset(7, 5, 3, 1), 5);
        assert_eq!(remap_offset(8, 5, 3, 1), 6);
        // pure insertion shifts the insertion point itself
        assert_eq!(remap_offset(5, 5, 0, 2), 7);
    }

    #[test]
    fn test_remap_line_mid_line_join() {
        // "ab\ncd\nef": delete "b\ncd\ne" from (0,1)
        let d = delta((0, 1), 1, (2, 1), "b\ncd\ne", "");
        assert_eq!(d.line_delta(), -2);
        assert_eq!(d.remap_line(0), Some(0));
        assert_eq!(d.remap_line(1), None);
        assert_eq!(d.remap_line(2), None);
        assert_eq!(d.remap_line_clamped(2), 0);
    }

    #[test]
    fn test_remap_line_insert_at_line_start_moves_line() {
        let d = delta((1, 0), 3, (1, 0), "", "x\ny\n");
        assert_eq!(d.remap_line(0), Some(0));
        assert_eq!(d.remap_line(1), Some(3));
        assert_eq!(d.remap_line(2), Some(4));
    }

    #[test]
    fn test_remap_line_delete_whole_line() {
        // delete line 1 including its break
        let d = delta((1, 0), 3, (2, 0), "cd\n", "");
        assert_eq!(d.remap_line(1), None);
        assert_eq!(d.remap_line(2), Some(1));
        assert_eq!(d.remap_line(3), Some(2));
    }
}
