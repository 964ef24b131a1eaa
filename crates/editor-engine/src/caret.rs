//! Multi-caret and selection state.
//!
//! Carets store char offsets so that they follow edits through the shared remap rule. A caret
//! past the end of its line keeps the overshoot as `virtual_space` columns; it is materialized as
//! padding only when text is typed there.
//!
//! The set stays normalized between operations: sorted by offset, overlapping ranges merged,
//! exact duplicates dropped, exactly one primary caret.

use crate::buffer::LineBuffer;
use crate::delta::{EditDelta, RemapConsumer};
use crate::error::{EngineError, Result};
use crate::position::Position;
use unicode_segmentation::UnicodeSegmentation;

/// One caret, optionally carrying a selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caret {
    /// Active end, as a char offset.
    pub position: usize,
    /// Selection anchor; `None` means no selection.
    pub anchor: Option<usize>,
    /// Columns beyond the end of the line (rectangular selections / virtual space).
    pub virtual_space: usize,
    /// Whether this is the primary caret.
    pub is_primary: bool,
    /// Sticky column for vertical movement.
    pub desired_column: Option<usize>,
}

impl Caret {
    /// A caret without selection.
    pub fn at(position: usize) -> Self {
        Self {
            position,
            anchor: None,
            virtual_space: 0,
            is_primary: false,
            desired_column: None,
        }
    }

    /// A caret selecting from `anchor` to `position`.
    pub fn with_anchor(position: usize, anchor: Option<usize>) -> Self {
        Self {
            anchor: anchor.filter(|a| *a != position),
            ..Self::at(position)
        }
    }

    /// `(start, end)` of the selected range (empty when there is no selection).
    pub fn range(&self) -> (usize, usize) {
        match self.anchor {
            Some(anchor) => (anchor.min(self.position), anchor.max(self.position)),
            None => (self.position, self.position),
        }
    }

    /// Returns `true` if the caret selects a non-empty range.
    pub fn has_selection(&self) -> bool {
        let (start, end) = self.range();
        start < end
    }

    /// Logical position of the active end.
    pub fn position_in(&self, buffer: &LineBuffer) -> Position {
        buffer.to_position(self.position)
    }

    /// Logical position of the anchor.
    pub fn anchor_in(&self, buffer: &LineBuffer) -> Option<Position> {
        self.anchor.map(|a| buffer.to_position(a))
    }

    /// Intended column including virtual space, when the caret sits past the line end.
    pub fn virtual_column(&self, buffer: &LineBuffer) -> Option<usize> {
        (self.virtual_space > 0).then(|| buffer.to_position(self.position).column + self.virtual_space)
    }

    fn collapse_to(&mut self, offset: usize) {
        self.position = offset;
        self.anchor = None;
        self.virtual_space = 0;
    }
}

/// A column block between two corners. Columns may lie past line ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RectangleSelection {
    /// Corner where the selection started.
    pub anchor: Position,
    /// Corner that follows the pointer / keyboard.
    pub active: Position,
}

impl RectangleSelection {
    /// Inclusive line range.
    pub fn lines(&self) -> (usize, usize) {
        (
            self.anchor.line.min(self.active.line),
            self.anchor.line.max(self.active.line),
        )
    }

    /// `(left, right)` columns.
    pub fn columns(&self) -> (usize, usize) {
        (
            self.anchor.column.min(self.active.column),
            self.anchor.column.max(self.active.column),
        )
    }

    /// Returns `true` if the block has zero width.
    pub fn is_thin(&self) -> bool {
        self.anchor.column == self.active.column
    }
}

/// Caret movement kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaretMove {
    /// One grapheme left.
    Left,
    /// One grapheme right.
    Right,
    /// Start of line.
    Home,
    /// End of line.
    End,
    /// One line up.
    Up,
    /// One line down.
    Down,
    /// Start of document.
    DocumentStart,
    /// End of document.
    DocumentEnd,
}

/// Ordered, de-duplicated set of carets.
#[derive(Debug, Clone)]
pub struct CaretSet {
    carets: Vec<Caret>,
    rectangle: Option<RectangleSelection>,
}

impl CaretSet {
    /// A single primary caret at offset 0.
    pub fn new() -> Self {
        Self {
            carets: vec![Caret {
                is_primary: true,
                ..Caret::at(0)
            }],
            rectangle: None,
        }
    }

    /// All carets in ascending offset order.
    pub fn carets(&self) -> &[Caret] {
        &self.carets
    }

    /// Number of carets. The set always holds its primary caret, so this is at least 1.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.carets.len()
    }

    /// Index of the primary caret.
    pub fn primary_index(&self) -> usize {
        self.carets.iter().position(|c| c.is_primary).unwrap_or(0)
    }

    /// The primary caret.
    pub fn primary(&self) -> Caret {
        self.carets[self.primary_index()]
    }

    /// Active rectangular selection, if any.
    pub fn rectangle(&self) -> Option<RectangleSelection> {
        self.rectangle
    }

    /// Whether the carets came from a rectangular selection.
    pub fn is_rectangular(&self) -> bool {
        self.rectangle.is_some()
    }

    pub(crate) fn caret_mut(&mut self, index: usize) -> Option<&mut Caret> {
        self.carets.get_mut(index)
    }

    pub(crate) fn clear_rectangle(&mut self) {
        self.rectangle = None;
    }

    /// Replace everything with one primary caret.
    pub fn set_single(&mut self, position: usize, anchor: Option<usize>) {
        self.carets = vec![Caret {
            is_primary: true,
            ..Caret::with_anchor(position, anchor)
        }];
        self.rectangle = None;
    }

    /// Replace all carets. The caret at `primary` becomes primary.
    pub fn set_all(&mut self, mut carets: Vec<Caret>, primary: usize) {
        if carets.is_empty() {
            self.set_single(0, None);
            return;
        }
        let primary = primary.min(carets.len() - 1);
        for (i, caret) in carets.iter_mut().enumerate() {
            caret.is_primary = i == primary;
        }
        self.carets = carets;
        self.rectangle = None;
        self.normalize();
    }

    /// Add a caret; it becomes primary. A caret coincident with an existing one merges into it.
    ///
    /// Returns the index of the resulting caret.
    pub fn add(&mut self, position: usize, anchor: Option<usize>) -> usize {
        for caret in &mut self.carets {
            caret.is_primary = false;
        }
        self.carets.push(Caret {
            is_primary: true,
            ..Caret::with_anchor(position, anchor)
        });
        self.rectangle = None;
        self.normalize();
        self.primary_index()
    }

    /// Remove the caret at `index`. The last caret cannot be removed.
    pub fn remove(&mut self, index: usize) -> Result<()> {
        let count = self.carets.len();
        if index >= count || count == 1 {
            return Err(EngineError::InvalidCaret { index, count });
        }
        let removed = self.carets.remove(index);
        if removed.is_primary {
            let next = index.min(self.carets.len() - 1);
            self.carets[next].is_primary = true;
        }
        self.rectangle = None;
        Ok(())
    }

    /// Keep only the primary caret (with its selection).
    pub fn collapse_to_primary(&mut self) {
        let primary = self.primary();
        self.carets = vec![primary];
        self.rectangle = None;
    }

    /// Build one caret per spanned line of `rect`.
    ///
    /// Each caret's anchor sits at the anchor column and its position at the active column,
    /// both clamped to the line length; the active overshoot becomes virtual space. The caret on
    /// the active line is primary.
    pub fn set_rectangle(&mut self, rect: RectangleSelection, buffer: &LineBuffer) {
        let last_line = buffer.line_count() - 1;
        let rect = RectangleSelection {
            anchor: Position::new(rect.anchor.line.min(last_line), rect.anchor.column),
            active: Position::new(rect.active.line.min(last_line), rect.active.column),
        };
        let (first, last) = rect.lines();

        let mut carets = Vec::with_capacity(last - first + 1);
        for line in first..=last {
            let len = buffer.line_len(line);
            let line_start = buffer.to_offset(Position::new(line, 0));
            let anchor = line_start + rect.anchor.column.min(len);
            let position = line_start + rect.active.column.min(len);
            carets.push(Caret {
                position,
                anchor: (anchor != position).then_some(anchor),
                virtual_space: rect.active.column.saturating_sub(len),
                is_primary: line == rect.active.line,
                desired_column: Some(rect.active.column),
            });
        }

        self.carets = carets;
        self.rectangle = Some(rect);
        tracing::trace!(?rect, carets = self.carets.len(), "rectangular selection");
    }

    /// Clamp every caret into `[0, len]`.
    pub fn clamp(&mut self, len: usize) {
        for caret in &mut self.carets {
            caret.position = caret.position.min(len);
            caret.anchor = caret.anchor.map(|a| a.min(len));
        }
    }

    /// Sort, merge overlapping ranges, drop duplicates, and keep exactly one primary.
    pub fn normalize(&mut self) {
        if self.carets.is_empty() {
            self.set_single(0, None);
            return;
        }

        let mut carets = std::mem::take(&mut self.carets);
        for caret in &mut carets {
            if caret.anchor == Some(caret.position) {
                caret.anchor = None;
            }
        }
        carets.sort_by(|a, b| {
            let (a_min, a_max) = a.range();
            let (b_min, b_max) = b.range();
            a_min
                .cmp(&b_min)
                .then_with(|| a_max.cmp(&b_max))
                .then_with(|| a.virtual_space.cmp(&b.virtual_space))
        });

        let mut merged: Vec<Caret> = Vec::with_capacity(carets.len());
        for caret in carets {
            let Some(last) = merged.last_mut() else {
                merged.push(caret);
                continue;
            };
            let (last_min, last_max) = last.range();
            let (min, max) = caret.range();

            let overlaps = min < last_max
                || min == last_min
                || (min == last_max && (min == max || last_min == last_max));
            if !overlaps {
                merged.push(caret);
                continue;
            }

            let is_primary = last.is_primary || caret.is_primary;
            let new_min = last_min.min(min);
            let new_max = last_max.max(max);
            if new_min == new_max {
                // Same empty caret; keep the larger virtual space.
                last.virtual_space = last.virtual_space.max(caret.virtual_space);
            } else {
                let backward = caret.anchor.is_some_and(|a| a > caret.position)
                    && (max - min) >= (last_max - last_min);
                *last = Caret {
                    position: if backward { new_min } else { new_max },
                    anchor: Some(if backward { new_max } else { new_min }),
                    virtual_space: 0,
                    is_primary,
                    desired_column: None,
                };
            }
            last.is_primary = is_primary;
        }

        let primary_count = merged.iter().filter(|c| c.is_primary).count();
        if primary_count != 1 {
            let keep = merged
                .iter()
                .rposition(|c| c.is_primary)
                .unwrap_or(merged.len() - 1);
            for (i, caret) in merged.iter_mut().enumerate() {
                caret.is_primary = i == keep;
            }
        }

        self.carets = merged;
    }

    /// Move every caret, optionally extending its selection.
    pub fn move_all(&mut self, movement: CaretMove, extend: bool, buffer: &LineBuffer) {
        for caret in &mut self.carets {
            move_caret(caret, movement, extend, buffer);
        }
        self.rectangle = None;
        self.normalize();
    }
}

impl Default for CaretSet {
    fn default() -> Self {
        Self::new()
    }
}

impl RemapConsumer for CaretSet {
    fn apply_delta(&mut self, delta: &EditDelta) {
        let start = delta.start_offset;
        let end = delta.removed_end_offset();
        for caret in &mut self.carets {
            if caret.virtual_space > 0 && (start..=end).contains(&caret.position) {
                caret.virtual_space = 0;
            }
            caret.position = delta.remap_offset(caret.position);
            caret.anchor = caret.anchor.map(|a| delta.remap_offset(a));
        }
        if let Some(rect) = &mut self.rectangle {
            rect.anchor.line = delta.remap_line_clamped(rect.anchor.line);
            rect.active.line = delta.remap_line_clamped(rect.active.line);
        }
        tracing::trace!(carets = self.carets.len(), "carets remapped");
    }
}

fn move_caret(caret: &mut Caret, movement: CaretMove, extend: bool, buffer: &LineBuffer) {
    let (sel_start, sel_end) = caret.range();
    let here = buffer.to_position(caret.position);

    if !extend && caret.has_selection() {
        match movement {
            CaretMove::Left => {
                caret.collapse_to(sel_start);
                caret.desired_column = None;
                return;
            }
            CaretMove::Right => {
                caret.collapse_to(sel_end);
                caret.desired_column = None;
                return;
            }
            _ => {}
        }
    }

    let (target, desired) = match movement {
        CaretMove::Left => (prev_grapheme_offset(buffer, caret.position), None),
        CaretMove::Right => (next_grapheme_offset(buffer, caret.position), None),
        CaretMove::Home => (buffer.to_offset(Position::new(here.line, 0)), None),
        CaretMove::End => (
            buffer.to_offset(Position::new(here.line, buffer.line_len(here.line))),
            None,
        ),
        CaretMove::Up | CaretMove::Down => {
            let column = caret
                .desired_column
                .unwrap_or(here.column + caret.virtual_space);
            let line = if movement == CaretMove::Up {
                here.line.checked_sub(1)
            } else {
                (here.line + 1 < buffer.line_count()).then_some(here.line + 1)
            };
            match line {
                Some(line) => (buffer.to_offset(Position::new(line, column)), Some(column)),
                None if movement == CaretMove::Up => (0, None),
                None => (buffer.len_chars(), None),
            }
        }
        CaretMove::DocumentStart => (0, None),
        CaretMove::DocumentEnd => (buffer.len_chars(), None),
    };

    let anchor = if extend {
        Some(caret.anchor.unwrap_or(caret.position))
    } else {
        None
    };
    caret.position = target;
    caret.anchor = anchor.filter(|a| *a != target);
    caret.virtual_space = 0;
    caret.desired_column = desired;
}

/// Offset of the previous grapheme boundary (a break counts as one grapheme).
pub fn prev_grapheme_offset(buffer: &LineBuffer, offset: usize) -> usize {
    let offset = offset.min(buffer.len_chars());
    let pos = buffer.to_position(offset);
    if pos.column == 0 {
        return offset.saturating_sub(1);
    }
    let line = buffer.line_text(pos.line).unwrap_or_default();
    let mut column = 0usize;
    let mut prev = 0usize;
    for grapheme in line.graphemes(true) {
        if column >= pos.column {
            break;
        }
        prev = column;
        column += grapheme.chars().count();
    }
    offset - (pos.column - prev)
}

/// Offset of the next grapheme boundary (a break counts as one grapheme).
pub fn next_grapheme_offset(buffer: &LineBuffer, offset: usize) -> usize {
    let len = buffer.len_chars();
    let offset = offset.min(len);
    let pos = buffer.to_position(offset);
    let line_len = buffer.line_len(pos.line);
    if pos.column >= line_len {
        return (offset + 1).min(len);
    }
    let line = buffer.line_text(pos.line).unwrap_or_default();
    let mut column = 0usize;
    for grapheme in line.graphemes(true) {
        column += grapheme.chars().count();
        if column > pos.column {
            break;
        }
    }
    offset + (column - pos.column)
}
