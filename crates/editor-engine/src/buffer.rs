//! Line buffer.
//!
//! Owns the document as addressable lines. Text lives LF-normalized in a [`LineIndex`]; each
//! line's original terminator is kept alongside so that the save path can reproduce it. Edits are
//! clamped to document bounds, produce one normalized [`EditDelta`], and are published to every
//! registered [`RemapConsumer`] before [`LineBuffer::apply_edit_with`] returns.

use crate::delta::{EditDelta, RemapConsumer};
use crate::error::{EngineError, Result};
use crate::line_ending::{LineTerminator, split_terminated};
use crate::line_index::LineIndex;
use crate::position::Position;

/// Where an edit starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditStart {
    /// Absolute char offset.
    Offset(usize),
    /// Logical position.
    Position(Position),
}

impl From<usize> for EditStart {
    fn from(offset: usize) -> Self {
        Self::Offset(offset)
    }
}

impl From<Position> for EditStart {
    fn from(position: Position) -> Self {
        Self::Position(position)
    }
}

/// An edit intent as received from a collaborator.
///
/// `removed_len` is signed so that malformed input can be detected instead of wrapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditRequest {
    /// Start of the edit.
    pub start: EditStart,
    /// Number of chars to remove.
    pub removed_len: i64,
    /// Text to insert; may contain `\n`, `\r\n` or `\r`.
    pub inserted_text: String,
}

impl EditRequest {
    /// Insert `text` at `at`.
    pub fn insert(at: impl Into<EditStart>, text: impl Into<String>) -> Self {
        Self {
            start: at.into(),
            removed_len: 0,
            inserted_text: text.into(),
        }
    }

    /// Delete `len` chars at `at`.
    pub fn delete(at: impl Into<EditStart>, len: i64) -> Self {
        Self {
            start: at.into(),
            removed_len: len,
            inserted_text: String::new(),
        }
    }

    /// Replace `len` chars at `at` with `text`.
    pub fn replace(at: impl Into<EditStart>, len: i64, text: impl Into<String>) -> Self {
        Self {
            start: at.into(),
            removed_len: len,
            inserted_text: text.into(),
        }
    }
}

/// The document text with per-line terminators.
#[derive(Debug, Clone)]
pub struct LineBuffer {
    index: LineIndex,
    terminators: Vec<LineTerminator>,
    default_terminator: LineTerminator,
    convert_inserted_line_endings: bool,
    version: u64,
}

impl LineBuffer {
    /// Empty document.
    pub fn new() -> Self {
        Self {
            index: LineIndex::new(),
            terminators: vec![LineTerminator::None],
            default_terminator: LineTerminator::platform_default(),
            convert_inserted_line_endings: false,
            version: 0,
        }
    }

    /// Load `text`, detecting each line's terminator.
    ///
    /// The document default terminator becomes the dominant one of `text`, or the platform
    /// default when `text` has no breaks.
    pub fn from_text(text: &str) -> Self {
        let parts = split_terminated(text);
        let mut content = String::with_capacity(text.len());
        let mut terminators = Vec::with_capacity(parts.len());
        for (i, (line, terminator)) in parts.iter().enumerate() {
            if i > 0 {
                content.push('\n');
            }
            content.push_str(line);
            terminators.push(*terminator);
        }

        Self {
            index: LineIndex::from_text(&content),
            terminators,
            default_terminator: LineTerminator::detect_in_text(text)
                .unwrap_or_else(LineTerminator::platform_default),
            convert_inserted_line_endings: false,
            version: 0,
        }
    }

    /// Load pre-split lines with a terminator hint per line.
    ///
    /// Breaks embedded in a line's text are honored. A `None` hint on an inner line takes
    /// `default`; a terminated final line is followed by an empty unterminated line.
    pub fn from_lines<I, S>(lines: I, default: LineTerminator) -> Self
    where
        I: IntoIterator<Item = (S, LineTerminator)>,
        S: AsRef<str>,
    {
        let default = sanitize_default(default);
        let mut content = String::new();
        let mut terminators = Vec::new();

        let mut lines = lines.into_iter().peekable();
        while let Some((line, hint)) = lines.next() {
            let is_last_line = lines.peek().is_none();
            let parts = split_terminated(line.as_ref());
            let last_part = parts.len() - 1;
            for (i, (segment, terminator)) in parts.into_iter().enumerate() {
                let terminator = if i < last_part {
                    terminator
                } else if is_last_line || hint != LineTerminator::None {
                    hint
                } else {
                    default
                };
                content.push_str(segment);
                if terminator != LineTerminator::None {
                    content.push('\n');
                }
                terminators.push(terminator);
            }
        }
        if terminators.last() != Some(&LineTerminator::None) {
            terminators.push(LineTerminator::None);
        }

        Self {
            index: LineIndex::from_text(&content),
            terminators,
            default_terminator: default,
            convert_inserted_line_endings: false,
            version: 0,
        }
    }

    /// Document default terminator for new lines.
    pub fn default_line_ending(&self) -> LineTerminator {
        self.default_terminator
    }

    /// Change the document default terminator. `None` is ignored.
    pub fn set_default_line_ending(&mut self, terminator: LineTerminator) {
        self.default_terminator = sanitize_default(terminator);
    }

    /// When set, breaks in inserted text take the document default terminator.
    pub fn set_convert_inserted_line_endings(&mut self, convert: bool) {
        self.convert_inserted_line_endings = convert;
    }

    /// Monotonic edit counter.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// The position index.
    pub fn index(&self) -> &LineIndex {
        &self.index
    }

    /// Number of lines (at least 1).
    pub fn line_count(&self) -> usize {
        self.index.line_count()
    }

    /// Document length in chars; each break counts as one.
    pub fn len_chars(&self) -> usize {
        self.index.char_count()
    }

    /// Returns `true` if the document is empty.
    pub fn is_empty(&self) -> bool {
        self.len_chars() == 0
    }

    /// Text of `line` without its terminator.
    pub fn line_text(&self, line: usize) -> Option<String> {
        self.index.line_text(line)
    }

    /// Length of `line` in chars (0 past the end).
    pub fn line_len(&self, line: usize) -> usize {
        self.index.line_len(line)
    }

    /// Terminator of `line`. The last line is always [`LineTerminator::None`].
    pub fn line_terminator(&self, line: usize) -> Option<LineTerminator> {
        self.terminators.get(line).copied()
    }

    /// Text of `[start, end)`, breaks rendered as `'\n'`.
    pub fn text_in_range(&self, start: usize, end: usize) -> String {
        self.index.text_in_range(start, end)
    }

    /// Whole document, breaks rendered as `'\n'`.
    pub fn text(&self) -> String {
        self.index.text()
    }

    /// Whole document with every line's own terminator.
    pub fn text_with_terminators(&self) -> String {
        let mut out = String::with_capacity(self.len_chars() + self.line_count());
        for (line, terminator) in self.terminators.iter().enumerate() {
            let start = self.index.line_start(line);
            for chunk in self.index.slice(start, start + self.index.line_len(line)).chunks() {
                out.push_str(chunk);
            }
            out.push_str(terminator.as_str());
        }
        out
    }

    /// Rewrite every break to `terminator`. Offsets are unaffected.
    pub fn convert_line_endings(&mut self, terminator: LineTerminator) {
        let terminator = sanitize_default(terminator);
        let last = self.terminators.len() - 1;
        for t in &mut self.terminators[..last] {
            *t = terminator;
        }
        self.default_terminator = terminator;
        self.version += 1;
        tracing::debug!(?terminator, version = self.version, "converted line endings");
    }

    /// Char offset of `position` (clamped).
    pub fn to_offset(&self, position: Position) -> usize {
        self.index.position_to_offset(position)
    }

    /// Position of `offset` (clamped).
    pub fn to_position(&self, offset: usize) -> Position {
        self.index.offset_to_position(offset)
    }

    /// Character at `offset`; breaks read as `'\n'`.
    pub fn char_at(&self, offset: usize) -> Option<char> {
        self.index.char_at(offset)
    }

    /// Apply an edit without consumers. See [`LineBuffer::apply_edit_with`].
    pub fn apply_edit(&mut self, request: EditRequest) -> Result<EditDelta> {
        self.apply_edit_with(request, &mut [])
    }

    /// Apply an edit and publish the normalized delta to `consumers` before returning.
    ///
    /// Out-of-range starts and lengths are clamped. A negative `removed_len` is rejected with
    /// [`EngineError::Range`] and leaves the buffer untouched.
    pub fn apply_edit_with(
        &mut self,
        request: EditRequest,
        consumers: &mut [&mut dyn RemapConsumer],
    ) -> Result<EditDelta> {
        let len = self.len_chars();
        let (raw_start, start_offset) = match request.start {
            EditStart::Offset(offset) => (offset, offset.min(len)),
            EditStart::Position(position) => {
                let offset = self.index.position_to_offset(position);
                if !self.index.is_valid_position(position) {
                    tracing::warn!(%position, clamped = offset, "edit start clamped to document");
                }
                (offset, offset)
            }
        };

        let removed_requested = usize::try_from(request.removed_len).map_err(|_| {
            EngineError::Range {
                start: raw_start,
                removed_len: request.removed_len,
            }
        })?;
        if raw_start > len {
            tracing::warn!(requested = raw_start, len, "edit start clamped to document end");
        }
        let removed_len = removed_requested.min(len - start_offset);
        if removed_len != removed_requested {
            tracing::warn!(
                requested = removed_requested,
                clamped = removed_len,
                "removed length clamped to document end"
            );
        }

        let start = self.index.offset_to_position(start_offset);
        let removed_end = self.index.offset_to_position(start_offset + removed_len);
        let removed_text = self.index.text_in_range(start_offset, start_offset + removed_len);

        let parts = split_terminated(&request.inserted_text);
        let mut inserted_text = String::with_capacity(request.inserted_text.len());
        let mut inserted_terminators = Vec::with_capacity(parts.len() - 1);
        for (i, (segment, terminator)) in parts.iter().enumerate() {
            if i > 0 {
                inserted_text.push('\n');
            }
            inserted_text.push_str(segment);
            if *terminator != LineTerminator::None {
                inserted_terminators.push(if self.convert_inserted_line_endings {
                    self.default_terminator
                } else {
                    *terminator
                });
            }
        }

        if removed_len == 0 && inserted_text.is_empty() {
            return Ok(EditDelta::new(
                start,
                start_offset,
                removed_end,
                removed_text,
                inserted_text,
                self.version,
            ));
        }

        // Lines start.line..removed_end.line lose their breaks; the inserted breaks take their
        // place and the removal-end line keeps its own terminator.
        self.terminators
            .splice(start.line..removed_end.line, inserted_terminators);
        self.index.delete(start_offset, removed_len);
        self.index.insert(start_offset, &inserted_text);
        self.version += 1;
        debug_assert_eq!(self.terminators.len(), self.index.line_count());

        let delta = EditDelta::new(
            start,
            start_offset,
            removed_end,
            removed_text,
            inserted_text,
            self.version,
        );
        tracing::debug!(
            start = delta.start_offset,
            removed = delta.removed_len(),
            inserted = delta.inserted_len(),
            version = delta.version,
            "applied edit"
        );

        for consumer in consumers.iter_mut() {
            consumer.apply_delta(&delta);
        }
        tracing::trace!(consumers = consumers.len(), "remap propagated");

        Ok(delta)
    }

    /// Insert a new line at `line` holding `text`, terminated with the document default.
    ///
    /// `line == line_count()` appends after the last line.
    pub fn insert_line_with(
        &mut self,
        line: usize,
        text: &str,
        consumers: &mut [&mut dyn RemapConsumer],
    ) -> Result<EditDelta> {
        let line_count = self.line_count();
        if line > line_count {
            return Err(EngineError::LineOutOfRange { line, line_count });
        }

        let break_str = self.default_terminator.as_str();
        let request = if line == line_count {
            EditRequest::insert(self.len_chars(), format!("{break_str}{text}"))
        } else {
            EditRequest::insert(self.index.line_start(line), format!("{text}{break_str}"))
        };
        self.apply_edit_with(request, consumers)
    }
}

impl Default for LineBuffer {
    fn default() -> Self {
        Self::new()
    }
}

fn sanitize_default(terminator: LineTerminator) -> LineTerminator {
    match terminator {
        LineTerminator::None => LineTerminator::Lf,
        other => other,
    }
}
