//! Backend selection.
//!
//! Hosts program against [`EditorBackend`]. A document is opened once either on a native
//! rich-editor component (wrapped by the host) or on the built-in [`Engine`]; the choice never
//! changes for the lifetime of the document.

use crate::buffer::EditRequest;
use crate::caret::Caret;
use crate::config::{EngineConfig, FoldStrategy};
use crate::delta::EditDelta;
use crate::engine::Engine;
use crate::error::Result;
use crate::events::EngineEvent;
use crate::indicators::{HotspotEvents, HotspotId, Indicator, StyleId};
use crate::line_ending::LineTerminator;
use crate::margins::{MarginClick, MarginSpec};
use crate::position::Position;
use std::ops::{Deref, DerefMut, RangeInclusive};

/// Editing capabilities every backend provides.
pub trait EditorBackend {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    // Line buffer and position index.

    /// Number of lines.
    fn line_count(&self) -> usize;
    /// Text of `line` without terminator.
    fn line_text(&self, line: usize) -> Option<String>;
    /// Terminator of `line`.
    fn line_terminator(&self, line: usize) -> Option<LineTerminator>;
    /// LF-normalized text in `[start, end)`.
    fn text_in_range(&self, start: usize, end: usize) -> String;
    /// Apply a raw edit.
    fn apply_edit(&mut self, request: EditRequest) -> Result<EditDelta>;
    /// Offset of a position.
    fn to_offset(&self, position: Position) -> usize;
    /// Position of an offset.
    fn to_position(&self, offset: usize) -> Position;

    // Carets.

    /// Carets in document order.
    fn caret_list(&self) -> Vec<Caret>;
    /// Add a caret; returns the index of the new primary caret.
    fn add_caret(&mut self, position: usize, anchor: Option<usize>) -> usize;
    /// Remove a caret.
    fn remove_caret(&mut self, index: usize) -> Result<()>;
    /// Keep only the primary caret.
    fn collapse_to_primary(&mut self);
    /// Type at every caret.
    fn apply_typed_text(&mut self, text: &str) -> Result<()>;
    /// Backspace at every caret.
    fn apply_backspace(&mut self) -> Result<()>;
    /// Delete at every caret.
    fn apply_delete(&mut self) -> Result<()>;
    /// Paste at every caret.
    fn paste(&mut self, text: &str) -> Result<()>;
    /// Start a rectangular selection.
    fn begin_rectangular_selection(&mut self, anchor: Position);
    /// Extend the rectangular selection.
    fn extend_rectangular(&mut self, to: Position);

    // Folding and line hiding.

    /// Recompute fold regions.
    fn compute_folds(&mut self, strategy: FoldStrategy);
    /// Toggle a region; returns its new collapsed state.
    fn toggle_fold(&mut self, header_line: usize) -> Option<bool>;
    /// Collapse every region.
    fn fold_all(&mut self);
    /// Expand every region.
    fn unfold_all(&mut self);
    /// Collapse regions at or below `level`.
    fn set_fold_level(&mut self, level: usize);
    /// Hide lines.
    fn hide_lines(&mut self, start: usize, end: usize) -> bool;
    /// Show hidden lines.
    fn show_hidden_lines(&mut self, range: Option<RangeInclusive<usize>>) -> bool;
    /// Whether `line` is shown.
    fn is_visible(&self, line: usize) -> bool;

    // Margins and markers.

    /// Define a margin.
    fn define_margin(&mut self, spec: MarginSpec);
    /// Put a marker on a line.
    fn set_marker(&mut self, line: usize, symbol: u32) -> Result<()>;
    /// Remove a marker from a line.
    fn clear_marker(&mut self, line: usize, symbol: u32) -> Result<()>;
    /// Marker bits on a line.
    fn markers_on_line(&self, line: usize) -> u32;
    /// Route a margin click.
    fn on_margin_click(&mut self, index: usize, line: usize) -> Result<Option<MarginClick>>;
    /// Set the annotation below a line; empty text clears it.
    fn set_annotation(&mut self, line: usize, text: &str) -> Result<()>;
    /// Annotation below a line.
    fn annotation(&self, line: usize) -> Option<String>;
    /// Remove every annotation.
    fn clear_all_annotations(&mut self);

    // Indicators, hotspots and braces.

    /// Add an indicator range.
    fn add_indicator_range(&mut self, start: usize, end: usize, style_id: StyleId);
    /// Remove an indicator range.
    fn remove_indicator_range(&mut self, start: usize, end: usize, style_id: StyleId) -> bool;
    /// Indicators at an offset.
    fn query_indicators_at(&self, offset: usize) -> Vec<Indicator>;
    /// Add a hotspot.
    fn set_hotspot(
        &mut self,
        start: usize,
        end: usize,
        payload: String,
        events: HotspotEvents,
    ) -> Option<HotspotId>;
    /// Brace pair for a caret offset.
    fn match_brace_at(&self, offset: usize) -> Option<(usize, usize)>;
    /// Pointer moved.
    fn pointer_moved(&mut self, offset: Option<usize>);
    /// Pointer clicked.
    fn pointer_clicked(&mut self, offset: usize);
    /// Take queued events.
    fn drain_events(&mut self) -> Vec<EngineEvent>;
}

impl EditorBackend for Engine {
    fn name(&self) -> &'static str {
        "fallback"
    }

    fn line_count(&self) -> usize {
        Engine::line_count(self)
    }

    fn line_text(&self, line: usize) -> Option<String> {
        Engine::line_text(self, line)
    }

    fn line_terminator(&self, line: usize) -> Option<LineTerminator> {
        Engine::line_terminator(self, line)
    }

    fn text_in_range(&self, start: usize, end: usize) -> String {
        Engine::text_in_range(self, start, end)
    }

    fn apply_edit(&mut self, request: EditRequest) -> Result<EditDelta> {
        Engine::apply_edit(self, request)
    }

    fn to_offset(&self, position: Position) -> usize {
        Engine::to_offset(self, position)
    }

    fn to_position(&self, offset: usize) -> Position {
        Engine::to_position(self, offset)
    }

    fn caret_list(&self) -> Vec<Caret> {
        self.carets.carets().to_vec()
    }

    fn add_caret(&mut self, position: usize, anchor: Option<usize>) -> usize {
        Engine::add_caret(self, position, anchor)
    }

    fn remove_caret(&mut self, index: usize) -> Result<()> {
        Engine::remove_caret(self, index)
    }

    fn collapse_to_primary(&mut self) {
        Engine::collapse_to_primary(self)
    }

    fn apply_typed_text(&mut self, text: &str) -> Result<()> {
        Engine::apply_typed_text(self, text)
    }

    fn apply_backspace(&mut self) -> Result<()> {
        Engine::apply_backspace(self)
    }

    fn apply_delete(&mut self) -> Result<()> {
        Engine::apply_delete(self)
    }

    fn paste(&mut self, text: &str) -> Result<()> {
        Engine::paste(self, text)
    }

    fn begin_rectangular_selection(&mut self, anchor: Position) {
        Engine::begin_rectangular_selection(self, anchor)
    }

    fn extend_rectangular(&mut self, to: Position) {
        Engine::extend_rectangular(self, to)
    }

    fn compute_folds(&mut self, strategy: FoldStrategy) {
        Engine::compute_folds(self, strategy)
    }

    fn toggle_fold(&mut self, header_line: usize) -> Option<bool> {
        Engine::toggle_fold(self, header_line)
    }

    fn fold_all(&mut self) {
        Engine::fold_all(self)
    }

    fn unfold_all(&mut self) {
        Engine::unfold_all(self)
    }

    fn set_fold_level(&mut self, level: usize) {
        Engine::set_fold_level(self, level)
    }

    fn hide_lines(&mut self, start: usize, end: usize) -> bool {
        Engine::hide_lines(self, start, end)
    }

    fn show_hidden_lines(&mut self, range: Option<RangeInclusive<usize>>) -> bool {
        Engine::show_hidden_lines(self, range)
    }

    fn is_visible(&self, line: usize) -> bool {
        Engine::is_visible(self, line)
    }

    fn define_margin(&mut self, spec: MarginSpec) {
        Engine::define_margin(self, spec)
    }

    fn set_marker(&mut self, line: usize, symbol: u32) -> Result<()> {
        Engine::set_marker(self, line, symbol)
    }

    fn clear_marker(&mut self, line: usize, symbol: u32) -> Result<()> {
        Engine::clear_marker(self, line, symbol)
    }

    fn markers_on_line(&self, line: usize) -> u32 {
        Engine::markers_on_line(self, line)
    }

    fn on_margin_click(&mut self, index: usize, line: usize) -> Result<Option<MarginClick>> {
        self.click_margin(index, line)
    }

    fn set_annotation(&mut self, line: usize, text: &str) -> Result<()> {
        Engine::set_annotation(self, line, text)
    }

    fn annotation(&self, line: usize) -> Option<String> {
        Engine::annotation(self, line).map(str::to_string)
    }

    fn clear_all_annotations(&mut self) {
        Engine::clear_all_annotations(self)
    }

    fn add_indicator_range(&mut self, start: usize, end: usize, style_id: StyleId) {
        Engine::add_indicator_range(self, start, end, style_id)
    }

    fn remove_indicator_range(&mut self, start: usize, end: usize, style_id: StyleId) -> bool {
        Engine::remove_indicator_range(self, start, end, style_id)
    }

    fn query_indicators_at(&self, offset: usize) -> Vec<Indicator> {
        Engine::query_indicators_at(self, offset)
    }

    fn set_hotspot(
        &mut self,
        start: usize,
        end: usize,
        payload: String,
        events: HotspotEvents,
    ) -> Option<HotspotId> {
        Engine::set_hotspot(self, start, end, payload, events)
    }

    fn match_brace_at(&self, offset: usize) -> Option<(usize, usize)> {
        Engine::match_brace_at(self, offset)
    }

    fn pointer_moved(&mut self, offset: Option<usize>) {
        Engine::pointer_moved(self, offset)
    }

    fn pointer_clicked(&mut self, offset: usize) {
        Engine::pointer_clicked(self, offset)
    }

    fn drain_events(&mut self) -> Vec<EngineEvent> {
        Engine::drain_events(self)
    }
}

/// The backend serving one open document.
pub enum Backend {
    /// Host-provided native component.
    Native(Box<dyn EditorBackend + Send>),
    /// Built-in engine.
    Fallback(Engine),
}

impl Backend {
    /// Choose the backend for a newly opened document.
    ///
    /// A native component, when the host has one, is used as is (it was loaded by the host);
    /// otherwise `text` is opened on the built-in engine under `config`.
    pub fn open(
        text: &str,
        config: EngineConfig,
        native: Option<Box<dyn EditorBackend + Send>>,
    ) -> Result<Self> {
        let backend = match native {
            Some(native) => Self::Native(native),
            None => Self::Fallback(Engine::new(text, config)?),
        };
        tracing::debug!(backend = backend.name(), "document backend selected");
        Ok(backend)
    }

    /// Whether the native component serves this document.
    pub fn is_native(&self) -> bool {
        matches!(self, Self::Native(_))
    }

    /// The built-in engine, when it serves this document.
    pub fn engine(&self) -> Option<&Engine> {
        match self {
            Self::Fallback(engine) => Some(engine),
            Self::Native(_) => None,
        }
    }

    /// Mutable access to the built-in engine, when it serves this document.
    pub fn engine_mut(&mut self) -> Option<&mut Engine> {
        match self {
            Self::Fallback(engine) => Some(engine),
            Self::Native(_) => None,
        }
    }
}

impl Deref for Backend {
    type Target = dyn EditorBackend;

    fn deref(&self) -> &Self::Target {
        match self {
            Self::Native(native) => native.as_ref(),
            Self::Fallback(engine) => engine,
        }
    }
}

impl DerefMut for Backend {
    fn deref_mut(&mut self) -> &mut Self::Target {
        match self {
            Self::Native(native) => native.as_mut(),
            Self::Fallback(engine) => engine,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_selected_without_native() {
        let mut backend = Backend::open("ab\ncd", EngineConfig::default(), None).unwrap();
        assert!(!backend.is_native());
        assert_eq!(backend.name(), "fallback");
        backend.add_caret(2, None);
        backend.apply_typed_text("!").unwrap();
        assert_eq!(backend.line_text(0).as_deref(), Some("!ab!"));
    }
}
