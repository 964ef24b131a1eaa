//! Engine state interface.
//!
//! Structured snapshots of the engine for the paint layer, which polls them once per render pass,
//! plus version tracking and change notifications.
//!
//! # Example
//!
//! ```rust
//! use editor_engine::{Engine, EngineConfig, StateChangeType};
//!
//! let mut engine = Engine::new("fn main() {\n}\n", EngineConfig::default()).unwrap();
//! engine.subscribe(|change| {
//!     if change.change_type == StateChangeType::DocumentModified {
//!         println!("{} edits", change.deltas.len());
//!     }
//! });
//!
//! engine.apply_typed_text("// ").unwrap();
//! let document = engine.document_state();
//! assert_eq!(document.line_count, 3);
//! assert!(document.is_modified);
//! ```

use crate::brace::BraceHighlight;
use crate::caret::{Caret, RectangleSelection};
use crate::delta::EditDelta;
use crate::engine::Engine;
use crate::folding::FoldRegion;
use crate::indicators::Indicator;
use crate::line_ending::LineTerminator;
use crate::margins::FoldMarker;
use crate::position::Position;
use std::ops::Range;

/// Document state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentState {
    /// Total line count
    pub line_count: usize,
    /// Total char count (each line break counts once)
    pub char_count: usize,
    /// Whether the document changed since it was opened or last saved
    pub is_modified: bool,
    /// State version (incremented on every notified change)
    pub version: u64,
    /// Buffer version (incremented on every text edit)
    pub buffer_version: u64,
    /// Terminator used for new lines
    pub default_line_ending: LineTerminator,
}

/// Caret state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaretState {
    /// All carets in document order
    pub carets: Vec<Caret>,
    /// Logical positions of the carets' active ends
    pub positions: Vec<Position>,
    /// Index of the primary caret in `carets`
    pub primary_index: usize,
    /// Active rectangular selection
    pub rectangle: Option<RectangleSelection>,
    /// Brace highlight for the primary caret
    pub brace_highlight: Option<BraceHighlight>,
}

/// Folding state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoldingState {
    /// All fold regions in header order
    pub regions: Vec<FoldRegion>,
    /// Lines hidden independently of folding
    pub hidden_lines: Vec<usize>,
    /// Lines that are not visible for either reason
    pub invisible_line_count: usize,
    /// Visible line count
    pub display_line_count: usize,
    /// Regions are awaiting recomputation
    pub is_dirty: bool,
}

/// Everything the paint layer needs for one visible line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineRenderState {
    /// Logical line
    pub line: usize,
    /// Row among the visible lines
    pub display_row: usize,
    /// Line text without terminator
    pub text: String,
    /// Line terminator
    pub terminator: LineTerminator,
    /// Marker bits
    pub markers: u32,
    /// Fold chevron state
    pub fold_marker: FoldMarker,
    /// Annotation painted below the line
    pub annotation: Option<String>,
    /// Indicators overlapping the line (char offsets)
    pub indicators: Vec<Indicator>,
    /// Columns of carets on this line, including virtual space
    pub caret_columns: Vec<usize>,
    /// Selected column range on this line, one per caret selection touching it
    pub selections: Vec<Range<usize>>,
}

/// Complete engine snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineState {
    /// Document state
    pub document: DocumentState,
    /// Caret state
    pub carets: CaretState,
    /// Folding state
    pub folding: FoldingState,
}

/// State change type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateChangeType {
    /// Document content modified
    DocumentModified,
    /// Carets moved or selections changed
    CaretsChanged,
    /// Fold regions, collapsed state or hidden lines changed
    FoldingChanged,
    /// Margins or markers changed
    MarginsChanged,
    /// Indicators or hotspots changed
    IndicatorsChanged,
    /// Settings were applied
    ConfigChanged,
}

/// State change record
#[derive(Debug, Clone)]
pub struct StateChange {
    /// Change type
    pub change_type: StateChangeType,
    /// Old version number
    pub old_version: u64,
    /// New version number
    pub new_version: u64,
    /// Affected region (post-edit char offsets)
    pub affected_region: Option<Range<usize>>,
    /// Deltas applied by the operation, in application order
    pub deltas: Vec<EditDelta>,
}

impl StateChange {
    /// Create a new state change record without an affected region.
    pub fn new(change_type: StateChangeType, old_version: u64, new_version: u64) -> Self {
        Self {
            change_type,
            old_version,
            new_version,
            affected_region: None,
            deltas: Vec::new(),
        }
    }

    /// Attach the affected char range.
    pub fn with_region(mut self, region: Range<usize>) -> Self {
        self.affected_region = Some(region);
        self
    }

    /// Attach the applied deltas.
    pub fn with_deltas(mut self, deltas: Vec<EditDelta>) -> Self {
        self.deltas = deltas;
        self
    }
}

/// State change callback function type
pub type StateChangeCallback = Box<dyn FnMut(&StateChange) + Send>;

// Deltas are expressed in pre-edit offsets of their own step, so the union is approximate for
// multi-caret edits; it always covers every inserted range.
fn affected_region(deltas: &[EditDelta]) -> Option<Range<usize>> {
    let start = deltas.iter().map(|d| d.start_offset).min()?;
    let end = deltas
        .iter()
        .map(|d| d.inserted_end_offset())
        .max()
        .unwrap_or(start);
    Some(start..end.max(start))
}

impl Engine {
    /// Subscribe to state change notifications
    pub fn subscribe<F>(&mut self, callback: F)
    where
        F: FnMut(&StateChange) + Send + 'static,
    {
        self.callbacks.push(Box::new(callback));
    }

    /// Current state version.
    pub fn version(&self) -> u64 {
        self.state_version
    }

    /// Check if state has changed since a version
    pub fn has_changed_since(&self, version: u64) -> bool {
        self.state_version > version
    }

    /// Whether the document changed since it was opened or last saved.
    pub fn is_modified(&self) -> bool {
        self.is_modified
    }

    /// Mark document as unmodified (e.g., after saving)
    pub fn mark_saved(&mut self) {
        self.is_modified = false;
    }

    pub(crate) fn notify(&mut self, change_type: StateChangeType, deltas: Vec<EditDelta>) {
        let old_version = self.state_version;
        self.state_version += 1;

        let mut change = StateChange::new(change_type, old_version, self.state_version);
        if let Some(region) = affected_region(&deltas) {
            change = change.with_region(region);
        }
        change = change.with_deltas(deltas);
        tracing::trace!(
            ?change_type,
            version = self.state_version,
            subscribers = self.callbacks.len(),
            "state changed"
        );
        for callback in &mut self.callbacks {
            callback(&change);
        }
    }

    /// Document state
    pub fn document_state(&self) -> DocumentState {
        DocumentState {
            line_count: self.buffer.line_count(),
            char_count: self.buffer.len_chars(),
            is_modified: self.is_modified,
            version: self.state_version,
            buffer_version: self.buffer.version(),
            default_line_ending: self.buffer.default_line_ending(),
        }
    }

    /// Caret state
    pub fn caret_state(&self) -> CaretState {
        let carets = self.carets.carets().to_vec();
        let positions = carets
            .iter()
            .map(|c| self.buffer.to_position(c.position))
            .collect();
        CaretState {
            carets,
            positions,
            primary_index: self.carets.primary_index(),
            rectangle: self.carets.rectangle(),
            brace_highlight: self.brace_highlight(),
        }
    }

    /// Folding state
    pub fn folding_state(&self) -> FoldingState {
        let display_line_count = self.folding.display_line_count();
        FoldingState {
            regions: self.folding.regions().to_vec(),
            hidden_lines: self.folding.hidden_lines().iter().copied().collect(),
            invisible_line_count: self.buffer.line_count() - display_line_count,
            display_line_count,
            is_dirty: self.folding.is_dirty(),
        }
    }

    /// Complete snapshot
    pub fn full_state(&self) -> EngineState {
        EngineState {
            document: self.document_state(),
            carets: self.caret_state(),
            folding: self.folding_state(),
        }
    }

    /// Render state of `line`; `None` past the end of the document or for invisible lines.
    pub fn line_render_state(&self, line: usize) -> Option<LineRenderState> {
        let display_row = self.folding.line_to_display(line)?;
        let text = self.buffer.line_text(line)?;
        let terminator = self.buffer.line_terminator(line)?;
        let line_start = self.buffer.to_offset(Position::new(line, 0));
        let line_end = line_start + self.buffer.line_len(line);

        let mut caret_columns = Vec::new();
        let mut selections = Vec::new();
        for caret in self.carets.carets() {
            let position = self.buffer.to_position(caret.position);
            if position.line == line {
                caret_columns.push(position.column + caret.virtual_space);
            }
            let (start, end) = caret.range();
            if start < end && start <= line_end && end >= line_start {
                let from = start.max(line_start) - line_start;
                let to = end.min(line_end) - line_start;
                if from < to {
                    selections.push(from..to);
                }
            }
        }

        Some(LineRenderState {
            line,
            display_row,
            text,
            terminator,
            markers: self.margins.markers_on_line(line),
            fold_marker: self.folding.fold_marker(line),
            annotation: self.margins.annotation(line).map(str::to_string),
            indicators: self.query_indicators_in_range(line_start, line_end.max(line_start + 1)),
            caret_columns,
            selections,
        })
    }

    /// Render states of up to `count` visible lines starting at display row `start_row`.
    pub fn visible_lines(&self, start_row: usize, count: usize) -> Vec<LineRenderState> {
        (start_row..start_row.saturating_add(count))
            .map_while(|row| self.folding.display_to_line(row))
            .filter_map(|line| self.line_render_state(line))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_notifications_carry_deltas() {
        let mut engine = Engine::new("abc", EngineConfig::default()).unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        engine.subscribe(move |change| {
            sink.lock()
                .unwrap()
                .push((change.change_type, change.deltas.len()));
        });

        let before = engine.version();
        engine.set_caret(3, None);
        engine.apply_typed_text("d").unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(
            *seen,
            vec![
                (StateChangeType::CaretsChanged, 0),
                (StateChangeType::DocumentModified, 1)
            ]
        );
        assert!(engine.has_changed_since(before));
        assert!(engine.is_modified());
    }

    #[test]
    fn test_visible_lines_skip_folded() {
        let mut engine = Engine::new(
            "def f():\n    x = 1\n    y = 2\nreturn",
            EngineConfig::default(),
        )
        .unwrap();
        engine.toggle_fold(0);
        let lines: Vec<usize> = engine.visible_lines(0, 10).iter().map(|l| l.line).collect();
        assert_eq!(lines, vec![0, 3]);

        let header = engine.line_render_state(0).unwrap();
        assert_eq!(header.fold_marker, FoldMarker::Collapsed);
        assert_eq!(header.caret_columns, vec![0]);
        assert!(engine.line_render_state(1).is_none());
        assert!(engine.line_render_state(40).is_none());
    }

    #[test]
    fn test_selection_columns_per_line() {
        let mut engine = Engine::new("abc\ndef", EngineConfig::default()).unwrap();
        engine.set_selection(1, 6);
        assert_eq!(engine.line_render_state(0).unwrap().selections, vec![1..3]);
        assert_eq!(engine.line_render_state(1).unwrap().selections, vec![0..2]);
    }
}
