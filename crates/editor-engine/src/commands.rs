//! Command interface layer
//!
//! Plain edit intents from collaborators (key handling, paste, margin clicks, lint results) as
//! one enum, dispatched by [`Engine::execute`].
//!
//! # Example
//!
//! ```rust
//! use editor_engine::{CaretCommand, Command, EditCommand, Engine, EngineConfig};
//!
//! let mut engine = Engine::new("", EngineConfig::default()).unwrap();
//! engine
//!     .execute_batch(vec![
//!         Command::Edit(EditCommand::TypeText { text: "one two".to_string() }),
//!         Command::Caret(CaretCommand::Add { position: 3, anchor: None }),
//!         Command::Edit(EditCommand::TypeText { text: "!".to_string() }),
//!     ])
//!     .unwrap();
//! assert_eq!(engine.text(), "one! two!");
//! ```

use crate::buffer::EditRequest;
use crate::caret::CaretMove;
use crate::config::FoldStrategy;
use crate::engine::Engine;
use crate::error::Result;
use crate::indicators::{HotspotEvents, HotspotId, Indicator, StyleId};
use crate::line_ending::LineTerminator;
use crate::margins::{MarginClick, MarginSpec};
use crate::position::Position;

/// Text editing commands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditCommand {
    /// Insert text at an offset
    Insert {
        /// Char offset to insert at.
        offset: usize,
        /// Text to insert.
        text: String,
    },
    /// Delete a range
    Delete {
        /// Char offset of the deletion start.
        start: usize,
        /// Length of the deletion in chars.
        length: usize,
    },
    /// Replace a range
    Replace {
        /// Char offset of the replacement start.
        start: usize,
        /// Length of the replaced range in chars.
        length: usize,
        /// Replacement text.
        text: String,
    },
    /// Insert a line terminated with the document default.
    InsertLine {
        /// Index of the new line.
        line: usize,
        /// Line text.
        text: String,
    },
    /// Type at every caret
    TypeText {
        /// Typed text.
        text: String,
    },
    /// Paste clipboard text at every caret
    Paste {
        /// Clipboard text.
        text: String,
    },
    /// Paste clipboard content already split into rows
    PasteSegments {
        /// Clipboard rows.
        segments: Vec<String>,
    },
    /// Line break with auto-indent at every caret
    InsertNewline,
    /// Tab at every caret
    InsertTab,
    /// Delete before every caret
    Backspace,
    /// Delete after every caret
    DeleteForward,
    /// Rewrite every line terminator
    ConvertLineEndings {
        /// New terminator.
        terminator: LineTerminator,
    },
}

/// Caret & selection commands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaretCommand {
    /// Single caret (with optional selection anchor)
    Set {
        /// Caret offset.
        position: usize,
        /// Selection anchor.
        anchor: Option<usize>,
    },
    /// Add a caret
    Add {
        /// Caret offset.
        position: usize,
        /// Selection anchor.
        anchor: Option<usize>,
    },
    /// Remove a caret by index
    Remove {
        /// Caret index.
        index: usize,
    },
    /// Keep only the primary caret
    CollapseToPrimary,
    /// Move every caret
    Move {
        /// Movement kind.
        movement: CaretMove,
        /// Extend selections instead of moving.
        extend: bool,
    },
    /// Select the whole document
    SelectAll,
    /// Start a rectangular selection
    BeginRectangular {
        /// Fixed corner.
        anchor: Position,
    },
    /// Move the active corner of the rectangular selection
    ExtendRectangular {
        /// Moving corner.
        to: Position,
    },
}

/// Folding & line hiding commands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FoldCommand {
    /// Recompute regions
    Compute {
        /// Strategy; `None` uses the configured one.
        strategy: Option<FoldStrategy>,
    },
    /// Toggle the region headed by a line
    Toggle {
        /// Header line.
        header_line: usize,
    },
    /// Expand or collapse the region headed by a line
    FoldLine {
        /// Header line.
        line: usize,
        /// Expand instead of collapse.
        expand: bool,
    },
    /// Collapse every region
    FoldAll,
    /// Expand every region
    UnfoldAll,
    /// Collapse regions at or below a level
    SetLevel {
        /// Lowest collapsed level.
        level: usize,
    },
    /// Expand regions hiding a line
    EnsureVisible {
        /// Line to reveal.
        line: usize,
    },
    /// Hide lines independently of folding
    HideLines {
        /// First line.
        start: usize,
        /// Last line (inclusive).
        end: usize,
    },
    /// Show hidden lines
    ShowLines {
        /// Inclusive range; `None` shows every hidden line.
        range: Option<(usize, usize)>,
    },
}

/// Margin & marker commands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarginCommand {
    /// Define or replace a margin
    Define(MarginSpec),
    /// Set a margin's width
    SetWidth {
        /// Margin index.
        index: usize,
        /// Width in pixels.
        width_px: u32,
    },
    /// Set a margin's sensitivity
    SetSensitive {
        /// Margin index.
        index: usize,
        /// Report clicks.
        sensitive: bool,
    },
    /// Put a marker on a line
    SetMarker {
        /// Line.
        line: usize,
        /// Marker slot.
        symbol: u32,
    },
    /// Remove a marker from a line
    ClearMarker {
        /// Line.
        line: usize,
        /// Marker slot.
        symbol: u32,
    },
    /// Remove a marker from every line
    ClearMarkerEverywhere {
        /// Marker slot.
        symbol: u32,
    },
    /// Set or clear margin text
    SetText {
        /// Line.
        line: usize,
        /// Text; `None` clears.
        text: Option<String>,
    },
    /// Set an annotation; empty text clears it
    SetAnnotation {
        /// Line.
        line: usize,
        /// Annotation text.
        text: String,
    },
    /// Remove every annotation
    ClearAllAnnotations,
    /// A click on a margin
    Click {
        /// Margin index.
        index: usize,
        /// Clicked line.
        line: usize,
    },
}

/// Indicator & hotspot commands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndicatorCommand {
    /// Add an indicator range
    Add {
        /// Start offset.
        start: usize,
        /// End offset (exclusive).
        end: usize,
        /// Indicator style.
        style_id: StyleId,
        /// Attached value.
        value: i32,
    },
    /// Remove an exact indicator range
    Remove {
        /// Start offset.
        start: usize,
        /// End offset (exclusive).
        end: usize,
        /// Indicator style.
        style_id: StyleId,
    },
    /// Clear a span, splitting ranges that stick out
    Clear {
        /// Start offset.
        start: usize,
        /// End offset (exclusive).
        end: usize,
        /// Only this style; `None` clears all.
        style_id: Option<StyleId>,
    },
    /// Query indicators at an offset
    QueryAt {
        /// Offset.
        offset: usize,
    },
    /// Add a hotspot
    SetHotspot {
        /// Start offset.
        start: usize,
        /// End offset (exclusive).
        end: usize,
        /// Host payload.
        payload: String,
        /// Reported events.
        events: HotspotEvents,
    },
    /// Remove a hotspot
    RemoveHotspot {
        /// Hotspot id.
        id: HotspotId,
    },
    /// Pointer moved over the text (`None` when outside)
    PointerMoved {
        /// Offset under the pointer.
        offset: Option<usize>,
    },
    /// Click in the text
    PointerClicked {
        /// Clicked offset.
        offset: usize,
    },
    /// Brace match for a caret offset
    MatchBrace {
        /// Caret offset.
        offset: usize,
    },
}

/// Unified command enum
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Text editing commands
    Edit(EditCommand),
    /// Caret commands
    Caret(CaretCommand),
    /// Folding commands
    Fold(FoldCommand),
    /// Margin commands
    Margin(MarginCommand),
    /// Indicator commands
    Indicator(IndicatorCommand),
}

/// Command execution result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandResult {
    /// Success, no return value
    Success,
    /// Success, returns an offset
    Offset(usize),
    /// Success, returns a flag (fold found / state changed / removed)
    Changed(bool),
    /// Fold toggle result: new collapsed state, or `None` without a region
    Fold(Option<bool>),
    /// Margin click result
    MarginClick(Option<MarginClick>),
    /// Indicators at a point
    Indicators(Vec<Indicator>),
    /// New hotspot id (`None` for an empty range)
    Hotspot(Option<HotspotId>),
    /// Brace pair `(open, close)`
    Brace(Option<(usize, usize)>),
}

impl Engine {
    /// Execute command
    pub fn execute(&mut self, command: Command) -> Result<CommandResult> {
        match command {
            Command::Edit(command) => self.execute_edit(command),
            Command::Caret(command) => self.execute_caret(command),
            Command::Fold(command) => Ok(self.execute_fold(command)),
            Command::Margin(command) => self.execute_margin(command),
            Command::Indicator(command) => Ok(self.execute_indicator(command)),
        }
    }

    /// Execute commands in order, stopping at the first error.
    ///
    /// Commands before the failing one stay applied.
    pub fn execute_batch(&mut self, commands: Vec<Command>) -> Result<Vec<CommandResult>> {
        let mut results = Vec::with_capacity(commands.len());
        for command in commands {
            results.push(self.execute(command)?);
        }
        Ok(results)
    }

    fn execute_edit(&mut self, command: EditCommand) -> Result<CommandResult> {
        match command {
            EditCommand::Insert { offset, text } => {
                let delta = self.apply_edit(EditRequest::insert(offset, text))?;
                Ok(CommandResult::Offset(delta.inserted_end_offset()))
            }
            EditCommand::Delete { start, length } => {
                let delta = self.apply_edit(EditRequest::delete(start, length as i64))?;
                Ok(CommandResult::Offset(delta.start_offset))
            }
            EditCommand::Replace {
                start,
                length,
                text,
            } => {
                let delta = self.apply_edit(EditRequest::replace(start, length as i64, text))?;
                Ok(CommandResult::Offset(delta.inserted_end_offset()))
            }
            EditCommand::InsertLine { line, text } => {
                let delta = self.insert_line(line, &text)?;
                Ok(CommandResult::Offset(delta.start_offset))
            }
            EditCommand::TypeText { text } => {
                self.apply_typed_text(&text)?;
                Ok(CommandResult::Success)
            }
            EditCommand::Paste { text } => {
                self.paste(&text)?;
                Ok(CommandResult::Success)
            }
            EditCommand::PasteSegments { segments } => {
                self.paste_segments(&segments)?;
                Ok(CommandResult::Success)
            }
            EditCommand::InsertNewline => {
                self.insert_newline()?;
                Ok(CommandResult::Success)
            }
            EditCommand::InsertTab => {
                self.insert_tab()?;
                Ok(CommandResult::Success)
            }
            EditCommand::Backspace => {
                self.apply_backspace()?;
                Ok(CommandResult::Success)
            }
            EditCommand::DeleteForward => {
                self.apply_delete()?;
                Ok(CommandResult::Success)
            }
            EditCommand::ConvertLineEndings { terminator } => {
                self.convert_line_endings(terminator);
                Ok(CommandResult::Success)
            }
        }
    }

    fn execute_caret(&mut self, command: CaretCommand) -> Result<CommandResult> {
        match command {
            CaretCommand::Set { position, anchor } => self.set_caret(position, anchor),
            CaretCommand::Add { position, anchor } => {
                return Ok(CommandResult::Offset(self.add_caret(position, anchor)));
            }
            CaretCommand::Remove { index } => self.remove_caret(index)?,
            CaretCommand::CollapseToPrimary => self.collapse_to_primary(),
            CaretCommand::Move { movement, extend } => self.move_carets(movement, extend),
            CaretCommand::SelectAll => self.select_all(),
            CaretCommand::BeginRectangular { anchor } => self.begin_rectangular_selection(anchor),
            CaretCommand::ExtendRectangular { to } => self.extend_rectangular(to),
        }
        Ok(CommandResult::Success)
    }

    fn execute_fold(&mut self, command: FoldCommand) -> CommandResult {
        match command {
            FoldCommand::Compute { strategy } => {
                self.compute_folds(strategy.unwrap_or(self.config.fold_strategy));
                CommandResult::Success
            }
            FoldCommand::Toggle { header_line } => CommandResult::Fold(self.toggle_fold(header_line)),
            FoldCommand::FoldLine { line, expand } => {
                CommandResult::Changed(self.fold_line(line, expand))
            }
            FoldCommand::FoldAll => {
                self.fold_all();
                CommandResult::Success
            }
            FoldCommand::UnfoldAll => {
                self.unfold_all();
                CommandResult::Success
            }
            FoldCommand::SetLevel { level } => {
                self.set_fold_level(level);
                CommandResult::Success
            }
            FoldCommand::EnsureVisible { line } => {
                CommandResult::Changed(self.ensure_line_visible(line))
            }
            FoldCommand::HideLines { start, end } => CommandResult::Changed(self.hide_lines(start, end)),
            FoldCommand::ShowLines { range } => {
                CommandResult::Changed(self.show_hidden_lines(range.map(|(s, e)| s..=e)))
            }
        }
    }

    fn execute_margin(&mut self, command: MarginCommand) -> Result<CommandResult> {
        match command {
            MarginCommand::Define(spec) => self.define_margin(spec),
            MarginCommand::SetWidth { index, width_px } => self.set_margin_width(index, width_px)?,
            MarginCommand::SetSensitive { index, sensitive } => {
                self.set_margin_sensitive(index, sensitive)?
            }
            MarginCommand::SetMarker { line, symbol } => self.set_marker(line, symbol)?,
            MarginCommand::ClearMarker { line, symbol } => self.clear_marker(line, symbol)?,
            MarginCommand::ClearMarkerEverywhere { symbol } => self.clear_marker_everywhere(symbol)?,
            MarginCommand::SetText { line, text } => self.set_margin_text(line, text)?,
            MarginCommand::SetAnnotation { line, text } => self.set_annotation(line, text)?,
            MarginCommand::ClearAllAnnotations => self.clear_all_annotations(),
            MarginCommand::Click { index, line } => {
                return Ok(CommandResult::MarginClick(self.click_margin(index, line)?));
            }
        }
        Ok(CommandResult::Success)
    }

    fn execute_indicator(&mut self, command: IndicatorCommand) -> CommandResult {
        match command {
            IndicatorCommand::Add {
                start,
                end,
                style_id,
                value,
            } => {
                self.add_indicator_range_with_value(start, end, style_id, value);
                CommandResult::Success
            }
            IndicatorCommand::Remove {
                start,
                end,
                style_id,
            } => CommandResult::Changed(self.remove_indicator_range(start, end, style_id)),
            IndicatorCommand::Clear {
                start,
                end,
                style_id,
            } => {
                self.clear_indicator_range(start, end, style_id);
                CommandResult::Success
            }
            IndicatorCommand::QueryAt { offset } => {
                CommandResult::Indicators(self.query_indicators_at(offset))
            }
            IndicatorCommand::SetHotspot {
                start,
                end,
                payload,
                events,
            } => CommandResult::Hotspot(self.set_hotspot(start, end, payload, events)),
            IndicatorCommand::RemoveHotspot { id } => CommandResult::Changed(self.remove_hotspot(id)),
            IndicatorCommand::PointerMoved { offset } => {
                self.pointer_moved(offset);
                CommandResult::Success
            }
            IndicatorCommand::PointerClicked { offset } => {
                self.pointer_clicked(offset);
                CommandResult::Success
            }
            IndicatorCommand::MatchBrace { offset } => CommandResult::Brace(self.match_brace_at(offset)),
        }
    }
}
