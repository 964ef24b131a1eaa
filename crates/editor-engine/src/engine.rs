//! The fallback engine: one document and every structure that holds positions into it.
//!
//! All text mutation goes through [`Engine::apply`], which hands the normalized delta to each
//! position-bearing consumer before returning. Public operations then run one finishing pass
//! (caret normalization, token refresh, refold, brace highlight, change notification).

use crate::brace::{self, BraceHighlight};
use crate::buffer::{EditRequest, LineBuffer};
use crate::caret::{
    Caret, CaretMove, CaretSet, RectangleSelection, next_grapheme_offset, prev_grapheme_offset,
};
use crate::config::{EngineConfig, FoldStrategy, IndicatorDefinition, MarkerDefinition, MarkerShape};
use crate::delta::EditDelta;
use crate::error::{EngineError, Result};
use crate::events::{EngineEvent, EventQueue};
use crate::folding::{FoldJob, FoldRegion, FoldSettings, FoldingEngine};
use crate::indicators::{
    HotspotEvents, HotspotId, HotspotTable, HoverTransition, Indicator, IndicatorTable, StyleId,
};
use crate::line_ending::{LineTerminator, split_terminated};
use crate::margins::{MarginClick, MarginContent, MarginKind, MarginSpec, MarginSystem};
use crate::position::Position;
use crate::state::{StateChangeCallback, StateChangeType};
use crate::tokens::{LiteralScanner, TokenProvider, TokenRange, TokenRanges};
use editor_engine_lang::LanguageConfig;
use std::ops::RangeInclusive;

/// What one caret contributes to a synchronized edit.
enum CaretEdit {
    Replace {
        start: usize,
        end: usize,
        text: String,
    },
    ConsumeVirtualSpace,
    Skip,
}

/// Editing engine for one open document.
pub struct Engine {
    pub(crate) buffer: LineBuffer,
    pub(crate) carets: CaretSet,
    pub(crate) folding: FoldingEngine,
    pub(crate) margins: MarginSystem,
    pub(crate) indicators: IndicatorTable,
    pub(crate) hotspots: HotspotTable,
    pub(crate) tokens: TokenRanges,
    token_provider: Box<dyn TokenProvider + Send>,
    pub(crate) events: EventQueue,
    pub(crate) config: EngineConfig,
    pub(crate) language: LanguageConfig,
    brace_highlight: Option<BraceHighlight>,
    rect_anchor: Option<Position>,
    pending: Vec<EditDelta>,
    pub(crate) callbacks: Vec<StateChangeCallback>,
    pub(crate) state_version: u64,
    pub(crate) is_modified: bool,
}

impl Engine {
    /// Open `text` under `config`.
    pub fn new(text: &str, config: EngineConfig) -> Result<Self> {
        Self::with_buffer(LineBuffer::from_text(text), config)
    }

    /// Open pre-split lines with a terminator hint per line (as handed over by file loading).
    pub fn from_lines<I, S>(lines: I, config: EngineConfig) -> Result<Self>
    where
        I: IntoIterator<Item = (S, LineTerminator)>,
        S: AsRef<str>,
    {
        let default = config
            .default_line_ending
            .unwrap_or_else(LineTerminator::platform_default);
        Self::with_buffer(LineBuffer::from_lines(lines, default), config)
    }

    fn with_buffer(mut buffer: LineBuffer, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let language = config.language_config();
        if let Some(terminator) = config.default_line_ending {
            buffer.set_default_line_ending(terminator);
        }
        buffer.set_convert_inserted_line_endings(config.convert_inserted_line_endings);

        let mut engine = Self {
            folding: FoldingEngine::new(buffer.line_count()),
            buffer,
            carets: CaretSet::new(),
            margins: MarginSystem::new(),
            indicators: IndicatorTable::new(),
            hotspots: HotspotTable::new(),
            tokens: TokenRanges::new(),
            token_provider: Box::new(LiteralScanner::new(language.clone())),
            events: EventQueue::new(),
            config,
            language,
            brace_highlight: None,
            rect_anchor: None,
            pending: Vec::new(),
            callbacks: Vec::new(),
            state_version: 0,
            is_modified: false,
        };
        engine.refresh_tokens();
        if engine.config.folding_enabled {
            engine.recompute_folds();
        }
        tracing::debug!(
            lines = engine.buffer.line_count(),
            language = %engine.language.id,
            "engine opened"
        );
        Ok(engine)
    }

    /// Replace the settings snapshot (explicit settings apply).
    pub fn apply_settings(&mut self, config: EngineConfig) -> Result<()> {
        config.validate()?;
        let language = config.language_config();
        if language.id != self.language.id {
            self.token_provider = Box::new(LiteralScanner::new(language.clone()));
            self.tokens.clear();
        }
        if let Some(terminator) = config.default_line_ending {
            self.buffer.set_default_line_ending(terminator);
        }
        self.buffer
            .set_convert_inserted_line_endings(config.convert_inserted_line_endings);
        self.config = config;
        self.language = language;
        self.refresh_tokens();
        if self.config.folding_enabled {
            self.recompute_folds();
        } else {
            self.folding.clear_regions();
        }
        tracing::debug!(language = %self.language.id, "settings applied");
        self.notify(StateChangeType::ConfigChanged, Vec::new());
        Ok(())
    }

    /// Current settings.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Lexical configuration in use.
    pub fn language(&self) -> &LanguageConfig {
        &self.language
    }

    // ---- buffer -------------------------------------------------------------------------------

    /// The line buffer.
    pub fn buffer(&self) -> &LineBuffer {
        &self.buffer
    }

    /// Number of lines (at least 1).
    pub fn line_count(&self) -> usize {
        self.buffer.line_count()
    }

    /// Text of `line` without its terminator.
    pub fn line_text(&self, line: usize) -> Option<String> {
        self.buffer.line_text(line)
    }

    /// Terminator of `line`.
    pub fn line_terminator(&self, line: usize) -> Option<LineTerminator> {
        self.buffer.line_terminator(line)
    }

    /// LF-normalized text in `[start, end)`.
    pub fn text_in_range(&self, start: usize, end: usize) -> String {
        self.buffer.text_in_range(start, end)
    }

    /// LF-normalized document text.
    pub fn text(&self) -> String {
        self.buffer.text()
    }

    /// Document text with each line's own terminator, for saving.
    pub fn text_for_saving(&self) -> String {
        self.buffer.text_with_terminators()
    }

    /// Offset of `position` (clamped).
    pub fn to_offset(&self, position: Position) -> usize {
        self.buffer.to_offset(position)
    }

    /// Position of `offset` (clamped).
    pub fn to_position(&self, offset: usize) -> Position {
        self.buffer.to_position(offset)
    }

    /// Apply a raw edit intent and run the finishing pass.
    pub fn apply_edit(&mut self, request: EditRequest) -> Result<EditDelta> {
        let delta = self.apply(request)?;
        self.finish_edit();
        Ok(delta)
    }

    /// Insert a line at `line` terminated with the document default.
    pub fn insert_line(&mut self, line: usize, text: &str) -> Result<EditDelta> {
        let delta = self.buffer.insert_line_with(
            line,
            text,
            &mut [
                &mut self.carets,
                &mut self.folding,
                &mut self.margins,
                &mut self.indicators,
                &mut self.hotspots,
                &mut self.tokens,
            ],
        )?;
        if !delta.is_noop() {
            self.pending.push(delta.clone());
        }
        self.finish_edit();
        Ok(delta)
    }

    /// Rewrite every line terminator (offsets are unaffected).
    pub fn convert_line_endings(&mut self, terminator: LineTerminator) {
        self.buffer.convert_line_endings(terminator);
        self.is_modified = true;
        self.notify(StateChangeType::DocumentModified, Vec::new());
    }

    /// The single entry point for text mutation.
    fn apply(&mut self, request: EditRequest) -> Result<EditDelta> {
        let delta = self.buffer.apply_edit_with(
            request,
            &mut [
                &mut self.carets,
                &mut self.folding,
                &mut self.margins,
                &mut self.indicators,
                &mut self.hotspots,
                &mut self.tokens,
            ],
        )?;
        if !delta.is_noop() {
            self.pending.push(delta.clone());
        }
        Ok(delta)
    }

    fn finish_edit(&mut self) {
        self.carets.clamp(self.buffer.len_chars());
        self.carets.normalize();
        let deltas = std::mem::take(&mut self.pending);
        if deltas.is_empty() {
            self.update_brace_highlight();
            return;
        }

        let small = self.buffer.line_count() <= self.config.sync_refold_line_limit;
        if self.tokens.is_stale() && small {
            self.refresh_tokens();
        }
        if self.config.folding_enabled && self.config.refold_on_edit && small {
            self.recompute_folds();
        }
        self.update_brace_highlight();
        self.is_modified = true;
        self.notify(StateChangeType::DocumentModified, deltas);
    }

    // ---- tokens -------------------------------------------------------------------------------

    /// Replace the lexer collaborator and re-tokenize.
    pub fn set_token_provider(&mut self, provider: Box<dyn TokenProvider + Send>) {
        self.token_provider = provider;
        self.refresh_tokens();
    }

    /// Install token ranges computed elsewhere. They are remapped by later edits until the next
    /// refresh.
    pub fn set_tokens(&mut self, ranges: Vec<TokenRange>) {
        self.tokens.set(ranges);
    }

    /// Current token ranges.
    pub fn tokens(&self) -> &TokenRanges {
        &self.tokens
    }

    /// Re-run the token provider over the whole document.
    pub fn refresh_tokens(&mut self) {
        let text = self.buffer.text();
        self.tokens.set(self.token_provider.tokenize(&text));
    }

    // ---- carets -------------------------------------------------------------------------------

    /// The caret set.
    pub fn carets(&self) -> &CaretSet {
        &self.carets
    }

    /// Primary caret.
    pub fn primary_caret(&self) -> Caret {
        self.carets.primary()
    }

    /// Replace all carets with one at `position` (selecting from `anchor`).
    pub fn set_caret(&mut self, position: usize, anchor: Option<usize>) {
        let len = self.buffer.len_chars();
        self.carets.set_single(position.min(len), anchor.map(|a| a.min(len)));
        self.rect_anchor = None;
        self.carets_changed();
    }

    /// Replace all carets with one selecting `anchor..position`.
    pub fn set_selection(&mut self, anchor: usize, position: usize) {
        self.set_caret(position, Some(anchor));
    }

    /// Select the whole document.
    pub fn select_all(&mut self) {
        self.set_caret(self.buffer.len_chars(), Some(0));
    }

    /// Add a caret; coincident carets merge. Returns the index of the new primary caret.
    pub fn add_caret(&mut self, position: usize, anchor: Option<usize>) -> usize {
        let len = self.buffer.len_chars();
        let index = self.carets.add(position.min(len), anchor.map(|a| a.min(len)));
        self.rect_anchor = None;
        self.carets_changed();
        index
    }

    /// Remove the caret at `index`.
    pub fn remove_caret(&mut self, index: usize) -> Result<()> {
        self.carets.remove(index)?;
        self.carets_changed();
        Ok(())
    }

    /// Drop every caret but the primary one.
    pub fn collapse_to_primary(&mut self) {
        self.carets.collapse_to_primary();
        self.rect_anchor = None;
        self.carets_changed();
    }

    /// Move every caret.
    pub fn move_carets(&mut self, movement: CaretMove, extend: bool) {
        self.carets.move_all(movement, extend, &self.buffer);
        self.rect_anchor = None;
        self.carets_changed();
    }

    /// Start a rectangular selection at `anchor`. Columns may lie past line ends.
    pub fn begin_rectangular_selection(&mut self, anchor: Position) {
        let anchor = Position::new(anchor.line.min(self.buffer.line_count() - 1), anchor.column);
        self.rect_anchor = Some(anchor);
        self.carets.set_rectangle(
            RectangleSelection {
                anchor,
                active: anchor,
            },
            &self.buffer,
        );
        self.carets_changed();
    }

    /// Move the active corner of the rectangular selection to `to`.
    ///
    /// Without a prior [`Engine::begin_rectangular_selection`] the primary caret is the anchor.
    pub fn extend_rectangular(&mut self, to: Position) {
        let anchor = match (self.carets.rectangle(), self.rect_anchor) {
            (Some(rect), _) => rect.anchor,
            (None, Some(anchor)) => anchor,
            (None, None) => {
                let caret = self.carets.primary();
                Position::new(
                    self.buffer.to_position(caret.position).line,
                    self.buffer.to_position(caret.position).column + caret.virtual_space,
                )
            }
        };
        self.rect_anchor = Some(anchor);
        self.carets
            .set_rectangle(RectangleSelection { anchor, active: to }, &self.buffer);
        self.carets_changed();
    }

    fn carets_changed(&mut self) {
        self.carets.normalize();
        self.update_brace_highlight();
        self.notify(StateChangeType::CaretsChanged, Vec::new());
    }

    /// Run `plan` for every caret from the rightmost to the leftmost and apply what it asks for.
    ///
    /// Each edit goes through [`Engine::apply`], so carets not yet processed are remapped before
    /// their turn. Edited carets collapse to the end of their inserted text.
    fn edit_carets<F>(&mut self, mut plan: F) -> Result<usize>
    where
        F: FnMut(&Self, usize, Caret) -> CaretEdit,
    {
        self.carets.normalize();
        let mut edits = 0;
        for idx in (0..self.carets.len()).rev() {
            let caret = self.carets.carets()[idx];
            match plan(self, idx, caret) {
                CaretEdit::Replace { start, end, text } => {
                    if start == end && text.is_empty() {
                        continue;
                    }
                    let removed = end.saturating_sub(start) as i64;
                    let delta = self.apply(EditRequest::replace(start, removed, text))?;
                    if let Some(caret) = self.carets.caret_mut(idx) {
                        caret.position = delta.inserted_end_offset();
                        caret.anchor = None;
                        caret.virtual_space = 0;
                        caret.desired_column = None;
                    }
                    edits += 1;
                }
                CaretEdit::ConsumeVirtualSpace => {
                    if let Some(caret) = self.carets.caret_mut(idx) {
                        caret.virtual_space = caret.virtual_space.saturating_sub(1);
                    }
                }
                CaretEdit::Skip => {}
            }
        }
        tracing::debug!(carets = self.carets.len(), edits, "synchronized caret edit");
        Ok(edits)
    }

    fn prepare_typing(&mut self) {
        if !self.config.additional_selection_typing && self.carets.len() > 1 {
            self.carets.collapse_to_primary();
        }
    }

    /// Padding that materializes a caret's virtual space.
    fn virtual_padding(&self, caret: &Caret) -> String {
        if caret.virtual_space == 0 {
            return String::new();
        }
        if !self.config.virtual_space_uses_tabs {
            return " ".repeat(caret.virtual_space);
        }
        let tab = self.config.tab_width;
        let mut column = self.buffer.to_position(caret.position).column;
        let target = column + caret.virtual_space;
        let mut padding = String::new();
        while (column / tab + 1) * tab <= target {
            padding.push('\t');
            column = (column / tab + 1) * tab;
        }
        padding.push_str(&" ".repeat(target - column));
        padding
    }

    /// Insert (or replace the selection with) `text` at a caret. Rectangle carets insert at
    /// their active column and keep the block's text.
    fn typed_edit(&self, caret: &Caret, text: &str, rectangular: bool) -> CaretEdit {
        if caret.has_selection() && !rectangular {
            let (start, end) = caret.range();
            return CaretEdit::Replace {
                start,
                end,
                text: text.to_string(),
            };
        }
        CaretEdit::Replace {
            start: caret.position,
            end: caret.position,
            text: format!("{}{text}", self.virtual_padding(caret)),
        }
    }

    /// Type `text` at every caret.
    pub fn apply_typed_text(&mut self, text: &str) -> Result<()> {
        if text.is_empty() {
            return Ok(());
        }
        self.prepare_typing();
        let rectangular = self.carets.is_rectangular();
        self.edit_carets(|engine, _, caret| engine.typed_edit(&caret, text, rectangular))?;
        self.carets.clear_rectangle();
        self.rect_anchor = None;
        self.finish_edit();
        Ok(())
    }

    /// Delete the selection or the grapheme before every caret.
    pub fn apply_backspace(&mut self) -> Result<()> {
        self.delete_at_carets(false)
    }

    /// Delete the selection or the grapheme after every caret.
    pub fn apply_delete(&mut self) -> Result<()> {
        self.delete_at_carets(true)
    }

    fn delete_at_carets(&mut self, forward: bool) -> Result<()> {
        self.prepare_typing();
        let block = self.carets.rectangle().filter(|rect| !rect.is_thin());
        self.edit_carets(|engine, _, caret| {
            if caret.has_selection() {
                let (start, end) = caret.range();
                return CaretEdit::Replace {
                    start,
                    end,
                    text: String::new(),
                };
            }
            if block.is_some() {
                return CaretEdit::Skip;
            }
            if !forward && caret.virtual_space > 0 {
                return CaretEdit::ConsumeVirtualSpace;
            }
            let (start, end) = if forward {
                (caret.position, next_grapheme_offset(&engine.buffer, caret.position))
            } else {
                (prev_grapheme_offset(&engine.buffer, caret.position), caret.position)
            };
            if start == end {
                CaretEdit::Skip
            } else {
                CaretEdit::Replace {
                    start,
                    end,
                    text: String::new(),
                }
            }
        })?;
        self.carets.clear_rectangle();
        self.rect_anchor = None;
        self.finish_edit();
        Ok(())
    }

    /// Paste clipboard text.
    ///
    /// With `multi_paste` on and one clipboard row per caret, rows go to carets in document
    /// order; otherwise every caret receives the whole text.
    pub fn paste(&mut self, text: &str) -> Result<()> {
        let mut rows: Vec<String> = split_terminated(text)
            .into_iter()
            .map(|(row, _)| row.to_string())
            .collect();
        if rows.len() > 1 && (text.ends_with('\n') || text.ends_with('\r')) {
            rows.pop();
        }
        self.paste_rows(&rows, text)
    }

    /// Paste clipboard content that arrives already split into rows.
    pub fn paste_segments(&mut self, segments: &[String]) -> Result<()> {
        let joined = segments.join(self.buffer.default_line_ending().as_str());
        self.paste_rows(segments, &joined)
    }

    fn paste_rows(&mut self, rows: &[String], full: &str) -> Result<()> {
        if full.is_empty() {
            return Ok(());
        }
        self.prepare_typing();
        self.carets.normalize();
        let rectangular = self.carets.is_rectangular();
        let distribute =
            self.config.multi_paste && self.carets.len() > 1 && rows.len() == self.carets.len();
        self.edit_carets(|engine, idx, caret| {
            let piece = if distribute { rows[idx].as_str() } else { full };
            engine.typed_edit(&caret, piece, rectangular)
        })?;
        self.carets.clear_rectangle();
        self.rect_anchor = None;
        self.finish_edit();
        Ok(())
    }

    fn indent_unit(&self) -> String {
        let indent = self.config.effective_indent();
        if indent.use_tabs {
            "\t".to_string()
        } else {
            " ".repeat(indent.width)
        }
    }

    /// Break the line at every caret, carrying the line's indentation over.
    ///
    /// One extra indentation level is added after an opening bracket (or `:` in Python).
    pub fn insert_newline(&mut self) -> Result<()> {
        self.prepare_typing();
        let rectangular = self.carets.is_rectangular();
        let eol = self.buffer.default_line_ending().as_str();
        self.edit_carets(|engine, _, caret| {
            let (start, end) = if caret.has_selection() && !rectangular {
                caret.range()
            } else {
                (caret.position, caret.position)
            };
            let position = engine.buffer.to_position(start);
            let line = engine.buffer.line_text(position.line).unwrap_or_default();
            let before: String = line.chars().take(position.column).collect();
            let indent: String = before.chars().take_while(|c| *c == ' ' || *c == '\t').collect();
            let opens_block = before.trim_end().chars().last().is_some_and(|ch| {
                engine.language.pair_for_open(ch).is_some()
                    || (ch == ':' && engine.language.id == "python")
            });

            let mut text = format!("{eol}{indent}");
            if opens_block {
                text.push_str(&engine.indent_unit());
            }
            CaretEdit::Replace { start, end, text }
        })?;
        self.carets.clear_rectangle();
        self.rect_anchor = None;
        self.finish_edit();
        Ok(())
    }

    /// Insert a tab at every caret: a tab character, or spaces up to the next indent stop.
    pub fn insert_tab(&mut self) -> Result<()> {
        self.prepare_typing();
        let rectangular = self.carets.is_rectangular();
        let indent = self.config.effective_indent();
        self.edit_carets(|engine, _, caret| {
            let text = if indent.use_tabs {
                "\t".to_string()
            } else {
                let column =
                    engine.buffer.to_position(caret.position).column + caret.virtual_space;
                " ".repeat(indent.width - column % indent.width)
            };
            engine.typed_edit(&caret, &text, rectangular)
        })?;
        self.carets.clear_rectangle();
        self.rect_anchor = None;
        self.finish_edit();
        Ok(())
    }

    // ---- folding ------------------------------------------------------------------------------

    /// The fold forest and hidden lines.
    pub fn folding(&self) -> &FoldingEngine {
        &self.folding
    }

    fn fold_settings(&self) -> FoldSettings {
        FoldSettings::from_config(&self.config, &self.language)
    }

    /// Recompute folds with `strategy`, keeping collapsed state per header line.
    pub fn compute_folds(&mut self, strategy: FoldStrategy) {
        if self.tokens.is_stale() {
            self.refresh_tokens();
        }
        let settings = FoldSettings {
            strategy,
            ..self.fold_settings()
        };
        self.folding.compute_folds(&self.buffer, &self.tokens, settings);
        self.notify(StateChangeType::FoldingChanged, Vec::new());
    }

    fn recompute_folds(&mut self) {
        let settings = self.fold_settings();
        self.folding.compute_folds(&self.buffer, &self.tokens, settings);
    }

    /// Start a resumable recomputation (for documents above the synchronous refold limit).
    pub fn start_fold_job(&mut self) -> FoldJob {
        if self.tokens.is_stale() {
            self.refresh_tokens();
        }
        self.folding
            .start_job(&self.buffer, &self.tokens, self.fold_settings())
    }

    /// Install a finished (or finishable) job; rejected if the buffer changed meanwhile.
    pub fn commit_fold_job(&mut self, job: FoldJob) -> Result<()> {
        self.folding.commit_fold_job(job, self.buffer.version())?;
        self.notify(StateChangeType::FoldingChanged, Vec::new());
        Ok(())
    }

    /// Fold regions in header order.
    pub fn fold_regions(&self) -> &[FoldRegion] {
        self.folding.regions()
    }

    /// Toggle the region headed by `header_line`; returns its new collapsed state.
    pub fn toggle_fold(&mut self, header_line: usize) -> Option<bool> {
        let collapsed = self.folding.toggle_fold(header_line)?;
        self.after_fold_change();
        Some(collapsed)
    }

    /// Expand or collapse the region headed by `line`.
    pub fn fold_line(&mut self, line: usize, expand: bool) -> bool {
        let found = self.folding.fold_line(line, expand);
        if found {
            self.after_fold_change();
        }
        found
    }

    /// Collapse every region.
    pub fn fold_all(&mut self) {
        self.folding.fold_all();
        self.after_fold_change();
    }

    /// Expand every region.
    pub fn unfold_all(&mut self) {
        self.folding.unfold_all();
        self.after_fold_change();
    }

    /// Collapse regions with `level >= level`, expand the others.
    pub fn set_fold_level(&mut self, level: usize) {
        self.folding.set_fold_level(level);
        self.after_fold_change();
    }

    /// Expand collapsed regions hiding `line`.
    pub fn ensure_line_visible(&mut self, line: usize) -> bool {
        let changed = self.folding.ensure_line_visible(line);
        if changed {
            self.notify(StateChangeType::FoldingChanged, Vec::new());
        }
        changed
    }

    /// Hide `start..=end` independently of folding.
    pub fn hide_lines(&mut self, start: usize, end: usize) -> bool {
        let changed = self.folding.hide_lines(start, end);
        if changed {
            self.notify(StateChangeType::FoldingChanged, Vec::new());
        }
        changed
    }

    /// Show hidden lines in `range`, or all of them.
    pub fn show_hidden_lines(&mut self, range: Option<RangeInclusive<usize>>) -> bool {
        let changed = self.folding.show_hidden_lines(range);
        if changed {
            self.notify(StateChangeType::FoldingChanged, Vec::new());
        }
        changed
    }

    /// Whether `line` is shown.
    pub fn is_visible(&self, line: usize) -> bool {
        line < self.buffer.line_count() && self.folding.is_visible(line)
    }

    // Carets inside a collapsed region move to its header.
    fn after_fold_change(&mut self) {
        let mut moved = false;
        for idx in 0..self.carets.len() {
            let caret = self.carets.carets()[idx];
            let line = self.buffer.to_position(caret.position).line;
            let Some(header) = self
                .folding
                .regions()
                .iter()
                .filter(|r| r.collapsed && r.hides(line))
                .map(|r| r.header_line)
                .min()
            else {
                continue;
            };
            let target = self
                .buffer
                .to_offset(Position::new(header, self.buffer.line_len(header)));
            if let Some(caret) = self.carets.caret_mut(idx) {
                caret.position = target;
                caret.anchor = None;
                caret.virtual_space = 0;
                moved = true;
            }
        }
        if moved {
            self.carets.normalize();
            self.update_brace_highlight();
        }
        self.notify(StateChangeType::FoldingChanged, Vec::new());
    }

    // ---- margins ------------------------------------------------------------------------------

    /// Margins and markers.
    pub fn margins(&self) -> &MarginSystem {
        &self.margins
    }

    /// Define or replace a margin.
    pub fn define_margin(&mut self, spec: MarginSpec) {
        self.margins.define_margin(spec);
        self.notify(StateChangeType::MarginsChanged, Vec::new());
    }

    /// Set a margin's width in pixels.
    pub fn set_margin_width(&mut self, index: usize, width_px: u32) -> Result<()> {
        self.margins.set_margin_width(index, width_px)?;
        self.notify(StateChangeType::MarginsChanged, Vec::new());
        Ok(())
    }

    /// Make a margin report clicks (or not).
    pub fn set_margin_sensitive(&mut self, index: usize, sensitive: bool) -> Result<()> {
        self.margins.set_margin_sensitive(index, sensitive)?;
        self.notify(StateChangeType::MarginsChanged, Vec::new());
        Ok(())
    }

    /// Set the marker slots a margin displays.
    pub fn set_margin_mask(&mut self, index: usize, mask: u32) -> Result<()> {
        self.margins.set_margin_mask(index, mask)?;
        self.notify(StateChangeType::MarginsChanged, Vec::new());
        Ok(())
    }

    /// Change what a margin paints.
    pub fn set_margin_kind(&mut self, index: usize, kind: MarginKind) -> Result<()> {
        self.margins.set_margin_kind(index, kind)?;
        self.notify(StateChangeType::MarginsChanged, Vec::new());
        Ok(())
    }

    /// Define a marker symbol in the next free slot.
    pub fn define_marker(&mut self, shape: MarkerShape) -> Option<u32> {
        self.config.markers.define(shape)
    }

    /// Definition of marker slot `symbol`.
    pub fn marker_definition(&self, symbol: u32) -> MarkerDefinition {
        self.config.markers.get(symbol)
    }

    fn check_line(&self, line: usize) -> Result<()> {
        let line_count = self.buffer.line_count();
        if line >= line_count {
            return Err(EngineError::LineOutOfRange { line, line_count });
        }
        Ok(())
    }

    /// Put marker `symbol` on `line`.
    pub fn set_marker(&mut self, line: usize, symbol: u32) -> Result<()> {
        self.check_line(line)?;
        self.margins.set_marker(line, symbol)?;
        self.notify(StateChangeType::MarginsChanged, Vec::new());
        Ok(())
    }

    /// Remove marker `symbol` from `line`.
    pub fn clear_marker(&mut self, line: usize, symbol: u32) -> Result<()> {
        self.margins.clear_marker(line, symbol)?;
        self.notify(StateChangeType::MarginsChanged, Vec::new());
        Ok(())
    }

    /// Remove marker `symbol` from every line.
    pub fn clear_marker_everywhere(&mut self, symbol: u32) -> Result<()> {
        self.margins.clear_marker_everywhere(symbol)?;
        self.notify(StateChangeType::MarginsChanged, Vec::new());
        Ok(())
    }

    /// Marker bits on `line` (0 past the end of the document).
    pub fn markers_on_line(&self, line: usize) -> u32 {
        self.margins.markers_on_line(line)
    }

    /// Set or clear the text shown on `line` by `Text` margins.
    pub fn set_margin_text(&mut self, line: usize, text: Option<String>) -> Result<()> {
        self.check_line(line)?;
        self.margins.set_margin_text(line, text);
        self.notify(StateChangeType::MarginsChanged, Vec::new());
        Ok(())
    }

    /// Attach an annotation below `line`; an empty `text` removes it.
    pub fn set_annotation(&mut self, line: usize, text: impl Into<String>) -> Result<()> {
        self.check_line(line)?;
        self.margins.set_annotation(line, text);
        self.notify(StateChangeType::MarginsChanged, Vec::new());
        Ok(())
    }

    /// Remove the annotation of `line`; returns `true` if there was one.
    pub fn clear_annotation(&mut self, line: usize) -> bool {
        let removed = self.margins.clear_annotation(line);
        if removed {
            self.notify(StateChangeType::MarginsChanged, Vec::new());
        }
        removed
    }

    /// Remove every annotation.
    pub fn clear_all_annotations(&mut self) {
        self.margins.clear_all_annotations();
        self.notify(StateChangeType::MarginsChanged, Vec::new());
    }

    /// Annotation of `line`.
    pub fn annotation(&self, line: usize) -> Option<&str> {
        self.margins.annotation(line)
    }

    /// What margin `index` shows on `line`.
    pub fn margin_content(&self, index: usize, line: usize) -> Result<MarginContent> {
        if line >= self.buffer.line_count() {
            self.margins.margin(index).ok_or(EngineError::InvalidMargin(index))?;
            return Ok(MarginContent::Empty);
        }
        self.margins
            .margin_content(index, line, self.folding.fold_marker(line))
    }

    /// Route a click on margin `index` at `line`.
    ///
    /// Insensitive margins ignore clicks entirely. On a sensitive fold margin the click also
    /// toggles the region headed by `line`. The click is reported both as the return value and
    /// as a queued event.
    pub fn click_margin(&mut self, index: usize, line: usize) -> Result<Option<MarginClick>> {
        let spec = *self
            .margins
            .margin(index)
            .ok_or(EngineError::InvalidMargin(index))?;
        if !spec.sensitive || line >= self.buffer.line_count() {
            return Ok(None);
        }
        if spec.kind == MarginKind::Fold
            && let Some(collapsed) = self.folding.toggle_fold(line)
        {
            self.events.push(EngineEvent::FoldToggled {
                header_line: line,
                collapsed,
            });
            self.after_fold_change();
        }
        let click = self.margins.on_margin_click(index, line)?;
        if let Some(click) = click {
            self.events.push(EngineEvent::MarginClicked(click));
        }
        Ok(click)
    }

    // ---- indicators and hotspots --------------------------------------------------------------

    /// Indicator ranges.
    pub fn indicators(&self) -> &IndicatorTable {
        &self.indicators
    }

    fn clamp_range(&self, start: usize, end: usize) -> (usize, usize) {
        let len = self.buffer.len_chars();
        (start.min(len), end.min(len))
    }

    /// Add an indicator over `[start, end)`.
    pub fn add_indicator_range(&mut self, start: usize, end: usize, style_id: StyleId) {
        self.add_indicator_range_with_value(start, end, style_id, 0);
    }

    /// Add an indicator over `[start, end)` carrying `value`.
    pub fn add_indicator_range_with_value(
        &mut self,
        start: usize,
        end: usize,
        style_id: StyleId,
        value: i32,
    ) {
        let (start, end) = self.clamp_range(start, end);
        if start >= end {
            return;
        }
        self.indicators.add_range_with_value(start, end, style_id, value);
        self.notify(StateChangeType::IndicatorsChanged, Vec::new());
    }

    /// Remove the indicator exactly covering `[start, end)` with `style_id`.
    pub fn remove_indicator_range(&mut self, start: usize, end: usize, style_id: StyleId) -> bool {
        let removed = self.indicators.remove_range(start, end, style_id);
        if removed {
            self.notify(StateChangeType::IndicatorsChanged, Vec::new());
        }
        removed
    }

    /// Clear `[start, end)` of `style_id` (or every style), splitting ranges that stick out.
    pub fn clear_indicator_range(&mut self, start: usize, end: usize, style_id: Option<StyleId>) {
        self.indicators.clear_range(start, end, style_id);
        self.notify(StateChangeType::IndicatorsChanged, Vec::new());
    }

    /// Select the style and value used by [`Engine::fill_indicator_range`].
    pub fn set_current_indicator(&mut self, style_id: StyleId, value: i32) {
        self.indicators.set_current(style_id);
        self.indicators.set_current_value(value);
    }

    /// Fill `len` chars at `position` with the current indicator.
    pub fn fill_indicator_range(&mut self, position: usize, len: usize) {
        let (style_id, value) = self.indicators.current();
        self.add_indicator_range_with_value(position, position.saturating_add(len), style_id, value);
    }

    /// Clear `len` chars at `position` of the current indicator.
    pub fn clear_current_indicator_range(&mut self, position: usize, len: usize) {
        self.indicators.clear_current_range(position, len);
        self.notify(StateChangeType::IndicatorsChanged, Vec::new());
    }

    /// Indicators containing `offset`.
    pub fn query_indicators_at(&self, offset: usize) -> Vec<Indicator> {
        self.indicators.query_at(offset).into_iter().cloned().collect()
    }

    /// Indicators overlapping `[start, end)`.
    pub fn query_indicators_in_range(&self, start: usize, end: usize) -> Vec<Indicator> {
        self.indicators
            .query_range(start, end)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Drawing definition of indicator style `style_id`.
    pub fn indicator_definition(&self, style_id: StyleId) -> IndicatorDefinition {
        self.config.indicators.get(style_id)
    }

    /// Hotspots.
    pub fn hotspots(&self) -> &HotspotTable {
        &self.hotspots
    }

    /// Add a hotspot over `[start, end)` reporting `events`.
    pub fn set_hotspot(
        &mut self,
        start: usize,
        end: usize,
        payload: impl Into<String>,
        events: HotspotEvents,
    ) -> Option<HotspotId> {
        let (start, end) = self.clamp_range(start, end);
        let id = self.hotspots.set_hotspot(start, end, payload, events)?;
        self.notify(StateChangeType::IndicatorsChanged, Vec::new());
        Some(id)
    }

    /// Remove a hotspot.
    pub fn remove_hotspot(&mut self, id: HotspotId) -> bool {
        let removed = self.hotspots.remove(id);
        if removed {
            self.notify(StateChangeType::IndicatorsChanged, Vec::new());
        }
        removed
    }

    /// Pointer moved to `offset` (`None` when it is over no text).
    pub fn pointer_moved(&mut self, offset: Option<usize>) {
        for (indicator, transition) in self.indicators.update_hover(offset) {
            let Indicator {
                start,
                end,
                style_id,
                value,
                ..
            } = indicator;
            self.events.push(match transition {
                HoverTransition::Enter => EngineEvent::IndicatorHoverEnter {
                    style_id,
                    value,
                    start,
                    end,
                },
                HoverTransition::Exit => EngineEvent::IndicatorHoverExit {
                    style_id,
                    value,
                    start,
                    end,
                },
            });
        }
        for (hotspot, transition) in self.hotspots.update_hover(offset) {
            match transition {
                HoverTransition::Enter if hotspot.events.on_hover_enter => {
                    self.events.push(EngineEvent::HotspotHoverEnter {
                        id: hotspot.id,
                        payload: hotspot.payload,
                    });
                }
                HoverTransition::Exit if hotspot.events.on_hover_exit => {
                    self.events.push(EngineEvent::HotspotHoverExit {
                        id: hotspot.id,
                        payload: hotspot.payload,
                    });
                }
                _ => {}
            }
        }
    }

    /// Pointer left the text area.
    pub fn pointer_left(&mut self) {
        self.pointer_moved(None);
    }

    /// Click at `offset`.
    pub fn pointer_clicked(&mut self, offset: usize) {
        self.pointer_moved(Some(offset));
        if let Some(hotspot) = self
            .hotspots
            .hotspot_at(offset)
            .filter(|h| h.events.on_click)
            .cloned()
        {
            self.events.push(EngineEvent::HotspotClick {
                id: hotspot.id,
                payload: hotspot.payload,
                offset,
            });
        }
        for indicator in self.query_indicators_at(offset) {
            self.events.push(EngineEvent::IndicatorClick {
                style_id: indicator.style_id,
                value: indicator.value,
                offset,
            });
        }
    }

    /// Take every queued event.
    pub fn drain_events(&mut self) -> Vec<EngineEvent> {
        self.events.drain()
    }

    // ---- brace matching -----------------------------------------------------------------------

    /// Bracket pair around a caret at `offset`, as `(open, close)`.
    pub fn match_brace_at(&self, offset: usize) -> Option<(usize, usize)> {
        brace::match_brace_at(&self.buffer, &self.tokens, &self.language.brackets, offset)
    }

    /// Recompute the brace highlight for the primary caret.
    pub fn update_brace_highlight(&mut self) -> Option<BraceHighlight> {
        let caret = self.carets.primary();
        self.brace_highlight = if caret.has_selection() {
            None
        } else {
            brace::brace_highlight(
                &self.buffer,
                &self.tokens,
                &self.language.brackets,
                caret.position,
            )
        };
        self.brace_highlight
    }

    /// Last computed brace highlight.
    pub fn brace_highlight(&self) -> Option<BraceHighlight> {
        self.brace_highlight
    }
}
