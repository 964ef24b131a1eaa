//! Fold regions and line visibility.
//!
//! Two independent sources hide lines:
//! - collapsed [`FoldRegion`]s (everything after the header up to `last_child_line`)
//! - the explicit [`HiddenLineSet`]
//!
//! A line is visible iff neither hides it. Both are kept in line coordinates and remapped by every
//! edit delta. Region *recomputation* is a separate, resumable [`FoldJob`] over a rope snapshot,
//! committed in one step so queries never see a half-built forest.

use crate::buffer::LineBuffer;
use crate::config::{EngineConfig, FoldStrategy};
use crate::delta::{EditDelta, RemapConsumer};
use crate::error::{EngineError, Result};
use crate::margins::FoldMarker;
use crate::tokens::TokenRanges;
use editor_engine_lang::{BracketPair, LanguageConfig};
use ropey::Rope;
use std::collections::{BTreeMap, BTreeSet};
use std::ops::RangeInclusive;

/// A collapsible line range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FoldRegion {
    /// Line that stays visible when collapsed.
    pub header_line: usize,
    /// Last line hidden when collapsed (inclusive).
    pub last_child_line: usize,
    /// Nesting depth in the fold forest, starting at 1 for top-level regions.
    pub level: usize,
    /// Whether the region is collapsed.
    pub collapsed: bool,
}

impl FoldRegion {
    /// Expanded region.
    pub fn new(header_line: usize, last_child_line: usize, level: usize) -> Self {
        Self {
            header_line,
            last_child_line,
            level,
            collapsed: false,
        }
    }

    /// Returns `true` if collapsing this region hides `line`.
    pub fn hides(&self, line: usize) -> bool {
        line > self.header_line && line <= self.last_child_line
    }

    /// Returns `true` if `line` lies in `header_line..=last_child_line`.
    pub fn contains_line(&self, line: usize) -> bool {
        line >= self.header_line && line <= self.last_child_line
    }
}

/// Lines hidden independently of folding.
pub type HiddenLineSet = BTreeSet<usize>;

/// Inputs for fold computation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoldSettings {
    /// Which strategy to run.
    pub strategy: FoldStrategy,
    /// Tab stop width used when measuring indentation.
    pub tab_width: usize,
    /// Bracket pairs that open regions.
    pub fold_brackets: Vec<BracketPair>,
    /// Lines processed per job step.
    pub batch_lines: usize,
}

impl FoldSettings {
    /// Settings for `language` under `config`.
    pub fn from_config(config: &EngineConfig, language: &LanguageConfig) -> Self {
        Self {
            strategy: config.fold_strategy,
            tab_width: config.tab_width.max(1),
            fold_brackets: language.fold_brackets.clone(),
            batch_lines: config.fold_batch_lines.max(1),
        }
    }
}

impl Default for FoldSettings {
    fn default() -> Self {
        Self {
            strategy: FoldStrategy::Combined,
            tab_width: 4,
            fold_brackets: vec![BracketPair::new('{', '}')],
            batch_lines: 2_000,
        }
    }
}

#[derive(Debug, Clone, Default)]
struct IndentScan {
    prev: Option<(usize, usize)>,
    stack: Vec<(usize, usize)>,
    regions: Vec<FoldRegion>,
}

impl IndentScan {
    fn push_line(&mut self, line: usize, indent: usize) {
        if let Some((prev_line, prev_indent)) = self.prev {
            while let Some(&(header, header_indent)) = self.stack.last() {
                if indent > header_indent {
                    break;
                }
                self.stack.pop();
                self.close(header, prev_line);
            }
            if indent > prev_indent {
                self.stack.push((prev_line, prev_indent));
            }
        }
        self.prev = Some((line, indent));
    }

    fn finish(&mut self) {
        let Some((last_line, _)) = self.prev else {
            return;
        };
        while let Some((header, _)) = self.stack.pop() {
            self.close(header, last_line);
        }
    }

    fn close(&mut self, header: usize, last: usize) {
        if last > header {
            self.regions.push(FoldRegion::new(header, last, 1));
        }
    }
}

#[derive(Debug, Clone, Default)]
struct BracketScan {
    stack: Vec<(char, usize)>,
    regions: BTreeMap<usize, FoldRegion>,
}

impl BracketScan {
    fn open(&mut self, close: char, line: usize) {
        self.stack.push((close, line));
    }

    fn close(&mut self, ch: char, line: usize) {
        // Unbalanced closers are skipped; a mismatched one unwinds to its opener if there is one.
        let Some(depth) = self.stack.iter().rposition(|(close, _)| *close == ch) else {
            return;
        };
        let (_, header) = self.stack[depth];
        self.stack.truncate(depth);
        if line <= header {
            return;
        }
        let candidate = FoldRegion::new(header, line, depth + 1);
        match self.regions.get(&header) {
            Some(existing) if existing.last_child_line >= line => {}
            _ => {
                self.regions.insert(header, candidate);
            }
        }
    }
}

/// Resumable fold computation over a snapshot of the document.
///
/// The job owns a rope snapshot and the token ranges it was started with, so it never borrows the
/// engine. Drive it with [`FoldJob::step`] or [`FoldJob::run`], then hand it to
/// [`FoldingEngine::commit_fold_job`].
#[derive(Debug, Clone)]
pub struct FoldJob {
    rope: Rope,
    tokens: TokenRanges,
    settings: FoldSettings,
    version: u64,
    next_line: usize,
    indent: IndentScan,
    brackets: BracketScan,
    result: Option<Vec<FoldRegion>>,
}

impl FoldJob {
    /// Snapshot `buffer` for a new computation.
    pub fn new(buffer: &LineBuffer, tokens: &TokenRanges, settings: FoldSettings) -> Self {
        Self {
            rope: buffer.index().rope().clone(),
            tokens: tokens.clone(),
            settings,
            version: buffer.version(),
            next_line: 0,
            indent: IndentScan::default(),
            brackets: BracketScan::default(),
            result: None,
        }
    }

    /// Buffer version the snapshot was taken at.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// `(lines processed, total lines)`.
    pub fn progress(&self) -> (usize, usize) {
        (self.next_line, self.rope.len_lines())
    }

    /// Returns `true` once every line has been processed.
    pub fn is_finished(&self) -> bool {
        self.result.is_some()
    }

    /// Process one batch. Returns `true` when the job is finished.
    pub fn step(&mut self) -> bool {
        if self.result.is_some() {
            return true;
        }
        let total = self.rope.len_lines();
        let end = (self.next_line + self.settings.batch_lines).min(total);
        for line in self.next_line..end {
            self.scan_line(line);
        }
        self.next_line = end;
        tracing::trace!(processed = end, total, "fold job step");
        if end >= total {
            self.finish();
            return true;
        }
        false
    }

    /// Run batches until finished or `should_cancel` returns `true`; it is polled before each
    /// batch. Returns `true` if the job finished.
    pub fn run(&mut self, mut should_cancel: impl FnMut() -> bool) -> bool {
        while !self.is_finished() {
            if should_cancel() {
                tracing::debug!(processed = self.next_line, "fold job cancelled");
                return false;
            }
            self.step();
        }
        true
    }

    fn uses_indentation(&self) -> bool {
        matches!(self.settings.strategy, FoldStrategy::Indentation | FoldStrategy::Combined)
    }

    fn uses_brackets(&self) -> bool {
        matches!(self.settings.strategy, FoldStrategy::BracketPairs | FoldStrategy::Combined)
    }

    fn scan_line(&mut self, line: usize) {
        let slice = self.rope.line(line);
        let line_start = self.rope.line_to_char(line);

        if self.uses_indentation() {
            let tab = self.settings.tab_width;
            let mut indent = 0usize;
            let mut blank = true;
            for ch in slice.chars() {
                match ch {
                    ' ' => indent += 1,
                    '\t' => indent = (indent / tab + 1) * tab,
                    '\n' | '\r' => break,
                    c if c.is_whitespace() => indent += 1,
                    _ => {
                        blank = false;
                        break;
                    }
                }
            }
            if !blank {
                self.indent.push_line(line, indent);
            }
        }

        if self.uses_brackets() {
            for (column, ch) in slice.chars().enumerate() {
                if ch == '\n' {
                    break;
                }
                let is_open = self.settings.fold_brackets.iter().find(|p| p.open == ch);
                let is_close = self.settings.fold_brackets.iter().any(|p| p.close == ch);
                if is_open.is_none() && !is_close {
                    continue;
                }
                if self.tokens.is_ignored(line_start + column) {
                    continue;
                }
                match is_open {
                    Some(pair) => self.brackets.open(pair.close, line),
                    None => self.brackets.close(ch, line),
                }
            }
        }
    }

    fn finish(&mut self) {
        self.indent.finish();
        let mut by_header: BTreeMap<usize, FoldRegion> = BTreeMap::new();
        for region in std::mem::take(&mut self.indent.regions) {
            by_header.insert(region.header_line, region);
        }
        for (header, region) in std::mem::take(&mut self.brackets.regions) {
            match by_header.get_mut(&header) {
                Some(existing) => {
                    if region.last_child_line > existing.last_child_line {
                        existing.last_child_line = region.last_child_line;
                    }
                }
                None => {
                    by_header.insert(header, region);
                }
            }
        }
        let mut regions: Vec<FoldRegion> = by_header.into_values().collect();
        normalize_forest(&mut regions);
        self.result = Some(regions);
    }
}

/// Turn `regions` into a proper forest sorted by header line.
///
/// At most one region per header survives (the widest). A region that starts inside another but
/// ends after it makes the earlier region end on the line before the later header; regions that
/// shrink to a single line are dropped. Levels are then reassigned from nesting depth.
pub fn normalize_forest(regions: &mut Vec<FoldRegion>) {
    regions.retain(|r| r.last_child_line > r.header_line);
    regions.sort_by(|a, b| {
        a.header_line
            .cmp(&b.header_line)
            .then(b.last_child_line.cmp(&a.last_child_line))
    });
    regions.dedup_by_key(|r| r.header_line);

    let mut open: Vec<usize> = Vec::new();
    for idx in 0..regions.len() {
        let current = regions[idx];
        while let Some(&top) = open.last() {
            let parent = regions[top];
            if parent.last_child_line < current.header_line {
                open.pop();
            } else if parent.last_child_line < current.last_child_line {
                regions[top].last_child_line = current.header_line - 1;
                open.pop();
            } else {
                break;
            }
        }
        open.push(idx);
    }
    regions.retain(|r| r.last_child_line > r.header_line);

    let mut enclosing: Vec<usize> = Vec::new();
    for region in regions.iter_mut() {
        while enclosing.last().is_some_and(|&end| end < region.header_line) {
            enclosing.pop();
        }
        region.level = enclosing.len() + 1;
        enclosing.push(region.last_child_line);
    }
}

/// Fold forest plus hidden lines for one document.
#[derive(Debug, Clone, Default)]
pub struct FoldingEngine {
    regions: Vec<FoldRegion>,
    hidden: HiddenLineSet,
    // Disjoint, sorted inclusive ranges of invisible lines, with the count hidden before each.
    invisible: Vec<(usize, usize, usize)>,
    line_count: usize,
    dirty: bool,
}

impl FoldingEngine {
    /// Empty engine for a document of `line_count` lines.
    pub fn new(line_count: usize) -> Self {
        Self {
            line_count: line_count.max(1),
            ..Self::default()
        }
    }

    /// Compute regions for `buffer` synchronously and install them.
    pub fn compute_folds(
        &mut self,
        buffer: &LineBuffer,
        tokens: &TokenRanges,
        settings: FoldSettings,
    ) {
        let mut job = FoldJob::new(buffer, tokens, settings);
        job.run(|| false);
        self.install(job);
    }

    /// Start a resumable recomputation of `buffer`.
    pub fn start_job(&self, buffer: &LineBuffer, tokens: &TokenRanges, settings: FoldSettings) -> FoldJob {
        FoldJob::new(buffer, tokens, settings)
    }

    /// Finish `job` if needed and install its regions.
    ///
    /// Fails with [`EngineError::StaleFoldJob`] if the buffer changed since the job started; the
    /// current regions are left untouched.
    pub fn commit_fold_job(&mut self, mut job: FoldJob, buffer_version: u64) -> Result<()> {
        if job.version != buffer_version {
            return Err(EngineError::StaleFoldJob {
                job_version: job.version,
                buffer_version,
            });
        }
        job.run(|| false);
        self.install(job);
        Ok(())
    }

    fn install(&mut self, job: FoldJob) {
        let collapsed: BTreeSet<usize> = self.collapsed_headers().collect();
        let mut regions = job.result.unwrap_or_default();
        for region in &mut regions {
            region.collapsed = collapsed.contains(&region.header_line);
        }
        self.line_count = job.rope.len_lines().max(1);
        self.regions = regions;
        self.dirty = false;
        self.rebuild_invisible();
        tracing::debug!(
            regions = self.regions.len(),
            version = job.version,
            "fold regions committed"
        );
    }

    /// Drop every region (hidden lines are kept).
    pub fn clear_regions(&mut self) {
        self.regions.clear();
        self.dirty = false;
        self.rebuild_invisible();
    }

    /// Returns `true` if edits happened since the last recomputation.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Regions in header order.
    pub fn regions(&self) -> &[FoldRegion] {
        &self.regions
    }

    /// Region whose header is `line`.
    pub fn region_at(&self, line: usize) -> Option<&FoldRegion> {
        self.regions
            .binary_search_by_key(&line, |r| r.header_line)
            .ok()
            .map(|idx| &self.regions[idx])
    }

    fn region_at_mut(&mut self, line: usize) -> Option<&mut FoldRegion> {
        self.regions
            .binary_search_by_key(&line, |r| r.header_line)
            .ok()
            .map(|idx| &mut self.regions[idx])
    }

    /// Header lines of collapsed regions.
    pub fn collapsed_headers(&self) -> impl Iterator<Item = usize> + '_ {
        self.regions.iter().filter(|r| r.collapsed).map(|r| r.header_line)
    }

    /// Explicitly hidden lines.
    pub fn hidden_lines(&self) -> &HiddenLineSet {
        &self.hidden
    }

    /// Toggle the region headed by `header_line`. Returns the new collapsed state.
    ///
    /// Nested regions keep their own state.
    pub fn toggle_fold(&mut self, header_line: usize) -> Option<bool> {
        let region = self.region_at_mut(header_line)?;
        region.collapsed = !region.collapsed;
        let collapsed = region.collapsed;
        self.rebuild_invisible();
        Some(collapsed)
    }

    /// Expand (`expand = true`) or collapse the region headed by `line`.
    /// Returns `false` if there is no such region.
    pub fn fold_line(&mut self, line: usize, expand: bool) -> bool {
        let Some(region) = self.region_at_mut(line) else {
            return false;
        };
        if region.collapsed == !expand {
            return true;
        }
        region.collapsed = !expand;
        self.rebuild_invisible();
        true
    }

    /// Collapse every region.
    pub fn fold_all(&mut self) {
        self.set_all(true);
    }

    /// Expand every region.
    pub fn unfold_all(&mut self) {
        self.set_all(false);
    }

    fn set_all(&mut self, collapsed: bool) {
        for region in &mut self.regions {
            region.collapsed = collapsed;
        }
        self.rebuild_invisible();
    }

    /// Collapse every region with `level >= level`, expand the rest.
    pub fn set_fold_level(&mut self, level: usize) {
        for region in &mut self.regions {
            region.collapsed = region.level >= level;
        }
        self.rebuild_invisible();
    }

    /// Expand collapsed regions hiding `line`. Hidden lines stay hidden.
    /// Returns `true` if anything was expanded.
    pub fn ensure_line_visible(&mut self, line: usize) -> bool {
        let mut changed = false;
        for region in self.regions.iter_mut().take_while(|r| r.header_line < line) {
            if region.collapsed && region.hides(line) {
                region.collapsed = false;
                changed = true;
            }
        }
        if changed {
            self.rebuild_invisible();
        }
        changed
    }

    /// Chevron state for `line`.
    pub fn fold_marker(&self, line: usize) -> FoldMarker {
        match self.region_at(line) {
            Some(region) if region.collapsed => FoldMarker::Collapsed,
            Some(_) => FoldMarker::Expanded,
            None => FoldMarker::None,
        }
    }

    /// Hide lines in `start..=end` (either order). Hiding hidden lines is a no-op.
    pub fn hide_lines(&mut self, start: usize, end: usize) -> bool {
        let (lo, hi) = (start.min(end), start.max(end));
        let hi = hi.min(self.line_count.saturating_sub(1));
        let before = self.hidden.len();
        self.hidden.extend(lo..=hi);
        let changed = self.hidden.len() != before;
        if changed {
            self.rebuild_invisible();
        }
        changed
    }

    /// Show hidden lines in `range`, or all of them for `None`. Fold state is untouched.
    pub fn show_hidden_lines(&mut self, range: Option<RangeInclusive<usize>>) -> bool {
        let before = self.hidden.len();
        match range {
            Some(range) => self.hidden.retain(|line| !range.contains(line)),
            None => self.hidden.clear(),
        }
        let changed = self.hidden.len() != before;
        if changed {
            self.rebuild_invisible();
        }
        changed
    }

    /// Returns `true` unless `line` is hidden or inside a collapsed region.
    pub fn is_visible(&self, line: usize) -> bool {
        let idx = self.invisible.partition_point(|&(_, end, _)| end < line);
        !matches!(self.invisible.get(idx), Some(&(start, _, _)) if start <= line)
    }

    /// Display row of `line`, or `None` if it is not visible.
    pub fn line_to_display(&self, line: usize) -> Option<usize> {
        if line >= self.line_count {
            return None;
        }
        let idx = self.invisible.partition_point(|&(_, end, _)| end < line);
        match self.invisible.get(idx) {
            Some(&(start, _, _)) if start <= line => None,
            Some(&(_, _, hidden_before)) => Some(line - hidden_before),
            None => Some(line - self.hidden_total()),
        }
    }

    /// Document line shown at display row `row`.
    pub fn display_to_line(&self, row: usize) -> Option<usize> {
        let mut line = row;
        for &(start, end, _) in &self.invisible {
            if start > line {
                break;
            }
            line += end - start + 1;
        }
        (line < self.line_count).then_some(line)
    }

    /// Number of visible lines.
    pub fn display_line_count(&self) -> usize {
        self.line_count - self.hidden_total().min(self.line_count)
    }

    /// Line count this engine currently tracks.
    pub fn line_count(&self) -> usize {
        self.line_count
    }

    fn hidden_total(&self) -> usize {
        self.invisible
            .last()
            .map(|&(start, end, before)| before + end - start + 1)
            .unwrap_or(0)
    }

    fn rebuild_invisible(&mut self) {
        let mut spans: Vec<(usize, usize)> = self
            .regions
            .iter()
            .filter(|r| r.collapsed)
            .map(|r| (r.header_line + 1, r.last_child_line))
            .collect();
        spans.extend(self.hidden.iter().map(|&line| (line, line)));
        spans.sort_unstable();

        self.invisible.clear();
        let mut hidden_before = 0;
        let mut current: Option<(usize, usize)> = None;
        for (start, end) in spans {
            match current {
                Some((cs, ce)) if start <= ce + 1 => current = Some((cs, ce.max(end))),
                Some((cs, ce)) => {
                    self.invisible.push((cs, ce, hidden_before));
                    hidden_before += ce - cs + 1;
                    current = Some((start, end));
                }
                None => current = Some((start, end)),
            }
        }
        if let Some((cs, ce)) = current {
            self.invisible.push((cs, ce, hidden_before));
        }
    }
}

impl RemapConsumer for FoldingEngine {
    fn apply_delta(&mut self, delta: &EditDelta) {
        let line_count = self.line_count as isize + delta.line_delta();
        self.line_count = line_count.max(1) as usize;
        self.dirty = true;

        if delta.removed_breaks() == 0 && delta.inserted_breaks() == 0 {
            return;
        }

        for region in &mut self.regions {
            region.header_line = delta.remap_line_clamped(region.header_line);
            region.last_child_line = delta.remap_line_clamped(region.last_child_line);
        }
        normalize_forest(&mut self.regions);

        self.hidden = std::mem::take(&mut self.hidden)
            .into_iter()
            .filter_map(|line| delta.remap_line(line))
            .collect();
        self.rebuild_invisible();
        tracing::trace!(regions = self.regions.len(), hidden = self.hidden.len(), "folds remapped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::EditRequest;
    use crate::position::Position;
    use crate::tokens::{LiteralScanner, TokenProvider};
    use pretty_assertions::assert_eq;

    fn computed(text: &str, strategy: FoldStrategy) -> (LineBuffer, FoldingEngine) {
        let buffer = LineBuffer::from_text(text);
        let mut folding = FoldingEngine::new(buffer.line_count());
        let settings = FoldSettings {
            strategy,
            ..FoldSettings::default()
        };
        folding.compute_folds(&buffer, &TokenRanges::new(), settings);
        (buffer, folding)
    }

    fn spans(folding: &FoldingEngine) -> Vec<(usize, usize, usize)> {
        folding
            .regions()
            .iter()
            .map(|r| (r.header_line, r.last_child_line, r.level))
            .collect()
    }

    #[test]
    fn test_indentation_region() {
        let (_, mut folding) = computed("def f():\n    x = 1\n    y = 2\nreturn", FoldStrategy::Indentation);
        assert_eq!(spans(&folding), vec![(0, 2, 1)]);

        folding.toggle_fold(0);
        assert!(folding.is_visible(0));
        assert!(!folding.is_visible(1));
        assert!(!folding.is_visible(2));
        assert!(folding.is_visible(3));
    }

    #[test]
    fn test_indentation_skips_blank_lines() {
        let text = "class A:\n\n    def f(self):\n        pass\n\n    def g(self):\n        pass\n\nx = 1";
        let (_, folding) = computed(text, FoldStrategy::Indentation);
        assert_eq!(spans(&folding), vec![(0, 6, 1), (2, 3, 2), (5, 6, 2)]);
    }

    #[test]
    fn test_bracket_regions_ignore_literals() {
        let text = "fn main() {\n    let s = \"{\";\n    if x {\n        y();\n    }\n}";
        let buffer = LineBuffer::from_text(text);
        let mut tokens = TokenRanges::new();
        tokens.set(LiteralScanner::new(LanguageConfig::rust()).tokenize(&buffer.text()));

        let mut folding = FoldingEngine::new(buffer.line_count());
        let settings = FoldSettings {
            strategy: FoldStrategy::BracketPairs,
            ..FoldSettings::default()
        };
        folding.compute_folds(&buffer, &tokens, settings);
        assert_eq!(spans(&folding), vec![(0, 5, 1), (2, 4, 2)]);
    }

    #[test]
    fn test_else_overlap_is_normalized() {
        let text = "if a {\n    b();\n} else {\n    c();\n}";
        let (_, folding) = computed(text, FoldStrategy::BracketPairs);
        assert_eq!(spans(&folding), vec![(0, 1, 1), (2, 4, 1)]);
    }

    #[test]
    fn test_combined_keeps_larger_extent() {
        let text = "function f() {\n  a();\n}\nnext();";
        let (_, folding) = computed(text, FoldStrategy::Combined);
        assert_eq!(spans(&folding), vec![(0, 2, 1)]);
    }

    #[test]
    fn test_toggle_is_sticky_per_region() {
        let text = "a:\n    b:\n        c\n    d\ne";
        let (_, mut folding) = computed(text, FoldStrategy::Indentation);
        assert_eq!(spans(&folding), vec![(0, 3, 1), (1, 2, 2)]);

        folding.toggle_fold(1);
        folding.toggle_fold(0);
        assert!(!folding.is_visible(1));
        folding.toggle_fold(0);
        assert!(folding.is_visible(1));
        assert!(!folding.is_visible(2));
        assert_eq!(folding.fold_marker(1), FoldMarker::Collapsed);
        assert_eq!(folding.fold_marker(0), FoldMarker::Expanded);
        assert_eq!(folding.fold_marker(4), FoldMarker::None);
    }

    #[test]
    fn test_set_fold_level() {
        let text = "a:\n    b:\n        c\n    d\ne";
        let (_, mut folding) = computed(text, FoldStrategy::Indentation);
        folding.set_fold_level(2);
        assert_eq!(folding.collapsed_headers().collect::<Vec<_>>(), vec![1]);
        folding.set_fold_level(1);
        assert_eq!(folding.collapsed_headers().collect::<Vec<_>>(), vec![0, 1]);
        folding.unfold_all();
        assert_eq!(folding.collapsed_headers().count(), 0);
    }

    #[test]
    fn test_hidden_lines_are_orthogonal() {
        let (_, mut folding) = computed("def f():\n    x = 1\n    y = 2\nreturn", FoldStrategy::Indentation);
        assert!(folding.hide_lines(3, 3));
        assert!(!folding.hide_lines(3, 3));
        folding.fold_all();
        folding.unfold_all();
        assert!(!folding.is_visible(3));
        assert!(folding.show_hidden_lines(None));
        assert!(folding.is_visible(3));
    }

    #[test]
    fn test_display_mapping() {
        let text = "a\nb\nc\nd\ne\nf\ng";
        let (_, mut folding) = computed(text, FoldStrategy::Indentation);
        folding.hide_lines(1, 2);
        folding.hide_lines(5, 5);
        assert_eq!(folding.display_line_count(), 4);
        assert_eq!(folding.line_to_display(0), Some(0));
        assert_eq!(folding.line_to_display(1), None);
        assert_eq!(folding.line_to_display(3), Some(1));
        assert_eq!(folding.line_to_display(6), Some(3));
        assert_eq!(folding.display_to_line(1), Some(3));
        assert_eq!(folding.display_to_line(3), Some(6));
        assert_eq!(folding.display_to_line(4), None);
    }

    #[test]
    fn test_remap_moves_regions_and_hidden_lines() {
        let (mut buffer, mut folding) =
            computed("x\ndef f():\n    a\n    b\ny", FoldStrategy::Indentation);
        folding.toggle_fold(1);
        folding.hide_lines(4, 4);

        buffer
            .apply_edit_with(EditRequest::insert(0, "new\n"), &mut [&mut folding])
            .unwrap();
        assert_eq!(spans(&folding), vec![(2, 4, 1)]);
        assert!(folding.region_at(2).is_some_and(|r| r.collapsed));
        assert!(folding.hidden_lines().contains(&5));
        assert!(folding.is_dirty());
    }

    #[test]
    fn test_recompute_preserves_collapsed_state() {
        let (mut buffer, mut folding) =
            computed("def f():\n    x = 1\nreturn", FoldStrategy::Indentation);
        folding.toggle_fold(0);
        buffer
            .apply_edit_with(EditRequest::insert(Position::new(1, 9), "\n    y = 2"), &mut [&mut folding])
            .unwrap();
        folding.compute_folds(&buffer, &TokenRanges::new(), FoldSettings::default());
        assert_eq!(folding.region_at(0).map(|r| (r.last_child_line, r.collapsed)), Some((2, true)));
    }

    #[test]
    fn test_stale_job_is_rejected() {
        let (mut buffer, mut folding) = computed("a {\n}\n", FoldStrategy::BracketPairs);
        let job = folding.start_job(&buffer, &TokenRanges::new(), FoldSettings::default());
        buffer
            .apply_edit_with(EditRequest::insert(0, "b\n"), &mut [&mut folding])
            .unwrap();
        let before = folding.regions().to_vec();
        let err = folding.commit_fold_job(job, buffer.version()).unwrap_err();
        assert!(matches!(err, EngineError::StaleFoldJob { .. }));
        assert_eq!(folding.regions(), before.as_slice());
    }

    #[test]
    fn test_job_batches_and_cancellation() {
        let text = (0..10).map(|i| format!("f{i} {{\n}}")).collect::<Vec<_>>().join("\n");
        let buffer = LineBuffer::from_text(&text);
        let mut folding = FoldingEngine::new(buffer.line_count());
        let settings = FoldSettings {
            strategy: FoldStrategy::BracketPairs,
            batch_lines: 4,
            ..FoldSettings::default()
        };
        let mut job = folding.start_job(&buffer, &TokenRanges::new(), settings);
        let mut polls = 0;
        assert!(!job.run(|| {
            polls += 1;
            polls > 2
        }));
        assert_eq!(job.progress(), (8, 20));
        assert!(job.run(|| false));
        folding.commit_fold_job(job, buffer.version()).unwrap();
        assert_eq!(folding.regions().len(), 10);
    }
}
