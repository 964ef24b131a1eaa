//! Margins and per-line markers.
//!
//! Markers are stored sparsely as a 32-bit mask per line. Margins are plain specs keyed by index;
//! each margin renders its own content from its kind and the shared per-line state. Annotations
//! are free-text notes painted below a line; like markers they stay with their line across edits
//! and vanish with it.

use crate::delta::{EditDelta, RemapConsumer};
use crate::error::{EngineError, Result};
use std::collections::BTreeMap;

/// Number of marker symbol slots per line.
pub const MARKER_SLOTS: u32 = 32;

/// Marker slots conventionally reserved for fold chevrons (25..=31).
pub const MASK_FOLDERS: u32 = 0xFE00_0000;

/// What a margin paints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarginKind {
    /// Marker symbols filtered by the margin mask.
    Symbol,
    /// Line numbers.
    Number,
    /// Per-line text.
    Text,
    /// Fold chevrons.
    Fold,
}

/// Margin definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarginSpec {
    /// Margin index (left to right).
    pub index: usize,
    /// Content kind.
    pub kind: MarginKind,
    /// Width in pixels; 0 hides the margin.
    pub width_px: u32,
    /// Marker slots this margin displays.
    pub mask: u32,
    /// Whether clicks produce events.
    pub sensitive: bool,
}

impl MarginSpec {
    /// A margin with the usual mask for its kind.
    pub fn new(index: usize, kind: MarginKind, width_px: u32) -> Self {
        let mask = match kind {
            MarginKind::Fold => MASK_FOLDERS,
            MarginKind::Symbol => !MASK_FOLDERS,
            MarginKind::Number | MarginKind::Text => 0,
        };
        Self {
            index,
            kind,
            width_px,
            mask,
            sensitive: false,
        }
    }

    /// Builder-style sensitivity.
    pub fn sensitive(mut self, sensitive: bool) -> Self {
        self.sensitive = sensitive;
        self
    }
}

/// Fold chevron state of a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FoldMarker {
    /// Header of an expanded region.
    Expanded,
    /// Header of a collapsed region.
    Collapsed,
    /// Not a fold header.
    None,
}

/// Rendered content of one margin cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarginContent {
    /// Masked marker bits (Symbol margins).
    Markers(u32),
    /// 1-based line number (Number margins).
    LineNumber(usize),
    /// Per-line text (Text margins).
    Text(String),
    /// Fold chevron (Fold margins).
    Fold(FoldMarker),
    /// Nothing to paint.
    Empty,
}

/// A sensitive margin was clicked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarginClick {
    /// Margin index.
    pub margin: usize,
    /// Clicked line.
    pub line: usize,
    /// Margin kind.
    pub kind: MarginKind,
    /// Markers on the clicked line.
    pub markers: u32,
}

/// Margins, markers, margin text and annotations of one document.
#[derive(Debug, Clone, Default)]
pub struct MarginSystem {
    margins: BTreeMap<usize, MarginSpec>,
    markers: BTreeMap<usize, u32>,
    text: BTreeMap<usize, String>,
    annotations: BTreeMap<usize, String>,
}

impl MarginSystem {
    /// No margins, no markers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Define (or redefine) a margin.
    pub fn define_margin(&mut self, spec: MarginSpec) {
        tracing::debug!(index = spec.index, kind = ?spec.kind, "margin defined");
        self.margins.insert(spec.index, spec);
    }

    /// Margin by index.
    pub fn margin(&self, index: usize) -> Option<&MarginSpec> {
        self.margins.get(&index)
    }

    /// All margins in index order.
    pub fn margins(&self) -> impl Iterator<Item = &MarginSpec> {
        self.margins.values()
    }

    fn margin_mut(&mut self, index: usize) -> Result<&mut MarginSpec> {
        self.margins
            .get_mut(&index)
            .ok_or(EngineError::InvalidMargin(index))
    }

    /// Set a margin's width.
    pub fn set_margin_width(&mut self, index: usize, width_px: u32) -> Result<()> {
        self.margin_mut(index)?.width_px = width_px;
        Ok(())
    }

    /// Set a margin's click sensitivity.
    pub fn set_margin_sensitive(&mut self, index: usize, sensitive: bool) -> Result<()> {
        self.margin_mut(index)?.sensitive = sensitive;
        Ok(())
    }

    /// Set a margin's marker mask.
    pub fn set_margin_mask(&mut self, index: usize, mask: u32) -> Result<()> {
        self.margin_mut(index)?.mask = mask;
        Ok(())
    }

    /// Change a margin's kind.
    pub fn set_margin_kind(&mut self, index: usize, kind: MarginKind) -> Result<()> {
        self.margin_mut(index)?.kind = kind;
        Ok(())
    }

    /// Sum of all margin widths.
    pub fn total_width(&self) -> u32 {
        self.margins.values().map(|m| m.width_px).sum()
    }

    /// Set marker `symbol` on `line`.
    pub fn set_marker(&mut self, line: usize, symbol: u32) -> Result<()> {
        let bit = marker_bit(symbol)?;
        *self.markers.entry(line).or_insert(0) |= bit;
        Ok(())
    }

    /// Clear marker `symbol` on `line`. Clearing an absent marker is a no-op.
    pub fn clear_marker(&mut self, line: usize, symbol: u32) -> Result<()> {
        let bit = marker_bit(symbol)?;
        if let Some(mask) = self.markers.get_mut(&line) {
            *mask &= !bit;
            if *mask == 0 {
                self.markers.remove(&line);
            }
        }
        Ok(())
    }

    /// Clear marker `symbol` from every line.
    pub fn clear_marker_everywhere(&mut self, symbol: u32) -> Result<()> {
        let bit = marker_bit(symbol)?;
        self.markers.retain(|_, mask| {
            *mask &= !bit;
            *mask != 0
        });
        Ok(())
    }

    /// Marker bitmask of `line` (0 when none or out of range).
    pub fn markers_on_line(&self, line: usize) -> u32 {
        self.markers.get(&line).copied().unwrap_or(0)
    }

    /// Lines carrying any marker, with their masks.
    pub fn marker_lines(&self) -> impl Iterator<Item = (usize, u32)> + '_ {
        self.markers.iter().map(|(line, mask)| (*line, *mask))
    }

    /// First line `>= from` with a marker in `mask`.
    pub fn next_marker_line(&self, from: usize, mask: u32) -> Option<usize> {
        self.markers
            .range(from..)
            .find(|(_, m)| **m & mask != 0)
            .map(|(line, _)| *line)
    }

    /// Last line `<= from` with a marker in `mask`.
    pub fn previous_marker_line(&self, from: usize, mask: u32) -> Option<usize> {
        self.markers
            .range(..=from)
            .rev()
            .find(|(_, m)| **m & mask != 0)
            .map(|(line, _)| *line)
    }

    /// Lowest marker slot on `line` visible through margin `index`'s mask.
    pub fn first_masked_marker(&self, index: usize, line: usize) -> Option<u32> {
        let mask = self.margins.get(&index)?.mask;
        let visible = self.markers_on_line(line) & mask;
        (visible != 0).then(|| visible.trailing_zeros())
    }

    /// Set (or with `None`, clear) the text shown for `line` in Text margins.
    pub fn set_margin_text(&mut self, line: usize, text: Option<String>) {
        match text {
            Some(text) => {
                self.text.insert(line, text);
            }
            None => {
                self.text.remove(&line);
            }
        }
    }

    /// Margin text of `line`.
    pub fn margin_text(&self, line: usize) -> Option<&str> {
        self.text.get(&line).map(String::as_str)
    }

    /// Content of margin `index` on `line`; `fold` supplies the chevron state for Fold margins.
    pub fn margin_content(&self, index: usize, line: usize, fold: FoldMarker) -> Result<MarginContent> {
        let spec = self.margins.get(&index).ok_or(EngineError::InvalidMargin(index))?;
        Ok(match spec.kind {
            MarginKind::Symbol => match self.markers_on_line(line) & spec.mask {
                0 => MarginContent::Empty,
                bits => MarginContent::Markers(bits),
            },
            MarginKind::Number => MarginContent::LineNumber(line + 1),
            MarginKind::Text => self
                .margin_text(line)
                .map(|t| MarginContent::Text(t.to_string()))
                .unwrap_or(MarginContent::Empty),
            MarginKind::Fold => match fold {
                FoldMarker::None => MarginContent::Empty,
                other => MarginContent::Fold(other),
            },
        })
    }

    /// Route a click. Unknown margins are an error; insensitive margins produce nothing.
    pub fn on_margin_click(&self, index: usize, line: usize) -> Result<Option<MarginClick>> {
        let spec = self.margins.get(&index).ok_or(EngineError::InvalidMargin(index))?;
        if !spec.sensitive {
            return Ok(None);
        }
        Ok(Some(MarginClick {
            margin: index,
            line,
            kind: spec.kind,
            markers: self.markers_on_line(line),
        }))
    }

    /// Attach an annotation below `line`. An empty `text` removes it.
    pub fn set_annotation(&mut self, line: usize, text: impl Into<String>) {
        let text = text.into();
        if text.is_empty() {
            self.annotations.remove(&line);
        } else {
            self.annotations.insert(line, text);
        }
    }

    /// Remove the annotation of `line`; returns `true` if there was one.
    pub fn clear_annotation(&mut self, line: usize) -> bool {
        self.annotations.remove(&line).is_some()
    }

    /// Remove every annotation.
    pub fn clear_all_annotations(&mut self) {
        self.annotations.clear();
    }

    /// Annotation of `line`.
    pub fn annotation(&self, line: usize) -> Option<&str> {
        self.annotations.get(&line).map(String::as_str)
    }

    /// Annotated lines in order.
    pub fn annotations(&self) -> impl Iterator<Item = (usize, &str)> + '_ {
        self.annotations.iter().map(|(line, text)| (*line, text.as_str()))
    }
}

impl RemapConsumer for MarginSystem {
    fn apply_delta(&mut self, delta: &EditDelta) {
        if delta.removed_breaks() == 0 && delta.inserted_breaks() == 0 {
            return;
        }
        self.markers = remap_lines(std::mem::take(&mut self.markers), delta);
        self.text = remap_lines(std::mem::take(&mut self.text), delta);
        self.annotations = remap_lines(std::mem::take(&mut self.annotations), delta);
        tracing::trace!(
            marker_lines = self.markers.len(),
            annotations = self.annotations.len(),
            "markers remapped"
        );
    }
}

fn remap_lines<V>(map: BTreeMap<usize, V>, delta: &EditDelta) -> BTreeMap<usize, V> {
    map.into_iter()
        .filter_map(|(line, value)| delta.remap_line(line).map(|line| (line, value)))
        .collect()
}

fn marker_bit(symbol: u32) -> Result<u32> {
    if symbol >= MARKER_SLOTS {
        return Err(EngineError::InvalidMarkerSymbol(symbol));
    }
    Ok(1 << symbol)
}
