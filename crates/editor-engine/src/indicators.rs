//! Indicators and hotspots.
//!
//! Indicators are styled ranges kept in a sorted vector with a prefix maximum of end offsets, so
//! point and range queries only scan candidates that can still overlap. Ranges of the same style
//! and value coalesce when they overlap or touch.
//!
//! Hotspots are ranges with a payload that report hover/click events. Hover state on both kinds
//! is transient: it is set while the pointer is inside the range and cleared as soon as it
//! leaves.

use crate::delta::{EditDelta, RemapConsumer};

/// Indicator style id.
pub type StyleId = u32;

/// A styled range `[start, end)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Indicator {
    /// Start offset (inclusive).
    pub start: usize,
    /// End offset (exclusive).
    pub end: usize,
    /// Indicator style.
    pub style_id: StyleId,
    /// User value attached to the range.
    pub value: i32,
    /// Whether the pointer is currently inside the range.
    pub hover_active: bool,
}

impl Indicator {
    /// Create an indicator with value 0.
    pub fn new(start: usize, end: usize, style_id: StyleId) -> Self {
        Self {
            start,
            end,
            style_id,
            value: 0,
            hover_active: false,
        }
    }

    /// Returns `true` if `offset` lies in `[start, end)`.
    pub fn contains(&self, offset: usize) -> bool {
        self.start <= offset && offset < self.end
    }
}

/// Hover transition of one range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoverTransition {
    /// The pointer entered.
    Enter,
    /// The pointer left.
    Exit,
}

/// Indicator ranges of one document.
#[derive(Debug, Clone, Default)]
pub struct IndicatorTable {
    /// Sorted by `(start, end)`.
    indicators: Vec<Indicator>,
    /// `prefix_max_end[i] = max(indicators[0..=i].end)`.
    prefix_max_end: Vec<usize>,
    current_style: StyleId,
    current_value: i32,
}

impl IndicatorTable {
    /// Empty table.
    pub fn new() -> Self {
        Self::default()
    }

    fn rebuild_prefix_max_end_from(&mut self, start_idx: usize) {
        self.prefix_max_end.resize(self.indicators.len(), 0);
        let mut max_end = match start_idx {
            0 => 0,
            i => self.prefix_max_end[i - 1],
        };
        for (idx, indicator) in self.indicators.iter().enumerate().skip(start_idx) {
            max_end = max_end.max(indicator.end);
            self.prefix_max_end[idx] = max_end;
        }
    }

    fn insert_sorted(&mut self, indicator: Indicator) {
        let pos = self
            .indicators
            .partition_point(|i| (i.start, i.end) <= (indicator.start, indicator.end));
        self.indicators.insert(pos, indicator);
        self.rebuild_prefix_max_end_from(pos);
    }

    /// Add `[start, end)` with `style_id` and value 0.
    pub fn add_range(&mut self, start: usize, end: usize, style_id: StyleId) {
        self.add_range_with_value(start, end, style_id, 0);
    }

    /// Add `[start, end)`, merging with overlapping or touching ranges of the same style and value.
    /// Empty ranges are ignored.
    pub fn add_range_with_value(&mut self, start: usize, end: usize, style_id: StyleId, value: i32) {
        if start >= end {
            return;
        }
        let mut merged = Indicator {
            value,
            ..Indicator::new(start, end, style_id)
        };
        let original_len = self.indicators.len();
        loop {
            let before = self.indicators.len();
            self.indicators.retain(|i| {
                let mergeable = i.style_id == style_id
                    && i.value == value
                    && i.start <= merged.end
                    && i.end >= merged.start;
                if mergeable {
                    merged.start = merged.start.min(i.start);
                    merged.end = merged.end.max(i.end);
                    merged.hover_active |= i.hover_active;
                }
                !mergeable
            });
            if self.indicators.len() == before {
                break;
            }
        }
        if self.indicators.len() != original_len {
            self.prefix_max_end.clear();
            self.rebuild_prefix_max_end_from(0);
        }
        self.insert_sorted(merged);
    }

    /// Remove the range exactly matching `[start, end)` and `style_id`.
    pub fn remove_range(&mut self, start: usize, end: usize, style_id: StyleId) -> bool {
        let Some(pos) = self
            .indicators
            .iter()
            .position(|i| i.start == start && i.end == end && i.style_id == style_id)
        else {
            return false;
        };
        self.indicators.remove(pos);
        self.rebuild_prefix_max_end_from(pos.min(self.indicators.len()));
        true
    }

    /// Clear `[start, end)` from every range (of `style_id` only, when given), splitting ranges
    /// that extend past either side.
    pub fn clear_range(&mut self, start: usize, end: usize, style_id: Option<StyleId>) {
        if start >= end {
            return;
        }
        let mut kept = Vec::with_capacity(self.indicators.len());
        for indicator in self.indicators.drain(..) {
            let affected = style_id.is_none_or(|s| s == indicator.style_id)
                && indicator.start < end
                && indicator.end > start;
            if !affected {
                kept.push(indicator);
                continue;
            }
            if indicator.start < start {
                kept.push(Indicator {
                    end: start,
                    ..indicator.clone()
                });
            }
            if indicator.end > end {
                kept.push(Indicator {
                    start: end,
                    ..indicator
                });
            }
        }
        kept.sort_by_key(|i| (i.start, i.end));
        self.indicators = kept;
        self.rebuild_prefix_max_end_from(0);
    }

    /// Select the style used by [`IndicatorTable::fill_range`].
    pub fn set_current(&mut self, style_id: StyleId) {
        self.current_style = style_id;
    }

    /// Select the value used by [`IndicatorTable::fill_range`].
    pub fn set_current_value(&mut self, value: i32) {
        self.current_value = value;
    }

    /// Current `(style, value)` pair.
    pub fn current(&self) -> (StyleId, i32) {
        (self.current_style, self.current_value)
    }

    /// Fill `len` chars at `position` with the current style and value.
    pub fn fill_range(&mut self, position: usize, len: usize) {
        self.add_range_with_value(
            position,
            position.saturating_add(len),
            self.current_style,
            self.current_value,
        );
    }

    /// Clear `len` chars at `position` for the current style.
    pub fn clear_current_range(&mut self, position: usize, len: usize) {
        self.clear_range(position, position.saturating_add(len), Some(self.current_style));
    }

    /// Indicators containing `offset`, in start order.
    pub fn query_at(&self, offset: usize) -> Vec<&Indicator> {
        let idx = self.indicators.partition_point(|i| i.start <= offset);
        let mut out = Vec::new();
        for i in (0..idx).rev() {
            if self.prefix_max_end[i] <= offset {
                break;
            }
            if self.indicators[i].contains(offset) {
                out.push(&self.indicators[i]);
            }
        }
        out.reverse();
        out
    }

    /// Indicators overlapping `[start, end)`.
    pub fn query_range(&self, start: usize, end: usize) -> Vec<&Indicator> {
        if start >= end {
            return Vec::new();
        }
        let search_end = self.indicators.partition_point(|i| i.start < end);
        let mut scan_start = self.indicators[..search_end].partition_point(|i| i.start < start);
        while scan_start > 0 && self.prefix_max_end[scan_start - 1] > start {
            scan_start -= 1;
        }
        self.indicators[scan_start..search_end]
            .iter()
            .filter(|i| i.end > start)
            .collect()
    }

    /// All indicators sorted by start.
    pub fn all(&self) -> &[Indicator] {
        &self.indicators
    }

    /// Number of stored ranges.
    pub fn len(&self) -> usize {
        self.indicators.len()
    }

    /// Returns `true` if no range is stored.
    pub fn is_empty(&self) -> bool {
        self.indicators.is_empty()
    }

    /// Remove every range.
    pub fn clear(&mut self) {
        self.indicators.clear();
        self.prefix_max_end.clear();
    }

    /// Update hover state for a pointer at `offset` (`None` = outside the text).
    ///
    /// Returns the ranges whose state changed, with the change.
    pub fn update_hover(&mut self, offset: Option<usize>) -> Vec<(Indicator, HoverTransition)> {
        let mut changes = Vec::new();
        for indicator in &mut self.indicators {
            let inside = offset.is_some_and(|o| indicator.contains(o));
            if inside != indicator.hover_active {
                indicator.hover_active = inside;
                let transition = if inside {
                    HoverTransition::Enter
                } else {
                    HoverTransition::Exit
                };
                changes.push((indicator.clone(), transition));
            }
        }
        changes
    }
}

impl RemapConsumer for IndicatorTable {
    fn apply_delta(&mut self, delta: &EditDelta) {
        if self.indicators.is_empty() {
            return;
        }
        for indicator in &mut self.indicators {
            indicator.start = delta.remap_offset(indicator.start);
            indicator.end = delta.remap_offset(indicator.end);
        }
        self.indicators.retain(|i| i.start < i.end);
        self.indicators.sort_by_key(|i| (i.start, i.end));
        self.rebuild_prefix_max_end_from(0);
        tracing::trace!(indicators = self.indicators.len(), "indicators remapped");
    }
}

/// Identifier of a hotspot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HotspotId(pub u64);

/// Which events a hotspot reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HotspotEvents {
    /// Report pointer entering the range.
    pub on_hover_enter: bool,
    /// Report pointer leaving the range.
    pub on_hover_exit: bool,
    /// Report clicks inside the range.
    pub on_click: bool,
}

impl HotspotEvents {
    /// Every event kind.
    pub const ALL: Self = Self {
        on_hover_enter: true,
        on_hover_exit: true,
        on_click: true,
    };

    /// Clicks only.
    pub const CLICK: Self = Self {
        on_hover_enter: false,
        on_hover_exit: false,
        on_click: true,
    };
}

impl Default for HotspotEvents {
    fn default() -> Self {
        Self::ALL
    }
}

/// A clickable range with a payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hotspot {
    /// Stable id.
    pub id: HotspotId,
    /// Start offset (inclusive).
    pub start: usize,
    /// End offset (exclusive).
    pub end: usize,
    /// Host-defined payload (URL, symbol name, ...).
    pub payload: String,
    /// Reported events.
    pub events: HotspotEvents,
    /// Whether the pointer is currently inside the range.
    pub hover_active: bool,
}

impl Hotspot {
    /// Returns `true` if `offset` lies in `[start, end)`.
    pub fn contains(&self, offset: usize) -> bool {
        self.start <= offset && offset < self.end
    }
}

/// Hotspots of one document, sorted by start.
#[derive(Debug, Clone, Default)]
pub struct HotspotTable {
    hotspots: Vec<Hotspot>,
    next_id: u64,
}

impl HotspotTable {
    /// Empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a hotspot over `[start, end)`. Empty ranges are ignored and return `None`.
    pub fn set_hotspot(
        &mut self,
        start: usize,
        end: usize,
        payload: impl Into<String>,
        events: HotspotEvents,
    ) -> Option<HotspotId> {
        if start >= end {
            return None;
        }
        let id = HotspotId(self.next_id);
        self.next_id += 1;
        let pos = self.hotspots.partition_point(|h| h.start <= start);
        self.hotspots.insert(
            pos,
            Hotspot {
                id,
                start,
                end,
                payload: payload.into(),
                events,
                hover_active: false,
            },
        );
        Some(id)
    }

    /// Remove a hotspot by id.
    pub fn remove(&mut self, id: HotspotId) -> bool {
        let before = self.hotspots.len();
        self.hotspots.retain(|h| h.id != id);
        before != self.hotspots.len()
    }

    /// Remove every hotspot.
    pub fn clear(&mut self) {
        self.hotspots.clear();
    }

    /// Innermost (latest-starting) hotspot at `offset`.
    pub fn hotspot_at(&self, offset: usize) -> Option<&Hotspot> {
        let idx = self.hotspots.partition_point(|h| h.start <= offset);
        self.hotspots[..idx].iter().rev().find(|h| h.contains(offset))
    }

    /// All hotspots sorted by start.
    pub fn all(&self) -> &[Hotspot] {
        &self.hotspots
    }

    /// Update hover state for a pointer at `offset`; returns changed hotspots.
    pub fn update_hover(&mut self, offset: Option<usize>) -> Vec<(Hotspot, HoverTransition)> {
        let mut changes = Vec::new();
        for hotspot in &mut self.hotspots {
            let inside = offset.is_some_and(|o| hotspot.contains(o));
            if inside != hotspot.hover_active {
                hotspot.hover_active = inside;
                let transition = if inside {
                    HoverTransition::Enter
                } else {
                    HoverTransition::Exit
                };
                changes.push((hotspot.clone(), transition));
            }
        }
        changes
    }
}

impl RemapConsumer for HotspotTable {
    fn apply_delta(&mut self, delta: &EditDelta) {
        if self.hotspots.is_empty() {
            return;
        }
        for hotspot in &mut self.hotspots {
            hotspot.start = delta.remap_offset(hotspot.start);
            hotspot.end = delta.remap_offset(hotspot.end);
        }
        self.hotspots.retain(|h| h.start < h.end);
        self.hotspots.sort_by_key(|h| h.start);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::Position;

    fn ranges(table: &IndicatorTable) -> Vec<(usize, usize, StyleId)> {
        table.all().iter().map(|i| (i.start, i.end, i.style_id)).collect()
    }

    #[test]
    fn test_same_style_coalesces() {
        let mut table = IndicatorTable::new();
        table.add_range(0, 5, 1);
        table.add_range(5, 8, 1);
        table.add_range(3, 6, 2);
        assert_eq!(ranges(&table), vec![(0, 8, 1), (3, 6, 2)]);

        table.add_range(10, 12, 1);
        table.add_range(7, 11, 1);
        assert_eq!(ranges(&table), vec![(0, 12, 1), (3, 6, 2)]);
    }

    #[test]
    fn test_different_values_do_not_coalesce() {
        let mut table = IndicatorTable::new();
        table.add_range_with_value(0, 4, 1, 7);
        table.add_range_with_value(2, 6, 1, 8);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_query_at() {
        let mut table = IndicatorTable::new();
        table.add_range(0, 100, 1);
        table.add_range(10, 20, 2);
        table.add_range(50, 60, 3);
        let hits: Vec<_> = table.query_at(15).iter().map(|i| i.style_id).collect();
        assert_eq!(hits, vec![1, 2]);
        assert!(table.query_at(100).is_empty());
        assert_eq!(table.query_range(19, 51).len(), 3);
    }

    #[test]
    fn test_clear_range_splits() {
        let mut table = IndicatorTable::new();
        table.add_range(0, 10, 1);
        table.add_range(0, 10, 2);
        table.clear_range(3, 6, Some(1));
        assert_eq!(ranges(&table), vec![(0, 3, 1), (0, 10, 2), (6, 10, 1)]);
    }

    #[test]
    fn test_fill_uses_current_style_and_value() {
        let mut table = IndicatorTable::new();
        table.set_current(4);
        table.set_current_value(9);
        table.fill_range(2, 3);
        assert_eq!(table.all()[0], Indicator { value: 9, ..Indicator::new(2, 5, 4) });
        table.clear_current_range(0, 10);
        assert!(table.is_empty());
    }

    #[test]
    fn test_hover_transitions() {
        let mut table = IndicatorTable::new();
        table.add_range(2, 5, 1);
        assert_eq!(table.update_hover(Some(3)).len(), 1);
        assert!(table.all()[0].hover_active);
        assert!(table.update_hover(Some(4)).is_empty());
        let changes = table.update_hover(Some(5));
        assert_eq!(changes[0].1, HoverTransition::Exit);
        assert!(!table.all()[0].hover_active);
    }

    #[test]
    fn test_indicators_follow_edits() {
        let mut table = IndicatorTable::new();
        table.add_range(4, 8, 1);
        table.add_range(10, 12, 1);
        // delete [5, 11)
        let delta = EditDelta::new(
            Position::new(0, 5),
            5,
            Position::new(0, 11),
            "x".repeat(6),
            String::new(),
            1,
        );
        table.apply_delta(&delta);
        assert_eq!(ranges(&table), vec![(4, 5, 1), (5, 6, 1)]);
    }

    #[test]
    fn test_hotspot_lookup_and_hover() {
        let mut hotspots = HotspotTable::new();
        let outer = hotspots.set_hotspot(0, 10, "outer", HotspotEvents::ALL).unwrap();
        let inner = hotspots.set_hotspot(4, 6, "inner", HotspotEvents::CLICK).unwrap();
        assert_eq!(hotspots.hotspot_at(5).map(|h| h.id), Some(inner));
        assert_eq!(hotspots.hotspot_at(8).map(|h| h.id), Some(outer));
        assert!(hotspots.set_hotspot(3, 3, "empty", HotspotEvents::ALL).is_none());

        let entered = hotspots.update_hover(Some(5));
        assert_eq!(entered.len(), 2);
        let left = hotspots.update_hover(None);
        assert!(left.iter().all(|(_, t)| *t == HoverTransition::Exit));
    }
}
