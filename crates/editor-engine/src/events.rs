//! Engine event records.
//!
//! Hover and click interactions are queued instead of delivered through callbacks, so nothing
//! re-enters the engine while it is mutating. Hosts drain the queue once per frame.

use crate::indicators::{HotspotId, StyleId};
use crate::margins::MarginClick;
use std::collections::VecDeque;

/// One interaction or state record for the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// Pointer entered a hotspot.
    HotspotHoverEnter {
        /// Hotspot id.
        id: HotspotId,
        /// Hotspot payload.
        payload: String,
    },
    /// Pointer left a hotspot.
    HotspotHoverExit {
        /// Hotspot id.
        id: HotspotId,
        /// Hotspot payload.
        payload: String,
    },
    /// A hotspot was clicked.
    HotspotClick {
        /// Hotspot id.
        id: HotspotId,
        /// Hotspot payload.
        payload: String,
        /// Clicked offset.
        offset: usize,
    },
    /// Pointer entered an indicator range.
    IndicatorHoverEnter {
        /// Indicator style.
        style_id: StyleId,
        /// Indicator value.
        value: i32,
        /// Range start.
        start: usize,
        /// Range end.
        end: usize,
    },
    /// Pointer left an indicator range.
    IndicatorHoverExit {
        /// Indicator style.
        style_id: StyleId,
        /// Indicator value.
        value: i32,
        /// Range start.
        start: usize,
        /// Range end.
        end: usize,
    },
    /// An indicator range was clicked.
    IndicatorClick {
        /// Indicator style.
        style_id: StyleId,
        /// Indicator value.
        value: i32,
        /// Clicked offset.
        offset: usize,
    },
    /// A sensitive margin was clicked.
    MarginClicked(MarginClick),
    /// A fold region was expanded or collapsed from a margin click.
    FoldToggled {
        /// Header line of the region.
        header_line: usize,
        /// New collapsed state.
        collapsed: bool,
    },
}

/// FIFO of pending events.
#[derive(Debug, Clone, Default)]
pub struct EventQueue {
    events: VecDeque<EngineEvent>,
}

impl EventQueue {
    /// Empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue an event.
    pub fn push(&mut self, event: EngineEvent) {
        tracing::trace!(?event, "event queued");
        self.events.push_back(event);
    }

    /// Take every pending event in emission order.
    pub fn drain(&mut self) -> Vec<EngineEvent> {
        self.events.drain(..).collect()
    }

    /// Pending events, oldest first.
    pub fn pending(&self) -> impl Iterator<Item = &EngineEvent> {
        self.events.iter()
    }

    /// Number of pending events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Returns `true` if nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drain_preserves_order() {
        let mut queue = EventQueue::new();
        queue.push(EngineEvent::FoldToggled {
            header_line: 1,
            collapsed: true,
        });
        queue.push(EngineEvent::HotspotClick {
            id: HotspotId(3),
            payload: "x".to_string(),
            offset: 4,
        });
        assert_eq!(queue.len(), 2);
        let drained = queue.drain();
        assert!(matches!(drained[0], EngineEvent::FoldToggled { header_line: 1, .. }));
        assert!(matches!(drained[1], EngineEvent::HotspotClick { offset: 4, .. }));
        assert!(queue.is_empty());
    }
}
