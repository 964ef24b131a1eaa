#![warn(missing_docs)]
//! Editor Engine - headless fallback editing engine
//!
//! # Overview
//!
//! `editor-engine` implements rich-editor behaviors from scratch for hosts that have no native
//! editing component: margins and markers, code folding, multiple carets, rectangular selection
//! with virtual space, indicators and hotspots, brace matching and line hiding. It does not
//! paint; the UI layer polls engine state once per render pass.
//!
//! Every text mutation produces one [`EditDelta`]. The buffer hands that delta to every
//! position-bearing structure before the edit returns, so no query can observe edited text with
//! stale carets, markers, fold lines or indicator bounds.
//!
//! # Architecture Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  Backend selection, Commands, State         │  ← Public API
//! ├─────────────────────────────────────────────┤
//! │  Engine (synchronized edits, events)        │  ← Coordination
//! ├─────────────────────────────────────────────┤
//! │  Carets │ Folding │ Margins │ Indicators    │  ← Remap consumers
//! ├─────────────────────────────────────────────┤
//! │  Line Buffer + EditDelta remap contract     │  ← Text storage
//! ├─────────────────────────────────────────────┤
//! │  Line Index (Rope-based)                    │  ← Offset <-> Position
//! └─────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```rust
//! use editor_engine::{Engine, EngineConfig, Position};
//!
//! let mut engine = Engine::new("def f():\n    x = 1\n    y = 2\nreturn", EngineConfig::default())
//!     .unwrap();
//!
//! // One fold region from the indentation.
//! assert_eq!(engine.fold_regions()[0].last_child_line, 2);
//! engine.toggle_fold(0);
//! assert!(!engine.is_visible(1));
//! assert!(engine.is_visible(3));
//!
//! // Two carets, one edit each.
//! engine.set_caret(engine.to_offset(Position::new(3, 0)), None);
//! engine.add_caret(0, None);
//! engine.apply_typed_text("#").unwrap();
//! assert_eq!(engine.line_text(3).as_deref(), Some("#return"));
//! ```
//!
//! # Module Description
//!
//! - [`buffer`] - line buffer and edit requests
//! - [`line_index`] - rope based offset/position index
//! - [`delta`] - edit deltas and the remap contract
//! - [`caret`] - multi-caret and rectangular selection state
//! - [`folding`] - fold regions, hidden lines and resumable recomputation
//! - [`margins`] - margins and per-line markers
//! - [`indicators`] - indicator ranges and hotspots
//! - [`brace`] - brace matching
//! - [`tokens`] - lexer token ranges and built-in providers
//! - [`engine`] - the engine itself
//! - [`commands`] - unified command interface
//! - [`state`] - state snapshots and change notifications
//! - [`backend`] - native / fallback backend selection

pub mod backend;
pub mod brace;
pub mod buffer;
pub mod caret;
pub mod commands;
pub mod config;
pub mod delta;
pub mod engine;
pub mod error;
pub mod events;
pub mod folding;
pub mod indicators;
pub mod line_ending;
pub mod line_index;
pub mod margins;
mod position;
pub mod state;
pub mod tokens;

pub use backend::{Backend, EditorBackend};
pub use brace::BraceHighlight;
pub use buffer::{EditRequest, EditStart, LineBuffer};
pub use caret::{Caret, CaretMove, CaretSet, RectangleSelection};
pub use commands::{
    CaretCommand, Command, CommandResult, EditCommand, FoldCommand, IndicatorCommand,
    MarginCommand,
};
pub use config::{
    EngineConfig, FoldStrategy, IndentOverride, IndicatorDefinition, IndicatorRegistry,
    IndicatorStyle, MarkerDefinition, MarkerRegistry, MarkerShape,
};
pub use delta::{EditDelta, RemapConsumer};
pub use engine::Engine;
pub use error::{EngineError, Result};
pub use events::{EngineEvent, EventQueue};
pub use folding::{FoldJob, FoldRegion, FoldSettings, FoldingEngine, HiddenLineSet};
pub use indicators::{
    Hotspot, HotspotEvents, HotspotId, HotspotTable, HoverTransition, Indicator, IndicatorTable,
    StyleId,
};
pub use line_ending::LineTerminator;
pub use line_index::LineIndex;
pub use margins::{
    FoldMarker, MarginClick, MarginContent, MarginKind, MarginSpec, MarginSystem, MARKER_SLOTS,
    MASK_FOLDERS,
};
pub use position::Position;
pub use state::{
    CaretState, DocumentState, EngineState, FoldingState, LineRenderState, StateChange,
    StateChangeCallback, StateChangeType,
};
pub use tokens::{
    LiteralScanner, RegexTokenizer, TokenKind, TokenProvider, TokenRange, TokenRanges, TokenRule,
};

pub use editor_engine_lang::{BracketPair, IndentConfig, LanguageConfig};
