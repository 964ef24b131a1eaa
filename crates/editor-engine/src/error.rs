//! Engine error taxonomy.
//!
//! Only structurally invalid input is an error. Out-of-range edit intents are clamped by the
//! buffer, brace-match failure is `None`, and render-time queries on lines past the end of the
//! document return empty results.

use thiserror::Error;

/// Errors surfaced by the engine.
///
/// No error is fatal: after any `Err` the engine is still in its last consistent state.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Malformed offset/length input that cannot be clamped (e.g. a negative length).
    #[error("invalid range: start {start}, removed length {removed_len}")]
    Range {
        /// Requested start offset.
        start: usize,
        /// Requested removed length.
        removed_len: i64,
    },
    /// A line-addressed mutation referenced a line past the end of the document.
    #[error("line {line} is out of range (document has {line_count} lines)")]
    LineOutOfRange {
        /// Requested line.
        line: usize,
        /// Current line count.
        line_count: usize,
    },
    /// A margin index that was never defined.
    #[error("unknown margin index {0}")]
    InvalidMargin(usize),
    /// A marker symbol outside the 32 available slots.
    #[error("marker symbol {0} is outside the 0..32 slot range")]
    InvalidMarkerSymbol(u32),
    /// A caret index that does not exist, or an attempt to remove the last caret.
    #[error("invalid caret index {index} ({count} carets)")]
    InvalidCaret {
        /// Requested caret index.
        index: usize,
        /// Current caret count.
        count: usize,
    },
    /// A fold job computed against a buffer version that has since changed.
    #[error("fold job was computed for buffer version {job_version}, buffer is at {buffer_version}")]
    StaleFoldJob {
        /// Version the job started from.
        job_version: u64,
        /// Current buffer version.
        buffer_version: u64,
    },
    /// Settings payload could not be parsed.
    #[error("invalid settings payload: {0}")]
    ConfigParse(#[from] serde_json::Error),
    /// Settings payload parsed but holds unusable values.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Engine result alias.
pub type Result<T, E = EngineError> = std::result::Result<T, E>;
