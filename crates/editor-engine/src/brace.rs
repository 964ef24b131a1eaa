//! Brace matching.
//!
//! Brackets inside strings and comments (per the current [`TokenRanges`]) neither match nor count
//! towards nesting depth. An unbalanced bracket is a normal "no match", not an error.

use crate::buffer::LineBuffer;
use crate::tokens::TokenRanges;
use editor_engine_lang::BracketPair;

/// Brace highlight state for the primary caret.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BraceHighlight {
    /// Matched pair, as `(open, close)` offsets.
    Matched(usize, usize),
    /// Bracket adjacent to the caret with no partner.
    Unmatched(usize),
}

/// Offset of the bracket a caret at `caret` refers to.
///
/// The character before the caret wins over the one after it, which is how most editors pick
/// between `)|(`.
pub fn brace_near_caret(
    buffer: &LineBuffer,
    tokens: &TokenRanges,
    brackets: &[BracketPair],
    caret: usize,
) -> Option<usize> {
    let is_bracket = |offset: usize| {
        buffer
            .char_at(offset)
            .is_some_and(|ch| brackets.iter().any(|p| p.open == ch || p.close == ch))
            && !tokens.is_ignored(offset)
    };
    if caret > 0 && is_bracket(caret - 1) {
        return Some(caret - 1);
    }
    is_bracket(caret).then_some(caret)
}

/// Partner of the bracket at `offset`, returned as `(open, close)`.
pub fn match_brace(
    buffer: &LineBuffer,
    tokens: &TokenRanges,
    brackets: &[BracketPair],
    offset: usize,
) -> Option<(usize, usize)> {
    let ch = buffer.char_at(offset)?;
    if tokens.is_ignored(offset) {
        return None;
    }
    let rope = buffer.index().rope();

    if let Some(pair) = brackets.iter().find(|p| p.open == ch) {
        let mut depth = 0usize;
        let mut pos = offset + 1;
        for c in rope.chars_at(offset + 1) {
            if (c == pair.open || c == pair.close) && !tokens.is_ignored(pos) {
                if c == pair.open {
                    depth += 1;
                } else if depth == 0 {
                    return Some((offset, pos));
                } else {
                    depth -= 1;
                }
            }
            pos += 1;
        }
        return None;
    }

    let pair = brackets.iter().find(|p| p.close == ch)?;
    let mut depth = 0usize;
    let mut pos = offset;
    let mut chars = rope.chars_at(offset);
    while let Some(c) = chars.prev() {
        pos -= 1;
        if (c == pair.open || c == pair.close) && !tokens.is_ignored(pos) {
            if c == pair.close {
                depth += 1;
            } else if depth == 0 {
                return Some((pos, offset));
            } else {
                depth -= 1;
            }
        }
    }
    None
}

/// Brace match for a caret at `caret`: the bracket next to it and its partner.
pub fn match_brace_at(
    buffer: &LineBuffer,
    tokens: &TokenRanges,
    brackets: &[BracketPair],
    caret: usize,
) -> Option<(usize, usize)> {
    let offset = brace_near_caret(buffer, tokens, brackets, caret)?;
    match_brace(buffer, tokens, brackets, offset)
}

/// Highlight state for a caret at `caret`; `None` when no bracket is adjacent.
pub fn brace_highlight(
    buffer: &LineBuffer,
    tokens: &TokenRanges,
    brackets: &[BracketPair],
    caret: usize,
) -> Option<BraceHighlight> {
    let offset = brace_near_caret(buffer, tokens, brackets, caret)?;
    Some(match match_brace(buffer, tokens, brackets, offset) {
        Some((open, close)) => BraceHighlight::Matched(open, close),
        None => BraceHighlight::Unmatched(offset),
    })
}
