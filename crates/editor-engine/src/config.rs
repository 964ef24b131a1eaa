//! Engine configuration.
//!
//! The settings collaborator hands the engine a read-only [`EngineConfig`] at document open and
//! again on an explicit settings apply. It usually arrives as JSON; every field has a default so
//! partial payloads are fine.
//!
//! Marker and indicator registries live here, per engine instance, so documents never share
//! symbol or style namespaces.

use crate::error::{EngineError, Result};
use crate::line_ending::LineTerminator;
use editor_engine_lang::{IndentConfig, LanguageConfig};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};

/// How fold regions are computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FoldStrategy {
    /// Leading-whitespace depth.
    Indentation,
    /// Matching fold brackets.
    BracketPairs,
    /// Both, keeping the larger region per header line.
    #[default]
    Combined,
}

/// Per-language indentation override.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct IndentOverride {
    /// Indent width in columns.
    pub width: Option<usize>,
    /// Whether indentation uses tabs.
    pub use_tabs: Option<bool>,
}

/// Shape painted for a marker symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerShape {
    /// Filled circle.
    #[default]
    Circle,
    /// Rounded rectangle.
    RoundRect,
    /// Right-pointing arrow.
    Arrow,
    /// Small rectangle.
    SmallRect,
    /// Short arrow.
    ShortArrow,
    /// Outline only.
    Empty,
    /// Boxed plus (collapsed fold).
    Plus,
    /// Boxed minus (expanded fold).
    Minus,
    /// Bookmark ribbon.
    Bookmark,
    /// Line background instead of a glyph.
    Background,
}

/// Marker symbol definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct MarkerDefinition {
    /// Glyph shape.
    pub shape: MarkerShape,
    /// Foreground colour as `0xRRGGBB`.
    pub foreground: Option<u32>,
    /// Background colour as `0xRRGGBB`.
    pub background: Option<u32>,
}

/// Marker symbol slot -> definition.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(transparent)]
pub struct MarkerRegistry {
    definitions: BTreeMap<u32, MarkerDefinition>,
}

impl MarkerRegistry {
    /// Define `shape` in the lowest free slot; `None` when all 32 slots are taken.
    pub fn define(&mut self, shape: MarkerShape) -> Option<u32> {
        let slot = (0..crate::margins::MARKER_SLOTS).find(|s| !self.definitions.contains_key(s))?;
        self.definitions.insert(
            slot,
            MarkerDefinition {
                shape,
                ..MarkerDefinition::default()
            },
        );
        Some(slot)
    }

    /// Define or replace the marker in `slot`.
    pub fn define_at(&mut self, slot: u32, definition: MarkerDefinition) -> Result<()> {
        if slot >= crate::margins::MARKER_SLOTS {
            return Err(EngineError::InvalidMarkerSymbol(slot));
        }
        self.definitions.insert(slot, definition);
        Ok(())
    }

    /// Set the background colour of `slot`, defining it with the default shape if needed.
    pub fn set_background(&mut self, slot: u32, rgb: u32) -> Result<()> {
        let mut definition = self.get(slot);
        definition.background = Some(rgb);
        self.define_at(slot, definition)
    }

    /// Definition of `slot`; undefined slots read as the default circle.
    pub fn get(&self, slot: u32) -> MarkerDefinition {
        self.definitions.get(&slot).copied().unwrap_or_default()
    }

    /// Defined slots.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &MarkerDefinition)> {
        self.definitions.iter().map(|(slot, def)| (*slot, def))
    }
}

/// Indicator drawing style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndicatorStyle {
    /// Straight underline.
    #[default]
    Plain,
    /// Squiggly underline.
    Squiggle,
    /// Line of small T shapes.
    Tt,
    /// Diagonal hatching.
    Diagonal,
    /// Strike-out.
    Strike,
    /// Not drawn (used for hit-testing only).
    Hidden,
    /// Rectangle around the text.
    Box,
    /// Translucent rounded box.
    RoundBox,
    /// Translucent box filling the cell.
    FullBox,
    /// Dashed underline.
    Dash,
    /// Dotted underline.
    Dots,
    /// Text colour change.
    TextFore,
}

/// Indicator style definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct IndicatorDefinition {
    /// Normal drawing style.
    pub style: IndicatorStyle,
    /// Colour as `0xRRGGBB`.
    pub foreground: Option<u32>,
    /// Style while hovered; falls back to `style`.
    pub hover_style: Option<IndicatorStyle>,
    /// Colour while hovered; falls back to `foreground`.
    pub hover_foreground: Option<u32>,
    /// Fill alpha for box styles.
    pub alpha: Option<u8>,
    /// Draw under the text.
    pub under_text: bool,
}

impl IndicatorDefinition {
    /// Style to paint, given the range's hover state.
    pub fn effective_style(&self, hover_active: bool) -> IndicatorStyle {
        if hover_active {
            self.hover_style.unwrap_or(self.style)
        } else {
            self.style
        }
    }

    /// Colour to paint, given the range's hover state.
    pub fn effective_foreground(&self, hover_active: bool) -> Option<u32> {
        if hover_active {
            self.hover_foreground.or(self.foreground)
        } else {
            self.foreground
        }
    }
}

/// Indicator style id -> definition.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(transparent)]
pub struct IndicatorRegistry {
    definitions: BTreeMap<u32, IndicatorDefinition>,
}

impl IndicatorRegistry {
    /// Define or replace style `id`.
    pub fn define(&mut self, id: u32, definition: IndicatorDefinition) {
        self.definitions.insert(id, definition);
    }

    /// Definition of `id`; undefined ids read as a plain underline.
    pub fn get(&self, id: u32) -> IndicatorDefinition {
        self.definitions.get(&id).copied().unwrap_or_default()
    }

    /// Defined style ids.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &IndicatorDefinition)> {
        self.definitions.iter().map(|(id, def)| (*id, def))
    }
}

/// Read-only settings snapshot.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Display width of a tab.
    pub tab_width: usize,
    /// Columns per indentation level.
    pub indent_width: usize,
    /// Indent with tabs.
    pub use_tabs: bool,
    /// Terminator for new lines; `None` keeps the loaded document's dominant terminator.
    pub default_line_ending: Option<LineTerminator>,
    /// Fold computation strategy.
    pub fold_strategy: FoldStrategy,
    /// Whether folds are computed at all.
    pub folding_enabled: bool,
    /// Language label (`"python"`, `"rust"`, a lexer name, ...).
    pub language: String,
    /// Language id -> indentation override.
    pub indent_overrides: HashMap<String, IndentOverride>,
    /// Distribute pasted rows over carets when counts match.
    pub multi_paste: bool,
    /// Typing affects every caret, not only the primary one.
    pub additional_selection_typing: bool,
    /// Convert breaks in inserted text to the document default.
    pub convert_inserted_line_endings: bool,
    /// Recompute folds synchronously after edits on small documents.
    pub refold_on_edit: bool,
    /// Largest document (in lines) refolded synchronously after an edit.
    pub sync_refold_line_limit: usize,
    /// Lines processed per fold job step.
    pub fold_batch_lines: usize,
    /// Pad virtual space with tabs (up to the last tab stop) instead of spaces.
    pub virtual_space_uses_tabs: bool,
    /// Marker symbol definitions.
    pub markers: MarkerRegistry,
    /// Indicator style definitions.
    pub indicators: IndicatorRegistry,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tab_width: 4,
            indent_width: 4,
            use_tabs: false,
            default_line_ending: None,
            fold_strategy: FoldStrategy::default(),
            folding_enabled: true,
            language: "plain".to_string(),
            indent_overrides: HashMap::new(),
            multi_paste: true,
            additional_selection_typing: true,
            convert_inserted_line_endings: false,
            refold_on_edit: true,
            sync_refold_line_limit: 20_000,
            fold_batch_lines: 2_000,
            virtual_space_uses_tabs: false,
            markers: MarkerRegistry::default(),
            indicators: IndicatorRegistry::default(),
        }
    }
}

impl EngineConfig {
    /// Parse and validate a JSON settings payload.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the engine cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.tab_width == 0 {
            return Err(EngineError::InvalidConfig("tab_width must be at least 1".into()));
        }
        if self.indent_width == 0 {
            return Err(EngineError::InvalidConfig("indent_width must be at least 1".into()));
        }
        if self.fold_batch_lines == 0 {
            return Err(EngineError::InvalidConfig(
                "fold_batch_lines must be at least 1".into(),
            ));
        }
        if let Some((language, _)) = self
            .indent_overrides
            .iter()
            .find(|(_, o)| o.width == Some(0))
        {
            return Err(EngineError::InvalidConfig(format!(
                "indent override for {language} has zero width"
            )));
        }
        Ok(())
    }

    /// Lexical configuration of the configured language.
    pub fn language_config(&self) -> LanguageConfig {
        LanguageConfig::for_label(&self.language)
    }

    /// Indentation after applying the override for the configured language.
    pub fn effective_indent(&self) -> IndentConfig {
        let language_id = self.language_config().id;
        let mut indent = IndentConfig {
            width: self.indent_width,
            use_tabs: self.use_tabs,
        };
        if let Some(o) = self.indent_overrides.get(&language_id) {
            indent.width = o.width.unwrap_or(indent.width);
            indent.use_tabs = o.use_tabs.unwrap_or(indent.use_tabs);
        }
        indent
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_payload_uses_defaults() {
        let config = EngineConfig::from_json_str(r#"{ "indent_width": 2, "language": "Python" }"#)
            .unwrap();
        assert_eq!(config.indent_width, 2);
        assert_eq!(config.tab_width, 4);
        assert_eq!(config.fold_strategy, FoldStrategy::Combined);
        assert_eq!(config.language_config().id, "python");
    }

    #[test]
    fn test_indent_override() {
        let config = EngineConfig::from_json_str(
            r#"{
                "language": "json",
                "default_line_ending": "crlf",
                "fold_strategy": "bracket_pairs",
                "indent_overrides": { "json": { "width": 2, "use_tabs": true } }
            }"#,
        )
        .unwrap();
        let indent = config.effective_indent();
        assert_eq!(indent.width, 2);
        assert!(indent.use_tabs);
        assert_eq!(config.default_line_ending, Some(LineTerminator::Crlf));
        assert_eq!(config.fold_strategy, FoldStrategy::BracketPairs);
    }

    #[test]
    fn test_invalid_payloads() {
        assert!(matches!(
            EngineConfig::from_json_str(r#"{ "tab_width": 0 }"#),
            Err(EngineError::InvalidConfig(_))
        ));
        assert!(matches!(
            EngineConfig::from_json_str(r#"{ "tab_width": "wide" }"#),
            Err(EngineError::ConfigParse(_))
        ));
    }

    #[test]
    fn test_registries() {
        let config = EngineConfig::from_json_str(
            r#"{
                "markers": { "1": { "shape": "arrow", "background": 16711680 } },
                "indicators": { "8": { "style": "box", "hover_style": "full_box" } }
            }"#,
        )
        .unwrap();
        assert_eq!(config.markers.get(1).shape, MarkerShape::Arrow);
        assert_eq!(config.markers.get(1).background, Some(0xFF0000));
        assert_eq!(config.indicators.get(8).effective_style(true), IndicatorStyle::FullBox);
        assert_eq!(config.indicators.get(8).effective_style(false), IndicatorStyle::Box);

        let mut markers = MarkerRegistry::default();
        assert_eq!(markers.define(MarkerShape::Bookmark), Some(0));
        assert_eq!(markers.define(MarkerShape::Circle), Some(1));
        assert!(markers.define_at(40, MarkerDefinition::default()).is_err());
    }
}
