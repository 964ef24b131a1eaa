//! Token ranges supplied by the lexer collaborator.
//!
//! Folding's bracket strategy and brace matching only need to know which offsets sit inside a
//! string or comment. [`TokenRanges`] keeps the supplied ranges remapped across edits and answers
//! [`TokenRanges::is_ignored`] with a binary search over merged literal spans.
//!
//! Two built-in providers exist for hosts without a lexer: [`LiteralScanner`], a small state
//! machine driven by [`LanguageConfig`], and [`RegexTokenizer`], a regex overlay for keyword /
//! number / comment / string highlighting.

use crate::delta::{EditDelta, RemapConsumer};
use editor_engine_lang::LanguageConfig;
use regex::Regex;

/// Lexical category of a token range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// String literal.
    String,
    /// Comment.
    Comment,
    /// Keyword.
    Keyword,
    /// Numeric literal.
    Number,
    /// Identifier.
    Identifier,
    /// Anything else a lexer wants to report.
    Other,
}

impl TokenKind {
    /// Strings and comments hide brackets from folding and brace matching.
    pub fn is_literal(self) -> bool {
        matches!(self, Self::String | Self::Comment)
    }
}

/// A token span `[start, end)` in char offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenRange {
    /// Start offset (inclusive).
    pub start: usize,
    /// End offset (exclusive).
    pub end: usize,
    /// Token category.
    pub kind: TokenKind,
}

impl TokenRange {
    /// Create a token range.
    pub fn new(start: usize, end: usize, kind: TokenKind) -> Self {
        Self { start, end, kind }
    }
}

/// Source of token ranges for a document.
pub trait TokenProvider {
    /// Tokenize LF-normalized `text`. Returned offsets are char offsets.
    fn tokenize(&self, text: &str) -> Vec<TokenRange>;
}

/// Token ranges of one document, remapped across edits.
#[derive(Debug, Clone, Default)]
pub struct TokenRanges {
    ranges: Vec<TokenRange>,
    literal_spans: Vec<(usize, usize)>,
    stale: bool,
}

impl TokenRanges {
    /// Empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace all ranges. The table is fresh afterwards.
    pub fn set(&mut self, mut ranges: Vec<TokenRange>) {
        ranges.retain(|r| r.start < r.end);
        ranges.sort_by_key(|r| (r.start, r.end));
        self.ranges = ranges;
        self.stale = false;
        self.rebuild_literal_spans();
    }

    /// All ranges sorted by start.
    pub fn ranges(&self) -> &[TokenRange] {
        &self.ranges
    }

    /// Ranges overlapping `[start, end)`.
    pub fn ranges_in(&self, start: usize, end: usize) -> impl Iterator<Item = &TokenRange> {
        self.ranges
            .iter()
            .take_while(move |r| r.start < end)
            .filter(move |r| r.end > start)
    }

    /// Merged string/comment spans.
    pub fn literal_spans(&self) -> &[(usize, usize)] {
        &self.literal_spans
    }

    /// Returns `true` if `offset` lies inside a string or comment.
    pub fn is_ignored(&self, offset: usize) -> bool {
        let idx = self.literal_spans.partition_point(|(start, _)| *start <= offset);
        idx > 0 && self.literal_spans[idx - 1].1 > offset
    }

    /// Kind of the innermost literal at `offset`, if any.
    pub fn literal_kind_at(&self, offset: usize) -> Option<TokenKind> {
        self.ranges
            .iter()
            .take_while(|r| r.start <= offset)
            .filter(|r| r.kind.is_literal() && r.end > offset)
            .last()
            .map(|r| r.kind)
    }

    /// Whether an edit happened since the last [`TokenRanges::set`].
    pub fn is_stale(&self) -> bool {
        self.stale
    }

    /// Drop every range.
    pub fn clear(&mut self) {
        self.ranges.clear();
        self.literal_spans.clear();
        self.stale = false;
    }

    fn rebuild_literal_spans(&mut self) {
        self.literal_spans.clear();
        for range in self.ranges.iter().filter(|r| r.kind.is_literal()) {
            match self.literal_spans.last_mut() {
                Some((_, end)) if range.start <= *end => *end = (*end).max(range.end),
                _ => self.literal_spans.push((range.start, range.end)),
            }
        }
    }
}

impl RemapConsumer for TokenRanges {
    fn apply_delta(&mut self, delta: &EditDelta) {
        if self.ranges.is_empty() {
            return;
        }
        for range in &mut self.ranges {
            range.start = delta.remap_offset(range.start);
            range.end = delta.remap_offset(range.end);
        }
        self.ranges.retain(|r| r.start < r.end);
        self.ranges.sort_by_key(|r| (r.start, r.end));
        self.stale = true;
        self.rebuild_literal_spans();
    }
}

impl TokenProvider for Vec<TokenRange> {
    fn tokenize(&self, _text: &str) -> Vec<TokenRange> {
        self.clone()
    }
}

/// Finds strings and comments with a state machine over the language's lexical rules.
///
/// This is not a lexer: it only has to be right about where literals start and end so that
/// brackets inside them are ignored.
#[derive(Debug, Clone)]
pub struct LiteralScanner {
    language: LanguageConfig,
}

#[derive(Debug, Clone, Copy)]
enum ScanState {
    Code,
    Str { delim: char, triple: bool, multiline: bool },
    LineComment,
    BlockComment,
}

impl LiteralScanner {
    /// Scanner for `language`.
    pub fn new(language: LanguageConfig) -> Self {
        Self { language }
    }

    /// Language this scanner follows.
    pub fn language(&self) -> &LanguageConfig {
        &self.language
    }
}

impl TokenProvider for LiteralScanner {
    fn tokenize(&self, text: &str) -> Vec<TokenRange> {
        let chars: Vec<char> = text.chars().collect();
        let line_comment: Option<Vec<char>> =
            self.language.comments.line_token().map(|t| t.chars().collect());
        let block: Option<(Vec<char>, Vec<char>)> = self
            .language
            .comments
            .block_tokens()
            .map(|(s, e)| (s.chars().collect(), e.chars().collect()));
        let escape = self.language.escape_char;

        let mut out = Vec::new();
        let mut state = ScanState::Code;
        let mut token_start = 0usize;
        let mut i = 0usize;

        while i < chars.len() {
            let ch = chars[i];
            match state {
                ScanState::Code => {
                    if let Some((open, _)) = &block
                        && starts_with_at(&chars, i, open)
                    {
                        state = ScanState::BlockComment;
                        token_start = i;
                        i += open.len();
                        continue;
                    }
                    if let Some(token) = &line_comment
                        && starts_with_at(&chars, i, token)
                    {
                        state = ScanState::LineComment;
                        token_start = i;
                        i += token.len();
                        continue;
                    }
                    if self.language.is_string_delimiter(ch) {
                        let triple = matches!(ch, '"' | '\'')
                            && chars.get(i + 1) == Some(&ch)
                            && chars.get(i + 2) == Some(&ch);
                        state = ScanState::Str {
                            delim: ch,
                            triple,
                            multiline: triple
                                || self.language.multiline_string_delimiters.contains(&ch),
                        };
                        token_start = i;
                        i += if triple { 3 } else { 1 };
                        continue;
                    }
                    i += 1;
                }
                ScanState::Str {
                    delim,
                    triple,
                    multiline,
                } => {
                    if Some(ch) == escape {
                        i += 2;
                        continue;
                    }
                    if ch == '\n' && !multiline {
                        out.push(TokenRange::new(token_start, i, TokenKind::String));
                        state = ScanState::Code;
                        i += 1;
                        continue;
                    }
                    if ch == delim {
                        if triple {
                            if chars.get(i + 1) == Some(&delim) && chars.get(i + 2) == Some(&delim)
                            {
                                out.push(TokenRange::new(token_start, i + 3, TokenKind::String));
                                state = ScanState::Code;
                                i += 3;
                                continue;
                            }
                        } else {
                            out.push(TokenRange::new(token_start, i + 1, TokenKind::String));
                            state = ScanState::Code;
                            i += 1;
                            continue;
                        }
                    }
                    i += 1;
                }
                ScanState::LineComment => {
                    if ch == '\n' {
                        out.push(TokenRange::new(token_start, i, TokenKind::Comment));
                        state = ScanState::Code;
                    }
                    i += 1;
                }
                ScanState::BlockComment => {
                    if let Some((_, close)) = &block
                        && starts_with_at(&chars, i, close)
                    {
                        i += close.len();
                        out.push(TokenRange::new(token_start, i, TokenKind::Comment));
                        state = ScanState::Code;
                        continue;
                    }
                    i += 1;
                }
            }
        }

        let end = chars.len();
        match state {
            ScanState::Code => {}
            ScanState::Str { .. } => out.push(TokenRange::new(token_start, end, TokenKind::String)),
            ScanState::LineComment | ScanState::BlockComment => {
                out.push(TokenRange::new(token_start, end, TokenKind::Comment))
            }
        }
        out.retain(|r| r.start < r.end);
        out
    }
}

fn starts_with_at(chars: &[char], at: usize, token: &[char]) -> bool {
    !token.is_empty() && chars.get(at..at + token.len()) == Some(token)
}

/// A single regex overlay rule.
#[derive(Debug, Clone)]
pub struct TokenRule {
    regex: Regex,
    kind: TokenKind,
    capture_group: Option<usize>,
}

impl TokenRule {
    /// Compile `pattern` into a rule producing `kind` tokens.
    pub fn new(pattern: &str, kind: TokenKind) -> Result<Self, regex::Error> {
        Ok(Self {
            regex: Regex::new(pattern)?,
            kind,
            capture_group: None,
        })
    }

    /// Tokenize only a capture group of each match.
    pub fn with_capture_group(mut self, group: usize) -> Self {
        self.capture_group = Some(group);
        self
    }

    /// Kind produced by this rule.
    pub fn kind(&self) -> TokenKind {
        self.kind
    }
}

/// Regex-based keyword/number/comment/string overlays.
///
/// Rules run over the whole document in order; later rules are reported after earlier ones and
/// may overlap them.
#[derive(Debug, Clone)]
pub struct RegexTokenizer {
    rules: Vec<TokenRule>,
}

const NUMBER_PATTERN: &str = r"\b\d+(?:\.\d+)?\b";
const QUOTED_PATTERN: &str = r#"'(?:[^'\\\n]|\\.)*'|"(?:[^"\\\n]|\\.)*""#;

impl RegexTokenizer {
    /// Tokenizer from explicit rules.
    pub fn new(rules: Vec<TokenRule>) -> Self {
        Self { rules }
    }

    /// Rules in application order.
    pub fn rules(&self) -> &[TokenRule] {
        &self.rules
    }

    /// Built-in overlay for `language` (python, javascript, typescript, json, markdown, rust, c).
    ///
    /// Other languages get keyword and number rules only.
    pub fn for_language(language: &LanguageConfig) -> Result<Self, regex::Error> {
        let mut rules = Vec::new();

        match language.id.as_str() {
            "json" => {
                rules.push(
                    TokenRule::new(r#"("(?:\\.|[^"\\])*")\s*:"#, TokenKind::Keyword)?
                        .with_capture_group(1),
                );
                rules.push(TokenRule::new(r#""(?:\\.|[^"\\])*""#, TokenKind::String)?);
                rules.push(TokenRule::new(NUMBER_PATTERN, TokenKind::Number)?);
                rules.push(TokenRule::new(r"\b(?:true|false|null)\b", TokenKind::Keyword)?);
                return Ok(Self::new(rules));
            }
            "markdown" => {
                rules.push(TokenRule::new(r"(?m)^#{1,6} .*$", TokenKind::Keyword)?);
                rules.push(TokenRule::new(r"`{1,3}[^`]+`{1,3}", TokenKind::String)?);
                rules.push(TokenRule::new(r"\*\*[^*\n]+\*\*", TokenKind::Keyword)?);
                rules.push(TokenRule::new(r"\*[^*\n]+\*", TokenKind::Other)?);
                return Ok(Self::new(rules));
            }
            _ => {}
        }

        if !language.keywords.is_empty() {
            let alternation = language
                .keywords
                .iter()
                .map(|k| regex::escape(k))
                .collect::<Vec<_>>()
                .join("|");
            rules.push(TokenRule::new(&format!(r"\b(?:{alternation})\b"), TokenKind::Keyword)?);
        }
        if let Some(token) = language.comments.line_token() {
            rules.push(TokenRule::new(
                &format!("{}.*", regex::escape(token)),
                TokenKind::Comment,
            )?);
        }
        if let Some((start, end)) = language.comments.block_tokens() {
            rules.push(TokenRule::new(
                &format!("(?s){}.*?{}", regex::escape(start), regex::escape(end)),
                TokenKind::Comment,
            )?);
        }
        if language.id == "python" {
            rules.push(TokenRule::new(r#"(?s)'''.*?'''|""".*?""""#, TokenKind::String)?);
        }
        if !language.string_delimiters.is_empty() {
            let pattern = if language.string_delimiters.contains(&'`') {
                format!("{QUOTED_PATTERN}|`(?:[^`\\\\]|\\\\.)*`")
            } else {
                QUOTED_PATTERN.to_string()
            };
            rules.push(TokenRule::new(&pattern, TokenKind::String)?);
        }
        rules.push(TokenRule::new(NUMBER_PATTERN, TokenKind::Number)?);

        Ok(Self::new(rules))
    }
}

impl TokenProvider for RegexTokenizer {
    fn tokenize(&self, text: &str) -> Vec<TokenRange> {
        let index = CharIndex::new(text);
        let mut out = Vec::new();
        for rule in &self.rules {
            match rule.capture_group {
                Some(group) => {
                    for caps in rule.regex.captures_iter(text) {
                        if let Some(m) = caps.get(group) {
                            push_match(&mut out, &index, m.start(), m.end(), rule.kind);
                        }
                    }
                }
                None => {
                    for m in rule.regex.find_iter(text) {
                        push_match(&mut out, &index, m.start(), m.end(), rule.kind);
                    }
                }
            }
        }
        out
    }
}

fn push_match(out: &mut Vec<TokenRange>, index: &CharIndex, start: usize, end: usize, kind: TokenKind) {
    let start = index.byte_to_char(start);
    let end = index.byte_to_char(end);
    if start < end {
        out.push(TokenRange::new(start, end, kind));
    }
}

/// Byte offset to char offset lookup for one string.
struct CharIndex {
    char_to_byte: Vec<usize>,
}

impl CharIndex {
    fn new(text: &str) -> Self {
        let mut char_to_byte: Vec<usize> = text.char_indices().map(|(b, _)| b).collect();
        char_to_byte.push(text.len());
        Self { char_to_byte }
    }

    fn byte_to_char(&self, byte_offset: usize) -> usize {
        match self.char_to_byte.binary_search(&byte_offset) {
            Ok(idx) | Err(idx) => idx,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn kinds(ranges: &[TokenRange], text: &str) -> Vec<(String, TokenKind)> {
        ranges
            .iter()
            .map(|r| (text.chars().skip(r.start).take(r.end - r.start).collect(), r.kind))
            .collect()
    }

    #[test]
    fn test_literal_scanner_rust() {
        let text = "let s = \"a{b\"; // }\n/* { */ x";
        let ranges = LiteralScanner::new(LanguageConfig::rust()).tokenize(text);
        assert_eq!(
            kinds(&ranges, text),
            vec![
                ("\"a{b\"".to_string(), TokenKind::String),
                ("// }".to_string(), TokenKind::Comment),
                ("/* { */".to_string(), TokenKind::Comment),
            ]
        );
    }

    #[test]
    fn test_literal_scanner_escape_and_unterminated() {
        let text = "x = 'it\\'s' + \"open\ny";
        let ranges = LiteralScanner::new(LanguageConfig::python()).tokenize(text);
        assert_eq!(
            kinds(&ranges, text),
            vec![
                ("'it\\'s'".to_string(), TokenKind::String),
                ("\"open".to_string(), TokenKind::String),
            ]
        );
    }

    #[test]
    fn test_literal_scanner_python_triple_quotes() {
        let text = "a = \"\"\"x\n(\n\"\"\"\nb";
        let ranges = LiteralScanner::new(LanguageConfig::python()).tokenize(text);
        assert_eq!(ranges.len(), 1);
        assert_eq!(ranges[0].start, 4);
        assert_eq!(ranges[0].end, 14);
    }

    #[test]
    fn test_is_ignored_and_remap() {
        let mut tokens = TokenRanges::new();
        tokens.set(vec![
            TokenRange::new(2, 5, TokenKind::String),
            TokenRange::new(4, 8, TokenKind::Comment),
            TokenRange::new(10, 12, TokenKind::Keyword),
        ]);
        assert_eq!(tokens.literal_spans(), &[(2, 8)]);
        assert!(!tokens.is_ignored(1));
        assert!(tokens.is_ignored(2));
        assert!(tokens.is_ignored(7));
        assert!(!tokens.is_ignored(8));
        assert!(!tokens.is_ignored(10));

        let delta = EditDelta::new(
            (0, 0).into(),
            0,
            (0, 0).into(),
            String::new(),
            "xyz".to_string(),
            1,
        );
        tokens.apply_delta(&delta);
        assert!(tokens.is_stale());
        assert!(tokens.is_ignored(5));
        assert!(!tokens.is_ignored(4));
    }

    #[test]
    fn test_regex_tokenizer_json_keys() {
        let text = "{\"né\": 12, \"b\": true}";
        let tokenizer = RegexTokenizer::for_language(&LanguageConfig::json()).unwrap();
        let ranges = tokenizer.tokenize(text);
        let found = kinds(&ranges, text);
        assert!(found.contains(&("\"né\"".to_string(), TokenKind::Keyword)));
        assert!(found.contains(&("12".to_string(), TokenKind::Number)));
        assert!(found.contains(&("true".to_string(), TokenKind::Keyword)));
    }

    #[test]
    fn test_regex_tokenizer_python() {
        let text = "def f(): # done\n    return 'x'";
        let tokenizer = RegexTokenizer::for_language(&LanguageConfig::python()).unwrap();
        let found = kinds(&tokenizer.tokenize(text), text);
        assert!(found.contains(&("def".to_string(), TokenKind::Keyword)));
        assert!(found.contains(&("# done".to_string(), TokenKind::Comment)));
        assert!(found.contains(&("'x'".to_string(), TokenKind::String)));
    }
}
