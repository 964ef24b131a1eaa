#![warn(missing_docs)]
//! `editor-engine-lang` - data-driven language configuration for `editor-engine`.
//!
//! This crate stays dependency-free and does not lex anything itself. It describes, per
//! language, the few lexical facts the engine needs to stay correct without a real parser:
//!
//! - comment tokens (so brackets inside comments are ignored by folding / brace matching)
//! - string delimiters and the escape character
//! - bracket pairs used for brace matching, and the subset used for bracket folding
//! - default indentation width / tabs policy
//! - a small keyword list for lightweight highlighting overlays

/// Comment tokens for a given language.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommentConfig {
    /// Line comment token (e.g. `//`, `#`).
    pub line: Option<String>,
    /// Block comment start token (e.g. `/*`).
    pub block_start: Option<String>,
    /// Block comment end token (e.g. `*/`).
    pub block_end: Option<String>,
}

impl CommentConfig {
    /// A language without comments.
    pub fn none() -> Self {
        Self::default()
    }

    /// Line comments only.
    pub fn line(token: impl Into<String>) -> Self {
        Self {
            line: Some(token.into()),
            block_start: None,
            block_end: None,
        }
    }

    /// Line comments plus block comments.
    pub fn line_and_block(
        line: impl Into<String>,
        block_start: impl Into<String>,
        block_end: impl Into<String>,
    ) -> Self {
        Self {
            line: Some(line.into()),
            block_start: Some(block_start.into()),
            block_end: Some(block_end.into()),
        }
    }

    /// Returns the line comment token if one is configured and non-empty.
    pub fn line_token(&self) -> Option<&str> {
        self.line.as_deref().filter(|s| !s.is_empty())
    }

    /// Returns `(start, end)` block comment tokens if both are configured and non-empty.
    pub fn block_tokens(&self) -> Option<(&str, &str)> {
        let start = self.block_start.as_deref().filter(|s| !s.is_empty())?;
        let end = self.block_end.as_deref().filter(|s| !s.is_empty())?;
        Some((start, end))
    }
}

/// An opening/closing bracket pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BracketPair {
    /// Opening bracket character.
    pub open: char,
    /// Closing bracket character.
    pub close: char,
}

impl BracketPair {
    /// Create a new bracket pair.
    pub const fn new(open: char, close: char) -> Self {
        Self { open, close }
    }
}

/// The default bracket pairs: `()`, `[]`, `{}`.
pub const DEFAULT_BRACKETS: [BracketPair; 3] = [
    BracketPair::new('(', ')'),
    BracketPair::new('[', ']'),
    BracketPair::new('{', '}'),
];

/// Default indentation settings for a language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndentConfig {
    /// Width of one indentation level in columns.
    pub width: usize,
    /// Whether indentation is written with tab characters.
    pub use_tabs: bool,
}

impl Default for IndentConfig {
    fn default() -> Self {
        Self {
            width: 4,
            use_tabs: false,
        }
    }
}

/// Lexical configuration of one language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageConfig {
    /// Stable language identifier (`"python"`, `"rust"`, `"plain"`, ...).
    pub id: String,
    /// Comment tokens.
    pub comments: CommentConfig,
    /// Characters that open (and close) a string literal.
    pub string_delimiters: Vec<char>,
    /// Delimiters whose literals may span lines (e.g. JavaScript template strings).
    pub multiline_string_delimiters: Vec<char>,
    /// Escape character inside string literals.
    pub escape_char: Option<char>,
    /// Bracket pairs used by brace matching.
    pub brackets: Vec<BracketPair>,
    /// Bracket pairs that open fold regions under the bracket strategy.
    pub fold_brackets: Vec<BracketPair>,
    /// Default indentation.
    pub indent: IndentConfig,
    /// Keywords used by lightweight highlighting overlays.
    pub keywords: Vec<&'static str>,
}

impl Default for LanguageConfig {
    fn default() -> Self {
        Self::plain()
    }
}

impl LanguageConfig {
    /// Plain text: no comments, no strings, default brackets.
    pub fn plain() -> Self {
        Self {
            id: "plain".to_string(),
            comments: CommentConfig::none(),
            string_delimiters: Vec::new(),
            multiline_string_delimiters: Vec::new(),
            escape_char: None,
            brackets: DEFAULT_BRACKETS.to_vec(),
            fold_brackets: vec![BracketPair::new('{', '}')],
            indent: IndentConfig::default(),
            keywords: Vec::new(),
        }
    }

    /// Python.
    pub fn python() -> Self {
        Self {
            id: "python".to_string(),
            comments: CommentConfig::line("#"),
            string_delimiters: vec!['"', '\''],
            escape_char: Some('\\'),
            keywords: vec![
                "and", "as", "assert", "break", "class", "continue", "def", "del", "elif",
                "else", "except", "False", "finally", "for", "from", "global", "if", "import",
                "in", "is", "lambda", "None", "nonlocal", "not", "or", "pass", "raise",
                "return", "True", "try", "while", "with", "yield",
            ],
            ..Self::plain()
        }
    }

    /// JavaScript.
    pub fn javascript() -> Self {
        Self {
            id: "javascript".to_string(),
            comments: CommentConfig::line_and_block("//", "/*", "*/"),
            string_delimiters: vec!['"', '\'', '`'],
            multiline_string_delimiters: vec!['`'],
            escape_char: Some('\\'),
            keywords: vec![
                "break", "case", "catch", "class", "const", "continue", "debugger", "default",
                "delete", "do", "else", "export", "extends", "false", "finally", "for",
                "function", "if", "import", "in", "instanceof", "let", "new", "null",
                "return", "super", "switch", "this", "throw", "true", "try", "typeof", "var",
                "void", "while", "with", "yield",
            ],
            ..Self::plain()
        }
    }

    /// TypeScript (JavaScript lexical rules, own id).
    pub fn typescript() -> Self {
        let mut config = Self::javascript();
        config.id = "typescript".to_string();
        config.keywords.extend(["interface", "type", "enum", "implements", "readonly"]);
        config
    }

    /// JSON.
    pub fn json() -> Self {
        Self {
            id: "json".to_string(),
            string_delimiters: vec!['"'],
            escape_char: Some('\\'),
            fold_brackets: vec![BracketPair::new('{', '}'), BracketPair::new('[', ']')],
            indent: IndentConfig {
                width: 2,
                use_tabs: false,
            },
            keywords: vec!["true", "false", "null"],
            ..Self::plain()
        }
    }

    /// Rust.
    pub fn rust() -> Self {
        Self {
            id: "rust".to_string(),
            comments: CommentConfig::line_and_block("//", "/*", "*/"),
            string_delimiters: vec!['"'],
            escape_char: Some('\\'),
            keywords: vec![
                "as", "break", "const", "continue", "crate", "else", "enum", "false", "fn",
                "for", "if", "impl", "in", "let", "loop", "match", "mod", "move", "mut", "pub",
                "ref", "return", "self", "Self", "static", "struct", "super", "trait", "true",
                "type", "unsafe", "use", "where", "while",
            ],
            ..Self::plain()
        }
    }

    /// C / C++.
    pub fn c() -> Self {
        Self {
            id: "c".to_string(),
            comments: CommentConfig::line_and_block("//", "/*", "*/"),
            string_delimiters: vec!['"', '\''],
            escape_char: Some('\\'),
            keywords: vec![
                "break", "case", "char", "const", "continue", "default", "do", "double",
                "else", "enum", "extern", "float", "for", "if", "int", "long", "return",
                "short", "signed", "sizeof", "static", "struct", "switch", "typedef", "union",
                "unsigned", "void", "while",
            ],
            ..Self::plain()
        }
    }

    /// Markdown (no code-level comments; fenced code is left to the lexer collaborator).
    pub fn markdown() -> Self {
        Self {
            id: "markdown".to_string(),
            brackets: DEFAULT_BRACKETS.to_vec(),
            fold_brackets: Vec::new(),
            indent: IndentConfig {
                width: 2,
                use_tabs: false,
            },
            ..Self::plain()
        }
    }

    /// Resolve a language from a free-form label (lexer name, file type, etc.).
    ///
    /// Unknown labels resolve to [`LanguageConfig::plain`].
    pub fn for_label(label: &str) -> Self {
        let label = label.trim().to_ascii_lowercase();
        if label.contains("python") || label == "py" {
            Self::python()
        } else if label.contains("json") {
            Self::json()
        } else if label.contains("typescript") || label == "ts" {
            Self::typescript()
        } else if label.contains("javascript") || label == "js" {
            Self::javascript()
        } else if label.contains("markdown") || label == "md" {
            Self::markdown()
        } else if label.contains("rust") || label == "rs" {
            Self::rust()
        } else if label == "c" || label == "cpp" || label.contains("c++") || label == "h" {
            Self::c()
        } else {
            Self::plain()
        }
    }

    /// Returns the pair for which `ch` is the opening bracket.
    pub fn pair_for_open(&self, ch: char) -> Option<BracketPair> {
        self.brackets.iter().copied().find(|p| p.open == ch)
    }

    /// Returns the pair for which `ch` is the closing bracket.
    pub fn pair_for_close(&self, ch: char) -> Option<BracketPair> {
        self.brackets.iter().copied().find(|p| p.close == ch)
    }

    /// Returns `true` if `ch` opens a string literal.
    pub fn is_string_delimiter(&self, ch: char) -> bool {
        self.string_delimiters.contains(&ch)
    }
}
