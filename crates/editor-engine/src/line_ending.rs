//! Line terminator helpers.
//!
//! Every line records the terminator it was loaded or typed with. Internally a break always
//! occupies a single offset unit (`'\n'` in the index), whatever its persisted form.

use serde::Deserialize;

/// How a line ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineTerminator {
    /// Unix-style LF (`'\n'`).
    Lf,
    /// Windows-style CRLF (`"\r\n"`).
    Crlf,
    /// Classic Mac CR (`'\r'`).
    Cr,
    /// No terminator; only ever used by the final line.
    None,
}

impl LineTerminator {
    /// The persisted character sequence.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lf => "\n",
            Self::Crlf => "\r\n",
            Self::Cr => "\r",
            Self::None => "",
        }
    }

    /// Default terminator of the host platform.
    pub fn platform_default() -> Self {
        if cfg!(windows) { Self::Crlf } else { Self::Lf }
    }

    /// Detect the dominant terminator of `text`.
    ///
    /// Ties prefer LF, then CRLF. Returns `None` when `text` has no line break at all.
    pub fn detect_in_text(text: &str) -> Option<Self> {
        let (mut lf, mut crlf, mut cr) = (0usize, 0usize, 0usize);
        for (_, terminator) in split_terminated(text) {
            match terminator {
                Self::Lf => lf += 1,
                Self::Crlf => crlf += 1,
                Self::Cr => cr += 1,
                Self::None => {}
            }
        }
        if lf + crlf + cr == 0 {
            return None;
        }
        if lf >= crlf && lf >= cr {
            Some(Self::Lf)
        } else if crlf >= cr {
            Some(Self::Crlf)
        } else {
            Some(Self::Cr)
        }
    }
}

/// Split `text` into `(line content, terminator)` pairs.
///
/// `"\r\n"`, `'\r'` and `'\n'` are all recognized. The final segment always has
/// [`LineTerminator::None`], so `N` breaks produce `N + 1` segments.
pub fn split_terminated(text: &str) -> Vec<(&str, LineTerminator)> {
    let bytes = text.as_bytes();
    let mut out = Vec::new();
    let mut line_start = 0usize;
    let mut i = 0usize;

    while i < bytes.len() {
        match bytes[i] {
            b'\n' => {
                out.push((&text[line_start..i], LineTerminator::Lf));
                i += 1;
                line_start = i;
            }
            b'\r' => {
                if bytes.get(i + 1) == Some(&b'\n') {
                    out.push((&text[line_start..i], LineTerminator::Crlf));
                    i += 2;
                } else {
                    out.push((&text[line_start..i], LineTerminator::Cr));
                    i += 1;
                }
                line_start = i;
            }
            _ => i += 1,
        }
    }

    out.push((&text[line_start..], LineTerminator::None));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_terminated_mixed() {
        let parts = split_terminated("a\r\nb\nc\rd");
        assert_eq!(
            parts,
            vec![
                ("a", LineTerminator::Crlf),
                ("b", LineTerminator::Lf),
                ("c", LineTerminator::Cr),
                ("d", LineTerminator::None),
            ]
        );
    }

    #[test]
    fn test_split_terminated_trailing_break() {
        let parts = split_terminated("x\n");
        assert_eq!(parts, vec![("x", LineTerminator::Lf), ("", LineTerminator::None)]);
        assert_eq!(split_terminated(""), vec![("", LineTerminator::None)]);
    }

    #[test]
    fn test_detect_dominant() {
        assert_eq!(LineTerminator::detect_in_text("a\r\nb\r\nc\n"), Some(LineTerminator::Crlf));
        assert_eq!(LineTerminator::detect_in_text("a\nb"), Some(LineTerminator::Lf));
        assert_eq!(LineTerminator::detect_in_text("abc"), None);
    }
}
