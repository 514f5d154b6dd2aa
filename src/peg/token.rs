//! Token and span types consumed by the engine
//!
//! Tokens are produced externally and read positionally through a cursor. The
//! engine only ever compares `kind` strings; `value` and `span` are carried
//! through to build functions and diagnostics.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Reserved token kind a token producer uses to flag a lexical failure.
pub const ERROR_KIND: &str = "error";

/// Offsets into the original source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Zero-width span at `offset`
    pub fn point(offset: usize) -> Self {
        Self {
            start: offset,
            end: offset,
        }
    }

    /// Smallest span covering both spans
    pub fn merge(&self, other: &Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// A single token from the external producer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub kind: String,
    pub value: Option<String>,
    pub span: Span,
}

impl Token {
    pub fn new(kind: impl Into<String>, value: Option<String>, span: Span) -> Self {
        Self {
            kind: kind.into(),
            value,
            span,
        }
    }

    /// Token whose value is its own text
    pub fn with_value(kind: impl Into<String>, value: impl Into<String>, span: Span) -> Self {
        Self::new(kind, Some(value.into()), span)
    }

    pub fn is(&self, kind: &str) -> bool {
        self.kind == kind
    }

    /// True if the producer flagged this token as a lexical failure
    pub fn is_error(&self) -> bool {
        self.kind == ERROR_KIND
    }

    /// Text used in diagnostics: the value when present, the kind otherwise
    pub fn text(&self) -> &str {
        self.value.as_deref().unwrap_or(&self.kind)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(value) => write!(f, "{}({:?})@{}", self.kind, value, self.span),
            None => write!(f, "{}@{}", self.kind, self.span),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_prefers_value() {
        let tok = Token::with_value("ident", "foo", Span::new(0, 3));
        assert_eq!(tok.text(), "foo");

        let bare = Token::new(";", None, Span::new(3, 4));
        assert_eq!(bare.text(), ";");
    }

    #[test]
    fn test_error_kind() {
        let tok = Token::with_value(ERROR_KIND, "k", Span::new(3, 3));
        assert!(tok.is_error());
        assert!(!tok.is("ok"));
    }

    #[test]
    fn test_span_merge() {
        let merged = Span::new(4, 6).merge(&Span::new(1, 5));
        assert_eq!(merged, Span::new(1, 6));
    }
}
