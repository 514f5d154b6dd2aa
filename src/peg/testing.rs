//! Token fixtures
//!
//! Small helpers for building token streams by hand, used by the engine's own
//! tests and handy when sketching a grammar before a real lexer exists.

use crate::peg::token::{Span, Token, ERROR_KIND};

/// Token of `kind` starting at `start`, as wide as the kind's text.
pub fn tok(kind: &str, start: usize) -> Token {
    Token::new(kind, None, Span::new(start, start + kind.len()))
}

/// Error token carrying the offending text.
pub fn error_token(text: &str, start: usize) -> Token {
    Token::with_value(ERROR_KIND, text, Span::new(start, start + text.len()))
}

/// Adjacent tokens of the given kinds.
pub fn tokens_from_kinds(kinds: &[&str]) -> Vec<Token> {
    let mut offset = 0;
    kinds
        .iter()
        .map(|kind| {
            let token = tok(kind, offset);
            offset = token.span.end;
            token
        })
        .collect()
}

/// Split `source` on whitespace: every word becomes a token of that kind and
/// every whitespace run a single `ws` token.
///
/// ```rust,ignore
/// let tokens = tokens_from_str("ok fk");
/// // [ok@0..2, ws@2..3, fk@3..5]
/// ```
pub fn tokens_from_str(source: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut run_start = 0;
    let mut run_is_ws: Option<bool> = None;

    for (offset, ch) in source.char_indices() {
        let is_ws = ch.is_whitespace();
        if run_is_ws != Some(is_ws) {
            if let Some(was_ws) = run_is_ws {
                tokens.push(run_token(source, run_start, offset, was_ws));
            }
            run_start = offset;
            run_is_ws = Some(is_ws);
        }
    }
    if let Some(was_ws) = run_is_ws {
        tokens.push(run_token(source, run_start, source.len(), was_ws));
    }
    tokens
}

fn run_token(source: &str, start: usize, end: usize, is_ws: bool) -> Token {
    let text = &source[start..end];
    let kind = if is_ws { "ws" } else { text };
    Token::with_value(kind, text, Span::new(start, end))
}
