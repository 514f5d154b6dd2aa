//! Lexer for the sample language
//!
//! Tokenization is handled entirely by logos. The only work done here is mapping
//! logos tokens to the engine's string-kinded [Token]s. Unrecognised input is not
//! dropped: it becomes an `error` token so the parser reports it.

use crate::peg::token::{Span, Token, ERROR_KIND};
use logos::Logos;

/// Token kinds of the sample language
#[derive(Logos, Debug, PartialEq, Eq, Clone, Copy)]
pub enum Kind {
    // Keywords
    #[token("let")]
    Let,
    #[token("fn")]
    Fn,
    #[token("return")]
    Return,

    #[regex(r"[A-Za-z_][A-Za-z0-9_]*")]
    Ident,
    #[regex(r"[0-9]+(\.[0-9]+)?")]
    Number,
    #[regex(r#""([^"\\\n]|\\.)*""#)]
    String,

    // Punctuation
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("=")]
    Assign,
    #[token("->")]
    Arrow,
    #[token("(")]
    OpenParen,
    #[token(")")]
    CloseParen,
    #[token("{")]
    OpenBrace,
    #[token("}")]
    CloseBrace,
    #[token(",")]
    Comma,
    #[token(":")]
    Colon,
    #[token(";")]
    Semicolon,

    // Trivia, ignored by the sample grammar
    #[regex(r"[ \t\r\n]+")]
    Whitespace,
    #[regex(r"//[^\n]*")]
    Comment,
}

impl Kind {
    /// The kind string the grammar matches on
    pub fn name(self) -> &'static str {
        match self {
            Kind::Let => "let",
            Kind::Fn => "fn",
            Kind::Return => "return",
            Kind::Ident => "ident",
            Kind::Number => "number",
            Kind::String => "string",
            Kind::Plus => "+",
            Kind::Minus => "-",
            Kind::Star => "*",
            Kind::Slash => "/",
            Kind::Assign => "=",
            Kind::Arrow => "->",
            Kind::OpenParen => "(",
            Kind::CloseParen => ")",
            Kind::OpenBrace => "{",
            Kind::CloseBrace => "}",
            Kind::Comma => ",",
            Kind::Colon => ":",
            Kind::Semicolon => ";",
            Kind::Whitespace => "ws",
            Kind::Comment => "comment",
        }
    }

    pub fn is_trivia(self) -> bool {
        matches!(self, Kind::Whitespace | Kind::Comment)
    }
}

/// Tokenize `source`, keeping trivia and turning unrecognised input into
/// `error` tokens.
pub fn tokenize(source: &str) -> Vec<Token> {
    let mut lexer = Kind::lexer(source);
    let mut tokens = Vec::new();

    while let Some(result) = lexer.next() {
        let span = lexer.span();
        let kind = match result {
            Ok(kind) => kind.name(),
            Err(_) => ERROR_KIND,
        };
        tokens.push(Token::with_value(
            kind,
            lexer.slice(),
            Span::new(span.start, span.end),
        ));
    }

    tokens
}
