//! Match values and the parse result
//!
//! The engine never knows what a build function produces. It hands builders a
//! [Match] tree (tokens, nested build outputs, lists for sequences and
//! repetitions) and stores whatever comes back as [Match::Node].

use crate::peg::error::ParseError;
use crate::peg::token::{Span, Token};
use serde::Serialize;

/// Raw result of evaluating a pattern.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Match<T> {
    /// A consumed token
    Token(Token),
    /// Output of a rule's build function
    Node(T),
    /// Ordered sub-results of a sequence or repetition
    List(Vec<Match<T>>),
    /// An optional pattern that did not match
    Absent,
}

impl<T> Match<T> {
    pub fn as_token(&self) -> Option<&Token> {
        match self {
            Match::Token(tok) => Some(tok),
            _ => None,
        }
    }

    pub fn as_node(&self) -> Option<&T> {
        match self {
            Match::Node(node) => Some(node),
            _ => None,
        }
    }

    pub fn into_node(self) -> Option<T> {
        match self {
            Match::Node(node) => Some(node),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Match<T>]> {
        match self {
            Match::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn into_list(self) -> Option<Vec<Match<T>>> {
        match self {
            Match::List(items) => Some(items),
            _ => None,
        }
    }

    /// Element `index` of a list match
    pub fn get(&self, index: usize) -> Option<&Match<T>> {
        self.as_list().and_then(|items| items.get(index))
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Match::Absent)
    }

    /// All tokens in this match, in input order
    pub fn tokens(&self) -> Vec<&Token> {
        let mut out = Vec::new();
        self.collect_tokens(&mut out);
        out
    }

    fn collect_tokens<'a>(&'a self, out: &mut Vec<&'a Token>) {
        match self {
            Match::Token(tok) => out.push(tok),
            Match::List(items) => items.iter().for_each(|item| item.collect_tokens(out)),
            Match::Node(_) | Match::Absent => {}
        }
    }

    /// Span covered by the tokens of this match, if it consumed any
    pub fn span(&self) -> Option<Span> {
        let tokens = self.tokens();
        let first = tokens.first()?;
        let last = tokens.last()?;
        Some(first.span.merge(&last.span))
    }
}

/// True if an optional slot matched something.
pub fn is_optional_passed<T>(slot: &Match<T>) -> bool {
    !slot.is_absent()
}

/// The matched content of an optional slot, or `None` when it was not passed.
pub fn get_optional<T>(slot: &Match<T>) -> Option<&Match<T>> {
    if slot.is_absent() {
        None
    } else {
        Some(slot)
    }
}

/// Counters collected during one `parse()` call.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Statistics {
    pub tokens_processed: usize,
    pub rules_applied: usize,
    pub errors_recovered: usize,
    pub memo_hits: usize,
    pub memo_misses: usize,
    pub parse_time_ms: f64,
}

/// Outcome of a parse: one AST entry per top-level application of the start rule.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParseResult<T> {
    pub ast: Vec<Match<T>>,
    pub errors: Vec<ParseError>,
    pub statistics: Option<Statistics>,
}

impl<T> ParseResult<T> {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    /// Build outputs of the top-level applications, skipping raw matches
    pub fn nodes(&self) -> impl Iterator<Item = &T> {
        self.ast.iter().filter_map(Match::as_node)
    }
}
