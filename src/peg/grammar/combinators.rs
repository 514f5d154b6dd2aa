//! Grammar authoring surface
//!
//! Patterns are built with plain functions and composed by value:
//!
//! ```rust,ignore
//! let statement = create_rule(
//!     "Statement",
//!     seq([rule("Expression"), token(";")]),
//!     RuleOptions::new().errors([
//!         error(0, "Expected expression"),
//!         error(1, "Expected `;` after expression"),
//!     ]),
//! );
//! ```

use crate::peg::grammar::pattern::{
    ChoicePattern, OptionalPattern, Pattern, RepeatPattern, RulePattern, SeqPattern, TokenPattern,
};
use crate::peg::grammar::rule::{ErrorCondition, ErrorHandler, Rule, RuleOptions};
use crate::peg::parser::context::{ContextQuery, ErrorContext};

/// Match one token of kind `name`.
pub fn token(name: impl Into<String>) -> Pattern {
    Pattern::Token(TokenPattern {
        name: name.into(),
        silent: false,
    })
}

/// Reference the rule called `name`.
pub fn rule(name: impl Into<String>) -> Pattern {
    Pattern::Rule(RulePattern {
        name: name.into(),
        silent: false,
    })
}

pub fn seq(patterns: impl IntoIterator<Item = Pattern>) -> Pattern {
    Pattern::Seq(SeqPattern {
        patterns: patterns.into_iter().collect(),
        silent: false,
    })
}

pub fn choice(patterns: impl IntoIterator<Item = Pattern>) -> Pattern {
    Pattern::Choice(ChoicePattern {
        patterns: patterns.into_iter().collect(),
        silent: false,
    })
}

/// Between `min` and `max` matches of `element`; `max = None` is unbounded.
pub fn repeat(element: Pattern, min: usize, max: Option<usize>) -> Pattern {
    Pattern::Repeat(RepeatPattern {
        element: Box::new(element),
        min,
        max,
        separator: None,
        silent: false,
        empty_as_absent: false,
    })
}

/// Like [repeat], with `separator` required between successive elements.
pub fn repeat_separated(
    element: Pattern,
    separator: Pattern,
    min: usize,
    max: Option<usize>,
) -> Pattern {
    Pattern::Repeat(RepeatPattern {
        element: Box::new(element),
        min,
        max,
        separator: Some(Box::new(separator)),
        silent: false,
        empty_as_absent: false,
    })
}

pub fn one_or_more(element: Pattern) -> Pattern {
    repeat(element, 1, None)
}

pub fn zero_or_more(element: Pattern) -> Pattern {
    repeat(element, 0, None)
}

/// Alias of [optional].
pub fn zero_or_one(element: Pattern) -> Pattern {
    optional(element)
}

pub fn optional(element: Pattern) -> Pattern {
    Pattern::Optional(OptionalPattern {
        element: Box::new(element),
    })
}

pub fn silent(pattern: Pattern) -> Pattern {
    pattern.silent()
}

pub fn loud(pattern: Pattern) -> Pattern {
    pattern.loud()
}

pub fn create_rule<T>(name: impl Into<String>, pattern: Pattern, options: RuleOptions<T>) -> Rule<T> {
    Rule::with_options(name, pattern, options)
}

/// Error handler keyed by the index of the sequence element that failed.
pub fn error(index: usize, msg: impl Into<String>) -> ErrorHandler {
    ErrorHandler::new(ErrorCondition::Index(index), msg)
}

/// Error handler selected by a predicate over the live parse context.
pub fn error_when<F>(predicate: F, msg: impl Into<String>) -> ErrorHandler
where
    F: Fn(&ContextQuery<'_>, &ErrorContext) -> bool + Send + Sync + 'static,
{
    ErrorHandler::new(ErrorCondition::when(predicate), msg)
}
