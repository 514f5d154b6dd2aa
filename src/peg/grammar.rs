//! Grammar model
//!
//! A grammar is a table of named [Rule]s whose bodies are [Pattern] trees.
//! Patterns are data, not code: the [parser](crate::peg::parser) interprets them.

pub mod combinators;
pub mod pattern;
pub mod rule;
pub mod rules;

pub use combinators::{
    choice, create_rule, error, error_when, loud, one_or_more, optional, repeat,
    repeat_separated, rule, seq, silent, token, zero_or_more, zero_or_one,
};
pub use pattern::Pattern;
pub use rule::{BuildFn, ErrorCondition, ErrorHandler, ErrorPredicate, Rule, RuleOptions};
pub use rules::Rules;
