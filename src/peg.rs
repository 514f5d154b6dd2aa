//! A generic, grammar-driven parsing engine
//!
//! Grammars are tables of named rules whose bodies are combinator trees
//! ([Pattern]). The [Parser] interprets them over a pre-lexed token stream with
//! backtracking, packrat memoization and context-aware diagnostics.
//!
//! Overview
//!
//!     token stream ──► Parser::parse ──► ParseResult { ast, errors, statistics }
//!                          │
//!                          ├── evaluator: one function per pattern kind
//!                          ├── memo: bounded packrat cache
//!                          ├── context: rule stack and recent completions
//!                          └── recovery: repositioning in resilient mode
//!
//! Silent vs loud
//!
//!     A loud pattern that fails produces a diagnostic describing what was
//!     expected. A silent pattern fails with a plain "no match" so that
//!     enclosing choices and optionals can backtrack cheaply. Silence is
//!     inherited: everything evaluated inside a silent pattern is silent.
//!
//! Build functions
//!
//!     Rules may carry a build function that turns the raw [Match] into a domain
//!     value of type `T`. The engine never inspects `T`.
//!
//! Example
//!
//! ```rust,ignore
//! use gramma::peg::*;
//!
//! let rules = vec![Rule::<()>::new("root", choice([token("ok"), token("fk")]))];
//! let mut parser = Parser::new(rules, ParserConfig::new().resilient())?;
//! let result = parser.parse(&testing::tokens_from_str("ok fk"));
//! assert_eq!(result.ast.len(), 2);
//! ```

pub mod config;
pub mod error;
pub mod grammar;
pub mod parser;
pub mod recovery;
pub mod result;
pub mod testing;
pub mod token;

pub use config::{DebugLevel, ErrorRecoveryConfig, Loader, ParserConfig, RecoveryMode};
pub use error::{BuildError, ErrorCode, GrammarError, ParseError};
pub use grammar::{
    choice, create_rule, error, error_when, loud, one_or_more, optional, repeat,
    repeat_separated, rule, seq, silent, token, zero_or_more, zero_or_one, BuildFn,
    ErrorCondition, ErrorHandler, ErrorPredicate, Pattern, Rule, RuleOptions, Rules,
};
pub use parser::{ContextQuery, ErrorContext, Parser};
pub use recovery::{skip_past, skip_until, RecoveryStrategy};
pub use result::{get_optional, is_optional_passed, Match, ParseResult, Statistics};
pub use token::{Span, Token, ERROR_KIND};
