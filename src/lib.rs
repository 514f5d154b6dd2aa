//! # gramma
//!
//! A grammar interpreter: named rules built from combinators are evaluated
//! directly against a token stream by memoizing recursive descent, with silent
//! (speculative) matching, custom error selection and resilient recovery.
//!
//! File Layout
//!
//!     src/peg       The engine: grammar model, evaluator, memo cache, errors, recovery
//!     src/sample    A small expression language that consumes the engine
//!
//! The engine never looks at characters. Tokens come from an external producer
//! (the sample language ships a logos lexer) and build results are opaque to it.

pub mod peg;
pub mod sample;
