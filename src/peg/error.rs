//! Error types for grammar construction and parsing
//!
//! Two families live here and they never mix:
//!
//!     - [GrammarError]: a programming error in the grammar itself. Returned from
//!       [Parser::new](crate::peg::Parser::new) and never part of a parse result.
//!     - [ParseError]: a problem with the input. Collected into
//!       [ParseResult::errors](crate::peg::ParseResult) so that parsing never fails
//!       for malformed input.

use crate::peg::token::Span;
use serde::{Serialize, Serializer};
use std::fmt;

/// Classification of a parse failure.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// The token producer flagged an error token
    LexicalError,
    /// Current token kind differs from the expected one
    TokenMismatch,
    /// A token was expected but the input ended
    TokenExpectedEof,
    /// A rule reference failed without a more specific cause
    RuleFailed,
    /// A sequence element failed without a more specific cause
    SequenceFailed,
    /// Every alternative of a choice failed without a more specific cause
    ChoiceAllFailed,
    /// Fewer repetitions than the configured minimum
    RepeatMinNotMet,
    /// A build function returned an error; the raw match was kept
    BuildFunctionFailed,
    /// Recursion went deeper than `max_depth`
    MaxDepthExceeded,
    /// Grammar misconfiguration discovered while parsing
    Fatal,
    /// Code declared by a grammar author on an [ErrorHandler](crate::peg::ErrorHandler)
    Custom(String),
}

impl ErrorCode {
    pub fn as_str(&self) -> &str {
        match self {
            ErrorCode::LexicalError => "LEXICAL_ERROR",
            ErrorCode::TokenMismatch => "TOKEN_MISMATCH",
            ErrorCode::TokenExpectedEof => "TOKEN_EXPECTED_EOF",
            ErrorCode::RuleFailed => "RULE_FAILED",
            ErrorCode::SequenceFailed => "SEQUENCE_FAILED",
            ErrorCode::ChoiceAllFailed => "CHOICE_ALL_FAILED",
            ErrorCode::RepeatMinNotMet => "REPEAT_MIN_NOT_MET",
            ErrorCode::BuildFunctionFailed => "BUILD_FUNCTION_FAILED",
            ErrorCode::MaxDepthExceeded => "MAX_DEPTH_EXCEEDED",
            ErrorCode::Fatal => "FATAL",
            ErrorCode::Custom(code) => code,
        }
    }

    /// Fatal errors abort the driver regardless of recovery mode
    pub fn is_fatal(&self) -> bool {
        matches!(self, ErrorCode::MaxDepthExceeded | ErrorCode::Fatal)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ErrorCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// A diagnostic produced while parsing.
///
/// Carries enough position and grammar context for default messages as well as
/// for custom [ErrorHandler](crate::peg::ErrorHandler) conditions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParseError {
    pub code: ErrorCode,
    pub msg: String,
    pub span: Span,
    /// 0-based index of the failing element when a sequence failed
    pub failed_at: Option<usize>,
    /// Cursor position at the failure
    pub token_index: usize,
    /// Innermost rule being applied when the failure happened
    pub rule: Option<String>,
    /// Last meaningful rule completed right before the failing token
    pub prev_rule: Option<String>,
    /// Innermost meaningful rule enclosing the failure
    pub prev_inner_rule: Option<String>,
    #[serde(skip)]
    pub(crate) custom: bool,
}

impl ParseError {
    pub fn new(code: ErrorCode, msg: impl Into<String>, span: Span, token_index: usize) -> Self {
        Self {
            code,
            msg: msg.into(),
            span,
            failed_at: None,
            token_index,
            rule: None,
            prev_rule: None,
            prev_inner_rule: None,
            custom: false,
        }
    }

    pub fn with_rule(mut self, rule: Option<&str>) -> Self {
        self.rule = rule.map(str::to_string);
        self
    }

    pub fn with_failed_at(mut self, index: usize) -> Self {
        self.failed_at = Some(index);
        self
    }

    /// True if the message came from a grammar author's handler
    pub fn is_custom(&self) -> bool {
        self.custom
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}] at {}", self.msg, self.code, self.span)
    }
}

impl std::error::Error for ParseError {}

/// Grammar definition problems detected eagerly at construction time.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GrammarError {
    #[error("rule '{referenced_by}' references undefined rule '{rule}'")]
    UndefinedRule { rule: String, referenced_by: String },
    #[error("start rule '{0}' is not defined")]
    MissingStartRule(String),
    #[error("rule '{0}' is defined more than once")]
    DuplicateRule(String),
    #[error("rule '{rule}' has an invalid repetition range {min}..{max}")]
    InvalidRepeat {
        rule: String,
        min: usize,
        max: usize,
    },
    #[error("rule '{rule}' contains an empty {kind}")]
    EmptyComposite { rule: String, kind: &'static str },
}

/// Failure reported by a build function.
///
/// The rule's raw match is kept and a `BUILD_FUNCTION_FAILED` diagnostic is
/// recorded instead of aborting the parse.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct BuildError(pub String);

impl BuildError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

impl From<&str> for BuildError {
    fn from(msg: &str) -> Self {
        Self(msg.to_string())
    }
}

impl From<String> for BuildError {
    fn from(msg: String) -> Self {
        Self(msg)
    }
}
