//! The combinator tree
//!
//! A [Pattern] is an immutable tree built by the functions in
//! [combinators](crate::peg::grammar::combinators). Every variant carries its
//! own payload struct, and the evaluator dispatches on the enum exhaustively.

use std::fmt;

/// Matches one token whose kind equals `name`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPattern {
    pub name: String,
    pub silent: bool,
}

/// Dispatches to the named rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RulePattern {
    pub name: String,
    pub silent: bool,
}

/// Ordered conjunction, all-or-nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeqPattern {
    pub patterns: Vec<Pattern>,
    pub silent: bool,
}

/// Ordered disjunction, first success wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoicePattern {
    pub patterns: Vec<Pattern>,
    pub silent: bool,
}

/// Greedy repetition with an optional separator between elements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepeatPattern {
    pub element: Box<Pattern>,
    pub min: usize,
    /// `None` is unbounded
    pub max: Option<usize>,
    pub separator: Option<Box<Pattern>>,
    pub silent: bool,
    /// Report an empty repetition as "no match" instead of an empty list
    pub empty_as_absent: bool,
}

/// Zero-or-one; never fails, yields [Match::Absent](crate::peg::Match::Absent) when not passed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionalPattern {
    pub element: Box<Pattern>,
}

/// A node of the grammar's combinator tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pattern {
    Token(TokenPattern),
    Rule(RulePattern),
    Seq(SeqPattern),
    Choice(ChoicePattern),
    Repeat(RepeatPattern),
    Optional(OptionalPattern),
}

impl Pattern {
    /// Failure of a silent pattern is an ordinary "no match"
    pub fn is_silent(&self) -> bool {
        match self {
            Pattern::Token(p) => p.silent,
            Pattern::Rule(p) => p.silent,
            Pattern::Seq(p) => p.silent,
            Pattern::Choice(p) => p.silent,
            Pattern::Repeat(p) => p.silent,
            Pattern::Optional(_) => true,
        }
    }

    /// Same pattern with the silent flag set to `silent`.
    ///
    /// Optional patterns are always silent and ignore the flag.
    pub fn with_silent(mut self, silent: bool) -> Self {
        match &mut self {
            Pattern::Token(p) => p.silent = silent,
            Pattern::Rule(p) => p.silent = silent,
            Pattern::Seq(p) => p.silent = silent,
            Pattern::Choice(p) => p.silent = silent,
            Pattern::Repeat(p) => p.silent = silent,
            Pattern::Optional(_) => {}
        }
        self
    }

    pub fn silent(self) -> Self {
        self.with_silent(true)
    }

    pub fn loud(self) -> Self {
        self.with_silent(false)
    }

    /// For repetitions: report an empty match as "no match".
    pub fn or_absent(mut self) -> Self {
        if let Pattern::Repeat(p) = &mut self {
            p.empty_as_absent = true;
        }
        self
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Pattern::Token(_) => "token",
            Pattern::Rule(_) => "rule",
            Pattern::Seq(_) => "seq",
            Pattern::Choice(_) => "choice",
            Pattern::Repeat(_) => "repeat",
            Pattern::Optional(_) => "optional",
        }
    }

    /// Whether results of this pattern are worth caching.
    ///
    /// Plain tokens are cheaper to re-match than to look up.
    pub fn is_memoizable(&self) -> bool {
        match self {
            Pattern::Token(_) => false,
            Pattern::Rule(_) | Pattern::Seq(_) | Pattern::Choice(_) | Pattern::Optional(_) => true,
            Pattern::Repeat(p) => p.min > 1,
        }
    }

    /// Direct sub-patterns, separators included
    pub fn children(&self) -> Vec<&Pattern> {
        match self {
            Pattern::Token(_) | Pattern::Rule(_) => Vec::new(),
            Pattern::Seq(p) => p.patterns.iter().collect(),
            Pattern::Choice(p) => p.patterns.iter().collect(),
            Pattern::Repeat(p) => {
                let mut out = vec![p.element.as_ref()];
                if let Some(sep) = &p.separator {
                    out.push(sep.as_ref());
                }
                out
            }
            Pattern::Optional(p) => vec![p.element.as_ref()],
        }
    }

    /// Short description used in default error messages
    pub fn describe(&self) -> String {
        match self {
            Pattern::Token(p) => format!("'{}'", p.name),
            Pattern::Rule(p) => p.name.clone(),
            Pattern::Seq(p) => p
                .patterns
                .first()
                .map(Pattern::describe)
                .unwrap_or_else(|| "sequence".to_string()),
            Pattern::Choice(p) => {
                let alternatives: Vec<String> = p.patterns.iter().map(Pattern::describe).collect();
                format!("one of {}", alternatives.join(", "))
            }
            Pattern::Repeat(p) => p.element.describe(),
            Pattern::Optional(p) => p.element.describe(),
        }
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pattern::Token(p) => write!(f, "'{}'", p.name),
            Pattern::Rule(p) => write!(f, "{}", p.name),
            Pattern::Seq(p) => write_list(f, "seq", &p.patterns),
            Pattern::Choice(p) => write_list(f, "choice", &p.patterns),
            Pattern::Repeat(p) => {
                match p.max {
                    Some(max) => write!(f, "repeat({}, {}..={}", p.element, p.min, max)?,
                    None => write!(f, "repeat({}, {}..", p.element, p.min)?,
                }
                if let Some(sep) = &p.separator {
                    write!(f, ", sep {}", sep)?;
                }
                write!(f, ")")
            }
            Pattern::Optional(p) => write!(f, "optional({})", p.element),
        }
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, name: &str, patterns: &[Pattern]) -> fmt::Result {
    write!(f, "{}(", name)?;
    for (i, pattern) in patterns.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", pattern)?;
    }
    write!(f, ")")
}
