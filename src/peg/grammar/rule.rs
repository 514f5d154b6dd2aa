//! Rules and their options

use crate::peg::error::BuildError;
use crate::peg::grammar::pattern::Pattern;
use crate::peg::parser::context::{ContextQuery, ErrorContext};
use crate::peg::recovery::RecoveryStrategy;
use crate::peg::result::Match;
use std::fmt;
use std::sync::Arc;

/// Turns a rule's raw match into a domain value.
pub type BuildFn<T> = Arc<dyn Fn(Match<T>) -> Result<T, BuildError> + Send + Sync>;

/// Predicate over the read-only parse context.
pub type ErrorPredicate = Arc<dyn Fn(&ContextQuery<'_>, &ErrorContext) -> bool + Send + Sync>;

/// When an [ErrorHandler] applies.
#[derive(Clone)]
pub enum ErrorCondition {
    /// The failing sequence element has this 0-based index
    Index(usize),
    /// The predicate returns true
    Predicate(ErrorPredicate),
}

impl ErrorCondition {
    pub fn when<F>(predicate: F) -> Self
    where
        F: Fn(&ContextQuery<'_>, &ErrorContext) -> bool + Send + Sync + 'static,
    {
        ErrorCondition::Predicate(Arc::new(predicate))
    }

    pub fn is_index(&self) -> bool {
        matches!(self, ErrorCondition::Index(_))
    }

    pub(crate) fn matches(&self, query: &ContextQuery<'_>, context: &ErrorContext) -> bool {
        match self {
            ErrorCondition::Index(index) => context.failed_at == Some(*index),
            ErrorCondition::Predicate(predicate) => predicate(query, context),
        }
    }
}

impl fmt::Debug for ErrorCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCondition::Index(index) => f.debug_tuple("Index").field(index).finish(),
            ErrorCondition::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

/// A custom message replacing the default error when its condition holds.
#[derive(Debug, Clone)]
pub struct ErrorHandler {
    pub cond: ErrorCondition,
    pub msg: String,
    pub code: Option<String>,
}

impl ErrorHandler {
    pub fn new(cond: ErrorCondition, msg: impl Into<String>) -> Self {
        Self {
            cond,
            msg: msg.into(),
            code: None,
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }
}

/// Optional behaviour attached to a [Rule].
pub struct RuleOptions<T> {
    pub build: Option<BuildFn<T>>,
    pub errors: Vec<ErrorHandler>,
    pub recovery: Option<RecoveryStrategy>,
    /// Replaces the parser-wide ignored token kinds inside this rule
    pub ignored: Option<Vec<String>>,
    pub silent: bool,
}

impl<T> RuleOptions<T> {
    pub fn new() -> Self {
        Self {
            build: None,
            errors: Vec::new(),
            recovery: None,
            ignored: None,
            silent: false,
        }
    }

    pub fn build<F>(mut self, build: F) -> Self
    where
        F: Fn(Match<T>) -> Result<T, BuildError> + Send + Sync + 'static,
    {
        self.build = Some(Arc::new(build));
        self
    }

    pub fn errors(mut self, errors: impl IntoIterator<Item = ErrorHandler>) -> Self {
        self.errors.extend(errors);
        self
    }

    pub fn recovery(mut self, strategy: RecoveryStrategy) -> Self {
        self.recovery = Some(strategy);
        self
    }

    pub fn ignored<S: Into<String>>(mut self, kinds: impl IntoIterator<Item = S>) -> Self {
        self.ignored = Some(kinds.into_iter().map(Into::into).collect());
        self
    }

    pub fn silent(mut self, silent: bool) -> Self {
        self.silent = silent;
        self
    }
}

impl<T> Default for RuleOptions<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for RuleOptions<T> {
    fn clone(&self) -> Self {
        Self {
            build: self.build.clone(),
            errors: self.errors.clone(),
            recovery: self.recovery.clone(),
            ignored: self.ignored.clone(),
            silent: self.silent,
        }
    }
}

impl<T> fmt::Debug for RuleOptions<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleOptions")
            .field("build", &self.build.as_ref().map(|_| ".."))
            .field("errors", &self.errors)
            .field("recovery", &self.recovery)
            .field("ignored", &self.ignored)
            .field("silent", &self.silent)
            .finish()
    }
}

/// A named, reusable pattern.
pub struct Rule<T> {
    pub name: String,
    pub pattern: Pattern,
    pub options: RuleOptions<T>,
}

impl<T> Rule<T> {
    pub fn new(name: impl Into<String>, pattern: Pattern) -> Self {
        Self::with_options(name, pattern, RuleOptions::new())
    }

    pub fn with_options(name: impl Into<String>, pattern: Pattern, options: RuleOptions<T>) -> Self {
        Self {
            name: name.into(),
            pattern,
            options,
        }
    }

    pub fn build<F>(mut self, build: F) -> Self
    where
        F: Fn(Match<T>) -> Result<T, BuildError> + Send + Sync + 'static,
    {
        self.options = self.options.build(build);
        self
    }

    pub fn errors(mut self, errors: impl IntoIterator<Item = ErrorHandler>) -> Self {
        self.options = self.options.errors(errors);
        self
    }

    pub fn recovery(mut self, strategy: RecoveryStrategy) -> Self {
        self.options = self.options.recovery(strategy);
        self
    }

    pub fn silent(mut self) -> Self {
        self.options.silent = true;
        self
    }
}

impl<T> Clone for Rule<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            pattern: self.pattern.clone(),
            options: self.options.clone(),
        }
    }
}

impl<T> fmt::Debug for Rule<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("name", &self.name)
            .field("pattern", &self.pattern)
            .field("options", &self.options)
            .finish()
    }
}
