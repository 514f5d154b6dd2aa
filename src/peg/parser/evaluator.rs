//! Pattern evaluation
//!
//! Every evaluation returns `Ok(match)` with the cursor advanced past what was
//! consumed, or a [Fail] with the cursor restored to where the pattern started.
//! Unwinding to the nearest silent boundary is plain `Result` propagation:
//!
//!     - A silent pattern (or anything evaluated inside one) fails with
//!       [Fail::NoMatch], which carries no diagnostic.
//!     - A loud pattern fails with [Fail::Error]. The error is data until the
//!       driver decides to record it.
//!     - [Fail::Fatal] crosses silent boundaries and aborts the parse.
//!
//! Only two things ever record errors: the driver, and build functions that
//! fail in a loud context. Build errors belong to the match that produced
//! them, so a failing evaluation discards whatever its children recorded.
//!
//! Recursion runs on a growable stack, so `max_depth` is the only limit on
//! nesting.

use super::context::{ContextQuery, ErrorContext, RuleContext};
use super::memo::{MemoCache, MemoKey, MEMO_MAX_DEPTH};
use crate::peg::config::{DebugLevel, ParserConfig};
use crate::peg::error::{ErrorCode, ParseError};
use crate::peg::grammar::pattern::{
    ChoicePattern, Pattern, RepeatPattern, RulePattern, SeqPattern, TokenPattern,
};
use crate::peg::grammar::{Rule, Rules};
use crate::peg::result::{Match, Statistics};
use crate::peg::token::{Span, Token};
use tracing::{debug, trace};

/// Remaining stack below which evaluation moves to a fresh segment
const STACK_RED_ZONE: usize = 128 * 1024;
/// Size of each additional stack segment
const STACK_SEGMENT: usize = 2 * 1024 * 1024;

/// Why a pattern did not match.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Fail {
    /// Silent failure
    NoMatch,
    /// Loud failure with its diagnostic
    Error(Box<ParseError>),
    /// Unrecoverable; propagates through silent patterns
    Fatal(Box<ParseError>),
}

pub(crate) type Eval<T> = Result<Match<T>, Fail>;

pub(crate) struct Evaluator<'a, T> {
    rules: &'a Rules<T>,
    config: &'a ParserConfig,
    tokens: &'a [Token],
    cache: &'a mut MemoCache<T>,
    index: usize,
    depth: usize,
    silent_stack: Vec<bool>,
    context: RuleContext,
    pub errors: Vec<ParseError>,
    pub stats: Statistics,
}

impl<'a, T: Clone> Evaluator<'a, T> {
    pub fn new(
        rules: &'a Rules<T>,
        config: &'a ParserConfig,
        tokens: &'a [Token],
        cache: &'a mut MemoCache<T>,
    ) -> Self {
        cache.clear();
        Self {
            rules,
            config,
            tokens,
            cache,
            index: 0,
            depth: 0,
            silent_stack: Vec::new(),
            context: RuleContext::default(),
            errors: Vec::new(),
            stats: Statistics::default(),
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn set_index(&mut self, index: usize) {
        self.index = index.min(self.tokens.len());
    }

    pub fn traces(&self, level: DebugLevel) -> bool {
        self.config.debug.enables(level)
    }

    fn in_silent(&self) -> bool {
        self.silent_stack.last().copied().unwrap_or(false)
    }

    /// Record an error, honoring silent context and the configured limits.
    ///
    /// Returns whether the error was kept.
    pub fn add_error(&mut self, error: ParseError) -> bool {
        if self.in_silent() {
            return false;
        }
        let limit = self.config.error_recovery.max_errors;
        let strict = !self.config.is_resilient();
        if (strict && !self.errors.is_empty()) || (limit > 0 && self.errors.len() >= limit) {
            if self.traces(DebugLevel::Debug) {
                debug!(code = %error.code, "error limit reached, dropping error");
            }
            return false;
        }
        if self.traces(DebugLevel::Warn) {
            tracing::warn!(code = %error.code, span = %error.span, "{}", error.msg);
        }
        self.errors.push(error);
        true
    }

    /// Error limit reached; further errors would be dropped
    pub fn error_limit_reached(&self) -> bool {
        let limit = self.config.error_recovery.max_errors;
        limit > 0 && self.errors.len() >= limit
    }

    /// Advance past ignored tokens, using the rule's own list when it has one
    pub fn skip_ignored(&mut self, parent: Option<&Rule<T>>) {
        let ignored = self.ignored_for(parent);
        while self
            .tokens
            .get(self.index)
            .is_some_and(|tok| ignored.iter().any(|k| tok.is(k)))
        {
            self.index += 1;
        }
    }

    fn ignored_for(&self, parent: Option<&Rule<T>>) -> &'a [String] {
        let rules: &'a Rules<T> = self.rules;
        let config: &'a ParserConfig = self.config;
        parent
            .and_then(|rule| rules.get(&rule.name))
            .and_then(|rule| rule.options.ignored.as_deref())
            .unwrap_or(config.ignored.as_slice())
    }

    /// Evaluate `pattern` in the rule `parent`.
    pub fn evaluate(&mut self, pattern: &'a Pattern, parent: Option<&'a Rule<T>>) -> Eval<T> {
        let silent = parent.is_some_and(|r| r.options.silent) || pattern.is_silent() || self.in_silent();
        let start = self.index;
        let recorded = self.errors.len();

        self.depth += 1;
        self.silent_stack.push(silent);
        let result = stacker::maybe_grow(STACK_RED_ZONE, STACK_SEGMENT, || {
            self.evaluate_guarded(pattern, parent, silent, start)
        });
        self.silent_stack.pop();
        self.depth -= 1;

        let fail = match result {
            Ok(m) => return Ok(m),
            Err(fail) => fail,
        };
        self.index = start;
        if self.errors.len() > recorded {
            if self.traces(DebugLevel::Debug) {
                debug!(
                    discarded = self.errors.len() - recorded,
                    position = start,
                    "discarding build errors of a failed match"
                );
            }
            self.errors.truncate(recorded);
        }
        match fail {
            Fail::Fatal(error) => Err(Fail::Fatal(error)),
            _ if silent => Err(Fail::NoMatch),
            fail => Err(fail),
        }
    }

    fn evaluate_guarded(
        &mut self,
        pattern: &'a Pattern,
        parent: Option<&'a Rule<T>>,
        silent: bool,
        start: usize,
    ) -> Eval<T> {
        if self.depth > self.config.max_depth {
            let error = self.error_here(
                ErrorCode::MaxDepthExceeded,
                format!("Maximum parse depth of {} exceeded", self.config.max_depth),
                parent,
            );
            return Err(Fail::Fatal(Box::new(error)));
        }

        let recorded = self.errors.len();
        let key = self
            .memoizes(pattern)
            .then(|| MemoKey::new(pattern, start, silent, recorded));

        if let Some(key) = &key {
            if let Some((value, end)) = self.cache.get(key) {
                self.stats.memo_hits += 1;
                if let Pattern::Rule(p) = pattern {
                    self.context.record_completion(&p.name, start, end);
                }
                if self.traces(DebugLevel::Trace) {
                    trace!(pattern = %pattern, position = start, end, "memo hit");
                }
                self.index = end;
                return Ok(value);
            }
            self.stats.memo_misses += 1;
        }

        let result = match pattern {
            Pattern::Token(p) => self.match_token(p, parent, silent),
            Pattern::Rule(p) => self.apply_rule(p, silent),
            Pattern::Seq(p) => self.match_seq(p, parent, silent),
            Pattern::Choice(p) => self.match_choice(p, parent, silent),
            Pattern::Repeat(p) => self.match_repeat(p, parent, silent),
            Pattern::Optional(p) => match self.evaluate(&p.element, parent) {
                Ok(m) => Ok(m),
                Err(Fail::Fatal(error)) => Err(Fail::Fatal(error)),
                Err(_) => {
                    self.index = start;
                    Ok(Match::Absent)
                }
            },
        };

        // A hit would skip the build errors this evaluation recorded
        let replayable = self.errors.len() == recorded;
        if let (Some(key), Ok(m), true) = (key, &result, replayable) {
            let evicted = self.cache.insert(key, m.clone(), self.index, self.errors.len());
            if evicted > 0 && self.traces(DebugLevel::Debug) {
                debug!(evicted, remaining = self.cache.len(), "memo eviction");
            }
        }
        result
    }

    fn memoizes(&self, pattern: &Pattern) -> bool {
        self.config.memoize
            && self.config.max_cache_size > 0
            && self.depth <= MEMO_MAX_DEPTH
            && pattern.is_memoizable()
    }

    fn match_token(&mut self, p: &TokenPattern, parent: Option<&'a Rule<T>>, silent: bool) -> Eval<T> {
        match self.tokens.get(self.index) {
            Some(tok) if tok.is(&p.name) => {
                self.index += 1;
                self.stats.tokens_processed += 1;
                Ok(Match::Token(tok.clone()))
            }
            _ if silent => Err(Fail::NoMatch),
            Some(tok) => {
                let error = self.error_here(
                    ErrorCode::TokenMismatch,
                    format!("Expected '{}', got '{}'", p.name, tok.kind),
                    parent,
                );
                Err(self.loud(parent, error, false))
            }
            None => {
                let error = self.error_here(
                    ErrorCode::TokenExpectedEof,
                    format!("Expected '{}', got end of input", p.name),
                    parent,
                );
                Err(self.loud(parent, error, false))
            }
        }
    }

    fn apply_rule(&mut self, p: &RulePattern, silent: bool) -> Eval<T> {
        let rules: &'a Rules<T> = self.rules;
        let Some(rule) = rules.get(&p.name) else {
            let error = self.error_here(ErrorCode::Fatal, format!("Undefined rule '{}'", p.name), None);
            return Err(Fail::Fatal(Box::new(error)));
        };

        let start = self.index;
        self.context.enter(&rule.name, start);
        if self.traces(DebugLevel::Trace) {
            trace!(rule = %rule.name, position = start, "enter rule");
        }

        match self.evaluate(&rule.pattern, Some(rule)) {
            Ok(raw) => {
                self.context.exit_success(start, self.index);
                self.stats.rules_applied += 1;
                Ok(self.build(rule, raw, start))
            }
            Err(Fail::NoMatch) if !silent => {
                let error = self.error_here(
                    ErrorCode::RuleFailed,
                    format!("Failed to parse '{}'", rule.name),
                    Some(rule),
                );
                let fail = self.loud(Some(rule), error, false);
                self.context.exit_failure();
                Err(fail)
            }
            Err(fail) => {
                self.context.exit_failure();
                Err(fail)
            }
        }
    }

    fn build(&mut self, rule: &Rule<T>, raw: Match<T>, start: usize) -> Match<T> {
        let Some(build) = &rule.options.build else {
            return raw;
        };
        match build(raw.clone()) {
            Ok(node) => Match::Node(node),
            Err(cause) => {
                let span = raw
                    .span()
                    .unwrap_or_else(|| Span::point(self.offset_at(start)));
                let mut error = ParseError::new(
                    ErrorCode::BuildFunctionFailed,
                    format!("Build function for '{}' failed: {}", rule.name, cause),
                    span,
                    start,
                )
                .with_rule(Some(&rule.name));
                error.prev_inner_rule = self.context.inner_rule().map(str::to_string);
                self.add_error(error);
                raw
            }
        }
    }

    fn match_seq(&mut self, p: &'a SeqPattern, parent: Option<&'a Rule<T>>, silent: bool) -> Eval<T> {
        let start = self.index;
        let mut items = Vec::with_capacity(p.patterns.len());

        for (i, child) in p.patterns.iter().enumerate() {
            if i > 0 {
                self.skip_ignored(parent);
            }
            let failure = match self.evaluate(child, parent) {
                Ok(m) => {
                    items.push(m);
                    continue;
                }
                Err(fail) => fail,
            };

            let error = match failure {
                Fail::Fatal(error) => {
                    self.index = start;
                    return Err(Fail::Fatal(error));
                }
                _ if silent => {
                    self.index = start;
                    return Err(Fail::NoMatch);
                }
                Fail::Error(error) if error.is_custom() => *error,
                Fail::Error(error) => (*error).with_failed_at(i),
                Fail::NoMatch => self
                    .error_here(
                        ErrorCode::SequenceFailed,
                        format!("Sequence failed at element {}", i),
                        parent,
                    )
                    .with_failed_at(i),
            };
            self.index = start;
            return Err(self.loud(parent, error, true));
        }

        Ok(Match::List(items))
    }

    fn match_choice(
        &mut self,
        p: &'a ChoicePattern,
        parent: Option<&'a Rule<T>>,
        silent: bool,
    ) -> Eval<T> {
        let start = self.index;
        let mut farthest: Option<Box<ParseError>> = None;

        for alternative in &p.patterns {
            match self.evaluate(alternative, parent) {
                Ok(m) => return Ok(m),
                Err(Fail::Fatal(error)) => return Err(Fail::Fatal(error)),
                Err(Fail::NoMatch) => {}
                Err(Fail::Error(error)) => {
                    // Ties go to custom errors, then to later alternatives
                    let replaces = farthest.as_ref().map_or(true, |f| {
                        error.token_index > f.token_index
                            || (error.token_index == f.token_index
                                && (error.is_custom() || !f.is_custom()))
                    });
                    if replaces {
                        farthest = Some(error);
                    }
                }
            }
            self.index = start;
        }

        if silent {
            return Err(Fail::NoMatch);
        }
        let error = match farthest {
            Some(error) => *error,
            None => {
                let expected: Vec<String> = p.patterns.iter().map(Pattern::describe).collect();
                let msg = format!(
                    "Expected one of {}, got {}",
                    expected.join(", "),
                    self.describe_current()
                );
                self.error_here(ErrorCode::ChoiceAllFailed, msg, parent)
            }
        };
        Err(self.loud(parent, error, false))
    }

    fn match_repeat(
        &mut self,
        p: &'a RepeatPattern,
        parent: Option<&'a Rule<T>>,
        silent: bool,
    ) -> Eval<T> {
        let start = self.index;
        let mut items = Vec::new();
        let mut stopped_at = start;

        loop {
            if p.max.is_some_and(|max| items.len() >= max) {
                break;
            }
            let before = self.index;
            if !items.is_empty() {
                self.skip_ignored(parent);
                if let Some(separator) = &p.separator {
                    match self.evaluate(separator, parent) {
                        Ok(_) => self.skip_ignored(parent),
                        Err(Fail::Fatal(error)) => {
                            self.index = start;
                            return Err(Fail::Fatal(error));
                        }
                        Err(_) => {
                            stopped_at = self.index;
                            self.index = before;
                            break;
                        }
                    }
                }
            }

            let element_start = self.index;
            match self.evaluate(&p.element, parent) {
                Ok(_) if self.index == element_start => {
                    // Zero-width matches would loop forever
                    self.index = before;
                    break;
                }
                Ok(m) => items.push(m),
                Err(Fail::Fatal(error)) => {
                    self.index = start;
                    return Err(Fail::Fatal(error));
                }
                Err(_) => {
                    stopped_at = element_start;
                    self.index = before;
                    break;
                }
            }
        }

        if items.len() < p.min {
            self.index = start;
            if silent {
                return Err(Fail::NoMatch);
            }
            let found = items.len();
            let error = self.error_at(
                stopped_at,
                ErrorCode::RepeatMinNotMet,
                format!(
                    "Expected at least {} {}, found {}",
                    p.min,
                    p.element.describe(),
                    found
                ),
                parent,
            );
            return Err(self.loud(parent, error, false));
        }

        if items.is_empty() && p.empty_as_absent {
            return Ok(Match::Absent);
        }
        Ok(Match::List(items))
    }

    /// Apply the rule's custom handlers to a loud failure.
    ///
    /// Index conditions only apply where a sequence failed (`in_seq`).
    fn loud(&self, parent: Option<&Rule<T>>, error: ParseError, in_seq: bool) -> Fail {
        Fail::Error(Box::new(self.customize(parent, error, in_seq)))
    }

    fn customize(&self, parent: Option<&Rule<T>>, mut error: ParseError, in_seq: bool) -> ParseError {
        let Some(rule) = parent else {
            return error;
        };
        if error.is_custom() || rule.options.errors.is_empty() {
            return error;
        }

        let context = ErrorContext {
            failed_at: error.failed_at,
            token_index: error.token_index,
            prev_rule: error.prev_rule.clone(),
            prev_inner_rule: error.prev_inner_rule.clone(),
        };
        let query = ContextQuery::new(
            self.tokens,
            error.token_index,
            self.ignored_for(Some(rule)),
            &self.context,
        );

        if let Some(handler) = rule
            .options
            .errors
            .iter()
            .filter(|handler| in_seq || !handler.cond.is_index())
            .find(|handler| handler.cond.matches(&query, &context))
        {
            error.msg = handler.msg.clone();
            if let Some(code) = &handler.code {
                error.code = ErrorCode::Custom(code.clone());
            }
            error.custom = true;
        }
        error
    }

    /// Diagnostic positioned at the current cursor
    pub fn error_here(
        &self,
        code: ErrorCode,
        msg: String,
        parent: Option<&Rule<T>>,
    ) -> ParseError {
        self.error_at(self.index, code, msg, parent)
    }

    fn error_at(
        &self,
        position: usize,
        code: ErrorCode,
        msg: String,
        parent: Option<&Rule<T>>,
    ) -> ParseError {
        let mut error = ParseError::new(code, msg, Span::point(self.offset_at(position)), position)
            .with_rule(parent.map(|r| r.name.as_str()).or(self.context.current()));
        let query = ContextQuery::new(self.tokens, position, self.ignored_for(parent), &self.context);
        error.prev_rule = query.prev_rule().map(str::to_string);
        error.prev_inner_rule = query.inner_rule().map(str::to_string);
        error
    }

    /// Source offset of the token at `position`, or the end of input
    fn offset_at(&self, position: usize) -> usize {
        match self.tokens.get(position) {
            Some(tok) => tok.span.start,
            None => self.tokens.last().map_or(0, |tok| tok.span.end),
        }
    }

    fn describe_current(&self) -> String {
        match self.tokens.get(self.index) {
            Some(tok) => format!("'{}'", tok.kind),
            None => "end of input".to_string(),
        }
    }
}
