//! Rule context tracking for diagnostics
//!
//! The evaluator keeps a cheap, approximate record of which rules are active and
//! which ones just completed. It exists only so that error conditions can ask
//! questions like "did the previous token belong to rule X" or "what is the
//! innermost meaningful rule here". It is best effort: completions recorded
//! during an attempt that later backtracks are not retracted.
//!
//! Rule names that look generated (leading underscore, dots, anything that is
//! not a plain identifier) are not meaningful and are skipped by the
//! innermost-rule queries.

use crate::peg::token::Token;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::VecDeque;

/// How many completed rules are remembered.
const HISTORY_LIMIT: usize = 32;

static MEANINGFUL_RULE_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_]*$").unwrap());

/// True if `name` is an author-facing rule name rather than a synthetic one.
pub fn is_meaningful_rule(name: &str) -> bool {
    MEANINGFUL_RULE_NAME.is_match(name)
}

/// A rule that matched tokens `start..end`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedRule {
    pub name: String,
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Default)]
pub(crate) struct RuleContext {
    /// Active rules, outermost first
    stack: Vec<String>,
    /// Cursor position where each active rule started
    starts: Vec<usize>,
    /// Completions counter at the time each active rule was entered
    entered_at: Vec<usize>,
    completions: usize,
    /// Rule entered most recently, whether or not it completed
    last_rule: Option<String>,
    last_leaf_rule: Option<CompletedRule>,
    /// Meaningful completions, oldest first
    history: VecDeque<CompletedRule>,
}

impl RuleContext {
    pub fn enter(&mut self, name: &str, start: usize) {
        self.stack.push(name.to_string());
        self.starts.push(start);
        self.entered_at.push(self.completions);
        self.last_rule = Some(name.to_string());
    }

    pub fn exit_success(&mut self, start: usize, end: usize) {
        let entered_at = self.entered_at.pop().unwrap_or(self.completions);
        self.starts.pop();
        if let Some(name) = self.stack.pop() {
            let completed = CompletedRule { name, start, end };
            if entered_at == self.completions && end > start {
                self.last_leaf_rule = Some(completed.clone());
            }
            self.record(completed);
        }
    }

    pub fn exit_failure(&mut self) {
        self.entered_at.pop();
        self.starts.pop();
        self.stack.pop();
    }

    /// Record a completion that did not go through enter/exit (memo hits)
    pub fn record_completion(&mut self, name: &str, start: usize, end: usize) {
        self.record(CompletedRule {
            name: name.to_string(),
            start,
            end,
        });
    }

    fn record(&mut self, completed: CompletedRule) {
        self.completions += 1;
        if !is_meaningful_rule(&completed.name) {
            return;
        }
        if self.history.len() == HISTORY_LIMIT {
            self.history.pop_front();
        }
        self.history.push_back(completed);
    }

    pub fn stack(&self) -> &[String] {
        &self.stack
    }

    pub fn current(&self) -> Option<&str> {
        self.stack.last().map(String::as_str)
    }

    /// Where the innermost active rule started
    pub fn current_start(&self) -> Option<usize> {
        self.starts.last().copied()
    }

    pub fn last_rule(&self) -> Option<&str> {
        self.last_rule.as_deref()
    }

    pub fn last_leaf_rule(&self) -> Option<&CompletedRule> {
        self.last_leaf_rule.as_ref()
    }

    /// Innermost active rule with a meaningful name
    pub fn inner_rule(&self) -> Option<&str> {
        self.stack
            .iter()
            .rev()
            .map(String::as_str)
            .find(|name| is_meaningful_rule(name))
    }

    /// Most recent meaningful non-empty completion ending at `boundary`
    pub fn prev_rule(&self, boundary: usize) -> Option<&str> {
        self.completed_at(boundary).next().map(|c| c.name.as_str())
    }

    pub fn completed_at(&self, boundary: usize) -> impl Iterator<Item = &CompletedRule> {
        self.history
            .iter()
            .rev()
            .filter(move |c| c.end == boundary && c.end > c.start)
    }
}

/// What an error condition gets to know about the failure.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ErrorContext {
    /// Index of the failing sequence element, if a sequence failed
    pub failed_at: Option<usize>,
    pub token_index: usize,
    pub prev_rule: Option<String>,
    pub prev_inner_rule: Option<String>,
}

/// Read-only view of the parse state handed to error predicates.
///
/// Exposes lookahead, lookbehind and rule-context queries and nothing that can
/// move the cursor or alter results.
pub struct ContextQuery<'a> {
    tokens: &'a [Token],
    position: usize,
    ignored: &'a [String],
    context: &'a RuleContext,
}

impl<'a> ContextQuery<'a> {
    pub(crate) fn new(
        tokens: &'a [Token],
        position: usize,
        ignored: &'a [String],
        context: &'a RuleContext,
    ) -> Self {
        Self {
            tokens,
            position,
            ignored,
            context,
        }
    }

    /// Cursor position of the failure
    pub fn position(&self) -> usize {
        self.position
    }

    /// Raw token at `position + offset`
    pub fn peek(&self, offset: usize) -> Option<&'a Token> {
        self.tokens.get(self.position.checked_add(offset)?)
    }

    /// Nearest non-ignored token at or after the cursor
    pub fn next_token(&self) -> Option<&'a Token> {
        self.tokens[self.position.min(self.tokens.len())..]
            .iter()
            .find(|tok| !self.is_ignored(tok))
    }

    /// Nearest non-ignored token before the cursor
    pub fn prev_token(&self) -> Option<&'a Token> {
        self.tokens[..self.position.min(self.tokens.len())]
            .iter()
            .rev()
            .find(|tok| !self.is_ignored(tok))
    }

    pub fn is_next_token(&self, kind: &str) -> bool {
        self.next_token().is_some_and(|tok| tok.is(kind))
    }

    pub fn is_prev_token(&self, kind: &str) -> bool {
        self.prev_token().is_some_and(|tok| tok.is(kind))
    }

    pub fn at_end(&self) -> bool {
        self.next_token().is_none()
    }

    /// Active rules, outermost first
    pub fn rule_stack(&self) -> &'a [String] {
        self.context.stack()
    }

    pub fn current_rule(&self) -> Option<&'a str> {
        self.context.current()
    }

    /// True if the failure is at the position where the current rule started
    pub fn at_rule_start(&self) -> bool {
        self.context.current_start() == Some(self.position)
    }

    /// Innermost active rule with a meaningful name
    pub fn inner_rule(&self) -> Option<&'a str> {
        self.context.inner_rule()
    }

    pub fn is_inner_rule(&self, name: &str) -> bool {
        self.inner_rule() == Some(name)
    }

    /// Meaningful rule that completed right before the failing token
    pub fn prev_rule(&self) -> Option<&'a str> {
        self.context.prev_rule(self.boundary())
    }

    /// True if any rule named `name` ended right before the failing token
    pub fn is_prev_rule(&self, name: &str) -> bool {
        self.context
            .completed_at(self.boundary())
            .any(|c| c.name == name)
    }

    /// Rule the parser attempted most recently, even if it failed
    pub fn last_rule(&self) -> Option<&'a str> {
        self.context.last_rule()
    }

    /// Last completed rule that contained no nested rule completion
    pub fn last_leaf_rule(&self) -> Option<&'a str> {
        self.context.last_leaf_rule().map(|c| c.name.as_str())
    }

    fn is_ignored(&self, tok: &Token) -> bool {
        self.ignored.iter().any(|k| tok.is(k))
    }

    /// Cursor moved back over ignored tokens
    fn boundary(&self) -> usize {
        let mut at = self.position.min(self.tokens.len());
        while at > 0 && self.is_ignored(&self.tokens[at - 1]) {
            at -= 1;
        }
        at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::peg::testing::tokens_from_kinds;

    #[test]
    fn test_meaningful_names() {
        assert!(is_meaningful_rule("Expression"));
        assert!(is_meaningful_rule("let_statement"));
        assert!(!is_meaningful_rule("_group"));
        assert!(!is_meaningful_rule("Expression.tail"));
        assert!(!is_meaningful_rule("Call|Member"));
        assert!(!is_meaningful_rule(""));
    }

    #[test]
    fn test_stack_and_leaf_tracking() {
        let mut ctx = RuleContext::default();
        ctx.enter("Statement", 0);
        ctx.enter("Identifier", 0);
        ctx.exit_success(0, 1);
        ctx.enter("_tail", 1);
        ctx.exit_success(1, 1);

        assert_eq!(ctx.current(), Some("Statement"));
        assert_eq!(ctx.inner_rule(), Some("Statement"));
        assert_eq!(ctx.last_leaf_rule().map(|c| c.name.as_str()), Some("Identifier"));
        assert_eq!(ctx.prev_rule(1), Some("Identifier"));
        assert_eq!(ctx.last_rule(), Some("_tail"));

        ctx.exit_success(0, 1);
        assert_eq!(ctx.prev_rule(1), Some("Statement"));
        // Statement had nested completions, so it is not a leaf
        assert_eq!(ctx.last_leaf_rule().map(|c| c.name.as_str()), Some("Identifier"));
    }

    #[test]
    fn test_history_is_bounded() {
        let mut ctx = RuleContext::default();
        for i in 0..(HISTORY_LIMIT + 10) {
            ctx.record_completion("Item", i, i + 1);
        }
        assert_eq!(ctx.history.len(), HISTORY_LIMIT);
        assert_eq!(ctx.prev_rule(HISTORY_LIMIT + 10), Some("Item"));
        assert_eq!(ctx.prev_rule(1), None);
    }

    #[test]
    fn test_query_skips_ignored_tokens() {
        let tokens = tokens_from_kinds(&["ident", "ws", "=", "ws"]);
        let ignored = vec!["ws".to_string()];
        let mut ctx = RuleContext::default();
        ctx.enter("Let", 0);
        ctx.enter("Identifier", 0);
        ctx.exit_success(0, 1);

        let query = ContextQuery::new(&tokens, 2, &ignored, &ctx);
        assert!(query.is_prev_token("ident"));
        assert!(query.is_next_token("="));
        assert_eq!(query.peek(1).map(|t| t.kind.as_str()), Some("ws"));
        assert!(query.is_prev_rule("Identifier"));
        assert_eq!(query.prev_rule(), Some("Identifier"));
        assert!(query.is_inner_rule("Let"));
        assert!(!query.at_rule_start());
        assert!(ContextQuery::new(&tokens, 0, &ignored, &ctx).at_rule_start());
        assert_eq!(query.rule_stack(), &["Let".to_string()]);

        let at_end = ContextQuery::new(&tokens, 3, &ignored, &ctx);
        assert!(at_end.at_end());

        ctx.enter("Expression", 2);
        ctx.exit_failure();
        let query = ContextQuery::new(&tokens, 2, &ignored, &ctx);
        assert_eq!(query.last_rule(), Some("Expression"));
        assert_eq!(query.last_leaf_rule(), Some("Identifier"));
    }
}
