//! The parsing driver
//!
//! [Parser] owns a validated rule table and its configuration. Each call to
//! [Parser::parse] starts from a clean state and repeatedly applies the start
//! rule until the input is exhausted, collecting one AST entry per application.
//!
//! Malformed input never makes `parse` fail. Problems are collected into
//! [ParseResult::errors]; in resilient mode the driver repositions the cursor
//! with the failing rule's [RecoveryStrategy] and keeps going.
//!
//! Termination is bounded by:
//!
//!     - the depth guard (`max_depth`), which also catches left recursion
//!     - the error limit (`max_errors`)
//!     - [MAX_CONSECUTIVE_ERRORS] failed applications in a row
//!     - forced single-token progress after every recovery
//!
//! Recovery scans from the position where the failure was detected, which may
//! be past the start of the failed application.

pub mod context;
mod evaluator;
mod memo;

pub use context::{is_meaningful_rule, CompletedRule, ContextQuery, ErrorContext};
pub use memo::MEMO_MAX_DEPTH;

use crate::peg::config::{DebugLevel, ParserConfig};
use crate::peg::error::{ErrorCode, GrammarError, ParseError};
use crate::peg::grammar::{rule, Pattern, Rule, Rules};
use crate::peg::recovery::RecoveryStrategy;
use crate::peg::result::{Match, ParseResult};
use crate::peg::token::{Span, Token};
use evaluator::{Evaluator, Fail};
use memo::MemoCache;
use std::fmt;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Failed start-rule applications in a row before the driver gives up.
pub const MAX_CONSECUTIVE_ERRORS: usize = 10;

pub struct Parser<T> {
    rules: Rules<T>,
    config: ParserConfig,
    start: Pattern,
    cache: MemoCache<T>,
}

impl<T: Clone> Parser<T> {
    /// Validate `rules` and build a parser.
    ///
    /// Fails if the grammar is malformed or the configured start rule does not
    /// exist. Left-recursive rules are accepted but reported through tracing.
    pub fn new(
        rules: impl IntoIterator<Item = Rule<T>>,
        config: ParserConfig,
    ) -> Result<Self, GrammarError> {
        Self::from_rules(Rules::new(rules)?, config)
    }

    pub fn from_rules(rules: Rules<T>, config: ParserConfig) -> Result<Self, GrammarError> {
        if !rules.contains(&config.start_rule) {
            return Err(GrammarError::MissingStartRule(config.start_rule.clone()));
        }
        if config.debug.enables(DebugLevel::Warn) {
            for name in rules.left_recursive_rules() {
                warn!(rule = name, "left-recursive rule only terminates through the depth guard");
            }
        }

        let start = rule(config.start_rule.as_str());
        let cache = MemoCache::new(config.max_cache_size, config.cache_freshness);
        Ok(Self {
            rules,
            config,
            start,
            cache,
        })
    }

    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    pub fn rules(&self) -> &Rules<T> {
        &self.rules
    }

    /// Entries currently held by the packrat cache
    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    /// Release the rule table and cache.
    ///
    /// Dropping the parser does the same; this exists so callers can end a
    /// parser's lifetime explicitly at the call site.
    pub fn dispose(self) {
        drop(self);
    }

    /// Parse `tokens` from the start rule.
    ///
    /// All per-parse state (cursor, errors, cache, statistics, rule context) is
    /// reset first, so a parser can be reused for any number of inputs.
    pub fn parse(&mut self, tokens: &[Token]) -> ParseResult<T> {
        let started = Instant::now();
        let Self {
            rules,
            config,
            start,
            cache,
        } = self;
        let rules: &Rules<T> = rules;
        let config: &ParserConfig = config;
        let start: &Pattern = start;

        let mut eval = Evaluator::new(rules, config, tokens, cache);
        let mut ast = Vec::new();

        if let Some((index, tok)) = tokens.iter().enumerate().find(|(_, tok)| tok.is_error()) {
            eval.add_error(ParseError::new(
                ErrorCode::LexicalError,
                format!("Unexpected token '{}'", tok.text()),
                Span::point(tok.span.start),
                index,
            ));
            return finish(ast, eval, started);
        }

        let start_recovery = rules
            .get(&config.start_rule)
            .and_then(|r| r.options.recovery.as_ref());
        let mut consecutive = 0;

        eval.skip_ignored(None);
        while eval.index() < tokens.len() {
            let begin = eval.index();
            let failure = match eval.evaluate(start, None) {
                Ok(m) => {
                    ast.push(m);
                    consecutive = 0;
                    if eval.index() == begin {
                        if eval.traces(DebugLevel::Debug) {
                            debug!(position = begin, "start rule matched without consuming input");
                        }
                        break;
                    }
                    eval.skip_ignored(None);
                    continue;
                }
                Err(fail) => fail,
            };

            let error = match failure {
                Fail::Error(error) | Fail::Fatal(error) => *error,
                Fail::NoMatch => eval.error_here(
                    ErrorCode::RuleFailed,
                    format!("Failed to parse '{}'", config.start_rule),
                    None,
                ),
            };
            let fatal = error.code.is_fatal();
            let failing_rule = error.rule.clone();
            let from = error.token_index.max(begin);
            eval.add_error(error);
            consecutive += 1;

            if fatal || !config.is_resilient() || eval.error_limit_reached() {
                break;
            }
            if consecutive >= MAX_CONSECUTIVE_ERRORS {
                if eval.traces(DebugLevel::Warn) {
                    warn!(position = begin, "too many consecutive errors, giving up");
                }
                break;
            }

            let strategy = failing_rule
                .as_deref()
                .and_then(|name| rules.get(name))
                .and_then(|r| r.options.recovery.as_ref())
                .or(start_recovery);
            let next = match strategy {
                Some(strategy) => strategy.recover(tokens, from),
                None => RecoveryStrategy::SkipOne.recover(tokens, from),
            };
            eval.set_index(next.max(begin + 1));
            eval.stats.errors_recovered += 1;
            if eval.traces(DebugLevel::Debug) {
                debug!(from = begin, to = eval.index(), "recovered");
            }
            eval.skip_ignored(None);
        }

        finish(ast, eval, started)
    }
}

fn finish<T: Clone>(ast: Vec<Match<T>>, eval: Evaluator<'_, T>, started: Instant) -> ParseResult<T> {
    let traces = eval.traces(DebugLevel::Info);
    let mut statistics = eval.stats;
    statistics.parse_time_ms = started.elapsed().as_secs_f64() * 1000.0;
    if traces {
        info!(
            entries = ast.len(),
            errors = eval.errors.len(),
            tokens = statistics.tokens_processed,
            memo_hits = statistics.memo_hits,
            elapsed_ms = statistics.parse_time_ms,
            "parse finished"
        );
    }
    ParseResult {
        ast,
        errors: eval.errors,
        statistics: Some(statistics),
    }
}

impl<T> fmt::Debug for Parser<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Parser")
            .field("rules", &self.rules.names().collect::<Vec<_>>())
            .field("config", &self.config)
            .field("cached", &self.cache.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::peg::grammar::*;
    use crate::peg::recovery::{skip_past, skip_until};
    use crate::peg::testing::{error_token, tokens_from_kinds, tokens_from_str};

    fn literal_parser() -> Parser<()> {
        let config = ParserConfig::new().resilient().with_max_errors(0);
        Parser::new(
            [Rule::new("root", choice([token("ok"), token("fk")]))],
            config,
        )
        .unwrap()
    }

    #[test]
    fn test_each_application_yields_an_entry() {
        let mut parser = literal_parser();

        let result = parser.parse(&tokens_from_str("ok"));
        assert!(result.errors.is_empty());
        assert_eq!(result.ast.len(), 1);
        assert_eq!(result.ast[0].as_token().map(|t| t.kind.as_str()), Some("ok"));

        let result = parser.parse(&tokens_from_str("ok fk"));
        assert!(result.errors.is_empty());
        let kinds: Vec<_> = result
            .ast
            .iter()
            .filter_map(Match::as_token)
            .map(|t| t.kind.as_str())
            .collect();
        assert_eq!(kinds, vec!["ok", "fk"]);
    }

    #[test]
    fn test_lexical_error_short_circuits() {
        let mut parser = literal_parser();
        let mut tokens = tokens_from_str("ok ");
        tokens.push(error_token("k", 3));

        let result = parser.parse(&tokens);
        assert!(result.ast.is_empty());
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].code, ErrorCode::LexicalError);
        assert_eq!(result.errors[0].msg, "Unexpected token 'k'");
        assert_eq!(result.errors[0].span, Span::new(3, 3));
    }

    #[test]
    fn test_choice_reports_farthest_alternative() {
        let mut parser = literal_parser();
        let result = parser.parse(&tokens_from_str("notOk"));

        assert!(result.ast.is_empty());
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].code, ErrorCode::TokenMismatch);
        assert_eq!(result.errors[0].msg, "Expected 'fk', got 'notOk'");
        assert_eq!(result.errors[0].span, Span::new(0, 0));
    }

    #[test]
    fn test_debug_lists_rules_and_cache() {
        let mut parser = literal_parser();
        parser.parse(&tokens_from_str("ok"));

        let debug = format!("{:?}", parser);
        assert!(debug.starts_with("Parser { rules: [\"root\"]"));
        assert!(debug.ends_with(&format!("cached: {} }}", parser.cache_len())));
    }

    #[test]
    fn test_empty_input() {
        let mut parser = literal_parser();
        let result = parser.parse(&[]);
        assert!(result.ast.is_empty());
        assert!(result.errors.is_empty());
        assert!(result.statistics.is_some());
    }

    #[test]
    fn test_missing_start_rule() {
        let err = Parser::<()>::new([Rule::new("A", token("a"))], ParserConfig::new()).unwrap_err();
        assert_eq!(err, GrammarError::MissingStartRule("root".into()));
    }

    #[test]
    fn test_strict_mode_stops_at_first_error() {
        let config = ParserConfig::new().with_max_errors(0);
        let mut parser =
            Parser::<()>::new([Rule::new("root", token("a"))], config).unwrap();

        let result = parser.parse(&tokens_from_str("a b a b"));
        assert_eq!(result.ast.len(), 1);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].msg, "Expected 'a', got 'b'");
    }

    #[test]
    fn test_max_errors_caps_recording() {
        let config = ParserConfig::new().resilient().with_max_errors(2);
        let mut parser =
            Parser::<()>::new([Rule::new("root", token("a"))], config).unwrap();

        let result = parser.parse(&tokens_from_str("b b b b a"));
        assert_eq!(result.errors.len(), 2);
    }

    #[test]
    fn test_consecutive_error_breaker() {
        let config = ParserConfig::new().resilient().with_max_errors(0);
        let mut parser =
            Parser::<()>::new([Rule::new("root", token("a"))], config).unwrap();

        let kinds = vec!["b"; 25];
        let result = parser.parse(&tokens_from_kinds(&kinds));
        assert_eq!(result.errors.len(), MAX_CONSECUTIVE_ERRORS);
        assert_eq!(
            result.statistics.map(|s| s.errors_recovered),
            Some(MAX_CONSECUTIVE_ERRORS - 1)
        );
    }

    #[test]
    fn test_sequence_index_error_and_recovery() {
        let statement = Rule::new("root", seq([token("x"), token(";")]))
            .errors([error(1, "Expected `;`")])
            .recovery(skip_past([";"]));
        let config = ParserConfig::new().resilient().with_max_errors(0);
        let mut parser = Parser::<()>::new([statement], config).unwrap();

        let result = parser.parse(&tokens_from_str("x y ; x ;"));
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].msg, "Expected `;`");
        assert_eq!(result.errors[0].failed_at, Some(1));
        assert!(result.errors[0].is_custom());
        assert_eq!(result.ast.len(), 1);
    }

    #[test]
    fn test_recovery_uses_failing_rule_strategy() {
        let rules = vec![
            Rule::new("root", rule("Item")),
            Rule::new("Item", seq([token("a"), token("b")])).recovery(skip_until(["a"])),
        ];
        let config = ParserConfig::new().resilient().with_max_errors(0);
        let mut parser = Parser::<()>::new(rules, config).unwrap();

        let result = parser.parse(&tokens_from_str("a c c c a b"));
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].rule.as_deref(), Some("Item"));
        assert_eq!(result.ast.len(), 1);
        assert_eq!(result.statistics.map(|s| s.errors_recovered), Some(1));
    }

    #[test]
    fn test_silent_rule_failure_becomes_rule_failed() {
        let rules = vec![
            Rule::new("root", seq([rule("Head"), token(";")])),
            Rule::new("Head", token("a")).silent(),
        ];
        let mut parser = Parser::<()>::new(rules, ParserConfig::new()).unwrap();

        let result = parser.parse(&tokens_from_str("b ;"));
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].code, ErrorCode::RuleFailed);
        assert_eq!(result.errors[0].msg, "Failed to parse 'Head'");
        assert_eq!(result.errors[0].failed_at, Some(0));
    }

    #[test]
    fn test_silent_seq_child_reports_sequence_failure() {
        let rules = vec![Rule::new("root", seq([token("a"), token("b").silent()]))];
        let mut parser = Parser::<()>::new(rules, ParserConfig::new()).unwrap();

        let result = parser.parse(&tokens_from_str("a c"));
        assert_eq!(result.errors[0].code, ErrorCode::SequenceFailed);
        assert_eq!(result.errors[0].msg, "Sequence failed at element 1");
        assert_eq!(result.errors[0].span, Span::point(2));
    }

    #[test]
    fn test_build_output_and_failure() {
        let rules = vec![
            Rule::new("root", seq([token("n"), token(";")])).build(|m| {
                let count = m.tokens().len();
                if count == 2 {
                    Ok(count)
                } else {
                    Err("unexpected shape".into())
                }
            }),
        ];
        let mut parser = Parser::new(rules, ParserConfig::new()).unwrap();
        let result = parser.parse(&tokens_from_str("n ;"));
        assert_eq!(result.nodes().collect::<Vec<_>>(), vec![&2]);

        let failing: Vec<Rule<usize>> =
            vec![Rule::new("root", token("n")).build(|_| Err("boom".into()))];
        let mut parser = Parser::new(failing, ParserConfig::new()).unwrap();
        let result = parser.parse(&tokens_from_str("n"));
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].code, ErrorCode::BuildFunctionFailed);
        assert_eq!(result.errors[0].msg, "Build function for 'root' failed: boom");
        // Raw match is kept
        assert_eq!(result.ast[0].as_token().map(|t| t.kind.as_str()), Some("n"));
    }

    #[test]
    fn test_build_failure_in_silent_context_is_not_recorded() {
        let rules: Vec<Rule<()>> = vec![
            Rule::new("root", choice([rule("Strict").silent(), token("n")])),
            Rule::new("Strict", token("n")).build(|_| Err("never".into())),
        ];
        let mut parser = Parser::new(rules, ParserConfig::new()).unwrap();
        let result = parser.parse(&tokens_from_str("n"));
        assert!(result.errors.is_empty());
        assert_eq!(result.ast.len(), 1);
    }

    #[test]
    fn test_left_recursion_hits_depth_guard() {
        let rules = vec![Rule::new(
            "root",
            choice([seq([rule("root"), token("+"), token("n")]), token("n")]),
        )];
        let config = ParserConfig::new()
            .resilient()
            .with_max_errors(0)
            .with_max_depth(64);
        let mut parser = Parser::<()>::new(rules, config).unwrap();

        let result = parser.parse(&tokens_from_str("n + n"));
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].code, ErrorCode::MaxDepthExceeded);
        assert_eq!(result.errors[0].msg, "Maximum parse depth of 64 exceeded");
    }

    #[test]
    fn test_repeat_min_not_met() {
        let rules = vec![Rule::new("root", seq([token("("), one_or_more(token("x")), token(")")]))];
        let mut parser = Parser::<()>::new(rules, ParserConfig::new()).unwrap();

        let result = parser.parse(&tokens_from_str("( )"));
        assert_eq!(result.errors[0].code, ErrorCode::RepeatMinNotMet);
        assert_eq!(result.errors[0].msg, "Expected at least 1 'x', found 0");
        assert_eq!(result.errors[0].failed_at, Some(1));
    }

    #[test]
    fn test_separated_repeat_excludes_separators() {
        let rules = vec![Rule::new(
            "root",
            seq([
                token("("),
                repeat_separated(token("x"), token(","), 0, None),
                token(")"),
            ]),
        )];
        let mut parser = Parser::<()>::new(rules, ParserConfig::new()).unwrap();

        let result = parser.parse(&tokens_from_str("( x , x , x )"));
        assert!(result.errors.is_empty());
        let items = result.ast[0].get(1).and_then(Match::as_list).unwrap();
        assert_eq!(items.len(), 3);
        assert!(items.iter().all(|m| m.as_token().is_some_and(|t| t.is("x"))));
    }

    #[test]
    fn test_trailing_separator_is_left_unconsumed() {
        let rules = vec![Rule::new(
            "root",
            seq([repeat_separated(token("x"), token(","), 1, None), token(",")]),
        )];
        let mut parser = Parser::<()>::new(rules, ParserConfig::new()).unwrap();
        let result = parser.parse(&tokens_from_str("x , x ,"));
        assert!(result.errors.is_empty());
        assert_eq!(result.ast[0].get(0).and_then(Match::as_list).map(|l| l.len()), Some(2));
    }

    #[test]
    fn test_optional_absent_and_or_absent() {
        let rules = vec![Rule::new(
            "root",
            seq([token("id"), optional(token("=")), zero_or_more(token("x")).or_absent()]),
        )];
        let mut parser = Parser::<()>::new(rules, ParserConfig::new()).unwrap();
        let result = parser.parse(&tokens_from_str("id"));

        assert!(result.errors.is_empty());
        assert_eq!(result.ast[0].get(1), Some(&Match::Absent));
        assert_eq!(result.ast[0].get(2), Some(&Match::Absent));
    }

    #[test]
    fn test_per_rule_ignored_replaces_global() {
        let rules = vec![
            Rule::new("root", rule("Line")),
            Rule::with_options(
                "Line",
                seq([token("a"), token("b")]),
                RuleOptions::new().ignored(["nl"]),
            ),
        ];
        let mut parser = Parser::<()>::new(rules, ParserConfig::new()).unwrap();

        let result = parser.parse(&tokens_from_kinds(&["a", "nl", "b"]));
        assert!(result.errors.is_empty());

        let result = parser.parse(&tokens_from_kinds(&["a", "ws", "b"]));
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].msg, "Expected 'b', got 'ws'");
    }

    #[test]
    fn test_predicate_error_sees_context() {
        let rules = vec![
            Rule::new("root", seq([rule("Name"), token("=")])).errors([error_when(
                |query, ctx| query.is_prev_rule("Name") && ctx.failed_at == Some(1),
                "Expected '=' after name",
            )
            .with_code("E_ASSIGN")]),
            Rule::new("Name", token("id")),
        ];
        let mut parser = Parser::<()>::new(rules, ParserConfig::new()).unwrap();

        let result = parser.parse(&tokens_from_str("id ;"));
        assert_eq!(result.errors[0].msg, "Expected '=' after name");
        assert_eq!(result.errors[0].code, ErrorCode::Custom("E_ASSIGN".into()));
        assert_eq!(result.errors[0].prev_rule.as_deref(), Some("Name"));
        assert_eq!(result.errors[0].prev_inner_rule.as_deref(), Some("root"));
    }

    #[test]
    fn test_statistics_and_memo() {
        // Both alternatives start with the same rule, so the second one is served
        // from the cache
        let rules = vec![
            Rule::new(
                "root",
                choice([
                    seq([rule("Head"), token("!")]),
                    seq([rule("Head"), token("?")]),
                ]),
            ),
            Rule::new("Head", seq([token("a"), token("b")])),
        ];
        let config = ParserConfig::new().with_max_cache_size(64);
        let mut parser = Parser::<()>::new(rules, config).unwrap();

        let result = parser.parse(&tokens_from_str("a b ?"));
        assert!(result.errors.is_empty());
        let stats = result.statistics.unwrap();
        assert!(stats.memo_hits >= 1);
        assert_eq!(stats.tokens_processed, 3);
        assert!(parser.cache_len() > 0);

        // State is reset between parses
        let again = parser.parse(&tokens_from_str("a b !"));
        assert!(again.errors.is_empty());
        assert_eq!(again.statistics.unwrap().memo_hits, 0);
    }
}
