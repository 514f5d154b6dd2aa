//! Property-based tests for the parsing engine
//!
//! Inputs are random streams over a tiny alphabet so that grammars hit every
//! path: partial matches, backtracking, recovery and end of input.

use gramma::peg::testing::tokens_from_str;
use gramma::peg::*;
use proptest::prelude::*;

/// Whitespace-separated words over `a b c ;`
fn source_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec(prop_oneof![Just("a"), Just("b"), Just("c"), Just(";")], 0..40)
        .prop_map(|words| words.join(" "))
}

fn resilient() -> ParserConfig {
    ParserConfig::new().resilient().with_max_errors(0)
}

/// Statements with shared prefixes, so alternatives backtrack and the memo
/// gets hits.
fn statement_rules() -> Vec<Rule<()>> {
    vec![
        Rule::new("root", choice([rule("Long"), rule("Short"), rule("Single")]))
            .recovery(skip_past([";"])),
        Rule::new("Long", seq([rule("Pair"), token("c"), token(";")])),
        Rule::new("Short", seq([rule("Pair"), token(";")])),
        Rule::new("Pair", seq([token("a"), token("b")])),
        Rule::new("Single", seq([token("c"), token(";")])).errors([error(1, "Expected `;` after c")]),
    ]
}

/// Non-whitespace kinds of a token stream
fn significant(tokens: &[Token]) -> Vec<String> {
    tokens
        .iter()
        .filter(|t| !t.is("ws"))
        .map(|t| t.kind.clone())
        .collect()
}

proptest! {
    #[test]
    fn test_parse_always_terminates_with_bounded_output(source in source_strategy()) {
        let tokens = tokens_from_str(&source);
        let mut parser = Parser::new(statement_rules(), resilient()).unwrap();
        let result = parser.parse(&tokens);

        // Every driver iteration consumes at least one token
        prop_assert!(result.ast.len() + result.errors.len() <= significant(&tokens).len());
        prop_assert!(result.statistics.is_some());
    }

    #[test]
    fn test_total_grammar_reproduces_input(source in source_strategy()) {
        // Every token kind is covered by some alternative, so whatever the
        // longer alternatives consumed before failing must be given back
        let rules = [Rule::<()>::new(
            "root",
            choice([
                seq([token("a"), token("b"), token("c")]),
                seq([token("a"), token("b")]),
                token("a"),
                token("b"),
                token("c"),
                token(";"),
            ]),
        )];
        let tokens = tokens_from_str(&source);
        let mut parser = Parser::new(rules, resilient()).unwrap();
        let result = parser.parse(&tokens);

        prop_assert!(result.errors.is_empty());
        let consumed: Vec<String> = result
            .ast
            .iter()
            .flat_map(|entry| entry.tokens())
            .map(|t| t.kind.clone())
            .collect();
        prop_assert_eq!(consumed, significant(&tokens));
    }

    #[test]
    fn test_first_matching_alternative_wins(source in source_strategy()) {
        let rules = [Rule::<()>::new(
            "root",
            choice([token("a"), seq([token("a"), token("b")]), token("b"), token("c"), token(";")]),
        )];
        let mut parser = Parser::new(rules, resilient()).unwrap();
        let result = parser.parse(&tokens_from_str(&source));

        prop_assert!(result.errors.is_empty());
        prop_assert!(result.ast.iter().all(|entry| entry.as_token().is_some()));
    }

    #[test]
    fn test_silent_rule_never_reports_inner_errors(source in source_strategy()) {
        let rules = [
            Rule::<()>::new("root", seq([token("a"), token("b"), rule("Tail")])).silent(),
            Rule::new("Tail", choice([token("c"), token(";")])),
        ];
        let mut parser = Parser::new(rules, resilient()).unwrap();
        let result = parser.parse(&tokens_from_str(&source));

        for error in &result.errors {
            prop_assert_eq!(&error.code, &ErrorCode::RuleFailed);
            prop_assert_eq!(error.msg.as_str(), "Failed to parse 'root'");
        }
    }

    #[test]
    fn test_sequences_are_atomic(source in source_strategy()) {
        let rules = [Rule::<()>::new(
            "root",
            choice([seq([token("a"), token("b"), token("c")]), token("a"), token("b"), token("c"), token(";")]),
        )];
        let mut parser = Parser::new(rules, resilient()).unwrap();
        let result = parser.parse(&tokens_from_str(&source));

        for entry in &result.ast {
            match entry.as_list() {
                Some(items) => prop_assert_eq!(items.len(), 3),
                None => prop_assert!(entry.as_token().is_some()),
            }
        }
    }

    #[test]
    fn test_memoization_is_transparent(source in source_strategy()) {
        let tokens = tokens_from_str(&source);
        let mut cached =
            Parser::new(statement_rules(), resilient().with_max_cache_size(256)).unwrap();
        let mut uncached = Parser::new(statement_rules(), resilient().with_memoize(false)).unwrap();

        let with_memo = cached.parse(&tokens);
        let without_memo = uncached.parse(&tokens);

        prop_assert_eq!(&with_memo.ast, &without_memo.ast);
        let summary = |result: &ParseResult<()>| -> Vec<(String, usize, Option<usize>)> {
            result
                .errors
                .iter()
                .map(|e| (e.msg.clone(), e.token_index, e.failed_at))
                .collect()
        };
        prop_assert_eq!(summary(&with_memo), summary(&without_memo));
        prop_assert_eq!(without_memo.statistics.map(|s| s.memo_hits), Some(0));
    }

    #[test]
    fn test_farthest_custom_message_is_reported(source in source_strategy()) {
        let tokens = tokens_from_str(&source);
        let mut parser = Parser::new(statement_rules(), resilient()).unwrap();
        let result = parser.parse(&tokens);

        // "c" followed by anything but ";" fails Single past the point where
        // the other alternatives gave up
        let kinds = significant(&tokens);
        let broken_single = kinds.first().map(String::as_str) == Some("c")
            && kinds.get(1).map(String::as_str) != Some(";");
        if broken_single {
            prop_assert_eq!(result.errors[0].msg.as_str(), "Expected `;` after c");
        }
    }
}
