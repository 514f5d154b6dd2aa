//! A small expression language built on the engine
//!
//! It exists to exercise the engine end to end: a logos lexer producing engine
//! tokens, a grammar with builders and custom error handlers, and a typed AST.
//!
//!     let add = fn(a: Int, b: Int) -> Int { return a + b; };
//!     add(1, 2 * 3);

pub mod ast;
pub mod grammar;
pub mod lexer;

pub use ast::{BinaryOp, Block, Expr, Node, Param, Program, Stmt, TypeExpr};
pub use grammar::{rules, START_RULE, TRIVIA};
pub use lexer::tokenize;

use crate::peg::config::{Loader, ParserConfig};
use crate::peg::error::GrammarError;
use crate::peg::parser::Parser;
use crate::peg::result::ParseResult;

/// Settings the sample language layers over the engine defaults
pub const CONFIG_TOML: &str = r#"
start_rule = "Statement"
ignored = ["ws", "comment"]
"#;

/// Engine defaults with the sample language's start rule and trivia.
pub fn default_config() -> ParserConfig {
    ParserConfig::new()
        .with_start_rule(START_RULE)
        .with_ignored(TRIVIA)
}

/// Config loader seeded with engine defaults and the sample language layer
pub fn config_loader() -> Loader {
    Loader::new().with_toml(CONFIG_TOML)
}

pub fn parser(config: ParserConfig) -> Result<Parser<Node>, GrammarError> {
    Parser::new(rules(), config)
}

/// Lex and parse `source` in one go.
pub fn parse_source(source: &str, config: ParserConfig) -> Result<ParseResult<Node>, GrammarError> {
    let tokens = tokenize(source);
    let mut parser = parser(config)?;
    Ok(parser.parse(&tokens))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::peg::error::ErrorCode;
    use crate::peg::grammar::Rule;
    use crate::peg::result::{is_optional_passed, Match};

    fn parse(source: &str) -> ParseResult<Node> {
        parse_source(source, default_config().resilient().with_max_errors(0)).unwrap()
    }

    fn program(source: &str) -> Program {
        let result = parse(source);
        assert!(result.errors.is_empty(), "unexpected errors: {:?}", result.errors);
        Program::from_nodes(result.nodes())
    }

    fn expr_of(stmt: &Stmt) -> String {
        match stmt {
            Stmt::Expr { expr, .. } => expr.to_string(),
            Stmt::Let { value: Some(value), .. } => value.to_string(),
            Stmt::Return { value: Some(value), .. } => value.to_string(),
            other => panic!("statement has no expression: {:?}", other),
        }
    }

    #[test]
    fn test_config_layer_matches_default_config() {
        let loaded = config_loader().build().unwrap();
        assert_eq!(loaded, default_config());
    }

    #[test]
    fn test_precedence_and_associativity() {
        let program = program("1 + 2 * 3; 8 - 4 - 2; -(a + b) / c;");
        let rendered: Vec<String> = program.statements.iter().map(expr_of).collect();
        assert_eq!(
            rendered,
            vec!["(+ 1 (* 2 3))", "(- (- 8 4) 2)", "(/ (- (+ a b)) c)"]
        );
    }

    #[test]
    fn test_calls_and_functions() {
        let program = program(
            "let add = fn(a: Int, b) -> Int { return a + b; };\nadd(1, f(2))(3);",
        );
        assert_eq!(program.statements.len(), 2);

        match &program.statements[0] {
            Stmt::Let {
                name,
                value: Some(Expr::Function { params, ret, body, .. }),
                ..
            } => {
                assert_eq!(name, "add");
                assert_eq!(params.len(), 2);
                assert_eq!(params[0].ty.as_ref().map(|t| t.name.as_str()), Some("Int"));
                assert!(params[1].ty.is_none());
                assert_eq!(ret.as_ref().map(|t| t.name.as_str()), Some("Int"));
                assert_eq!(body.len(), 1);
            }
            other => panic!("expected a function binding, got {:?}", other),
        }
        assert_eq!(expr_of(&program.statements[1]), "(call (call add 1 (call f 2)) 3)");
    }

    #[test]
    fn test_missing_semicolon_uses_sequence_index_message() {
        let result = parse("foo");
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].msg, "Expected `;` after expression");
        assert_eq!(result.errors[0].failed_at, Some(1));
        assert_eq!(result.errors[0].rule.as_deref(), Some("ExpressionStatement"));
    }

    #[test]
    fn test_optional_slot_not_passed() {
        let tokens = tokenize("let x;");

        // Parse with the let pattern as an unbuilt start rule to see the raw match
        let let_pattern = rules()
            .into_iter()
            .find(|r| r.name == "LetStatement")
            .map(|r| r.pattern)
            .unwrap();
        let mut raw = Parser::new(
            rules().into_iter().chain([Rule::new("root", let_pattern)]),
            default_config().with_start_rule("root"),
        )
        .unwrap();
        let result = raw.parse(&tokens);
        assert!(result.errors.is_empty());
        let slot = result.ast[0].get(3).unwrap();
        assert_eq!(slot, &Match::Absent);
        assert!(!is_optional_passed(slot));

        let mut parser = parser(default_config()).unwrap();
        let result = parser.parse(&tokens);
        match result.nodes().next().and_then(Node::as_stmt) {
            Some(Stmt::Let { name, value, .. }) => {
                assert_eq!(name, "x");
                assert!(value.is_none());
            }
            other => panic!("expected a let statement, got {:?}", other),
        };
    }

    #[test]
    fn test_recovery_skips_broken_statement() {
        let result = parse("let = 1; let y = 2; x + ; z;");
        let messages: Vec<&str> = result.errors.iter().map(|e| e.msg.as_str()).collect();
        assert_eq!(
            messages,
            vec!["Expected identifier after `let`", "Expected `;` after expression"]
        );

        let program = Program::from_nodes(result.nodes());
        let names: Vec<String> = program
            .statements
            .iter()
            .map(|stmt| match stmt {
                Stmt::Let { name, .. } => name.clone(),
                other => expr_of(other),
            })
            .collect();
        assert_eq!(names, vec!["y", "z"]);
    }

    #[test]
    fn test_group_and_expression_messages() {
        let result = parse("(1 + 2;");
        assert_eq!(result.errors[0].msg, "Expected `)` to close group");

        let result = parse("let x = ;");
        assert_eq!(result.errors[0].msg, "Expected expression after `=`");

        let result = parse("* 2;");
        assert_eq!(result.errors[0].msg, "Expected expression");
    }

    #[test]
    fn test_lexical_errors_stop_the_parse() {
        let result = parse("let x = 1 # 2;");
        assert!(result.ast.is_empty());
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].code, ErrorCode::LexicalError);
        assert_eq!(result.errors[0].msg, "Unexpected token '#'");
    }
}
