//! Grammar of the sample language
//!
//! Statements are the unit of top-level application and of recovery: a broken
//! statement is skipped through its terminating `;`.
//!
//!     Statement           = LetStatement | ReturnStatement | ExpressionStatement
//!     LetStatement        = "let" ident (":" Type)? ("=" Expression)? ";"
//!     ReturnStatement     = "return" Expression? ";"
//!     ExpressionStatement = Expression ";"
//!     Expression          = Term (("+" | "-") Term)*
//!     Term                = Unary (("*" | "/") Unary)*
//!     Unary               = "-" Unary | Call
//!     Call                = Primary ("(" Arguments? ")")*
//!     Arguments           = Expression ("," Expression)*
//!     Primary             = number | string | ident | "(" Expression ")" | Function
//!     Function            = "fn" "(" Params? ")" ("->" Type)? Block
//!     Params              = Param ("," Param)*
//!     Param               = ident (":" Type)?
//!     Block               = "{" Statement* "}"
//!     Type                = ident
//!
//! Binary precedence comes from the Expression/Term layering; each level folds
//! its repetition to the left.

use super::ast::{BinaryOp, Block, Expr, Node, Param, Stmt, TypeExpr};
use crate::peg::error::BuildError;
use crate::peg::grammar::{
    choice, error, error_when, optional, repeat_separated, rule, seq, token,
    zero_or_more, Rule,
};
use crate::peg::recovery::skip_past;
use crate::peg::result::{get_optional, Match};
use crate::peg::token::{Span, Token};

pub const START_RULE: &str = "Statement";

/// Token kinds the grammar never sees
pub const TRIVIA: [&str; 2] = ["ws", "comment"];

pub fn rules() -> Vec<Rule<Node>> {
    vec![
        Rule::new(
            "Statement",
            choice([
                rule("LetStatement"),
                rule("ReturnStatement"),
                rule("ExpressionStatement"),
            ]),
        )
        .recovery(skip_past([";"])),
        Rule::new(
            "LetStatement",
            seq([
                token("let"),
                token("ident"),
                optional(seq([token(":"), rule("Type")])),
                optional(seq([token("="), rule("Expression")])),
                token(";"),
            ]),
        )
        .errors([
            error(1, "Expected identifier after `let`"),
            error_when(
                |query, ctx| ctx.failed_at == Some(4) && query.is_next_token("="),
                "Expected expression after `=`",
            ),
            error(4, "Expected `;` after let statement"),
        ])
        .build(build_let),
        Rule::new(
            "ReturnStatement",
            seq([token("return"), optional(rule("Expression")), token(";")]),
        )
        .errors([error(2, "Expected `;` after return value")])
        .build(build_return),
        Rule::new("ExpressionStatement", seq([rule("Expression"), token(";")]))
            .errors([
                error(0, "Expected expression"),
                error(1, "Expected `;` after expression"),
            ])
            .build(build_expression_statement),
        Rule::new(
            "Expression",
            seq([
                rule("Term"),
                zero_or_more(seq([choice([token("+"), token("-")]), rule("Term")])),
            ]),
        )
        .build(build_binary),
        Rule::new(
            "Term",
            seq([
                rule("Unary"),
                zero_or_more(seq([choice([token("*"), token("/")]), rule("Unary")])),
            ]),
        )
        .build(build_binary),
        Rule::new(
            "Unary",
            choice([seq([token("-"), rule("Unary")]), rule("Call")]),
        )
        .build(build_unary),
        Rule::new(
            "Call",
            seq([
                rule("Primary"),
                zero_or_more(seq([token("("), optional(rule("Arguments")), token(")")])),
            ]),
        )
        .build(build_call),
        Rule::new(
            "Arguments",
            repeat_separated(rule("Expression"), token(","), 1, None),
        ),
        Rule::new(
            "Primary",
            choice([
                token("number"),
                token("string"),
                token("ident"),
                seq([token("("), rule("Expression"), token(")")]),
                rule("Function"),
            ]),
        )
        .errors([
            error(2, "Expected `)` to close group"),
            error_when(|query, _| query.at_rule_start(), "Expected expression"),
        ])
        .build(build_primary),
        Rule::new(
            "Function",
            seq([
                token("fn"),
                token("("),
                optional(rule("Params")),
                token(")"),
                optional(seq([token("->"), rule("Type")])),
                rule("Block"),
            ]),
        )
        .errors([
            error(1, "Expected `(` after `fn`"),
            error(3, "Expected `)` after parameters"),
            error(5, "Expected function body"),
        ])
        .build(build_function),
        Rule::new("Params", repeat_separated(rule("Param"), token(","), 1, None)),
        Rule::new("Param", seq([token("ident"), optional(seq([token(":"), rule("Type")]))]))
            .build(build_param),
        Rule::new(
            "Block",
            seq([token("{"), zero_or_more(rule("Statement")), token("}")]),
        )
        .errors([error(2, "Expected `}` to close block")])
        .build(build_block),
        Rule::new("Type", token("ident")).build(build_type),
    ]
}

// Build functions

fn build_let(m: Match<Node>) -> Result<Node, BuildError> {
    let name = token_at(&m, 1)?.text().to_string();
    let ty = optional_slot(&m, 2).map(|slot| type_at(slot, 1)).transpose()?;
    let value = optional_slot(&m, 3).map(|slot| expr_at(slot, 1)).transpose()?;
    Ok(Node::Stmt(Stmt::Let {
        name,
        ty,
        value,
        span: covering(&m)?,
    }))
}

fn build_return(m: Match<Node>) -> Result<Node, BuildError> {
    let value = optional_slot(&m, 1).map(as_expr).transpose()?;
    Ok(Node::Stmt(Stmt::Return {
        value,
        span: covering(&m)?,
    }))
}

fn build_expression_statement(m: Match<Node>) -> Result<Node, BuildError> {
    Ok(Node::Stmt(Stmt::Expr {
        expr: expr_at(&m, 0)?,
        span: covering(&m)?,
    }))
}

/// Left fold of `operand (op operand)*`
fn build_binary(m: Match<Node>) -> Result<Node, BuildError> {
    let mut left = expr_at(&m, 0)?;
    for pair in list_at(&m, 1)? {
        let symbol = token_at(pair, 0)?;
        let op = BinaryOp::from_symbol(&symbol.kind)
            .ok_or_else(|| BuildError::new(format!("unknown operator '{}'", symbol.kind)))?;
        left = Expr::binary(op, left, expr_at(pair, 1)?);
    }
    Ok(Node::Expr(left))
}

fn build_unary(m: Match<Node>) -> Result<Node, BuildError> {
    match &m {
        Match::List(_) => Ok(Node::Expr(Expr::Neg {
            operand: Box::new(expr_at(&m, 1)?),
            span: covering(&m)?,
        })),
        other => as_expr(other).map(Node::Expr),
    }
}

fn build_call(m: Match<Node>) -> Result<Node, BuildError> {
    let mut callee = expr_at(&m, 0)?;
    for suffix in list_at(&m, 1)? {
        let args = match optional_slot(suffix, 1) {
            Some(list) => list
                .as_list()
                .ok_or_else(|| BuildError::new("malformed argument list"))?
                .iter()
                .map(as_expr)
                .collect::<Result<Vec<_>, _>>()?,
            None => Vec::new(),
        };
        let span = callee.span().merge(&token_at(suffix, 2)?.span);
        callee = Expr::Call {
            callee: Box::new(callee),
            args,
            span,
        };
    }
    Ok(Node::Expr(callee))
}

fn build_primary(m: Match<Node>) -> Result<Node, BuildError> {
    match m {
        Match::Token(tok) => literal(&tok).map(Node::Expr),
        // "(" Expression ")"
        Match::List(_) => expr_at(&m, 1).map(Node::Expr),
        Match::Node(node) => Ok(node),
        Match::Absent => Err(BuildError::new("empty primary expression")),
    }
}

fn build_function(m: Match<Node>) -> Result<Node, BuildError> {
    let params = match optional_slot(&m, 2) {
        Some(list) => list
            .as_list()
            .ok_or_else(|| BuildError::new("malformed parameter list"))?
            .iter()
            .map(|item| match item {
                Match::Node(Node::Param(param)) => Ok(param.clone()),
                _ => Err(BuildError::new("expected a parameter")),
            })
            .collect::<Result<Vec<_>, _>>()?,
        None => Vec::new(),
    };
    let ret = optional_slot(&m, 4).map(|slot| type_at(slot, 1)).transpose()?;
    let body = match m.get(5) {
        Some(Match::Node(Node::Block(block))) => block.statements.clone(),
        _ => return Err(BuildError::new("expected a function body")),
    };
    Ok(Node::Expr(Expr::Function {
        params,
        ret,
        body,
        span: covering(&m)?,
    }))
}

fn build_param(m: Match<Node>) -> Result<Node, BuildError> {
    let name = token_at(&m, 0)?.text().to_string();
    let ty = optional_slot(&m, 1).map(|slot| type_at(slot, 1)).transpose()?;
    Ok(Node::Param(Param {
        name,
        ty,
        span: covering(&m)?,
    }))
}

fn build_block(m: Match<Node>) -> Result<Node, BuildError> {
    let statements = list_at(&m, 1)?
        .iter()
        .map(|item| match item {
            Match::Node(Node::Stmt(stmt)) => Ok(stmt.clone()),
            _ => Err(BuildError::new("expected a statement")),
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Node::Block(Block {
        statements,
        span: covering(&m)?,
    }))
}

fn build_type(m: Match<Node>) -> Result<Node, BuildError> {
    let tok = m
        .as_token()
        .ok_or_else(|| BuildError::new("expected a type name"))?;
    Ok(Node::Type(TypeExpr {
        name: tok.text().to_string(),
        span: tok.span,
    }))
}

// Match accessors

fn optional_slot(m: &Match<Node>, index: usize) -> Option<&Match<Node>> {
    m.get(index).and_then(get_optional)
}

fn token_at(m: &Match<Node>, index: usize) -> Result<&Token, BuildError> {
    m.get(index)
        .and_then(Match::as_token)
        .ok_or_else(|| BuildError::new(format!("expected a token at element {}", index)))
}

fn list_at(m: &Match<Node>, index: usize) -> Result<&[Match<Node>], BuildError> {
    m.get(index)
        .and_then(Match::as_list)
        .ok_or_else(|| BuildError::new(format!("expected a list at element {}", index)))
}

fn expr_at(m: &Match<Node>, index: usize) -> Result<Expr, BuildError> {
    m.get(index)
        .ok_or_else(|| BuildError::new(format!("missing element {}", index)))
        .and_then(as_expr)
}

fn type_at(m: &Match<Node>, index: usize) -> Result<TypeExpr, BuildError> {
    match m.get(index) {
        Some(Match::Node(Node::Type(ty))) => Ok(ty.clone()),
        _ => Err(BuildError::new(format!("expected a type at element {}", index))),
    }
}

fn as_expr(m: &Match<Node>) -> Result<Expr, BuildError> {
    match m {
        Match::Node(Node::Expr(expr)) => Ok(expr.clone()),
        _ => Err(BuildError::new("expected an expression")),
    }
}

fn literal(tok: &Token) -> Result<Expr, BuildError> {
    let span = tok.span;
    match tok.kind.as_str() {
        "number" => tok
            .text()
            .parse::<f64>()
            .map(|value| Expr::Number { value, span })
            .map_err(|err| BuildError::new(format!("invalid number '{}': {}", tok.text(), err))),
        "string" => Ok(Expr::String {
            value: unquote(tok.text()),
            span,
        }),
        "ident" => Ok(Expr::Ident {
            name: tok.text().to_string(),
            span,
        }),
        other => Err(BuildError::new(format!("unexpected literal kind '{}'", other))),
    }
}

/// Strip the quotes and resolve backslash escapes
fn unquote(text: &str) -> String {
    let inner = text
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(text);
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

/// Span covering every token and node in `m`
fn covering(m: &Match<Node>) -> Result<Span, BuildError> {
    span_of(m).ok_or_else(|| BuildError::new("match covers no input"))
}

fn span_of(m: &Match<Node>) -> Option<Span> {
    match m {
        Match::Token(tok) => Some(tok.span),
        Match::Node(node) => node_span(node),
        Match::List(items) => items.iter().filter_map(span_of).reduce(|a, b| a.merge(&b)),
        Match::Absent => None,
    }
}

fn node_span(node: &Node) -> Option<Span> {
    match node {
        Node::Expr(expr) => Some(expr.span()),
        Node::Stmt(stmt) => Some(stmt.span()),
        Node::Type(ty) => Some(ty.span),
        Node::Param(param) => Some(param.span),
        Node::Block(block) => Some(block.span),
    }
}
