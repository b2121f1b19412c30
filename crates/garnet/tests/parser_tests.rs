//! Tokenizer, parser and tooling entry points

use garnet::ast::{walk_expr, BinaryOp, Expr, Visitor};
use garnet::lexer::{TokenKind, Tokenizer};
use garnet::*;
use pretty_assertions::assert_eq;

fn tokens(src: &str) -> Vec<(TokenKind, String)> {
    let mut lexer = Tokenizer::new(src);
    let mut out = Vec::new();
    while let Some(token) = lexer.next_token().unwrap() {
        out.push((token.kind, token.text));
    }
    out
}

// ═══════════════════════════════════════════════════════════════════════
// Tokenizer
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_spaceship_is_one_token() {
    let toks = tokens("a <=> b");
    assert_eq!(toks[1], (TokenKind::Operator, "<=>".to_string()));
    assert_eq!(toks.len(), 3);
}

#[test]
fn test_trailing_dot_is_not_a_float() {
    let toks = tokens("1..2");
    assert_eq!(toks[0].0, TokenKind::Integer);
    assert_eq!(toks[1], (TokenKind::Operator, "..".to_string()));
    assert_eq!(tokens("1.5")[0].0, TokenKind::Float);
}

#[test]
fn test_keywords_recognized() {
    for word in ["def", "yield", "redo", "rescue", "ensure", "unless", "until"] {
        assert_eq!(tokens(word)[0].0, TokenKind::Keyword, "{}", word);
    }
    assert_eq!(tokens("defined?")[0].0, TokenKind::Keyword);
}

// ═══════════════════════════════════════════════════════════════════════
// Parser
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_reparse_is_structurally_equal() {
    for src in ["1 + 2 * 3", "(4 - 1) / 2 ** 2", "1 < 2 && 3 >= 3 || false", "'a' + \"b\""] {
        assert_eq!(parse(src).unwrap(), parse(src).unwrap(), "{}", src);
    }
}

#[test]
fn test_binary_tree_shape() {
    let program = parse("1 + 2 * 3").unwrap();
    let Expr::Binary { op, right, .. } = &program[0] else {
        panic!("expected a binary node, got {:?}", program[0]);
    };
    assert_eq!(*op, BinaryOp::Add);
    assert!(matches!(**right, Expr::Binary { op: BinaryOp::Mul, .. }));
}

#[test]
fn test_syntax_error_messages() {
    let err = parse("foo(1, 2").unwrap_err();
    assert_eq!(err.message, "expected ')'");

    let err = parse("module lower\nend").unwrap_err();
    assert_eq!(err.message, "class/module name must be a CONSTANT");
}

#[test]
fn test_syntax_error_reports_line() {
    let err = parse("x = 1\ny = 2\nfoo(").unwrap_err();
    assert_eq!(err.line, 3);
}

#[test]
fn test_execute_text_raises_syntax_error() {
    let err = Machine::new().execute_text("def broken(").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Syntax);
}

#[test]
fn test_try_parse_keeps_commands_before_error() {
    let (commands, error) = try_parse_commands("a = 1\nb = 2\nc = (");
    assert_eq!(commands.len(), 2);
    assert!(error.is_some());
}

#[test]
fn test_try_parse_clean_input() {
    let (commands, error) = try_parse_commands("puts 1\nputs 2");
    assert_eq!(commands.len(), 2);
    assert_eq!(error, None);
}

#[test]
fn test_try_parse_reports_incomplete_input() {
    for src in ["def", "class", "[1, 2", "\"open", "1 +", "foo("] {
        let (_, error) = try_parse_commands(src);
        assert!(error.is_some(), "{}", src);
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Visitor
// ═══════════════════════════════════════════════════════════════════════

#[derive(Default)]
struct CallNames(Vec<String>);

impl Visitor for CallNames {
    fn visit_expr(&mut self, expr: &Expr) {
        if let Expr::Call(call) = expr {
            self.0.push(call.name.clone());
        }
        walk_expr(self, expr);
    }
}

#[test]
fn test_visitor_finds_nested_calls() {
    let program = parse("def run\n  items.each { |x| log(x.name) }\nend").unwrap();
    let mut names = CallNames::default();
    for expr in &program {
        names.visit_expr(expr);
    }
    names.0.sort();
    assert_eq!(names.0, vec!["each", "log", "name"]);
}

#[test]
fn test_expr_accessors() {
    let program = parse("obj.render(1)").unwrap();
    assert_eq!(program[0].name(), Some("render"));
    assert_eq!(program[0].target(), Some(&Expr::Name("obj".into())));
}
