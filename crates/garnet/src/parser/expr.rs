//! Operator precedence, unary and postfix chains, assignment

use super::{PResult, Parser};
use crate::ast::{BinaryOp, ConstPath, Expr, FloatLit};
use crate::lexer::{Token, TokenKind};

/// Binary operator levels, loosest first. Every level is left-associative
/// except the last (`**`).
const LEVELS: &[&[&str]] = &[
    &["&&", "||", "and", "or"],
    &["..", "...", "==", "!=", "<", ">", "<=", ">=", "<=>"],
    &["+", "-"],
    &["*", "/", "%"],
    &["**"],
];

const COMPOUND_ASSIGN: &[&str] = &["+=", "-=", "*=", "/=", "%=", "**=", "||=", "&&="];

const MODIFIERS: &[&str] = &["if", "unless", "while", "until", "rescue"];

impl Parser {
    /// Full expression followed by any number of postfix modifiers.
    pub(super) fn parse_statement(&mut self) -> PResult<Expr> {
        let mut expr = self.parse_expr()?;
        loop {
            let Some(token) = self.peek()? else {
                break;
            };
            if token.newline_before
                || token.kind != TokenKind::Keyword
                || !MODIFIERS.contains(&token.text.as_str())
            {
                break;
            }
            self.next()?;
            let cond = Box::new(self.parse_binary_expr()?);
            let body = Box::new(expr);
            expr = match token.text.as_str() {
                "if" => Expr::If {
                    cond,
                    then_branch: body,
                    else_branch: None,
                },
                "unless" => Expr::Unless {
                    cond,
                    then_branch: body,
                    else_branch: None,
                },
                "while" => Expr::While { cond, body },
                "until" => Expr::Until { cond, body },
                _ => Expr::Begin(Box::new(crate::ast::BeginExpr {
                    body: *body,
                    rescues: vec![crate::ast::RescueClause {
                        classes: Vec::new(),
                        binding: None,
                        body: *cond,
                    }],
                    else_body: None,
                    ensure: None,
                })),
            };
        }
        Ok(expr)
    }

    /// Expression with assignment and ternary, without modifiers.
    pub(super) fn parse_expr(&mut self) -> PResult<Expr> {
        let expr = self.parse_binary_expr()?;

        let Some(token) = self.peek()? else {
            return Ok(expr);
        };
        if token.kind != TokenKind::Operator {
            return Ok(expr);
        }

        if token.text == "=" {
            self.next()?;
            let value = self.parse_expr()?;
            return self.make_assignment(expr, value);
        }

        if COMPOUND_ASSIGN.contains(&token.text.as_str()) {
            self.next()?;
            let rhs = self.parse_expr()?;
            let value = self.desugar_compound(&expr, &token.text, rhs);
            return self.make_assignment(expr, value);
        }

        if token.text == "?" {
            self.next()?;
            let then_branch = self.parse_expr()?;
            if !self.accept_operator(":")? {
                return Err(self.error("expected ':'"));
            }
            let else_branch = self.parse_expr()?;
            return Ok(Expr::If {
                cond: Box::new(expr),
                then_branch: Box::new(then_branch),
                else_branch: Some(Box::new(else_branch)),
            });
        }

        Ok(expr)
    }

    /// `target op= rhs` becomes `target = target op rhs`. `||=` and `&&=`
    /// keep the original value instead of collapsing it to a boolean.
    fn desugar_compound(&self, target: &Expr, op: &str, rhs: Expr) -> Expr {
        let op_text = &op[..op.len() - 1];
        if matches!(op_text, "||" | "&&") {
            // an undefined local reads as unset rather than failing
            let cond = match target {
                Expr::Name(_) => Expr::binary(
                    BinaryOp::And,
                    Expr::Defined(Box::new(target.clone())),
                    target.clone(),
                ),
                _ => target.clone(),
            };
            let (then_branch, else_branch) = if op_text == "||" {
                (target.clone(), rhs)
            } else {
                (rhs, target.clone())
            };
            return Expr::If {
                cond: Box::new(cond),
                then_branch: Box::new(then_branch),
                else_branch: Some(Box::new(else_branch)),
            };
        }
        match BinaryOp::from_token(op_text) {
            Some(op) => Expr::binary(op, target.clone(), rhs),
            None => rhs,
        }
    }

    fn make_assignment(&self, target: Expr, value: Expr) -> PResult<Expr> {
        let value = Box::new(value);
        Ok(match target {
            Expr::Name(name) => Expr::AssignLocal { name, value },
            Expr::Constant(name) => Expr::AssignConstant {
                path: ConstPath { scope: None, name },
                value,
            },
            Expr::ScopedConstant { scope, name } => Expr::AssignConstant {
                path: ConstPath {
                    scope: Some(scope),
                    name,
                },
                value,
            },
            Expr::InstanceVar(name) => Expr::AssignInstanceVar { name, value },
            Expr::ClassVar(name) => Expr::AssignClassVar { name, value },
            Expr::GlobalVar(name) => Expr::AssignGlobal { name, value },
            Expr::Call(call)
                if call.receiver.is_some() && call.args.is_empty() && call.block.is_none() =>
            {
                Expr::AssignMember {
                    receiver: call.receiver.unwrap_or_else(|| Box::new(Expr::SelfRef)),
                    name: call.name,
                    value,
                }
            }
            Expr::Index { receiver, args } => Expr::AssignIndex {
                receiver,
                args,
                value,
            },
            _ => return Err(self.error("invalid assignment target")),
        })
    }

    /// Binary expression over the precedence table.
    pub(super) fn parse_binary_expr(&mut self) -> PResult<Expr> {
        self.parse_level(0)
    }

    fn parse_level(&mut self, level: usize) -> PResult<Expr> {
        if level == LEVELS.len() {
            return self.parse_unary();
        }

        let mut left = self.parse_level(level + 1)?;
        loop {
            let Some(token) = self.peek()? else {
                break;
            };
            if token.newline_before || !is_level_operator(&token, level) {
                break;
            }
            self.next()?;
            let right = if level == LEVELS.len() - 1 {
                self.parse_level(level)?
            } else {
                self.parse_level(level + 1)?
            };
            left = combine(&token.text, left, right);
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> PResult<Expr> {
        let token = self.next_required("expression")?;

        match (token.kind, token.text.as_str()) {
            (TokenKind::Operator, "-") => {
                // `-2.abs` negates the literal, not the call result
                if let Some(next) = self.peek()? {
                    if !next.space_before
                        && matches!(next.kind, TokenKind::Integer | TokenKind::Float)
                    {
                        self.next()?;
                        let literal = self.number_literal(&next, true)?;
                        return self.parse_postfix(literal);
                    }
                }
                Ok(Expr::Negate(Box::new(self.parse_unary()?)))
            }
            (TokenKind::Operator, "+") => Ok(Expr::Plus(Box::new(self.parse_unary()?))),
            (TokenKind::Operator, "!") | (TokenKind::Keyword, "not") => {
                Ok(Expr::Not(Box::new(self.parse_unary()?)))
            }
            _ => {
                self.push(token);
                let primary = self.parse_primary()?;
                self.parse_postfix(primary)
            }
        }
    }

    pub(super) fn number_literal(&self, token: &Token, negative: bool) -> PResult<Expr> {
        let text = if negative {
            format!("-{}", token.text)
        } else {
            token.text.clone()
        };
        match token.kind {
            TokenKind::Integer => text
                .parse::<i64>()
                .map(Expr::Integer)
                .map_err(|_| self.error(format!("integer literal too large: {}", token.text))),
            _ => text
                .parse::<f64>()
                .map(|f| Expr::Float(FloatLit(f)))
                .map_err(|_| self.error(format!("invalid float literal: {}", token.text))),
        }
    }

    /// Member access, scope resolution and indexing chains.
    pub(super) fn parse_postfix(&mut self, mut expr: Expr) -> PResult<Expr> {
        loop {
            let Some(token) = self.peek()? else {
                break;
            };

            if token.is_separator(".") {
                self.next()?;
                let name = self.method_name_after_dot()?;
                expr = self.parse_call_tail(Some(expr), name)?.0;
            } else if token.is_separator("::") && !token.newline_before {
                self.next()?;
                let name = self.next_required("constant name after '::'")?;
                if name.kind != TokenKind::Name {
                    return Err(self.unexpected(&name));
                }
                let is_call = self
                    .peek()?
                    .is_some_and(|t| t.is_separator("(") && !t.space_before);
                expr = if name.is_constant() && !is_call {
                    Expr::ScopedConstant {
                        scope: Box::new(expr),
                        name: name.text,
                    }
                } else {
                    self.parse_call_tail(Some(expr), name.text)?.0
                };
            } else if token.is_separator("[") && !token.newline_before {
                self.next()?;
                let (args, _) = self.parse_arg_list("]", false)?;
                expr = Expr::Index {
                    receiver: Box::new(expr),
                    args,
                };
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn method_name_after_dot(&mut self) -> PResult<String> {
        let token = self.next_required("method name after '.'")?;
        match token.kind {
            TokenKind::Name | TokenKind::Keyword => Ok(token.text),
            TokenKind::Operator if !matches!(token.text.as_str(), "=" | "?" | ":") => {
                Ok(token.text)
            }
            TokenKind::Separator if token.text == "(" => {
                // `callable.(args)`
                self.push(Token {
                    space_before: false,
                    ..token
                });
                Ok("call".to_string())
            }
            TokenKind::Separator if token.text == "[" => {
                self.expect_separator("]")?;
                Ok("[]".to_string())
            }
            _ => Err(self.unexpected(&token)),
        }
    }
}

fn is_level_operator(token: &Token, level: usize) -> bool {
    let operator = match token.kind {
        TokenKind::Operator => true,
        TokenKind::Keyword => matches!(token.text.as_str(), "and" | "or"),
        _ => false,
    };
    operator && LEVELS[level].contains(&token.text.as_str())
}

fn combine(op: &str, left: Expr, right: Expr) -> Expr {
    match op {
        ".." | "..." => Expr::Range {
            start: Box::new(left),
            end: Box::new(right),
            exclusive: op == "...",
        },
        _ => match BinaryOp::from_token(op) {
            Some(op) => Expr::binary(op, left, right),
            None => left,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse_one(src: &str) -> Expr {
        let mut parser = Parser::new(src);
        parser.parse_command().unwrap().unwrap()
    }

    fn int(n: i64) -> Expr {
        Expr::Integer(n)
    }

    #[test]
    fn test_precedence() {
        assert_eq!(
            parse_one("1 + 2 * 3"),
            Expr::binary(
                BinaryOp::Add,
                int(1),
                Expr::binary(BinaryOp::Mul, int(2), int(3))
            )
        );
    }

    #[test]
    fn test_left_associative() {
        assert_eq!(
            parse_one("10 - 4 - 3"),
            Expr::binary(
                BinaryOp::Sub,
                Expr::binary(BinaryOp::Sub, int(10), int(4)),
                int(3)
            )
        );
    }

    #[test]
    fn test_power_right_associative() {
        assert_eq!(
            parse_one("2 ** 3 ** 2"),
            Expr::binary(
                BinaryOp::Pow,
                int(2),
                Expr::binary(BinaryOp::Pow, int(3), int(2))
            )
        );
    }

    #[test]
    fn test_negative_literal() {
        assert_eq!(parse_one("-5"), int(-5));
        assert_eq!(
            parse_one("- x"),
            Expr::Negate(Box::new(Expr::Name("x".into())))
        );
    }

    #[test]
    fn test_compound_assignment_desugars() {
        assert_eq!(
            parse_one("@n += 1"),
            Expr::AssignInstanceVar {
                name: "@n".into(),
                value: Box::new(Expr::binary(
                    BinaryOp::Add,
                    Expr::InstanceVar("@n".into()),
                    int(1)
                )),
            }
        );
    }

    #[test]
    fn test_ternary() {
        assert_eq!(
            parse_one("a ? 1 : 2"),
            Expr::If {
                cond: Box::new(Expr::Name("a".into())),
                then_branch: Box::new(int(1)),
                else_branch: Some(Box::new(int(2))),
            }
        );
    }

    #[test]
    fn test_modifier_applies_to_whole_statement() {
        assert_eq!(
            parse_one("x = 1 if y"),
            Expr::If {
                cond: Box::new(Expr::Name("y".into())),
                then_branch: Box::new(Expr::AssignLocal {
                    name: "x".into(),
                    value: Box::new(int(1)),
                }),
                else_branch: None,
            }
        );
    }

    #[test]
    fn test_newline_ends_binary_expression() {
        let mut parser = Parser::new("a\n- b");
        let first = parser.parse_command().unwrap().unwrap();
        assert_eq!(first, Expr::Name("a".into()));
    }

    #[test]
    fn test_invalid_assignment_target() {
        let mut parser = Parser::new("1 = 2");
        let err = parser.parse_command().unwrap_err();
        assert_eq!(err.message, "invalid assignment target");
    }
}
