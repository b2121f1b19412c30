//! Keyword constructs: conditionals, loops, definitions, exceptions

use std::rc::Rc;

use super::primary::starts_command_arg;
use super::{PResult, Parser};
use crate::ast::{
    BeginExpr, CaseExpr, CaseInExpr, ClassExpr, ConstPath, DefExpr, Expr, InClause, ModuleExpr,
    Params, RescueClause, WhenClause,
};
use crate::lexer::{Token, TokenKind};

/// Keywords after which `return`/`break`/`next` carry no value.
const VALUE_STOPPERS: &[&str] = &[
    "if", "unless", "while", "until", "rescue", "end", "else", "elsif", "when", "in", "ensure",
    "then", "do", "and", "or",
];

impl Parser {
    pub(super) fn parse_keyword(&mut self, token: Token) -> PResult<Expr> {
        match token.text.as_str() {
            "nil" => Ok(Expr::Nil),
            "true" => Ok(Expr::True),
            "false" => Ok(Expr::False),
            "self" => Ok(Expr::SelfRef),
            "if" => self.parse_if_rest(),
            "unless" => self.parse_unless(),
            "while" | "until" => self.parse_while(&token.text),
            "for" => self.parse_for(),
            "case" => self.parse_case(),
            "begin" => self.parse_begin(),
            "def" => self.parse_def(),
            "class" => self.parse_class(),
            "module" => self.parse_module(),
            "return" => Ok(Expr::Return(self.parse_jump_value()?)),
            "break" => Ok(Expr::Break(self.parse_jump_value()?)),
            "next" => Ok(Expr::Next(self.parse_jump_value()?)),
            "redo" => Ok(Expr::Redo),
            "yield" => Ok(Expr::Yield(self.parse_keyword_args()?)),
            "raise" => Ok(Expr::Raise(self.parse_keyword_args()?)),
            "require" => Ok(Expr::Require(Box::new(self.parse_expr()?))),
            "defined?" => {
                let inner = if self.accept_separator("(")? {
                    let inner = self.parse_expr()?;
                    self.expect_separator(")")?;
                    inner
                } else {
                    self.parse_binary_expr()?
                };
                Ok(Expr::Defined(Box::new(inner)))
            }
            "lambda" => Ok(Expr::Lambda(self.parse_block_literal("lambda")?)),
            "proc" => Ok(Expr::ProcLiteral(self.parse_block_literal("proc")?)),
            "not" => Ok(Expr::Not(Box::new(self.parse_binary_expr()?))),
            _ => Err(self.unexpected(&token)),
        }
    }

    /// Optional value after `return`, `break` or `next`; several values
    /// become an array.
    fn parse_jump_value(&mut self) -> PResult<Option<Box<Expr>>> {
        let Some(token) = self.peek()? else {
            return Ok(None);
        };
        if token.newline_before
            || token.is_separator(";")
            || token.is_separator("}")
            || token.is_separator(")")
            || (token.kind == TokenKind::Keyword && VALUE_STOPPERS.contains(&token.text.as_str()))
        {
            return Ok(None);
        }

        let first = self.parse_expr()?;
        if !self.accept_separator(",")? {
            return Ok(Some(Box::new(first)));
        }
        let mut items = vec![first];
        loop {
            items.push(self.parse_expr()?);
            if !self.accept_separator(",")? {
                break;
            }
        }
        Ok(Some(Box::new(Expr::Array(items))))
    }

    /// Arguments of `yield` and `raise`, with or without parentheses.
    fn parse_keyword_args(&mut self) -> PResult<Vec<Expr>> {
        let Some(token) = self.peek()? else {
            return Ok(Vec::new());
        };
        if token.is_separator("(") && !token.space_before {
            self.next()?;
            return Ok(self.parse_arg_list(")", false)?.0);
        }
        let starts = starts_command_arg(&token)
            || (token.space_before
                && !token.newline_before
                && (token.is_operator("-") || token.is_operator("*")));
        if starts {
            self.no_do += 1;
            let result = self.parse_arg_list_open();
            self.no_do -= 1;
            return result;
        }
        Ok(Vec::new())
    }

    fn parse_arg_list_open(&mut self) -> PResult<Vec<Expr>> {
        let mut args = Vec::new();
        loop {
            if self.accept_operator("*")? {
                args.push(Expr::Splat(Box::new(self.parse_expr()?)));
            } else {
                args.push(self.parse_expr()?);
            }
            if !self.accept_separator(",")? {
                break;
            }
        }
        Ok(args)
    }

    // ═══════════════════════════════════════════════════════════════════
    // Conditionals and loops
    // ═══════════════════════════════════════════════════════════════════

    /// After `if` or `elsif`. Consumes the closing `end`.
    fn parse_if_rest(&mut self) -> PResult<Expr> {
        let cond = self.parse_expr()?;
        self.accept_keyword("then")?;
        let then_branch = self.parse_body(&["elsif", "else", "end"])?;

        let else_branch = if self.accept_keyword("elsif")? {
            Some(Box::new(self.parse_if_rest()?))
        } else if self.accept_keyword("else")? {
            let body = self.parse_body(&["end"])?;
            self.expect_keyword("end")?;
            Some(Box::new(body))
        } else {
            self.expect_keyword("end")?;
            None
        };

        Ok(Expr::If {
            cond: Box::new(cond),
            then_branch: Box::new(then_branch),
            else_branch,
        })
    }

    fn parse_unless(&mut self) -> PResult<Expr> {
        let cond = self.parse_expr()?;
        self.accept_keyword("then")?;
        let then_branch = self.parse_body(&["else", "end"])?;
        let else_branch = if self.accept_keyword("else")? {
            Some(Box::new(self.parse_body(&["end"])?))
        } else {
            None
        };
        self.expect_keyword("end")?;
        Ok(Expr::Unless {
            cond: Box::new(cond),
            then_branch: Box::new(then_branch),
            else_branch,
        })
    }

    /// Loop header expression; `do` after it belongs to the loop.
    fn parse_loop_header(&mut self) -> PResult<Expr> {
        self.no_do += 1;
        let header = self.parse_expr();
        self.no_do -= 1;
        let header = header?;
        self.accept_keyword("do")?;
        Ok(header)
    }

    fn parse_while(&mut self, keyword: &str) -> PResult<Expr> {
        let cond = Box::new(self.parse_loop_header()?);
        let body = Box::new(self.parse_body(&["end"])?);
        self.expect_keyword("end")?;
        Ok(if keyword == "while" {
            Expr::While { cond, body }
        } else {
            Expr::Until { cond, body }
        })
    }

    fn parse_for(&mut self) -> PResult<Expr> {
        let mut vars = Vec::new();
        loop {
            let token = self.next_required("loop variable")?;
            if token.kind != TokenKind::Name || token.is_constant() {
                return Err(self.unexpected(&token));
            }
            vars.push(token.text);
            if !self.accept_separator(",")? {
                break;
            }
        }
        self.expect_keyword("in")?;
        let iterable = Box::new(self.parse_loop_header()?);
        let body = Box::new(self.parse_body(&["end"])?);
        self.expect_keyword("end")?;
        Ok(Expr::For {
            vars,
            iterable,
            body,
        })
    }

    fn parse_case(&mut self) -> PResult<Expr> {
        let subject = match self.peek()? {
            Some(t) if t.is_keyword("when") || t.is_keyword("in") => None,
            Some(_) => Some(Box::new(self.parse_expr()?)),
            None => return Err(self.error("expected 'when'")),
        };
        while self.accept_separator(";")? {}

        if self.peek_keyword("in")? {
            let Some(subject) = subject else {
                return Err(self.error("case/in requires a subject"));
            };
            return self.parse_case_in(subject);
        }

        let mut whens = Vec::new();
        while self.accept_keyword("when")? {
            let mut patterns = Vec::new();
            loop {
                if self.accept_operator("*")? {
                    patterns.push(Expr::Splat(Box::new(self.parse_expr()?)));
                } else {
                    patterns.push(self.parse_expr()?);
                }
                if !self.accept_separator(",")? {
                    break;
                }
            }
            self.accept_keyword("then")?;
            let body = self.parse_body(&["when", "else", "end"])?;
            whens.push(WhenClause { patterns, body });
        }
        if whens.is_empty() {
            return Err(self.error("expected 'when'"));
        }

        let else_body = self.parse_else_branch()?;
        self.expect_keyword("end")?;
        Ok(Expr::Case(Box::new(CaseExpr {
            subject,
            whens,
            else_body,
        })))
    }

    fn parse_case_in(&mut self, subject: Box<Expr>) -> PResult<Expr> {
        let mut clauses = Vec::new();
        while self.accept_keyword("in")? {
            let pattern = self.parse_top_pattern()?;
            let guard = if self.accept_keyword("if")? {
                Some(self.parse_expr()?)
            } else if self.accept_keyword("unless")? {
                Some(Expr::Not(Box::new(self.parse_expr()?)))
            } else {
                None
            };
            self.accept_keyword("then")?;
            let body = self.parse_body(&["in", "else", "end"])?;
            clauses.push(InClause {
                pattern,
                guard,
                body,
            });
        }

        let else_body = self.parse_else_branch()?;
        self.expect_keyword("end")?;
        Ok(Expr::CaseIn(Box::new(CaseInExpr {
            subject,
            clauses,
            else_body,
        })))
    }

    fn parse_else_branch(&mut self) -> PResult<Option<Box<Expr>>> {
        if self.accept_keyword("else")? {
            Ok(Some(Box::new(self.parse_body(&["end"])?)))
        } else {
            Ok(None)
        }
    }

    // ═══════════════════════════════════════════════════════════════════
    // Exceptions
    // ═══════════════════════════════════════════════════════════════════

    fn parse_begin(&mut self) -> PResult<Expr> {
        let body = self.parse_rescue_body()?;
        Ok(match body {
            Expr::Begin(_) => body,
            other => Expr::Begin(Box::new(BeginExpr {
                body: other,
                rescues: Vec::new(),
                else_body: None,
                ensure: None,
            })),
        })
    }

    /// Body with optional `rescue`/`else`/`ensure` clauses, through `end`.
    /// Shared by `begin` and `def`.
    fn parse_rescue_body(&mut self) -> PResult<Expr> {
        const CLAUSE_END: &[&str] = &["rescue", "else", "ensure", "end"];

        let body = self.parse_body(CLAUSE_END)?;
        let mut rescues = Vec::new();
        while self.accept_keyword("rescue")? {
            let mut classes = Vec::new();
            let mut binding = None;

            let starts_list = self.peek()?.is_some_and(|t| {
                !t.newline_before
                    && !t.is_operator("=>")
                    && !t.is_keyword("then")
                    && !t.is_separator(";")
            });
            if starts_list {
                loop {
                    classes.push(self.parse_binary_expr()?);
                    if !self.accept_separator(",")? {
                        break;
                    }
                }
            }
            if self.accept_operator("=>")? {
                let name = self.next_required("exception variable")?;
                if name.kind != TokenKind::Name {
                    return Err(self.unexpected(&name));
                }
                binding = Some(name.text);
            }
            self.accept_keyword("then")?;
            let body = self.parse_body(CLAUSE_END)?;
            rescues.push(RescueClause {
                classes,
                binding,
                body,
            });
        }

        let else_body = if self.accept_keyword("else")? {
            Some(self.parse_body(&["ensure", "end"])?)
        } else {
            None
        };
        let ensure = if self.accept_keyword("ensure")? {
            Some(self.parse_body(&["end"])?)
        } else {
            None
        };
        self.expect_keyword("end")?;

        if rescues.is_empty() && else_body.is_none() && ensure.is_none() {
            return Ok(body);
        }
        Ok(Expr::Begin(Box::new(BeginExpr {
            body,
            rescues,
            else_body,
            ensure,
        })))
    }

    // ═══════════════════════════════════════════════════════════════════
    // Definitions
    // ═══════════════════════════════════════════════════════════════════

    fn parse_def(&mut self) -> PResult<Expr> {
        let first = self.next_required("method name")?;

        let singleton_capable = first.is_keyword("self") || first.kind == TokenKind::Name;
        let (target, name_token) = if singleton_capable {
            match self.next()? {
                Some(sep) if sep.is_separator(".") || sep.is_separator("::") => {
                    let target = match first.kind {
                        TokenKind::Keyword => Expr::SelfRef,
                        _ if first.is_constant() => Expr::Constant(first.text),
                        _ => Expr::Name(first.text),
                    };
                    (Some(Box::new(target)), self.next_required("method name")?)
                }
                Some(other) => {
                    self.push(other);
                    (None, first)
                }
                None => (None, first),
            }
        } else {
            (None, first)
        };

        let name = self.parse_method_name(name_token)?;

        let params = match self.peek()? {
            Some(t) if t.is_separator("(") => {
                self.next()?;
                self.parse_params(Some(")"))?
            }
            Some(t) if !t.newline_before && !t.is_separator(";") => self.parse_params(None)?,
            _ => Params::default(),
        };

        let body = self.parse_rescue_body()?;
        Ok(Expr::Def(Box::new(DefExpr {
            target,
            name,
            params,
            body: Rc::new(body),
        })))
    }

    /// Method names may be identifiers with `?`/`!`/`=` suffixes, operators,
    /// `[]` or `[]=`.
    fn parse_method_name(&mut self, token: Token) -> PResult<String> {
        let mut name = match token.kind {
            TokenKind::Name | TokenKind::Keyword => token.text,
            TokenKind::Operator => match token.text.as_str() {
                "+" | "-" | "*" | "/" | "%" | "**" | "==" | "!=" | "<" | ">" | "<=" | ">="
                | "<=>" | "!" => token.text,
                _ => return Err(self.unexpected(&token)),
            },
            TokenKind::Separator if token.text == "[" => {
                self.expect_separator("]")?;
                "[]".to_string()
            }
            _ => return Err(self.unexpected(&token)),
        };

        // setter (`name=`), `===` and `[]=` are glued to a following `=`
        if let Some(next) = self.peek()? {
            if next.is_operator("=") && !next.space_before {
                let glue = match name.as_str() {
                    "==" | "[]" => true,
                    n => n.chars().all(|c| c.is_alphanumeric() || c == '_'),
                };
                if glue {
                    self.next()?;
                    name.push('=');
                }
            }
        }
        Ok(name)
    }

    fn parse_class(&mut self) -> PResult<Expr> {
        let token = self.next_required("class name")?;

        if token.is_operator("<") {
            if !self.accept_operator("<")? {
                return Err(self.error("expected '<<'"));
            }
            let target = Box::new(self.parse_expr()?);
            let body = Box::new(self.parse_body(&["end"])?);
            self.expect_keyword("end")?;
            return Ok(Expr::SingletonClass { target, body });
        }

        let path = self.parse_const_path(token)?;
        let superclass = if self.accept_operator("<")? {
            Some(Box::new(self.parse_binary_expr()?))
        } else {
            None
        };
        let body = self.parse_body(&["end"])?;
        self.expect_keyword("end")?;
        Ok(Expr::ClassDef(Box::new(ClassExpr {
            path,
            superclass,
            body,
        })))
    }

    fn parse_module(&mut self) -> PResult<Expr> {
        let token = self.next_required("module name")?;
        let path = self.parse_const_path(token)?;
        let body = self.parse_body(&["end"])?;
        self.expect_keyword("end")?;
        Ok(Expr::ModuleDef(Box::new(ModuleExpr { path, body })))
    }

    fn parse_const_path(&mut self, first: Token) -> PResult<ConstPath> {
        if !first.is_constant() {
            return Err(self.error("class/module name must be a CONSTANT"));
        }
        let mut path = ConstPath {
            scope: None,
            name: first.text,
        };
        while self.accept_separator("::")? {
            let next = self.next_required("constant name")?;
            if !next.is_constant() {
                return Err(self.error("class/module name must be a CONSTANT"));
            }
            let scope = match path.scope {
                None => Expr::Constant(path.name),
                Some(scope) => Expr::ScopedConstant {
                    scope,
                    name: path.name,
                },
            };
            path = ConstPath {
                scope: Some(Box::new(scope)),
                name: next.text,
            };
        }
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::BinaryOp;
    use pretty_assertions::assert_eq;

    fn parse_one(src: &str) -> Expr {
        let mut parser = Parser::new(src);
        parser.parse_command().unwrap().unwrap()
    }

    #[test]
    fn test_if_elsif_else() {
        let expr = parse_one("if a then 1 elsif b then 2 else 3 end");
        let Expr::If { else_branch, .. } = expr else {
            panic!("expected if");
        };
        let Some(elsif) = else_branch else {
            panic!("expected elsif");
        };
        assert!(matches!(*elsif, Expr::If { else_branch: Some(_), .. }));
    }

    #[test]
    fn test_while_do_belongs_to_loop() {
        let expr = parse_one("while x.ready? do\n  x.step\nend");
        let Expr::While { cond, .. } = expr else {
            panic!("expected while");
        };
        assert_eq!(*cond, Expr::call(Some(Expr::Name("x".into())), "ready?", vec![]));
    }

    #[test]
    fn test_def_with_singleton_target() {
        let Expr::Def(def) = parse_one("def self.build(a, *rest, &blk)\nend") else {
            panic!("expected def");
        };
        assert_eq!(def.target.as_deref(), Some(&Expr::SelfRef));
        assert_eq!(def.name, "build");
        assert_eq!(def.params.required, vec!["a".to_string()]);
        assert_eq!(def.params.rest.as_deref(), Some("rest"));
        assert_eq!(def.params.block.as_deref(), Some("blk"));
    }

    #[test]
    fn test_def_operator_and_setter_names() {
        let sources = [
            "def ==(o)\nend",
            "def ===(o)\nend",
            "def []=(k, v)\nend",
            "def name=(v)\nend",
            "def <=>(o)\nend",
            "def empty?\nend",
        ];
        let names: Vec<String> = sources
            .iter()
            .map(|src| match parse_one(src) {
                Expr::Def(def) => def.name,
                other => panic!("expected def, got {:?}", other),
            })
            .collect();
        assert_eq!(names, vec!["==", "===", "[]=", "name=", "<=>", "empty?"]);
    }

    #[test]
    fn test_def_with_implicit_rescue() {
        let Expr::Def(def) = parse_one("def f\n  risky\nrescue => e\n  0\nensure\n  done\nend") else {
            panic!("expected def");
        };
        let Expr::Begin(begin) = def.body.as_ref() else {
            panic!("expected begin body");
        };
        assert_eq!(begin.rescues.len(), 1);
        assert_eq!(begin.rescues[0].binding.as_deref(), Some("e"));
        assert!(begin.ensure.is_some());
    }

    #[test]
    fn test_class_name_must_be_constant() {
        let mut parser = Parser::new("class foo\nend");
        let err = parser.parse_command().unwrap_err();
        assert_eq!(err.message, "class/module name must be a CONSTANT");
        let mut parser = Parser::new("module bar\nend");
        let err = parser.parse_command().unwrap_err();
        assert_eq!(err.message, "class/module name must be a CONSTANT");
    }

    #[test]
    fn test_class_with_scoped_name_and_superclass() {
        let Expr::ClassDef(class) = parse_one("class A::B < Base\nend") else {
            panic!("expected class");
        };
        assert_eq!(class.path.name, "B");
        assert_eq!(class.path.scope.as_deref(), Some(&Expr::Constant("A".into())));
        assert_eq!(class.superclass.as_deref(), Some(&Expr::Constant("Base".into())));
    }

    #[test]
    fn test_singleton_class_body() {
        assert!(matches!(
            parse_one("class << self\n def x; end\nend"),
            Expr::SingletonClass { .. }
        ));
    }

    #[test]
    fn test_rescue_class_list() {
        let expr = parse_one("begin\n  x\nrescue ZeroDivisionError, TypeError => e\n  y\nend");
        let Expr::Begin(begin) = expr else {
            panic!("expected begin");
        };
        assert_eq!(
            begin.rescues[0].classes,
            vec![
                Expr::Constant("ZeroDivisionError".into()),
                Expr::Constant("TypeError".into())
            ]
        );
    }

    #[test]
    fn test_case_when() {
        let Expr::Case(case) = parse_one("case x\nwhen 1, 2 then :low\nwhen 3..5 then :mid\nelse :high\nend") else {
            panic!("expected case");
        };
        assert_eq!(case.whens.len(), 2);
        assert_eq!(case.whens[0].patterns.len(), 2);
        assert!(case.else_body.is_some());
    }

    #[test]
    fn test_return_with_modifier() {
        assert_eq!(
            parse_one("return x if y"),
            Expr::If {
                cond: Box::new(Expr::Name("y".into())),
                then_branch: Box::new(Expr::Return(Some(Box::new(Expr::Name("x".into()))))),
                else_branch: None,
            }
        );
    }

    #[test]
    fn test_short_circuit_raise_parses() {
        assert_eq!(
            parse_one("false && raise 'x'"),
            Expr::binary(
                BinaryOp::And,
                Expr::False,
                Expr::Raise(vec![Expr::Str("x".into())])
            )
        );
    }
}
