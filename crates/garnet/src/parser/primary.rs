//! Literals, identifiers, calls, arguments and blocks

use std::rc::Rc;

use super::{PResult, Parser};
use crate::ast::{BlockArg, BlockBody, CallExpr, Expr, Params};
use crate::lexer::{Token, TokenKind};

/// Keywords that may start a command argument (`puts nil`, `private def x`).
const ARGUMENT_KEYWORDS: &[&str] = &[
    "nil", "true", "false", "self", "not", "defined?", "lambda", "proc", "def", "case", "begin",
    "yield",
];

impl Parser {
    pub(super) fn parse_primary(&mut self) -> PResult<Expr> {
        let token = self.next_required("expression")?;

        match token.kind {
            TokenKind::Integer | TokenKind::Float => self.number_literal(&token, false),
            TokenKind::String => Ok(Expr::Str(token.text)),
            TokenKind::InterpolatedString => self.parse_interpolated(&token.text, token.line),
            TokenKind::Symbol => Ok(Expr::Symbol(token.text)),
            TokenKind::InstanceVariable => Ok(Expr::InstanceVar(token.text)),
            TokenKind::ClassVariable => Ok(Expr::ClassVar(token.text)),
            TokenKind::GlobalVariable => Ok(Expr::GlobalVar(token.text)),
            TokenKind::Name if token.is_constant() => self.parse_constant(token),
            TokenKind::Name => self.parse_identifier(token.text),
            TokenKind::Keyword => self.parse_keyword(token),
            TokenKind::Operator => match token.text.as_str() {
                "->" => self.parse_arrow_lambda(),
                "/" => {
                    let regex = self.lexer.read_regex()?;
                    let (pattern, flags) = regex.text.split_once('\0').unwrap_or((&regex.text, ""));
                    Ok(Expr::Regex {
                        pattern: pattern.to_string(),
                        flags: flags.to_string(),
                    })
                }
                _ => Err(self.unexpected(&token)),
            },
            TokenKind::Separator => match token.text.as_str() {
                "(" => self.parse_parenthesized(),
                "[" => {
                    let (items, _) = self.parse_arg_list("]", false)?;
                    Ok(Expr::Array(items))
                }
                "{" => self.parse_hash_literal(),
                "::" => {
                    let name = self.next_required("constant name after '::'")?;
                    if name.is_constant() {
                        Ok(Expr::Constant(name.text))
                    } else {
                        Err(self.unexpected(&name))
                    }
                }
                _ => Err(self.unexpected(&token)),
            },
            TokenKind::Regex => Err(self.unexpected(&token)),
        }
    }

    fn parse_parenthesized(&mut self) -> PResult<Expr> {
        let saved = std::mem::take(&mut self.no_do);
        let commands = self.parse_commands();
        self.no_do = saved;
        let mut commands = commands?;
        self.expect_separator(")")?;
        Ok(match commands.len() {
            0 => Expr::Nil,
            1 => commands.remove(0),
            _ => Expr::Sequence(commands),
        })
    }

    fn parse_constant(&mut self, token: Token) -> PResult<Expr> {
        // `Integer("3")` style conversion calls
        if self
            .peek()?
            .is_some_and(|t| t.is_separator("(") && !t.space_before)
        {
            return Ok(self.parse_call_tail(None, token.text)?.0);
        }
        Ok(Expr::Constant(token.text))
    }

    /// A bare identifier is a local variable read unless it carries
    /// arguments, parentheses or a block.
    fn parse_identifier(&mut self, name: String) -> PResult<Expr> {
        let (expr, explicit) = self.parse_call_tail(None, name)?;
        match expr {
            Expr::Call(CallExpr {
                receiver: None,
                name,
                args,
                block: None,
            }) if args.is_empty() && !explicit => Ok(Expr::Name(name)),
            other => Ok(other),
        }
    }

    /// Arguments and block after a method name. The flag reports whether
    /// an explicit argument list was present.
    pub(super) fn parse_call_tail(
        &mut self,
        receiver: Option<Expr>,
        name: String,
    ) -> PResult<(Expr, bool)> {
        let mut args = Vec::new();
        let mut block = None;
        let mut explicit = false;
        let mut command = false;

        if let Some(next) = self.peek()? {
            if next.is_separator("(") && !next.space_before {
                self.next()?;
                (args, block) = self.parse_arg_list(")", true)?;
                explicit = true;
            } else if starts_command_arg(&next) {
                (args, block) = self.parse_command_args()?;
                explicit = true;
                command = true;
            }
        }

        if block.is_none() {
            block = self.parse_block(!command)?;
        }

        Ok((
            Expr::Call(CallExpr {
                receiver: receiver.map(Box::new),
                name,
                args,
                block,
            }),
            explicit,
        ))
    }

    /// Arguments without parentheses, up to the end of the command. A `do`
    /// block after them belongs to this call, not the last argument.
    fn parse_command_args(&mut self) -> PResult<(Vec<Expr>, Option<BlockArg>)> {
        self.no_do += 1;
        let result = self.parse_args_until(None, true);
        self.no_do -= 1;
        result
    }

    /// Comma separated arguments closed by `closer`. Handles `*splat`,
    /// `**hash`, `key: value`, `key => value` and a trailing `&block`.
    pub(super) fn parse_arg_list(
        &mut self,
        closer: &str,
        allow_block: bool,
    ) -> PResult<(Vec<Expr>, Option<BlockArg>)> {
        let saved = std::mem::take(&mut self.no_do);
        let result = self.parse_args_until(Some(closer), allow_block);
        self.no_do = saved;
        result
    }

    fn parse_args_until(
        &mut self,
        closer: Option<&str>,
        allow_block: bool,
    ) -> PResult<(Vec<Expr>, Option<BlockArg>)> {
        let mut args = Vec::new();
        let mut pairs = Vec::new();
        let mut block = None;

        if let Some(closer) = closer {
            if self.accept_separator(closer)? {
                return Ok((args, block));
            }
        }

        loop {
            let token = self.next_required("argument")?;
            if allow_block && token.is_separator("&") {
                block = Some(BlockArg::Pass(Box::new(self.parse_expr()?)));
            } else if token.is_operator("*") {
                args.push(Expr::Splat(Box::new(self.parse_expr()?)));
            } else if token.is_operator("**") {
                let hash = self.parse_expr()?;
                pairs.push((Expr::DoubleSplat(Box::new(hash)), Expr::Nil));
            } else {
                self.push(token);
                let arg = self.parse_expr()?;
                if self.accept_operator(":")? {
                    let key = self.label_key(arg)?;
                    pairs.push((key, self.parse_expr()?));
                } else if self.accept_operator("=>")? {
                    pairs.push((arg, self.parse_expr()?));
                } else {
                    args.push(arg);
                }
            }

            if !self.accept_separator(",")? {
                break;
            }
            if block.is_some() {
                return Err(self.error("block argument must be the last argument"));
            }
            // trailing comma before the closer
            if let Some(closer) = closer {
                if self.peek()?.is_some_and(|t| t.is_separator(closer)) {
                    break;
                }
            }
        }

        if let Some(closer) = closer {
            self.expect_separator(closer)?;
        }
        if !pairs.is_empty() {
            args.push(Expr::Hash(pairs));
        }
        Ok((args, block))
    }

    /// Key of a `name: value` pair.
    fn label_key(&self, expr: Expr) -> PResult<Expr> {
        match expr {
            Expr::Name(name) | Expr::Constant(name) | Expr::Str(name) => Ok(Expr::Symbol(name)),
            _ => Err(self.error("expected a name before ':'")),
        }
    }

    fn parse_hash_literal(&mut self) -> PResult<Expr> {
        let saved = std::mem::take(&mut self.no_do);
        let result = self.parse_hash_entries();
        self.no_do = saved;
        result.map(Expr::Hash)
    }

    fn parse_hash_entries(&mut self) -> PResult<Vec<(Expr, Expr)>> {
        let mut pairs = Vec::new();
        if self.accept_separator("}")? {
            return Ok(pairs);
        }
        loop {
            if self.accept_operator("**")? {
                let hash = self.parse_expr()?;
                pairs.push((Expr::DoubleSplat(Box::new(hash)), Expr::Nil));
            } else {
                let key = self.parse_expr()?;
                let key = if self.accept_operator(":")? {
                    self.label_key(key)?
                } else if self.accept_operator("=>")? {
                    key
                } else {
                    return Err(self.error("expected '=>'"));
                };
                pairs.push((key, self.parse_expr()?));
            }

            if !self.accept_separator(",")? {
                break;
            }
            if self.peek()?.is_some_and(|t| t.is_separator("}")) {
                break;
            }
        }
        self.expect_separator("}")?;
        Ok(pairs)
    }

    // ═══════════════════════════════════════════════════════════════════
    // Blocks and parameters
    // ═══════════════════════════════════════════════════════════════════

    /// An optional `{ ... }` or `do ... end` block.
    pub(super) fn parse_block(&mut self, allow_brace: bool) -> PResult<Option<BlockArg>> {
        let Some(token) = self.peek()? else {
            return Ok(None);
        };
        if allow_brace && token.is_separator("{") && !token.newline_before {
            self.next()?;
            let body = self.parse_block_body("}")?;
            return Ok(Some(BlockArg::Literal(body)));
        }
        if token.is_keyword("do") && self.no_do == 0 {
            self.next()?;
            let body = self.parse_block_body("end")?;
            return Ok(Some(BlockArg::Literal(body)));
        }
        Ok(None)
    }

    /// Block parameters and body, consuming the closer.
    fn parse_block_body(&mut self, closer: &str) -> PResult<Rc<BlockBody>> {
        let params = if self.accept_operator("||")? {
            Params::default()
        } else if self.accept_separator("|")? {
            self.parse_params(Some("|"))?
        } else {
            Params::default()
        };
        let body = self.parse_body(&[closer])?;
        if closer == "end" {
            self.expect_keyword("end")?;
        } else {
            self.expect_separator(closer)?;
        }
        Ok(Rc::new(BlockBody { params, body }))
    }

    /// A parameter list. With a closer the closer is consumed; without one
    /// the list ends at the first parameter not followed by a comma.
    pub(super) fn parse_params(&mut self, closer: Option<&str>) -> PResult<Params> {
        let mut params = Params::default();
        if let Some(closer) = closer {
            if self.accept_separator(closer)? {
                return Ok(params);
            }
        }

        loop {
            let token = self.next_required("parameter")?;
            if params.block.is_some() {
                return Err(self.error("&block parameter must be the last parameter"));
            }

            if token.is_operator("*") {
                let name = self.next_required("rest parameter name")?;
                if name.kind != TokenKind::Name {
                    return Err(self.unexpected(&name));
                }
                params.rest = Some(name.text);
            } else if token.is_separator("&") {
                let name = self.next_required("block parameter name")?;
                if name.kind != TokenKind::Name {
                    return Err(self.unexpected(&name));
                }
                params.block = Some(name.text);
            } else if token.kind == TokenKind::Name && !token.is_constant() {
                if self.accept_operator("=")? {
                    let default = self.parse_binary_expr()?;
                    params.optional.push((token.text, default));
                } else if params.optional.is_empty() && params.rest.is_none() {
                    params.required.push(token.text);
                } else {
                    return Err(self.error(format!(
                        "required parameter '{}' after optional parameters",
                        token.text
                    )));
                }
            } else {
                return Err(self.unexpected(&token));
            }

            if !self.accept_separator(",")? {
                break;
            }
        }

        if let Some(closer) = closer {
            self.expect_separator(closer)?;
        }
        Ok(params)
    }

    /// `-> (x) { ... }`, `-> x do ... end`, `-> { ... }`
    fn parse_arrow_lambda(&mut self) -> PResult<Expr> {
        let params = match self.peek()? {
            Some(t) if t.is_separator("(") => {
                self.next()?;
                self.parse_params(Some(")"))?
            }
            Some(t) if t.kind == TokenKind::Name => self.parse_params(None)?,
            _ => Params::default(),
        };

        let closer = if self.accept_separator("{")? {
            "}"
        } else if self.accept_keyword("do")? {
            "end"
        } else {
            return Err(self.error("expected '{' after lambda parameters"));
        };
        let body = self.parse_body(&[closer])?;
        if closer == "end" {
            self.expect_keyword("end")?;
        } else {
            self.expect_separator("}")?;
        }
        Ok(Expr::Lambda(Rc::new(BlockBody { params, body })))
    }

    /// `lambda { ... }` / `proc { ... }`
    pub(super) fn parse_block_literal(&mut self, keyword: &str) -> PResult<Rc<BlockBody>> {
        match self.parse_block(true)? {
            Some(BlockArg::Literal(body)) => Ok(body),
            _ => Err(self.error(format!("expected block after '{}'", keyword))),
        }
    }
}

/// Whether `token` can begin an argument of a parenthesis-free call.
pub(super) fn starts_command_arg(token: &Token) -> bool {
    if token.newline_before || !token.space_before {
        return false;
    }
    match token.kind {
        TokenKind::Integer
        | TokenKind::Float
        | TokenKind::String
        | TokenKind::InterpolatedString
        | TokenKind::Symbol
        | TokenKind::InstanceVariable
        | TokenKind::ClassVariable
        | TokenKind::GlobalVariable
        | TokenKind::Name => true,
        TokenKind::Keyword => ARGUMENT_KEYWORDS.contains(&token.text.as_str()),
        TokenKind::Separator => matches!(token.text.as_str(), "[" | "(" | "::"),
        TokenKind::Operator => matches!(token.text.as_str(), "->" | "!"),
        TokenKind::Regex => false,
    }
}
