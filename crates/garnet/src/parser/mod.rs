//! Recursive-descent parser
//!
//! Turns a token stream into [`Expr`] trees. Commands are separated by
//! newlines or `;`; a token's `newline_before` flag is what ends a command,
//! so the grammar needs no explicit newline tokens.
//!
//! The parser is organised by concern:
//! - [`expr`]: operator precedence, unary and postfix chains, assignment
//! - [`primary`]: literals, identifiers, calls, arguments and blocks
//! - [`statements`]: keyword constructs (`if`, `def`, `class`, `begin`, ...)
//! - [`pattern`]: `case ... in` patterns
//! - [`interpolation`]: `#{...}` spans inside string literals

mod expr;
mod interpolation;
mod pattern;
mod primary;
mod statements;

use tracing::trace;

use crate::ast::Expr;
use crate::error::ParseError;
use crate::lexer::{Token, TokenKind, Tokenizer};

/// Result type for parser operations.
pub type PResult<T> = Result<T, ParseError>;

/// Keywords that close a body and can never start a command.
const CLOSING_KEYWORDS: &[&str] = &[
    "end", "else", "elsif", "when", "in", "rescue", "ensure", "then", "do",
];

/// Recursive-descent parser over a [`Tokenizer`].
pub struct Parser {
    lexer: Tokenizer,
    /// Non-zero while parsing a loop header, where `do` belongs to the loop
    no_do: usize,
}

impl Parser {
    /// Create a parser over `text`.
    pub fn new(text: &str) -> Self {
        Self {
            lexer: Tokenizer::new(text),
            no_do: 0,
        }
    }

    /// Parse one expression with assignment and ternary support, or `None`
    /// at end of input.
    pub fn parse_expression(&mut self) -> PResult<Option<Expr>> {
        if self.peek()?.is_none() {
            return Ok(None);
        }
        self.parse_expr().map(Some)
    }

    /// Parse one command: an expression with trailing modifiers, terminated
    /// by a newline, `;`, end of input or a closing keyword. Returns `None`
    /// at end of input or in front of a closing token.
    pub fn parse_command(&mut self) -> PResult<Option<Expr>> {
        while self.accept_separator(";")? {}

        let Some(token) = self.peek()? else {
            return Ok(None);
        };
        if is_closer(&token) {
            return Ok(None);
        }

        let expr = self.parse_statement()?;
        self.finish_command()?;
        trace!(line = self.lexer.line(), "parsed command");
        Ok(Some(expr))
    }

    /// Parse commands until end of input or a closing token.
    pub fn parse_commands(&mut self) -> PResult<Vec<Expr>> {
        let mut commands = Vec::new();
        while let Some(command) = self.parse_command()? {
            commands.push(command);
        }
        Ok(commands)
    }

    /// Parse a complete program. Anything left over is an error.
    pub fn parse_program(&mut self) -> PResult<Vec<Expr>> {
        let commands = self.parse_commands()?;
        match self.next()? {
            None => Ok(commands),
            Some(token) => Err(self.unexpected(&token)),
        }
    }

    // ═══════════════════════════════════════════════════════════════════
    // Token helpers
    // ═══════════════════════════════════════════════════════════════════

    fn next(&mut self) -> PResult<Option<Token>> {
        self.lexer.next_token()
    }

    fn push(&mut self, token: Token) {
        self.lexer.push_token(token);
    }

    fn peek(&mut self) -> PResult<Option<Token>> {
        let token = self.next()?;
        if let Some(t) = &token {
            self.push(t.clone());
        }
        Ok(token)
    }

    /// Next token, failing at end of input.
    fn next_required(&mut self, what: &str) -> PResult<Token> {
        match self.next()? {
            Some(token) => Ok(token),
            None => Err(self.error(format!("expected {}", what))),
        }
    }

    fn accept(&mut self, kind: TokenKind, text: &str) -> PResult<bool> {
        match self.next()? {
            Some(token) if token.is(kind, text) => Ok(true),
            Some(token) => {
                self.push(token);
                Ok(false)
            }
            None => Ok(false),
        }
    }

    fn accept_keyword(&mut self, text: &str) -> PResult<bool> {
        self.accept(TokenKind::Keyword, text)
    }

    fn accept_separator(&mut self, text: &str) -> PResult<bool> {
        self.accept(TokenKind::Separator, text)
    }

    fn accept_operator(&mut self, text: &str) -> PResult<bool> {
        self.accept(TokenKind::Operator, text)
    }

    fn peek_keyword(&mut self, text: &str) -> PResult<bool> {
        Ok(self.peek()?.is_some_and(|t| t.is_keyword(text)))
    }

    fn expect(&mut self, kind: TokenKind, text: &str) -> PResult<()> {
        if self.accept(kind, text)? {
            Ok(())
        } else {
            Err(self.error(format!("expected '{}'", text)))
        }
    }

    fn expect_keyword(&mut self, text: &str) -> PResult<()> {
        self.expect(TokenKind::Keyword, text)
    }

    fn expect_separator(&mut self, text: &str) -> PResult<()> {
        self.expect(TokenKind::Separator, text)
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError::new(message, self.lexer.line())
    }

    fn unexpected(&self, token: &Token) -> ParseError {
        ParseError::new(format!("unexpected '{}'", token.text), token.line)
    }

    /// After a command: end of input, `;`, a line break or a closer.
    fn finish_command(&mut self) -> PResult<()> {
        match self.peek()? {
            None => Ok(()),
            Some(token) if token.is_separator(";") => {
                self.next()?;
                Ok(())
            }
            Some(token) if token.newline_before || is_closer(&token) => Ok(()),
            Some(token) => Err(self.unexpected(&token)),
        }
    }

    /// Parse a body up to (not including) one of `terminators`.
    fn parse_body(&mut self, terminators: &[&str]) -> PResult<Expr> {
        let saved = std::mem::take(&mut self.no_do);
        let commands = self.parse_commands();
        self.no_do = saved;
        let commands = commands?;

        match self.peek()? {
            Some(token)
                if terminators.iter().any(|t| {
                    token.is_keyword(t) || token.is_separator(t)
                }) =>
            {
                Ok(Expr::Sequence(commands))
            }
            Some(token) => Err(self.unexpected(&token)),
            None => Err(self.error(format!(
                "expected '{}'",
                terminators.last().copied().unwrap_or("end")
            ))),
        }
    }
}

fn is_closer(token: &Token) -> bool {
    match token.kind {
        TokenKind::Keyword => CLOSING_KEYWORDS.contains(&token.text.as_str()),
        TokenKind::Separator => matches!(token.text.as_str(), "}" | ")" | "]"),
        _ => false,
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Convenience Functions
// ═══════════════════════════════════════════════════════════════════════

/// Parse a whole program.
pub fn parse(text: &str) -> PResult<Vec<Expr>> {
    Parser::new(text).parse_program()
}

/// Best-effort parse for editors: every command that parsed before the
/// first syntax error, plus that error's message. Never panics on
/// malformed input.
pub fn try_parse_commands(text: &str) -> (Vec<Expr>, Option<String>) {
    let mut parser = Parser::new(text);
    let mut commands = Vec::new();
    loop {
        match parser.parse_command() {
            Ok(Some(command)) => commands.push(command),
            Ok(None) => match parser.next() {
                Ok(None) => return (commands, None),
                Ok(Some(token)) => {
                    return (commands, Some(parser.unexpected(&token).message));
                }
                Err(err) => return (commands, Some(err.message)),
            },
            Err(err) => return (commands, Some(err.message)),
        }
    }
}
