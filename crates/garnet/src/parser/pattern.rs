//! Patterns for `case ... in`

use super::{PResult, Parser};
use crate::ast::{Expr, Pattern};
use crate::lexer::{Token, TokenKind};

impl Parser {
    /// Top-level pattern of an `in` clause. Braces and brackets may be
    /// omitted: `in name:, age:` and `in first, *rest`.
    pub(super) fn parse_top_pattern(&mut self) -> PResult<Pattern> {
        let first = self.parse_pattern()?;

        if let Pattern::Bind(name) = &first {
            if self.accept_operator(":")? {
                return self.parse_hash_pattern(Some(name.clone()), None);
            }
        }

        if self.peek()?.is_some_and(|t| t.is_separator(",")) {
            let mut before = vec![first];
            let mut rest = None;
            let mut after = Vec::new();
            while self.accept_separator(",")? {
                self.parse_array_element(&mut before, &mut rest, &mut after)?;
            }
            return Ok(Pattern::Array {
                before,
                rest,
                after,
            });
        }

        Ok(first)
    }

    /// A pattern with `|` alternatives.
    fn parse_pattern(&mut self) -> PResult<Pattern> {
        let first = self.parse_pattern_primary()?;
        if !self.peek()?.is_some_and(|t| t.is_separator("|")) {
            return Ok(first);
        }
        let mut options = vec![first];
        while self.accept_separator("|")? {
            options.push(self.parse_pattern_primary()?);
        }
        Ok(Pattern::Alternatives(options))
    }

    fn parse_pattern_primary(&mut self) -> PResult<Pattern> {
        let token = self.next_required("pattern")?;

        if token.is_separator("[") {
            let mut before = Vec::new();
            let mut rest = None;
            let mut after = Vec::new();
            if !self.accept_separator("]")? {
                loop {
                    self.parse_array_element(&mut before, &mut rest, &mut after)?;
                    if !self.accept_separator(",")? {
                        break;
                    }
                }
                self.expect_separator("]")?;
            }
            return Ok(Pattern::Array {
                before,
                rest,
                after,
            });
        }

        if token.is_separator("{") {
            return self.parse_hash_pattern(None, Some("}"));
        }

        if token.kind == TokenKind::Name && !token.is_constant() {
            return Ok(if token.text == "_" {
                Pattern::Wildcard
            } else {
                Pattern::Bind(token.text)
            });
        }

        let constant = token.is_constant();
        self.push(token);
        let expr = self.parse_binary_expr()?;
        if constant {
            if let Expr::Call(call) = &expr {
                if call.receiver.is_none() {
                    return Ok(Pattern::Deconstruct {
                        constant: Expr::Constant(call.name.clone()),
                        args: Vec::new(),
                    });
                }
            }
        }
        Ok(Pattern::Value(expr))
    }

    fn parse_array_element(
        &mut self,
        before: &mut Vec<Pattern>,
        rest: &mut Option<Option<String>>,
        after: &mut Vec<Pattern>,
    ) -> PResult<()> {
        if self.accept_operator("*")? {
            if rest.is_some() {
                return Err(self.error("only one splat is allowed in an array pattern"));
            }
            let name = match self.peek()? {
                Some(t) if t.kind == TokenKind::Name && !t.is_constant() => {
                    self.next()?;
                    Some(t.text)
                }
                _ => None,
            };
            *rest = Some(name);
            return Ok(());
        }
        let element = self.parse_pattern()?;
        if rest.is_some() {
            after.push(element);
        } else {
            before.push(element);
        }
        Ok(())
    }

    /// `key: pattern` entries. When `first_key` is given its `:` has
    /// already been consumed.
    fn parse_hash_pattern(
        &mut self,
        mut first_key: Option<String>,
        closer: Option<&str>,
    ) -> PResult<Pattern> {
        let mut entries = Vec::new();

        if let Some(closer) = closer {
            if self.accept_separator(closer)? {
                return Ok(Pattern::Hash(entries));
            }
        }

        loop {
            let key = match first_key.take() {
                Some(key) => key,
                None => {
                    let token = self.next_required("hash pattern key")?;
                    let key = hash_key(&token).ok_or_else(|| self.unexpected(&token))?;
                    if !self.accept_operator(":")? {
                        return Err(self.error("expected ':'"));
                    }
                    key
                }
            };

            let has_value = self.peek()?.is_some_and(|t| {
                !t.newline_before
                    && !t.is_separator(",")
                    && !t.is_separator("}")
                    && !t.is_keyword("then")
                    && !t.is_keyword("if")
                    && !t.is_keyword("unless")
            });
            let value = if has_value {
                Some(self.parse_pattern()?)
            } else {
                None
            };
            entries.push((key, value));

            if !self.accept_separator(",")? {
                break;
            }
        }

        if let Some(closer) = closer {
            self.expect_separator(closer)?;
        }
        Ok(Pattern::Hash(entries))
    }
}

fn hash_key(token: &Token) -> Option<String> {
    match token.kind {
        TokenKind::Name | TokenKind::Keyword | TokenKind::String => Some(token.text.clone()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn pattern(src: &str) -> Pattern {
        Parser::new(src).parse_top_pattern().unwrap()
    }

    #[test]
    fn test_bind_and_wildcard() {
        assert_eq!(pattern("x"), Pattern::Bind("x".into()));
        assert_eq!(pattern("_"), Pattern::Wildcard);
    }

    #[test]
    fn test_value_alternatives() {
        assert_eq!(
            pattern("1 | 2"),
            Pattern::Alternatives(vec![
                Pattern::Value(Expr::Integer(1)),
                Pattern::Value(Expr::Integer(2)),
            ])
        );
    }

    #[test]
    fn test_nested_hash_pattern() {
        assert_eq!(
            pattern("{db: {user:}}"),
            Pattern::Hash(vec![(
                "db".into(),
                Some(Pattern::Hash(vec![("user".into(), None)]))
            )])
        );
    }

    #[test]
    fn test_braceless_hash_pattern() {
        assert_eq!(
            pattern("name: String, age:"),
            Pattern::Hash(vec![
                ("name".into(), Some(Pattern::Value(Expr::Constant("String".into())))),
                ("age".into(), None),
            ])
        );
    }

    #[test]
    fn test_array_pattern_with_splat() {
        assert_eq!(
            pattern("[first, *rest]"),
            Pattern::Array {
                before: vec![Pattern::Bind("first".into())],
                rest: Some(Some("rest".into())),
                after: vec![],
            }
        );
    }

    #[test]
    fn test_constant_call_is_deconstruct() {
        assert!(matches!(pattern("Point(x, y)"), Pattern::Deconstruct { .. }));
    }
}
