//! `#{...}` spans inside double-quoted strings

use super::{PResult, Parser};
use crate::ast::{Expr, StrPart};
use crate::error::ParseError;

impl Parser {
    /// Split a raw interpolated literal into text and code parts. Each code
    /// span is parsed by a fresh parser over its inner text.
    pub(super) fn parse_interpolated(&self, raw: &str, line: usize) -> PResult<Expr> {
        let chars: Vec<char> = raw.chars().collect();
        let mut parts = Vec::new();
        let mut text = String::new();
        let mut i = 0;

        while i < chars.len() {
            match (chars[i], chars.get(i + 1).copied()) {
                ('\\', Some(escaped @ ('#' | '\\'))) => {
                    text.push(escaped);
                    i += 2;
                }
                ('#', Some('{')) => {
                    let end = matching_brace(&chars, i + 1)
                        .ok_or_else(|| ParseError::new("unclosed string", line))?;
                    let inner: String = chars[i + 2..end].iter().collect();
                    if !text.is_empty() {
                        parts.push(StrPart::Text(std::mem::take(&mut text)));
                    }
                    parts.push(StrPart::Code(parse_span(&inner, line)?));
                    i = end + 1;
                }
                (c, _) => {
                    text.push(c);
                    i += 1;
                }
            }
        }

        if !text.is_empty() {
            parts.push(StrPart::Text(text));
        }
        Ok(Expr::Interpolated(parts))
    }
}

/// Index of the `}` closing the `{` at `open`, skipping nested strings.
fn matching_brace(chars: &[char], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut i = open;
    while i < chars.len() {
        let c = chars[i];
        match quote {
            Some(q) => {
                if c == '\\' {
                    i += 1;
                } else if c == q {
                    quote = None;
                }
            }
            None => match c {
                '"' | '\'' => quote = Some(c),
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(i);
                    }
                }
                _ => {}
            },
        }
        i += 1;
    }
    None
}

fn parse_span(inner: &str, line: usize) -> PResult<Expr> {
    let mut commands = Parser::new(inner)
        .parse_program()
        .map_err(|e| ParseError::new(e.message, line + e.line.saturating_sub(1)))?;
    Ok(if commands.len() == 1 {
        commands.remove(0)
    } else {
        Expr::Sequence(commands)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::BinaryOp;
    use pretty_assertions::assert_eq;

    fn interpolate(raw: &str) -> Expr {
        Parser::new("").parse_interpolated(raw, 1).unwrap()
    }

    #[test]
    fn test_text_and_code_parts() {
        assert_eq!(
            interpolate("a #{x + 1} b"),
            Expr::Interpolated(vec![
                StrPart::Text("a ".into()),
                StrPart::Code(Expr::binary(
                    BinaryOp::Add,
                    Expr::Name("x".into()),
                    Expr::Integer(1)
                )),
                StrPart::Text(" b".into()),
            ])
        );
    }

    #[test]
    fn test_nested_string_with_brace() {
        assert_eq!(
            interpolate(r#"#{"}"}"#),
            Expr::Interpolated(vec![StrPart::Code(Expr::Str("}".into()))])
        );
    }

    #[test]
    fn test_escaped_marker_is_text() {
        assert_eq!(
            interpolate(r"\#{x} #{y}"),
            Expr::Interpolated(vec![
                StrPart::Text("#{x} ".into()),
                StrPart::Code(Expr::Name("y".into())),
            ])
        );
    }

    #[test]
    fn test_syntax_error_inside_span() {
        let err = Parser::new("").parse_interpolated("#{)}", 3).unwrap_err();
        assert_eq!(err.line, 3);
    }
}
