//! Tokenizer for Garnet source text
//!
//! Converts raw source into a lazily produced stream of [`Token`]s. The
//! tokenizer keeps a single pushback slot so the parser can look one token
//! ahead and back off again.

use crate::error::ParseError;

/// Reserved words of the language.
pub const KEYWORDS: &[&str] = &[
    "and", "begin", "break", "case", "class", "def", "defined?", "do", "else", "elsif", "end",
    "ensure", "false", "for", "if", "in", "lambda", "module", "next", "nil", "not", "or", "proc",
    "raise", "redo", "require", "rescue", "return", "self", "then", "true", "unless", "until",
    "when", "while", "yield",
];

/// Multi- and single-character operators, tried longest first.
const OPERATORS: &[&str] = &[
    "**=", "<=>", "...", "||=", "&&=", "==", "<=", ">=", "!=", "=>", "->", "..", "&&", "||",
    "+=", "-=", "*=", "/=", "%=", "**", "?", ":", "+", "-", "*", "/", "%", "=", "<", ">", "!",
];

/// Single-character separators.
const SEPARATORS: &[char] = &[';', '(', ')', '[', ']', ',', '.', '|', '{', '}', '&'];

/// The category of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// Identifier (local name, method name or constant)
    Name,
    /// Reserved word
    Keyword,
    /// Integer literal
    Integer,
    /// Floating point literal
    Float,
    /// String literal without interpolation (escapes already processed)
    String,
    /// Double-quoted literal containing `#{...}` spans, kept raw
    InterpolatedString,
    /// `:name`
    Symbol,
    /// `@name`
    InstanceVariable,
    /// `@@name`
    ClassVariable,
    /// `$name`
    GlobalVariable,
    /// Operator from the fixed operator set
    Operator,
    /// Separator character or `::`
    Separator,
    /// `/.../flags` literal, produced on request of the parser
    Regex,
}

/// A single token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// Token category
    pub kind: TokenKind,
    /// Token text (string contents for string literals, name for symbols)
    pub text: String,
    /// Line the token starts on (1-indexed)
    pub line: usize,
    /// Whitespace separates this token from the previous one
    pub space_before: bool,
    /// A line break separates this token from the previous one
    pub newline_before: bool,
}

impl Token {
    /// Check kind and text at once.
    pub fn is(&self, kind: TokenKind, text: &str) -> bool {
        self.kind == kind && self.text == text
    }

    /// Check for a keyword.
    pub fn is_keyword(&self, text: &str) -> bool {
        self.is(TokenKind::Keyword, text)
    }

    /// Check for an operator.
    pub fn is_operator(&self, text: &str) -> bool {
        self.is(TokenKind::Operator, text)
    }

    /// Check for a separator.
    pub fn is_separator(&self, text: &str) -> bool {
        self.is(TokenKind::Separator, text)
    }

    /// A name token that starts with an upper-case letter.
    pub fn is_constant(&self) -> bool {
        self.kind == TokenKind::Name && self.text.starts_with(|c: char| c.is_ascii_uppercase())
    }
}

/// Lazy tokenizer with a one-token pushback buffer.
pub struct Tokenizer {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    pushed: Option<Token>,
}

impl Tokenizer {
    /// Create a tokenizer over `text`.
    pub fn new(text: &str) -> Self {
        Self {
            chars: text.chars().collect(),
            pos: 0,
            line: 1,
            pushed: None,
        }
    }

    /// Current line number.
    pub fn line(&self) -> usize {
        self.line
    }

    /// Return a token to the stream. Only one token can be pending.
    pub fn push_token(&mut self, token: Token) {
        debug_assert!(self.pushed.is_none(), "pushback slot already occupied");
        self.pushed = Some(token);
    }

    /// Produce the next token, or `None` at end of input.
    pub fn next_token(&mut self) -> Result<Option<Token>, ParseError> {
        if let Some(token) = self.pushed.take() {
            return Ok(Some(token));
        }

        let (space_before, newline_before) = self.skip_blanks();
        let Some(c) = self.peek_char(0) else {
            return Ok(None);
        };

        let line = self.line;
        let make = |kind, text: String| {
            Ok(Some(Token {
                kind,
                text,
                line,
                space_before,
                newline_before,
            }))
        };

        if c.is_ascii_digit() {
            let (kind, text) = self.read_number();
            return make(kind, text);
        }

        if is_name_start(c) {
            let text = self.read_name();
            let kind = if KEYWORDS.contains(&text.as_str()) {
                TokenKind::Keyword
            } else {
                TokenKind::Name
            };
            return make(kind, text);
        }

        match c {
            '"' | '\'' => {
                self.pos += 1;
                let (text, interpolated) = self.read_string(c)?;
                let kind = if interpolated {
                    TokenKind::InterpolatedString
                } else {
                    TokenKind::String
                };
                make(kind, text)
            }
            ':' => self.read_colon().and_then(|(kind, text)| make(kind, text)),
            '@' => {
                let (kind, text) = self.read_variable()?;
                make(kind, text)
            }
            '$' => {
                self.pos += 1;
                match self.peek_char(0) {
                    Some(n) if is_name_start(n) => {
                        let name = self.read_plain_name();
                        make(TokenKind::GlobalVariable, format!("${}", name))
                    }
                    _ => Err(self.error("global variable name expected")),
                }
            }
            _ => {
                if let Some(op) = self.match_operator() {
                    self.pos += op.chars().count();
                    return make(TokenKind::Operator, op.to_string());
                }
                if SEPARATORS.contains(&c) {
                    self.pos += 1;
                    return make(TokenKind::Separator, c.to_string());
                }
                Err(self.error(format!("unexpected character '{}'", c)))
            }
        }
    }

    /// Read the body of a regular expression literal whose opening `/` the
    /// parser has already consumed. Returns a `Regex` token with the text
    /// `pattern` and the flags appended after a NUL separator.
    pub fn read_regex(&mut self) -> Result<Token, ParseError> {
        debug_assert!(self.pushed.is_none());
        let line = self.line;
        let mut pattern = String::new();
        loop {
            match self.peek_char(0) {
                None | Some('\n') => return Err(self.error("unclosed regular expression")),
                Some('\\') if self.peek_char(1) == Some('/') => {
                    pattern.push('/');
                    self.pos += 2;
                }
                Some('\\') => {
                    pattern.push('\\');
                    if let Some(n) = self.peek_char(1) {
                        pattern.push(n);
                    }
                    self.pos += 2;
                }
                Some('/') => {
                    self.pos += 1;
                    break;
                }
                Some(c) => {
                    pattern.push(c);
                    self.pos += 1;
                }
            }
        }
        let mut flags = String::new();
        while let Some(c @ ('i' | 'm' | 'x')) = self.peek_char(0) {
            flags.push(c);
            self.pos += 1;
        }
        Ok(Token {
            kind: TokenKind::Regex,
            text: format!("{}\0{}", pattern, flags),
            line,
            space_before: false,
            newline_before: false,
        })
    }

    // ═══════════════════════════════════════════════════════════════════
    // Scanning helpers
    // ═══════════════════════════════════════════════════════════════════

    fn peek_char(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError::new(message, self.line)
    }

    /// Skip whitespace and comments, reporting what was skipped.
    fn skip_blanks(&mut self) -> (bool, bool) {
        let at_start = self.pos == 0;
        let mut space = false;
        let mut newline = at_start;
        while let Some(c) = self.peek_char(0) {
            if c == '\n' {
                newline = true;
                space = true;
                self.line += 1;
                self.pos += 1;
            } else if c.is_whitespace() {
                space = true;
                self.pos += 1;
            } else if c == '\\' && self.peek_char(1) == Some('\n') {
                // explicit line continuation
                space = true;
                self.line += 1;
                self.pos += 2;
            } else if c == '#' {
                while let Some(c) = self.peek_char(0) {
                    if c == '\n' {
                        break;
                    }
                    self.pos += 1;
                }
            } else {
                break;
            }
        }
        (space, newline)
    }

    fn read_number(&mut self) -> (TokenKind, String) {
        let mut text = String::new();
        self.read_digits(&mut text);

        // `1.5` is a float; `1.foo` and `1..5` leave the dot unread.
        if self.peek_char(0) == Some('.') && self.peek_char(1).is_some_and(|c| c.is_ascii_digit())
        {
            self.pos += 1;
            text.push('.');
            self.read_digits(&mut text);
            if matches!(self.peek_char(0), Some('e' | 'E')) {
                let sign = matches!(self.peek_char(1), Some('+' | '-'));
                let digit_at = if sign { 2 } else { 1 };
                if self.peek_char(digit_at).is_some_and(|c| c.is_ascii_digit()) {
                    text.push('e');
                    if sign {
                        text.extend(self.peek_char(1));
                    }
                    self.pos += digit_at;
                    self.read_digits(&mut text);
                }
            }
            return (TokenKind::Float, text);
        }

        (TokenKind::Integer, text)
    }

    fn read_digits(&mut self, into: &mut String) {
        while let Some(c) = self.peek_char(0) {
            if c.is_ascii_digit() {
                into.push(c);
                self.pos += 1;
            } else if c == '_' && self.peek_char(1).is_some_and(|n| n.is_ascii_digit()) {
                self.pos += 1;
            } else {
                break;
            }
        }
    }

    fn read_plain_name(&mut self) -> String {
        let mut name = String::new();
        while let Some(c) = self.peek_char(0) {
            if is_name_char(c) {
                name.push(c);
                self.pos += 1;
            } else {
                break;
            }
        }
        name
    }

    /// A name may end in `?` or `!` when the suffix is not part of `!=`/`?=`.
    fn read_name(&mut self) -> String {
        let mut name = self.read_plain_name();
        if let Some(c @ ('?' | '!')) = self.peek_char(0) {
            if self.peek_char(1) != Some('=') || self.peek_char(2) == Some('=') {
                name.push(c);
                self.pos += 1;
            }
        }
        name
    }

    fn read_string(&mut self, quote: char) -> Result<(String, bool), ParseError> {
        let start_line = self.line;
        let mut text = String::new();
        let mut interpolated = false;

        loop {
            let Some(c) = self.peek_char(0) else {
                return Err(ParseError::new("unclosed string", start_line));
            };
            self.pos += 1;
            match c {
                c if c == quote => break,
                '\\' => {
                    let Some(escaped) = self.peek_char(0) else {
                        return Err(ParseError::new("unclosed string", start_line));
                    };
                    self.pos += 1;
                    match escaped {
                        'n' => text.push('\n'),
                        't' => text.push('\t'),
                        'r' => text.push('\r'),
                        // kept escaped so the interpolation splitter can tell it apart
                        '#' if quote == '"' => text.push_str("\\#"),
                        '\\' if quote == '"' => text.push_str("\\\\"),
                        other => {
                            if other == '\n' {
                                self.line += 1;
                            }
                            text.push(other);
                        }
                    }
                }
                '#' if quote == '"' && self.peek_char(0) == Some('{') => {
                    interpolated = true;
                    text.push('#');
                    self.copy_interpolation(&mut text, start_line)?;
                }
                '\n' => {
                    self.line += 1;
                    text.push('\n');
                }
                other => text.push(other),
            }
        }

        if quote == '"' {
            if interpolated {
                return Ok((text, true));
            }
            text = unescape_markers(&text);
        }
        Ok((text, false))
    }

    /// Copy a `{...}` interpolation span verbatim, tracking brace depth and
    /// skipping over nested string literals.
    fn copy_interpolation(&mut self, text: &mut String, start_line: usize) -> Result<(), ParseError> {
        let mut depth = 0usize;
        let mut in_string: Option<char> = None;
        loop {
            let Some(c) = self.peek_char(0) else {
                return Err(ParseError::new("unclosed string", start_line));
            };
            self.pos += 1;
            text.push(c);
            if c == '\n' {
                self.line += 1;
            }
            match in_string {
                Some(q) => {
                    if c == '\\' {
                        if let Some(n) = self.peek_char(0) {
                            text.push(n);
                            self.pos += 1;
                        }
                    } else if c == q {
                        in_string = None;
                    }
                }
                None => match c {
                    '"' | '\'' => in_string = Some(c),
                    '{' => depth += 1,
                    '}' => {
                        depth -= 1;
                        if depth == 0 {
                            return Ok(());
                        }
                    }
                    _ => {}
                },
            }
        }
    }

    fn read_colon(&mut self) -> Result<(TokenKind, String), ParseError> {
        // `key:1` inside hashes and argument lists: a symbol never directly
        // follows a name
        let after_name = self.pos > 0
            && self
                .chars
                .get(self.pos - 1)
                .is_some_and(|c| is_name_char(*c) || *c == '?');
        match self.peek_char(1) {
            Some(':') => {
                self.pos += 2;
                Ok((TokenKind::Separator, "::".to_string()))
            }
            _ if after_name => {
                self.pos += 1;
                Ok((TokenKind::Operator, ":".to_string()))
            }
            Some(d) if d.is_ascii_digit() => {
                Err(self.error("symbol name cannot start with a digit"))
            }
            Some(n) if is_name_start(n) => {
                self.pos += 1;
                let mut name = self.read_name();
                if self.peek_char(0) == Some('=')
                    && !matches!(self.peek_char(1), Some('=' | '>' | '~'))
                {
                    name.push('=');
                    self.pos += 1;
                }
                Ok((TokenKind::Symbol, name))
            }
            Some(q @ ('"' | '\'')) => {
                self.pos += 2;
                let (name, _) = self.read_string(q)?;
                Ok((TokenKind::Symbol, name))
            }
            _ => {
                self.pos += 1;
                Ok((TokenKind::Operator, ":".to_string()))
            }
        }
    }

    fn read_variable(&mut self) -> Result<(TokenKind, String), ParseError> {
        let (kind, prefix) = if self.peek_char(1) == Some('@') {
            (TokenKind::ClassVariable, "@@")
        } else {
            (TokenKind::InstanceVariable, "@")
        };
        self.pos += prefix.len();
        match self.peek_char(0) {
            Some(c) if c.is_ascii_digit() => Err(self.error(match kind {
                TokenKind::ClassVariable => "class variable name cannot start with a digit",
                _ => "instance variable name cannot start with a digit",
            })),
            Some(c) if is_name_start(c) => {
                let name = self.read_plain_name();
                Ok((kind, format!("{}{}", prefix, name)))
            }
            _ => Err(self.error("name expected")),
        }
    }

    /// Maximal munch over the operator set.
    fn match_operator(&self) -> Option<&'static str> {
        OPERATORS.iter().copied().find(|op| {
            op.chars()
                .enumerate()
                .all(|(i, c)| self.peek_char(i) == Some(c))
        })
    }
}

/// Replace the `\#` and `\\` markers kept by the string reader.
pub(crate) fn unescape_markers(text: &str) -> String {
    text.replace("\\#", "#").replace("\\\\", "\\")
}

fn is_name_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(src: &str) -> Vec<(TokenKind, String)> {
        let mut lexer = Tokenizer::new(src);
        let mut out = Vec::new();
        while let Some(t) = lexer.next_token().unwrap() {
            out.push((t.kind, t.text));
        }
        out
    }

    #[test]
    fn test_operator_maximal_munch() {
        let kinds: Vec<String> = tokens("a **= b ** c <=> d").into_iter().map(|t| t.1).collect();
        assert_eq!(kinds, vec!["a", "**=", "b", "**", "c", "<=>", "d"]);
    }

    #[test]
    fn test_munch_backs_off() {
        let texts: Vec<String> = tokens("x=-1").into_iter().map(|t| t.1).collect();
        assert_eq!(texts, vec!["x", "=", "-", "1"]);
    }

    #[test]
    fn test_integer_then_dot_method() {
        let toks = tokens("1.to_s");
        assert_eq!(toks[0], (TokenKind::Integer, "1".to_string()));
        assert_eq!(toks[1], (TokenKind::Separator, ".".to_string()));
        assert_eq!(toks[2], (TokenKind::Name, "to_s".to_string()));
    }

    #[test]
    fn test_float_literal() {
        assert_eq!(tokens("3.25"), vec![(TokenKind::Float, "3.25".to_string())]);
    }

    #[test]
    fn test_range_is_not_float() {
        let toks = tokens("1..5");
        assert_eq!(toks[0].0, TokenKind::Integer);
        assert_eq!(toks[1], (TokenKind::Operator, "..".to_string()));
        assert_eq!(toks[2].0, TokenKind::Integer);
    }

    #[test]
    fn test_colon_disambiguation() {
        let toks = tokens(":sym A::B a ? b : c");
        assert_eq!(toks[0], (TokenKind::Symbol, "sym".to_string()));
        assert_eq!(toks[2], (TokenKind::Separator, "::".to_string()));
        assert_eq!(toks[7], (TokenKind::Operator, ":".to_string()));
    }

    #[test]
    fn test_symbol_digit_rejected() {
        let mut lexer = Tokenizer::new(":1");
        let err = lexer.next_token().unwrap_err();
        assert!(err.message.contains("digit"));
    }

    #[test]
    fn test_variables() {
        let toks = tokens("@a @@b $c");
        assert_eq!(toks[0], (TokenKind::InstanceVariable, "@a".to_string()));
        assert_eq!(toks[1], (TokenKind::ClassVariable, "@@b".to_string()));
        assert_eq!(toks[2], (TokenKind::GlobalVariable, "$c".to_string()));
    }

    #[test]
    fn test_instance_variable_digit_rejected() {
        let mut lexer = Tokenizer::new("@1x");
        assert!(lexer.next_token().is_err());
    }

    #[test]
    fn test_string_escapes() {
        assert_eq!(
            tokens(r#""a\tb\n""#),
            vec![(TokenKind::String, "a\tb\n".to_string())]
        );
        assert_eq!(tokens(r"'it\'s'"), vec![(TokenKind::String, "it's".to_string())]);
    }

    #[test]
    fn test_unclosed_string() {
        let mut lexer = Tokenizer::new("\"abc");
        assert_eq!(lexer.next_token().unwrap_err().message, "unclosed string");
    }

    #[test]
    fn test_interpolated_string_is_raw() {
        assert_eq!(
            tokens(r#""x #{a + "}"} y""#),
            vec![(TokenKind::InterpolatedString, r#"x #{a + "}"} y"#.to_string())]
        );
    }

    #[test]
    fn test_comments_skipped() {
        let toks = tokens("a # comment\nb");
        assert_eq!(toks.len(), 2);
    }

    #[test]
    fn test_newline_flag() {
        let mut lexer = Tokenizer::new("a\nb c");
        let a = lexer.next_token().unwrap().unwrap();
        let b = lexer.next_token().unwrap().unwrap();
        let c = lexer.next_token().unwrap().unwrap();
        assert!(a.newline_before);
        assert!(b.newline_before);
        assert!(!c.newline_before);
        assert!(c.space_before);
    }

    #[test]
    fn test_predicate_names() {
        let texts: Vec<String> = tokens("a.empty? x != y defined?(z)")
            .into_iter()
            .map(|t| t.1)
            .collect();
        assert_eq!(texts, vec!["a", ".", "empty?", "x", "!=", "y", "defined?", "(", "z", ")"]);
    }

    #[test]
    fn test_pushback() {
        let mut lexer = Tokenizer::new("a b");
        let a = lexer.next_token().unwrap().unwrap();
        lexer.push_token(a.clone());
        assert_eq!(lexer.next_token().unwrap(), Some(a));
    }

    #[test]
    fn test_unknown_character() {
        let mut lexer = Tokenizer::new("a ~ b");
        lexer.next_token().unwrap();
        let err = lexer.next_token().unwrap_err();
        assert_eq!(err.message, "unexpected character '~'");
    }

    #[test]
    fn test_regex_body() {
        let mut lexer = Tokenizer::new("/ab\\/c/i rest");
        let slash = lexer.next_token().unwrap().unwrap();
        assert!(slash.is_operator("/"));
        let regex = lexer.read_regex().unwrap();
        assert_eq!(regex.text, "ab/c\0i");
    }
}
