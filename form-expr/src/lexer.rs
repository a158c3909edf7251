//! Expression lexer (tokenizer).

use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

use crate::error::{ParseError, ParseResult};
use crate::parser::DEFAULT_MAX_NESTING;
use crate::token::{Span, TemplateSubstitution, Token, TokenKind};

/// Expression lexer.
pub struct Lexer<'a> {
    /// Source code.
    source: &'a str,
    /// Current byte position.
    pos: usize,
    /// Byte offset of `source` inside the outermost expression.
    origin: usize,
    /// Current line (1-based).
    line: usize,
    /// Current column (1-based).
    column: usize,
    /// Start of current token.
    token_start: usize,
    /// Start line of current token.
    token_line: usize,
    /// Start column of current token.
    token_column: usize,
    /// Templates open around the current position.
    template_depth: usize,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer.
    pub fn new(source: &'a str) -> Self {
        Self::with_origin(source, Span::new(0, source.len(), 1, 1))
    }

    /// Create a lexer for a fragment of a larger expression (a template
    /// substitution), so spans keep pointing into the outer source.
    pub fn with_origin(source: &'a str, origin: Span) -> Self {
        Lexer {
            source,
            pos: 0,
            origin: origin.start,
            line: origin.line,
            column: origin.column,
            token_start: 0,
            token_line: origin.line,
            token_column: origin.column,
            template_depth: 0,
        }
    }

    /// Tokenize the entire source.
    pub fn tokenize(&mut self) -> ParseResult<Vec<Token>> {
        let mut tokens = Vec::new();

        loop {
            let token = self.next_token()?;
            let is_eof = token.is_eof();
            tokens.push(token);
            if is_eof {
                break;
            }
        }

        Ok(tokens)
    }

    /// Get the next token.
    pub fn next_token(&mut self) -> ParseResult<Token> {
        self.skip_whitespace_and_comments()?;

        self.token_start = self.pos;
        self.token_line = self.line;
        self.token_column = self.column;

        if self.is_eof() {
            return Ok(self.make_token(TokenKind::Eof));
        }

        let ch = self.current();

        if ch.is_ascii_digit() || (ch == '.' && self.peek().is_ascii_digit()) {
            return self.scan_number();
        }

        if ch == '"' || ch == '\'' {
            return self.scan_string(ch);
        }

        if ch == '`' {
            return self.scan_template();
        }

        if is_id_start(ch) {
            return self.scan_identifier();
        }

        if ch == '#' && is_id_start(self.peek()) {
            return self.scan_private_identifier();
        }

        self.scan_punctuator()
    }

    /// Skip whitespace and comments.
    fn skip_whitespace_and_comments(&mut self) -> ParseResult<()> {
        loop {
            while !self.is_eof() && is_whitespace(self.current()) {
                self.advance();
            }

            if self.current() == '/' && self.peek() == '/' {
                while !self.is_eof() && self.current() != '\n' {
                    self.advance();
                }
                continue;
            }

            if self.current() == '/' && self.peek() == '*' {
                self.advance(); // /
                self.advance(); // *
                loop {
                    if self.is_eof() {
                        return Err(self.error("Unterminated comment"));
                    }
                    if self.current() == '*' && self.peek() == '/' {
                        self.advance(); // *
                        self.advance(); // /
                        break;
                    }
                    self.advance();
                }
                continue;
            }

            return Ok(());
        }
    }

    /// Scan a number literal.
    fn scan_number(&mut self) -> ParseResult<Token> {
        let start = self.pos;

        if self.current() == '0' && matches!(self.peek(), 'x' | 'X' | 'o' | 'O' | 'b' | 'B') {
            self.advance(); // 0
            let radix = match self.current() {
                'x' | 'X' => 16,
                'o' | 'O' => 8,
                _ => 2,
            };
            self.advance();
            let digits_start = self.pos;
            while !self.is_eof() && (self.current().is_digit(radix) || self.current() == '_') {
                self.advance();
            }
            let digits: String = self.source[digits_start..self.pos]
                .chars()
                .filter(|c| *c != '_')
                .collect();
            if digits.is_empty() {
                return Err(self.error("Invalid number literal"));
            }
            let mut value = 0f64;
            for digit in digits.chars().filter_map(|c| c.to_digit(radix)) {
                value = value * radix as f64 + digit as f64;
            }
            if self.current() == 'n' {
                self.advance();
                return Ok(self.make_token(TokenKind::BigInt(String::from(
                    &self.source[start..self.pos - 1],
                ))));
            }
            self.reject_identifier_after_number()?;
            return Ok(self.make_token(TokenKind::Number(value)));
        }

        // Decimal integer part
        self.skip_decimal_digits();

        if self.current() == 'n' {
            self.advance();
            let digits = String::from(&self.source[start..self.pos - 1]);
            return Ok(self.make_token(TokenKind::BigInt(digits)));
        }

        // Fractional part ("1." is a complete literal)
        if self.current() == '.' {
            self.advance();
            self.skip_decimal_digits();
        }

        // Exponent
        if matches!(self.current(), 'e' | 'E') {
            self.advance();
            if matches!(self.current(), '+' | '-') {
                self.advance();
            }
            if !self.current().is_ascii_digit() {
                return Err(self.error("Invalid number literal"));
            }
            self.skip_decimal_digits();
        }

        self.reject_identifier_after_number()?;

        let text: String = self.source[start..self.pos]
            .chars()
            .filter(|c| *c != '_')
            .collect();
        let value = text
            .parse::<f64>()
            .map_err(|_| self.error(format!("Invalid number literal '{}'", text)))?;
        Ok(self.make_token(TokenKind::Number(value)))
    }

    fn skip_decimal_digits(&mut self) {
        while !self.is_eof() && (self.current().is_ascii_digit() || self.current() == '_') {
            self.advance();
        }
    }

    fn reject_identifier_after_number(&self) -> ParseResult<()> {
        if is_id_start(self.current()) || self.current().is_ascii_digit() {
            return Err(self.error("Identifier directly after number"));
        }
        Ok(())
    }

    /// Scan a string literal.
    fn scan_string(&mut self, quote: char) -> ParseResult<Token> {
        self.advance(); // Opening quote
        let mut value = String::new();

        while !self.is_eof() && self.current() != quote {
            match self.current() {
                '\\' => {
                    self.advance();
                    self.scan_escape(&mut value)?;
                }
                '\n' | '\r' => return Err(self.error("Unterminated string literal")),
                ch => {
                    value.push(ch);
                    self.advance();
                }
            }
        }

        if self.is_eof() {
            return Err(self.error("Unterminated string literal"));
        }

        self.advance(); // Closing quote
        Ok(self.make_token(TokenKind::String(value)))
    }

    /// Scan the character after a backslash into `value`.
    fn scan_escape(&mut self, value: &mut String) -> ParseResult<()> {
        let ch = self.current();
        match ch {
            'n' => value.push('\n'),
            'r' => value.push('\r'),
            't' => value.push('\t'),
            'b' => value.push('\u{8}'),
            'f' => value.push('\u{c}'),
            'v' => value.push('\u{b}'),
            '0' if !self.peek().is_ascii_digit() => value.push('\0'),
            'x' => {
                self.advance();
                let code = self.scan_hex_digits(2)?;
                push_code_point(value, code);
                return Ok(());
            }
            'u' => {
                self.advance();
                let code = if self.current() == '{' {
                    self.advance();
                    let start = self.pos;
                    while !self.is_eof() && self.current() != '}' {
                        self.advance();
                    }
                    let hex = &self.source[start..self.pos];
                    self.advance(); // }
                    u32::from_str_radix(hex, 16)
                        .map_err(|_| self.error("Invalid unicode escape"))?
                } else {
                    self.scan_hex_digits(4)?
                };
                push_code_point(value, code);
                return Ok(());
            }
            '\r' => {
                // Line continuation
                self.advance();
                if self.current() == '\n' {
                    self.advance();
                }
                return Ok(());
            }
            '\n' => {}
            '\0' if self.is_eof() => return Err(self.error("Unterminated escape sequence")),
            other => value.push(other),
        }
        self.advance();
        Ok(())
    }

    /// Scan a template literal, collecting substitution sources for the
    /// parser to compile separately.
    fn scan_template(&mut self) -> ParseResult<Token> {
        let (start, line, column) = (self.token_start, self.token_line, self.token_column);
        if self.template_depth >= DEFAULT_MAX_NESTING {
            return Err(self.error("Template literals nested too deeply"));
        }
        self.template_depth += 1;
        self.advance(); // `
        let mut quasis = Vec::new();
        let mut substitutions = Vec::new();
        let mut value = String::new();

        loop {
            if self.is_eof() {
                return Err(self.error("Unterminated template literal"));
            }
            match self.current() {
                '`' => {
                    self.advance();
                    break;
                }
                '$' if self.peek() == '{' => {
                    self.advance(); // $
                    self.advance(); // {
                    quasis.push(core::mem::take(&mut value));
                    substitutions.push(self.scan_substitution()?);
                }
                '\\' => {
                    self.advance();
                    self.scan_escape(&mut value)?;
                }
                ch => {
                    value.push(ch);
                    self.advance();
                }
            }
        }
        quasis.push(value);
        self.template_depth -= 1;

        self.token_start = start;
        self.token_line = line;
        self.token_column = column;
        Ok(self.make_token(TokenKind::Template {
            quasis,
            substitutions,
        }))
    }

    /// Scan the raw text of one `${...}` substitution, up to the matching `}`.
    fn scan_substitution(&mut self) -> ParseResult<TemplateSubstitution> {
        let start = self.pos;
        let (line, column) = (self.line, self.column);
        let mut depth = 0usize;

        loop {
            if self.is_eof() {
                return Err(self.error("Unterminated template substitution"));
            }
            match self.current() {
                '{' => {
                    depth += 1;
                    self.advance();
                }
                '}' if depth == 0 => break,
                '}' => {
                    depth -= 1;
                    self.advance();
                }
                quote @ ('"' | '\'') => {
                    self.scan_string(quote)?;
                }
                '`' => {
                    self.scan_template()?;
                }
                _ => self.advance(),
            }
        }

        let end = self.pos;
        self.advance(); // }
        Ok(TemplateSubstitution {
            source: String::from(&self.source[start..end]),
            span: Span::new(self.origin + start, self.origin + end, line, column),
        })
    }

    /// Scan an identifier or reserved word.
    fn scan_identifier(&mut self) -> ParseResult<Token> {
        let start = self.pos;

        while !self.is_eof() && is_id_continue(self.current()) {
            self.advance();
        }

        let text = &self.source[start..self.pos];
        let kind = TokenKind::keyword_from_str(text)
            .unwrap_or_else(|| TokenKind::Identifier(String::from(text)));

        Ok(self.make_token(kind))
    }

    /// Scan a private identifier.
    fn scan_private_identifier(&mut self) -> ParseResult<Token> {
        self.advance(); // #
        let start = self.pos;

        while !self.is_eof() && is_id_continue(self.current()) {
            self.advance();
        }

        let text = String::from(&self.source[start..self.pos]);
        Ok(self.make_token(TokenKind::PrivateIdentifier(text)))
    }

    /// Scan a punctuator.
    fn scan_punctuator(&mut self) -> ParseResult<Token> {
        let source = self.source;
        let rest = &source[self.pos..];
        let Some((mut text, mut kind)) = TokenKind::longest_punctuator(rest) else {
            return Err(ParseError::new(
                format!("Unexpected character '{}'", self.current()),
                self.token_line,
                self.token_column,
            ));
        };

        // `a?.5:b` is a conditional, not an optional chain
        if kind == TokenKind::QuestionDot && rest[2..].starts_with(|c: char| c.is_ascii_digit()) {
            text = "?";
            kind = TokenKind::Question;
        }

        for _ in text.chars() {
            self.advance();
        }

        Ok(self.make_token(kind))
    }

    /// Scan hex digits.
    fn scan_hex_digits(&mut self, count: usize) -> ParseResult<u32> {
        let mut value: u32 = 0;
        for _ in 0..count {
            let digit = self
                .current()
                .to_digit(16)
                .ok_or_else(|| self.error("Invalid hex escape"))?;
            value = value * 16 + digit;
            self.advance();
        }
        Ok(value)
    }

    // Helper methods

    fn is_eof(&self) -> bool {
        self.pos >= self.source.len()
    }

    fn current(&self) -> char {
        self.source[self.pos..].chars().next().unwrap_or('\0')
    }

    fn peek(&self) -> char {
        let mut chars = self.source[self.pos..].chars();
        chars.next();
        chars.next().unwrap_or('\0')
    }

    fn advance(&mut self) {
        if let Some(ch) = self.source[self.pos..].chars().next() {
            self.pos += ch.len_utf8();
            if ch == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
    }

    fn error<S: Into<String>>(&self, message: S) -> ParseError {
        ParseError::new(message, self.line, self.column)
    }

    fn make_token(&self, kind: TokenKind) -> Token {
        Token::new(
            kind,
            Span::new(
                self.origin + self.token_start,
                self.origin + self.pos,
                self.token_line,
                self.token_column,
            ),
        )
    }
}

fn push_code_point(value: &mut String, code: u32) {
    value.push(char::from_u32(code).unwrap_or('\u{FFFD}'));
}

/// Check if character is whitespace.
fn is_whitespace(ch: char) -> bool {
    ch.is_whitespace() || ch == '\u{FEFF}'
}

/// Check if character can start an identifier.
fn is_id_start(ch: char) -> bool {
    ch.is_alphabetic() || ch == '_' || ch == '$'
}

/// Check if character can continue an identifier.
fn is_id_continue(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_' || ch == '$' || ch == '\u{200C}' || ch == '\u{200D}'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Lexer::new(source)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_numbers() {
        assert_eq!(kinds("42")[0], TokenKind::Number(42.0));
        assert_eq!(kinds("3.25")[0], TokenKind::Number(3.25));
        assert_eq!(kinds(".5")[0], TokenKind::Number(0.5));
        assert_eq!(kinds("1e3")[0], TokenKind::Number(1000.0));
        assert_eq!(kinds("0xFF")[0], TokenKind::Number(255.0));
        assert_eq!(kinds("0b101")[0], TokenKind::Number(5.0));
        assert_eq!(kinds("1_000")[0], TokenKind::Number(1000.0));
        assert_eq!(kinds("10n")[0], TokenKind::BigInt("10".into()));
    }

    #[test]
    fn test_number_followed_by_identifier_is_error() {
        assert!(Lexer::new("3in").tokenize().is_err());
    }

    #[test]
    fn test_strings_and_escapes() {
        assert_eq!(kinds(r#""a\nb""#)[0], TokenKind::String("a\nb".into()));
        assert_eq!(kinds("'it\\'s'")[0], TokenKind::String("it's".into()));
        assert_eq!(kinds(r#""A\x42""#)[0], TokenKind::String("AB".into()));
        assert_eq!(kinds("'héllo'")[0], TokenKind::String("héllo".into()));
        assert!(Lexer::new("'open").tokenize().is_err());
    }

    #[test]
    fn test_template_substitutions() {
        match &kinds("`a ${b + `c${d}`} e`")[0] {
            TokenKind::Template {
                quasis,
                substitutions,
            } => {
                assert_eq!(quasis.len(), 2);
                assert_eq!(quasis[0], "a ");
                assert_eq!(quasis[1], " e");
                assert_eq!(substitutions[0].source, "b + `c${d}`");
            }
            other => panic!("expected template, got {:?}", other),
        }
    }

    #[test]
    fn test_deeply_nested_templates_are_rejected() {
        let source = format!("{}x{}", "`${".repeat(5_000), "}`".repeat(5_000));
        let err = Lexer::new(&source).tokenize().unwrap_err();
        assert_eq!(err.message, "Template literals nested too deeply");

        let shallow = format!("{}x{}", "`${".repeat(4), "}`".repeat(4));
        assert!(Lexer::new(&shallow).tokenize().is_ok());
    }

    #[test]
    fn test_contextual_words_are_identifiers() {
        assert_eq!(kinds("of")[0], TokenKind::Identifier("of".into()));
        assert_eq!(kinds("async")[0], TokenKind::Identifier("async".into()));
        assert_eq!(kinds("this")[0], TokenKind::This);
    }

    #[test]
    fn test_punctuators() {
        let k = kinds("a?.b ?? c >>>= d => ...e");
        assert!(k.contains(&TokenKind::QuestionDot));
        assert!(k.contains(&TokenKind::QuestionQuestion));
        assert!(k.contains(&TokenKind::UnsignedRightShiftAssign));
        assert!(k.contains(&TokenKind::Arrow));
        assert!(k.contains(&TokenKind::Ellipsis));
        // `?.` followed by a digit is a conditional
        assert_eq!(kinds("a?.5:1")[1], TokenKind::Question);
    }

    #[test]
    fn test_comments_and_positions() {
        let tokens = Lexer::new("/* x */ a\n  // y\n  b").tokenize().unwrap();
        assert_eq!(tokens[0].span.line, 1);
        assert_eq!(tokens[1].span.line, 3);
        assert_eq!(tokens[1].span.column, 3);
    }

    #[test]
    fn test_unexpected_character() {
        let err = Lexer::new("a @ b").tokenize().unwrap_err();
        assert_eq!(err.column, 3);
    }
}
