//! SQL Tokenizer implementation.

use core::fmt;

use super::{Keyword, Position, Token, TokenKind};

/// A tokenization failure, carrying the offending position.
#[derive(Debug, Clone, PartialEq)]
pub struct LexError {
    /// Where the bad input begins.
    pub pos: Position,
    /// Human-readable reason.
    pub reason: String,
}

impl LexError {
    /// Creates a new lex error.
    #[must_use]
    pub fn new(reason: impl Into<String>, pos: Position) -> Self {
        Self {
            pos,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}", self.reason, self.pos)
    }
}

impl std::error::Error for LexError {}

/// A lexer that tokenizes SQL input.
pub struct Lexer<'a> {
    /// The input source code.
    input: &'a str,
    /// The current byte position.
    byte: usize,
    /// The byte position of the start of the current token.
    start: usize,
    /// Line/column of the current character.
    pos: Position,
    /// Line/column at the start of the current token.
    token_pos: Position,
}

impl<'a> Lexer<'a> {
    /// Creates a new lexer for the given input.
    #[must_use]
    pub const fn new(input: &'a str) -> Self {
        Self {
            input,
            byte: 0,
            start: 0,
            pos: Position::new(1, 1),
            token_pos: Position::new(1, 1),
        }
    }

    /// Returns the current character without advancing.
    fn peek(&self) -> Option<char> {
        self.input[self.byte..].chars().next()
    }

    /// Returns the next character without advancing.
    fn peek_next(&self) -> Option<char> {
        let mut chars = self.input[self.byte..].chars();
        chars.next();
        chars.next()
    }

    /// Advances to the next character and returns it.
    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.byte += c.len_utf8();
        self.pos.advance(c);
        Some(c)
    }

    /// Skips whitespace and comments.
    ///
    /// Block comments do not nest: the first `*/` closes the comment.
    fn skip_whitespace_and_comments(&mut self) -> Result<(), LexError> {
        loop {
            // Skip whitespace
            while self.peek().is_some_and(|c| c.is_whitespace()) {
                self.advance();
            }

            // Skip single-line comments (-- ...)
            if self.peek() == Some('-') && self.peek_next() == Some('-') {
                self.advance(); // -
                self.advance(); // -
                while self.peek().is_some_and(|c| c != '\n') {
                    self.advance();
                }
                continue;
            }

            // Skip block comments (/* ... */)
            if self.peek() == Some('/') && self.peek_next() == Some('*') {
                let comment_pos = self.pos;
                self.advance(); // /
                self.advance(); // *
                loop {
                    match self.advance() {
                        Some('*') if self.peek() == Some('/') => {
                            self.advance();
                            break;
                        }
                        Some(_) => {}
                        None => {
                            return Err(LexError::new("unterminated block comment", comment_pos));
                        }
                    }
                }
                continue;
            }

            return Ok(());
        }
    }

    /// Creates a token starting at the current token position.
    fn make_token(&self, kind: TokenKind) -> Token {
        Token::new(kind, self.token_pos)
    }

    /// Scans an identifier or keyword.
    fn scan_identifier(&mut self) -> Token {
        while self.peek().is_some_and(|c| c.is_ascii_alphanumeric() || c == '_') {
            self.advance();
        }

        let text = &self.input[self.start..self.byte];

        // Check if it's a keyword
        if let Some(keyword) = Keyword::from_str(text) {
            self.make_token(TokenKind::Keyword(keyword))
        } else {
            self.make_token(TokenKind::Identifier(String::from(text)))
        }
    }

    /// Scans a number (integer or float).
    ///
    /// A leading minus is never part of the literal; it is lexed as the
    /// minus operator so `a-1` tokenizes as identifier, operator, integer.
    fn scan_number(&mut self) -> Result<Token, LexError> {
        let mut is_float = false;

        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }

        // Check for decimal point
        if self.peek() == Some('.') && self.peek_next().is_some_and(|c| c.is_ascii_digit()) {
            is_float = true;
            self.advance(); // consume .
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.advance();
            }
        }

        let text = &self.input[self.start..self.byte];

        if is_float {
            match text.parse::<f64>() {
                Ok(x) => Ok(self.make_token(TokenKind::Float(x))),
                Err(e) => Err(LexError::new(format!("invalid float literal: {e}"), self.token_pos)),
            }
        } else {
            match text.parse::<i64>() {
                Ok(n) => Ok(self.make_token(TokenKind::Integer(n))),
                Err(e) => Err(LexError::new(
                    format!("invalid integer literal: {e}"),
                    self.token_pos,
                )),
            }
        }
    }

    /// Scans a single-quoted string literal.
    ///
    /// The literal ends at the next single quote; there are no escape
    /// sequences.
    fn scan_string(&mut self) -> Result<Token, LexError> {
        self.advance(); // consume opening quote
        let mut value = String::new();

        loop {
            match self.advance() {
                Some('\'') => break,
                Some(c) => value.push(c),
                None => {
                    return Err(LexError::new("unterminated string literal", self.token_pos));
                }
            }
        }

        Ok(self.make_token(TokenKind::Str(value)))
    }

    /// Scans the next token.
    ///
    /// # Errors
    ///
    /// Returns a [`LexError`] on an unterminated string or block comment,
    /// an out-of-range numeric literal, or an illegal character.
    pub fn next_token(&mut self) -> Result<Token, LexError> {
        self.skip_whitespace_and_comments()?;
        self.start = self.byte;
        self.token_pos = self.pos;

        let c = match self.peek() {
            Some(c) => c,
            None => return Ok(self.make_token(TokenKind::Eof)),
        };

        match c {
            // Single-character tokens
            '(' => {
                self.advance();
                Ok(self.make_token(TokenKind::LeftParen))
            }
            ')' => {
                self.advance();
                Ok(self.make_token(TokenKind::RightParen))
            }
            ',' => {
                self.advance();
                Ok(self.make_token(TokenKind::Comma))
            }
            ';' => {
                self.advance();
                Ok(self.make_token(TokenKind::Semicolon))
            }
            '.' => {
                self.advance();
                Ok(self.make_token(TokenKind::Dot))
            }
            '+' => {
                self.advance();
                Ok(self.make_token(TokenKind::Plus))
            }
            '-' => {
                self.advance();
                Ok(self.make_token(TokenKind::Minus))
            }
            '*' => {
                self.advance();
                Ok(self.make_token(TokenKind::Star))
            }
            '/' => {
                self.advance();
                Ok(self.make_token(TokenKind::Slash))
            }

            // Potentially multi-character operators
            '=' => {
                self.advance();
                Ok(self.make_token(TokenKind::Eq))
            }
            '<' => {
                self.advance();
                if self.peek() == Some('=') {
                    self.advance();
                    Ok(self.make_token(TokenKind::LtEq))
                } else if self.peek() == Some('>') {
                    self.advance();
                    Ok(self.make_token(TokenKind::NotEq))
                } else {
                    Ok(self.make_token(TokenKind::Lt))
                }
            }
            '>' => {
                self.advance();
                if self.peek() == Some('=') {
                    self.advance();
                    Ok(self.make_token(TokenKind::GtEq))
                } else {
                    Ok(self.make_token(TokenKind::Gt))
                }
            }
            '!' => {
                self.advance();
                if self.peek() == Some('=') {
                    self.advance();
                    Ok(self.make_token(TokenKind::NotEq))
                } else {
                    Err(LexError::new("unexpected character: !", self.token_pos))
                }
            }

            // String literals
            '\'' => self.scan_string(),

            // Numbers
            c if c.is_ascii_digit() => self.scan_number(),

            // Identifiers and keywords
            c if c.is_ascii_alphabetic() || c == '_' => Ok(self.scan_identifier()),

            _ => Err(LexError::new(
                format!("unexpected character: {c}"),
                self.token_pos,
            )),
        }
    }

    /// Tokenizes the entire input and returns all tokens.
    ///
    /// The returned stream always ends with an [`TokenKind::Eof`] token.
    ///
    /// # Errors
    ///
    /// Returns the first [`LexError`] encountered.
    pub fn tokenize(&mut self) -> Result<Vec<Token>, LexError> {
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
}
