//! # shale-sql
//!
//! The SQL front end of the shale engine: a hand-written lexer, an AST,
//! and a recursive descent parser for a small multi-statement SQL
//! dialect.
//!
//! The pipeline is `&str` → [`Lexer`] → tokens → [`Parser`] → a list of
//! [`Statement`] nodes, which downstream crates execute against a
//! catalog. Parsing is a pure function of the input: no catalog access
//! happens here, so unknown tables and columns only surface later,
//! during execution.
//!
//! ```
//! use shale_sql::parse;
//!
//! let statements = parse("SELECT id, name FROM users WHERE id = 1").unwrap();
//! assert_eq!(statements.len(), 1);
//! ```

pub mod ast;
pub mod lexer;
pub mod parser;

pub use ast::{Expr, Statement};
pub use lexer::{LexError, Lexer, Position, Token, TokenKind};
pub use parser::{ParseError, Parser};

/// Any error the SQL front end can produce.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlError {
    /// Tokenization failed.
    Lex(LexError),
    /// The token stream did not match the grammar.
    Parse(ParseError),
}

impl core::fmt::Display for SqlError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Lex(e) => write!(f, "{e}"),
            Self::Parse(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for SqlError {}

impl From<LexError> for SqlError {
    fn from(e: LexError) -> Self {
        Self::Lex(e)
    }
}

impl From<ParseError> for SqlError {
    fn from(e: ParseError) -> Self {
        Self::Parse(e)
    }
}

/// Lexes and parses a (possibly multi-statement) SQL string.
///
/// Statements are separated by `;`; a trailing `;` is optional and an
/// empty input yields an empty list.
///
/// # Errors
///
/// Returns the first [`LexError`] or [`ParseError`] encountered.
pub fn parse(sql: &str) -> Result<Vec<Statement>, SqlError> {
    let tokens = Lexer::new(sql).tokenize()?;
    let statements = Parser::new(tokens).parse_statements()?;
    Ok(statements)
}
