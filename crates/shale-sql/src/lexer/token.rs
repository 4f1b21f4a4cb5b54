//! Token types for the SQL lexer.

use core::fmt;

use super::Position;

/// SQL keywords.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    // Data Query Language (DQL)
    Select,
    From,
    Where,
    Group,
    By,
    Order,
    Asc,
    Desc,
    Distinct,

    // Joins
    Join,
    Inner,
    Left,
    Right,
    Full,
    Outer,
    On,

    // Data Manipulation Language (DML)
    Insert,
    Into,
    Values,
    Update,
    Set,
    Delete,

    // Data Definition Language (DDL)
    Create,
    Drop,
    Table,

    // Constraints
    Primary,
    Key,
    References,
    Unique,

    // Logical operators and predicates
    And,
    Or,
    Not,
    Between,
    Is,
    Null,
    True,
    False,

    // Aggregates
    Count,
    Sum,
    Avg,
    Min,
    Max,

    // Data types
    Int,
    Text,
    Float,
    Boolean,

    // Misc
    As,
}

impl Keyword {
    /// Attempts to parse a keyword from a string (case-insensitive).
    #[must_use]
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        // Convert to uppercase for comparison
        match s.to_ascii_uppercase().as_str() {
            "SELECT" => Some(Self::Select),
            "FROM" => Some(Self::From),
            "WHERE" => Some(Self::Where),
            "GROUP" => Some(Self::Group),
            "BY" => Some(Self::By),
            "ORDER" => Some(Self::Order),
            "ASC" => Some(Self::Asc),
            "DESC" => Some(Self::Desc),
            "DISTINCT" => Some(Self::Distinct),
            "JOIN" => Some(Self::Join),
            "INNER" => Some(Self::Inner),
            "LEFT" => Some(Self::Left),
            "RIGHT" => Some(Self::Right),
            "FULL" => Some(Self::Full),
            "OUTER" => Some(Self::Outer),
            "ON" => Some(Self::On),
            "INSERT" => Some(Self::Insert),
            "INTO" => Some(Self::Into),
            "VALUES" => Some(Self::Values),
            "UPDATE" => Some(Self::Update),
            "SET" => Some(Self::Set),
            "DELETE" => Some(Self::Delete),
            "CREATE" => Some(Self::Create),
            "DROP" => Some(Self::Drop),
            "TABLE" => Some(Self::Table),
            "PRIMARY" => Some(Self::Primary),
            "KEY" => Some(Self::Key),
            "REFERENCES" => Some(Self::References),
            "UNIQUE" => Some(Self::Unique),
            "AND" => Some(Self::And),
            "OR" => Some(Self::Or),
            "NOT" => Some(Self::Not),
            "BETWEEN" => Some(Self::Between),
            "IS" => Some(Self::Is),
            "NULL" => Some(Self::Null),
            "TRUE" => Some(Self::True),
            "FALSE" => Some(Self::False),
            "COUNT" => Some(Self::Count),
            "SUM" => Some(Self::Sum),
            "AVG" => Some(Self::Avg),
            "MIN" => Some(Self::Min),
            "MAX" => Some(Self::Max),
            "INT" => Some(Self::Int),
            "TEXT" => Some(Self::Text),
            "FLOAT" => Some(Self::Float),
            "BOOLEAN" => Some(Self::Boolean),
            "AS" => Some(Self::As),
            _ => None,
        }
    }

    /// Returns the keyword as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Select => "SELECT",
            Self::From => "FROM",
            Self::Where => "WHERE",
            Self::Group => "GROUP",
            Self::By => "BY",
            Self::Order => "ORDER",
            Self::Asc => "ASC",
            Self::Desc => "DESC",
            Self::Distinct => "DISTINCT",
            Self::Join => "JOIN",
            Self::Inner => "INNER",
            Self::Left => "LEFT",
            Self::Right => "RIGHT",
            Self::Full => "FULL",
            Self::Outer => "OUTER",
            Self::On => "ON",
            Self::Insert => "INSERT",
            Self::Into => "INTO",
            Self::Values => "VALUES",
            Self::Update => "UPDATE",
            Self::Set => "SET",
            Self::Delete => "DELETE",
            Self::Create => "CREATE",
            Self::Drop => "DROP",
            Self::Table => "TABLE",
            Self::Primary => "PRIMARY",
            Self::Key => "KEY",
            Self::References => "REFERENCES",
            Self::Unique => "UNIQUE",
            Self::And => "AND",
            Self::Or => "OR",
            Self::Not => "NOT",
            Self::Between => "BETWEEN",
            Self::Is => "IS",
            Self::Null => "NULL",
            Self::True => "TRUE",
            Self::False => "FALSE",
            Self::Count => "COUNT",
            Self::Sum => "SUM",
            Self::Avg => "AVG",
            Self::Min => "MIN",
            Self::Max => "MAX",
            Self::Int => "INT",
            Self::Text => "TEXT",
            Self::Float => "FLOAT",
            Self::Boolean => "BOOLEAN",
            Self::As => "AS",
        }
    }
}

/// The kind of token.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Literals
    /// Integer literal (e.g., 42)
    Integer(i64),
    /// Float literal (e.g., 3.14)
    Float(f64),
    /// String literal (e.g., 'hello')
    Str(String),

    // Identifiers and keywords
    /// Identifier (e.g., column_name); original casing is preserved.
    Identifier(String),
    /// SQL keyword
    Keyword(Keyword),

    // Operators
    /// =
    Eq,
    /// != or <>
    NotEq,
    /// <
    Lt,
    /// <=
    LtEq,
    /// >
    Gt,
    /// >=
    GtEq,
    /// +
    Plus,
    /// -
    Minus,
    /// * (multiplication and the SELECT wildcard)
    Star,
    /// /
    Slash,

    // Delimiters
    /// (
    LeftParen,
    /// )
    RightParen,
    /// ,
    Comma,
    /// ;
    Semicolon,
    /// .
    Dot,

    // Special
    /// End of input
    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(n) => write!(f, "{n}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Str(s) => write!(f, "'{s}'"),
            Self::Identifier(name) => f.write_str(name),
            Self::Keyword(kw) => f.write_str(kw.as_str()),
            Self::Eq => f.write_str("="),
            Self::NotEq => f.write_str("!="),
            Self::Lt => f.write_str("<"),
            Self::LtEq => f.write_str("<="),
            Self::Gt => f.write_str(">"),
            Self::GtEq => f.write_str(">="),
            Self::Plus => f.write_str("+"),
            Self::Minus => f.write_str("-"),
            Self::Star => f.write_str("*"),
            Self::Slash => f.write_str("/"),
            Self::LeftParen => f.write_str("("),
            Self::RightParen => f.write_str(")"),
            Self::Comma => f.write_str(","),
            Self::Semicolon => f.write_str(";"),
            Self::Dot => f.write_str("."),
            Self::Eof => f.write_str("end of input"),
        }
    }
}

/// A token with its position in the source code.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// The kind of token.
    pub kind: TokenKind,
    /// The location in the source code.
    pub pos: Position,
}

impl Token {
    /// Creates a new token.
    #[must_use]
    pub const fn new(kind: TokenKind, pos: Position) -> Self {
        Self { kind, pos }
    }

    /// Returns true if this is an EOF token.
    #[must_use]
    pub const fn is_eof(&self) -> bool {
        matches!(self.kind, TokenKind::Eof)
    }

    /// Returns the keyword if this is a keyword token.
    #[must_use]
    pub const fn as_keyword(&self) -> Option<Keyword> {
        match &self.kind {
            TokenKind::Keyword(kw) => Some(*kw),
            _ => None,
        }
    }
}
