//! Error taxonomy for the engine pipeline.
//!
//! The engine surfaces the first error from lex → parse → execute
//! verbatim; the façade renders it as `"<Kind>: <message>"` using
//! [`EngineError::kind`].

use shale_sql::{LexError, ParseError, SqlError};
use shale_store::StoreError;

/// Name-resolution and schema-declaration errors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SemanticError {
    /// The named table does not exist.
    #[error("unknown table: {0}")]
    UnknownTable(String),

    /// The named column does not exist in any table in scope.
    #[error("unknown column: {0}")]
    UnknownColumn(String),

    /// An unqualified column name matched more than one table in scope.
    #[error("ambiguous column: {0}")]
    AmbiguousColumn(String),

    /// CREATE TABLE for a name that already exists.
    #[error("table already exists: {0}")]
    TableExists(String),

    /// The same column name was declared twice.
    #[error("duplicate column: {0}")]
    DuplicateColumn(String),

    /// More than one PRIMARY KEY column was declared.
    #[error("multiple PRIMARY KEY columns on table {0}")]
    MultiplePrimaryKeys(String),

    /// A REFERENCES clause names an invalid target.
    #[error("invalid reference to {table}({column}): {reason}")]
    InvalidReference {
        /// The referenced table.
        table: String,
        /// The referenced column.
        column: String,
        /// Why the target is not usable.
        reason: String,
    },

    /// Two tables in a SELECT share the same binding name.
    #[error("duplicate table name or alias: {0}")]
    DuplicateAlias(String),

    /// A select item references a column that is not grouped.
    #[error("column {0} must appear in the GROUP BY clause")]
    UngroupedColumn(String),

    /// An aggregate call appeared where aggregates are not allowed.
    #[error("aggregate function not allowed in this context")]
    AggregateNotAllowed,
}

/// An incompatible value assignment or operation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message}")]
pub struct TypeError {
    /// Human-readable description of the mismatch.
    pub message: String,
}

impl TypeError {
    /// Creates a new type error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// A data-dependent integrity violation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConstraintError {
    /// A second row would carry the same primary-key value.
    #[error("duplicate value for primary key column {table}.{column}")]
    PrimaryKeyDuplicate {
        /// The table.
        table: String,
        /// The primary-key column.
        column: String,
    },

    /// A second row would carry the same value in a UNIQUE column.
    #[error("duplicate value for unique column {table}.{column}")]
    UniqueViolation {
        /// The table.
        table: String,
        /// The unique column.
        column: String,
    },

    /// A NOT NULL column would end up null.
    #[error("column {table}.{column} cannot be NULL")]
    NotNull {
        /// The table.
        table: String,
        /// The NOT NULL column.
        column: String,
    },

    /// A foreign-key value has no referent in the target table.
    #[error("foreign key violation: no {table}.{column} matches value {value}")]
    ForeignKeyMissing {
        /// The referenced table.
        table: String,
        /// The referenced column.
        column: String,
        /// The offending value.
        value: String,
    },

    /// A delete, drop, or key update would orphan referring rows.
    #[error("{table} is still referenced by {referrer}.{column}")]
    StillReferenced {
        /// The table being deleted from / dropped / updated.
        table: String,
        /// The table holding the foreign key.
        referrer: String,
        /// The foreign-key column.
        column: String,
    },
}

/// Any error the engine pipeline can produce.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Tokenization failed.
    #[error("{0}")]
    Lex(#[from] LexError),

    /// Parsing failed.
    #[error("{0}")]
    Parse(#[from] ParseError),

    /// Name resolution or schema validation failed.
    #[error("{0}")]
    Semantic(#[from] SemanticError),

    /// A value had an incompatible type.
    #[error("{0}")]
    Type(#[from] TypeError),

    /// An integrity constraint was violated.
    #[error("{0}")]
    Constraint(#[from] ConstraintError),

    /// Persistence failed.
    #[error("{0}")]
    Io(#[from] StoreError),
}

impl EngineError {
    /// The taxonomy kind, used as the error prefix in the façade
    /// envelope.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Lex(_) => "LexError",
            Self::Parse(_) => "ParseError",
            Self::Semantic(_) => "SemanticError",
            Self::Type(_) => "TypeError",
            Self::Constraint(_) => "ConstraintError",
            Self::Io(_) => "IOError",
        }
    }
}

impl From<SqlError> for EngineError {
    fn from(e: SqlError) -> Self {
        match e {
            SqlError::Lex(e) => Self::Lex(e),
            SqlError::Parse(e) => Self::Parse(e),
        }
    }
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;
