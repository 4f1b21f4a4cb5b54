//! Table schema types.
//!
//! These types describe the structure of tables and are shared between
//! the executor (which validates values against them) and the catalog
//! (which persists them in `schema.json`).

use serde::{Deserialize, Serialize};

use crate::value::Value;

/// Declared column types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ColumnType {
    /// 64-bit signed integer.
    Int,
    /// UTF-8 text.
    Text,
    /// IEEE-754 double.
    Float,
    /// Boolean.
    Boolean,
}

impl ColumnType {
    /// Returns the SQL name of the type.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Int => "INT",
            Self::Text => "TEXT",
            Self::Float => "FLOAT",
            Self::Boolean => "BOOLEAN",
        }
    }

    /// Whether a value of this dynamic type can live in a column of
    /// this declared type. NULL is accepted by every type (nullability
    /// is a separate constraint); `Int` widens into `FLOAT`.
    #[must_use]
    pub fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (_, Value::Null) => true,
            (Self::Int, Value::Int(_)) => true,
            (Self::Float, Value::Float(_) | Value::Int(_)) => true,
            (Self::Text, Value::Text(_)) => true,
            (Self::Boolean, Value::Bool(_)) => true,
            _ => false,
        }
    }

    /// Coerces a value for storage in a column of this type; the only
    /// conversion is the `Int` → `FLOAT` widening.
    #[must_use]
    pub fn coerce(&self, value: Value) -> Value {
        match (self, value) {
            (Self::Float, Value::Int(n)) => Value::Float(n as f64),
            (_, value) => value,
        }
    }
}

impl core::fmt::Display for ColumnType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A foreign-key reference to another table's column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKey {
    /// The referenced table.
    pub table: String,
    /// The referenced column.
    pub column: String,
}

/// Schema definition for a column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSchema {
    /// Column name (canonical casing).
    pub name: String,
    /// Declared type.
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    /// Whether this column is the primary key.
    pub primary_key: bool,
    /// Whether the column rejects NULL values.
    pub not_null: bool,
    /// Whether this column has a UNIQUE constraint.
    pub unique: bool,
    /// Foreign-key reference, if any.
    pub references: Option<ForeignKey>,
}

impl ColumnSchema {
    /// Creates a new nullable, unconstrained column.
    #[must_use]
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            primary_key: false,
            not_null: false,
            unique: false,
            references: None,
        }
    }

    /// Marks the column as the primary key.
    ///
    /// A primary key is implicitly NOT NULL and UNIQUE.
    #[must_use]
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.not_null = true;
        self.unique = true;
        self
    }

    /// Marks the column as NOT NULL.
    #[must_use]
    pub fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    /// Marks the column as UNIQUE.
    #[must_use]
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Adds a foreign-key reference.
    #[must_use]
    pub fn references(mut self, table: impl Into<String>, column: impl Into<String>) -> Self {
        self.references = Some(ForeignKey {
            table: table.into(),
            column: column.into(),
        });
        self
    }
}

/// Schema of one table: a canonical name and its ordered columns.
#[derive(Debug, Clone, PartialEq)]
pub struct TableSchema {
    /// Table name (canonical casing, as written in CREATE TABLE).
    pub name: String,
    /// Ordered column definitions.
    pub columns: Vec<ColumnSchema>,
}

impl TableSchema {
    /// Creates a new table schema.
    #[must_use]
    pub fn new(name: impl Into<String>, columns: Vec<ColumnSchema>) -> Self {
        Self {
            name: name.into(),
            columns,
        }
    }

    /// Looks up a column case-insensitively.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&ColumnSchema> {
        self.columns
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Returns the canonical names of all columns, in schema order.
    #[must_use]
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// Returns the primary-key column, if one is declared.
    #[must_use]
    pub fn primary_key(&self) -> Option<&ColumnSchema> {
        self.columns.iter().find(|c| c.primary_key)
    }

    /// Returns the columns that declare a foreign key, with their
    /// targets.
    pub fn foreign_keys(&self) -> impl Iterator<Item = (&ColumnSchema, &ForeignKey)> {
        self.columns
            .iter()
            .filter_map(|c| c.references.as_ref().map(|fk| (c, fk)))
    }
}
