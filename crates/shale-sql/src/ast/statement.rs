//! SQL statement AST types.

use core::fmt;

use crate::lexer::Position;

use super::expression::{Expr, Literal};

/// A declared column type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeName {
    /// 64-bit signed integer.
    Int,
    /// UTF-8 text.
    Text,
    /// IEEE-754 double.
    Float,
    /// Boolean.
    Boolean,
}

impl TypeName {
    /// Returns the SQL representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Int => "INT",
            Self::Text => "TEXT",
            Self::Float => "FLOAT",
            Self::Boolean => "BOOLEAN",
        }
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A `REFERENCES table(column)` clause on a column definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKeyRef {
    /// The referenced table.
    pub table: String,
    /// The referenced column.
    pub column: String,
}

/// A column definition inside CREATE TABLE.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDef {
    /// Column name.
    pub name: String,
    /// Declared type.
    pub data_type: TypeName,
    /// PRIMARY KEY constraint.
    pub primary_key: bool,
    /// NOT NULL constraint.
    pub not_null: bool,
    /// UNIQUE constraint.
    pub unique: bool,
    /// Foreign-key reference, if any.
    pub references: Option<ForeignKeyRef>,
}

/// A CREATE TABLE statement.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateTableStatement {
    /// The table name.
    pub name: String,
    /// Ordered column definitions.
    pub columns: Vec<ColumnDef>,
}

/// A DROP TABLE statement.
#[derive(Debug, Clone, PartialEq)]
pub struct DropTableStatement {
    /// The table name.
    pub name: String,
}

/// An INSERT statement.
///
/// VALUES rows hold literals only; identifiers are not permitted there.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertStatement {
    /// The target table.
    pub table: String,
    /// Explicit column list; empty means positional assignment in
    /// schema order.
    pub columns: Vec<String>,
    /// One entry per VALUES row.
    pub rows: Vec<Vec<Literal>>,
}

/// A single `column = expr` assignment in UPDATE.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    /// The column being assigned.
    pub column: String,
    /// The value expression, evaluated in the pre-update row context.
    pub value: Expr,
}

/// An UPDATE statement.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateStatement {
    /// The target table.
    pub table: String,
    /// SET assignments.
    pub assignments: Vec<Assignment>,
    /// The WHERE clause.
    pub where_clause: Option<Expr>,
}

/// A DELETE statement.
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteStatement {
    /// The target table.
    pub table: String,
    /// The WHERE clause.
    pub where_clause: Option<Expr>,
}

/// Order direction for ORDER BY.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderDirection {
    /// Ascending order (default).
    #[default]
    Asc,
    /// Descending order.
    Desc,
}

impl OrderDirection {
    /// Returns the SQL representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

impl fmt::Display for OrderDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A possibly-qualified column reference, as used in GROUP BY and
/// ORDER BY lists.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnRef {
    /// Table name or alias (optional).
    pub table: Option<String>,
    /// Column name.
    pub name: String,
    /// Source position.
    pub pos: Position,
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.table {
            Some(t) => write!(f, "{t}.{}", self.name),
            None => f.write_str(&self.name),
        }
    }
}

/// An ORDER BY clause entry.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    /// The column to order by.
    pub column: ColumnRef,
    /// The direction (ASC or DESC).
    pub direction: OrderDirection,
}

/// Join kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    /// INNER JOIN (the default when no keyword is given).
    Inner,
    /// LEFT OUTER JOIN.
    Left,
    /// RIGHT OUTER JOIN.
    Right,
    /// FULL OUTER JOIN.
    Full,
}

impl JoinKind {
    /// Returns the SQL representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Inner => "INNER JOIN",
            Self::Left => "LEFT JOIN",
            Self::Right => "RIGHT JOIN",
            Self::Full => "FULL OUTER JOIN",
        }
    }
}

impl fmt::Display for JoinKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A table reference with an optional alias.
#[derive(Debug, Clone, PartialEq)]
pub struct TableRef {
    /// Table name.
    pub name: String,
    /// Alias.
    pub alias: Option<String>,
}

impl TableRef {
    /// The name this table is known by inside the statement: the alias
    /// when present, else the table name.
    #[must_use]
    pub fn binding(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

/// A JOIN clause.
#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    /// The kind of join.
    pub kind: JoinKind,
    /// The table to join.
    pub table: TableRef,
    /// The ON predicate.
    pub on: Expr,
}

/// An item in the SELECT list.
#[derive(Debug, Clone, PartialEq)]
pub enum SelectItem {
    /// `*` or `table.*`.
    Wildcard {
        /// Table qualifier (optional).
        table: Option<String>,
    },
    /// An expression with an optional alias.
    Expr {
        /// The expression.
        expr: Expr,
        /// Output alias.
        alias: Option<String>,
    },
}

/// A SELECT statement.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectStatement {
    /// Whether to deduplicate output rows.
    pub distinct: bool,
    /// The select list.
    pub items: Vec<SelectItem>,
    /// The base table.
    pub from: TableRef,
    /// JOIN clauses, applied left to right.
    pub joins: Vec<Join>,
    /// The WHERE clause.
    pub where_clause: Option<Expr>,
    /// GROUP BY column references.
    pub group_by: Vec<ColumnRef>,
    /// ORDER BY entries.
    pub order_by: Vec<OrderBy>,
}

/// A parsed SQL statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// CREATE TABLE.
    CreateTable(CreateTableStatement),
    /// DROP TABLE.
    DropTable(DropTableStatement),
    /// INSERT.
    Insert(InsertStatement),
    /// UPDATE.
    Update(UpdateStatement),
    /// DELETE.
    Delete(DeleteStatement),
    /// SELECT.
    Select(SelectStatement),
}

impl Statement {
    /// A short name for the statement kind, used in log events.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::CreateTable(_) => "CREATE TABLE",
            Self::DropTable(_) => "DROP TABLE",
            Self::Insert(_) => "INSERT",
            Self::Update(_) => "UPDATE",
            Self::Delete(_) => "DELETE",
            Self::Select(_) => "SELECT",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_ref_binding() {
        let plain = TableRef {
            name: String::from("users"),
            alias: None,
        };
        let aliased = TableRef {
            name: String::from("users"),
            alias: Some(String::from("u")),
        };
        assert_eq!(plain.binding(), "users");
        assert_eq!(aliased.binding(), "u");
    }

    #[test]
    fn test_column_ref_display() {
        let unqualified = ColumnRef {
            table: None,
            name: String::from("id"),
            pos: Position::default(),
        };
        let qualified = ColumnRef {
            table: Some(String::from("u")),
            name: String::from("id"),
            pos: Position::default(),
        };
        assert_eq!(unqualified.to_string(), "id");
        assert_eq!(qualified.to_string(), "u.id");
    }

    #[test]
    fn test_statement_kind() {
        let stmt = Statement::DropTable(DropTableStatement {
            name: String::from("users"),
        });
        assert_eq!(stmt.kind(), "DROP TABLE");
    }
}
