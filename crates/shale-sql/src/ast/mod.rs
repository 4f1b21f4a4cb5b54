//! Abstract syntax tree for the supported SQL dialect.
//!
//! Statements and expressions are plain tagged unions; the executor
//! matches on them exhaustively, so an unimplemented form is a compile
//! error there rather than a runtime surprise.

mod expression;
mod statement;

pub use expression::{AggregateFunc, BinaryOp, Expr, Literal, UnaryOp};
pub use statement::{
    Assignment, ColumnDef, ColumnRef, CreateTableStatement, DeleteStatement, DropTableStatement,
    ForeignKeyRef, InsertStatement, Join, JoinKind, OrderBy, OrderDirection, SelectItem,
    SelectStatement, Statement, TableRef, TypeName, UpdateStatement,
};
