//! Statement execution against the catalog.
//!
//! The executor is stateless apart from its catalog reference. It
//! dispatches on the statement variant: DDL is handled here, DML lives
//! in [`mutate`], and the SELECT pipeline in [`select`].

mod eval;
mod mutate;
mod select;

use shale_sql::ast::{CreateTableStatement, DropTableStatement, Statement, TypeName};
use shale_store::{Catalog, ColumnSchema, ColumnType, TableSchema};
use tracing::debug;

use crate::error::{ConstraintError, Result, SemanticError};

/// The output of a SELECT: ordered column labels and value rows.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultSet {
    /// Output column labels, in select-list order.
    pub columns: Vec<String>,
    /// One entry per output row, aligned with `columns`.
    pub rows: Vec<Vec<shale_store::Value>>,
}

/// The outcome of a mutating statement.
#[derive(Debug, Clone, PartialEq)]
pub struct MutationReport {
    /// How many rows the statement touched.
    pub affected_rows: u64,
    /// Human-readable summary, e.g. `Inserted 2 row(s) into users`.
    pub message: String,
}

impl MutationReport {
    fn new(affected_rows: u64, message: impl Into<String>) -> Self {
        Self {
            affected_rows,
            message: message.into(),
        }
    }
}

/// What a statement produced: a result set or a mutation report.
#[derive(Debug, Clone, PartialEq)]
pub enum StatementOutcome {
    /// SELECT output.
    Rows(ResultSet),
    /// Everything else.
    Mutation(MutationReport),
}

/// Executes statements against a catalog.
pub struct Executor<'a> {
    catalog: &'a mut Catalog,
}

impl<'a> Executor<'a> {
    /// Creates an executor over the given catalog.
    #[must_use]
    pub fn new(catalog: &'a mut Catalog) -> Self {
        Self { catalog }
    }

    /// Executes one statement.
    ///
    /// Mutations are atomic per statement: on any error, neither the
    /// in-memory catalog nor the on-disk files change.
    ///
    /// # Errors
    ///
    /// Returns the first [`crate::EngineError`] from validation,
    /// evaluation, constraint checking, or persistence.
    pub fn execute(&mut self, statement: &Statement) -> Result<StatementOutcome> {
        debug!(kind = statement.kind(), "executing statement");
        match statement {
            Statement::CreateTable(stmt) => self.create_table(stmt).map(StatementOutcome::Mutation),
            Statement::DropTable(stmt) => self.drop_table(stmt).map(StatementOutcome::Mutation),
            Statement::Insert(stmt) => {
                mutate::insert(self.catalog, stmt).map(StatementOutcome::Mutation)
            }
            Statement::Update(stmt) => {
                mutate::update(self.catalog, stmt).map(StatementOutcome::Mutation)
            }
            Statement::Delete(stmt) => {
                mutate::delete(self.catalog, stmt).map(StatementOutcome::Mutation)
            }
            Statement::Select(stmt) => {
                select::execute(self.catalog, stmt).map(StatementOutcome::Rows)
            }
        }
    }

    /// CREATE TABLE: validates the declaration and persists the schema.
    fn create_table(&mut self, stmt: &CreateTableStatement) -> Result<MutationReport> {
        if self.catalog.resolve(&stmt.name).is_some() {
            return Err(SemanticError::TableExists(stmt.name.clone()).into());
        }

        let mut columns: Vec<ColumnSchema> = Vec::with_capacity(stmt.columns.len());
        let mut pk_seen = false;

        for def in &stmt.columns {
            if columns
                .iter()
                .any(|c| c.name.eq_ignore_ascii_case(&def.name))
            {
                return Err(SemanticError::DuplicateColumn(def.name.clone()).into());
            }
            if def.primary_key {
                if pk_seen {
                    return Err(SemanticError::MultiplePrimaryKeys(stmt.name.clone()).into());
                }
                pk_seen = true;
            }

            let mut column = ColumnSchema::new(def.name.clone(), column_type(def.data_type));
            if def.primary_key {
                column = column.primary_key();
            }
            if def.not_null {
                column = column.not_null();
            }
            if def.unique {
                column = column.unique();
            }
            if let Some(fk) = &def.references {
                let (table, target) = self.resolve_reference_target(stmt, &fk.table, &fk.column)?;
                column = column.references(table, target);
            }

            columns.push(column);
        }

        self.catalog
            .create_table(TableSchema::new(stmt.name.clone(), columns))?;
        Ok(MutationReport::new(
            0,
            format!("Table {} created", stmt.name),
        ))
    }

    /// Validates a `REFERENCES table(column)` target and returns its
    /// canonical `(table, column)` names.
    ///
    /// The target column must be the target table's primary key or
    /// declared UNIQUE. A table may reference itself.
    fn resolve_reference_target(
        &self,
        stmt: &CreateTableStatement,
        table: &str,
        column: &str,
    ) -> Result<(String, String)> {
        // Self-reference: validate against the definition being created.
        if table.eq_ignore_ascii_case(&stmt.name) {
            let def = stmt
                .columns
                .iter()
                .find(|d| d.name.eq_ignore_ascii_case(column))
                .ok_or_else(|| SemanticError::InvalidReference {
                    table: table.to_string(),
                    column: column.to_string(),
                    reason: String::from("no such column"),
                })?;
            if !def.primary_key && !def.unique {
                return Err(SemanticError::InvalidReference {
                    table: table.to_string(),
                    column: column.to_string(),
                    reason: String::from("target must be PRIMARY KEY or UNIQUE"),
                }
                .into());
            }
            return Ok((stmt.name.clone(), def.name.clone()));
        }

        let Some(canonical) = self.catalog.resolve(table) else {
            return Err(SemanticError::InvalidReference {
                table: table.to_string(),
                column: column.to_string(),
                reason: String::from("no such table"),
            }
            .into());
        };
        let canonical = canonical.to_string();
        let schema = self.catalog.schema(&canonical)?;
        let target = schema
            .column(column)
            .ok_or_else(|| SemanticError::InvalidReference {
                table: canonical.clone(),
                column: column.to_string(),
                reason: String::from("no such column"),
            })?;
        if !target.primary_key && !target.unique {
            return Err(SemanticError::InvalidReference {
                table: canonical,
                column: target.name.clone(),
                reason: String::from("target must be PRIMARY KEY or UNIQUE"),
            }
            .into());
        }

        Ok((canonical, target.name.clone()))
    }

    /// DROP TABLE: rejected while other tables' foreign keys point at
    /// the victim.
    fn drop_table(&mut self, stmt: &DropTableStatement) -> Result<MutationReport> {
        let victim = self
            .catalog
            .resolve(&stmt.name)
            .ok_or_else(|| SemanticError::UnknownTable(stmt.name.clone()))?
            .to_string();

        for schema in self.catalog.schemas() {
            if schema.name == victim {
                continue;
            }
            for (column, fk) in schema.foreign_keys() {
                if fk.table.eq_ignore_ascii_case(&victim) {
                    return Err(ConstraintError::StillReferenced {
                        table: victim.clone(),
                        referrer: schema.name.clone(),
                        column: column.name.clone(),
                    }
                    .into());
                }
            }
        }

        self.catalog.drop_table(&victim)?;
        Ok(MutationReport::new(0, format!("Table {victim} dropped")))
    }
}

/// Maps a parsed type name to a storage column type.
const fn column_type(name: TypeName) -> ColumnType {
    match name {
        TypeName::Int => ColumnType::Int,
        TypeName::Text => ColumnType::Text,
        TypeName::Float => ColumnType::Float,
        TypeName::Boolean => ColumnType::Boolean,
    }
}
