//! INSERT, UPDATE, and DELETE execution.
//!
//! All three are all-or-nothing per statement: every row is validated
//! against the would-be final state before the catalog is touched, and
//! a failed persist rolls the in-memory rows back, so an error leaves
//! both memory and disk unchanged.

use shale_sql::ast::{DeleteStatement, InsertStatement, UpdateStatement};
use shale_store::{Catalog, Row, TableSchema, Value};

use super::eval::{eval, literal_value, truthy, Scope};
use super::MutationReport;
use crate::error::{ConstraintError, Result, SemanticError, TypeError};

/// Resolves a statement's table name to its canonical form.
fn resolve_table(catalog: &Catalog, name: &str) -> Result<String> {
    catalog
        .resolve(name)
        .map(str::to_string)
        .ok_or_else(|| SemanticError::UnknownTable(name.to_string()).into())
}

/// Flattens a stored row into schema column order.
fn flat_row(schema: &TableSchema, row: &Row) -> Vec<Value> {
    schema
        .columns
        .iter()
        .map(|c| row.get(&c.name).cloned().unwrap_or(Value::Null))
        .collect()
}

/// Rebuilds a stored row from a flat value vector.
fn row_from_flat(schema: &TableSchema, flat: Vec<Value>) -> Row {
    schema
        .columns
        .iter()
        .zip(flat)
        .map(|(c, v)| (c.name.clone(), v))
        .collect()
}

/// Loads a table's rows in flat form.
fn flat_rows(catalog: &mut Catalog, canonical: &str, schema: &TableSchema) -> Result<Vec<Vec<Value>>> {
    Ok(catalog
        .rows(canonical)?
        .iter()
        .map(|r| flat_row(schema, r))
        .collect())
}

/// One foreign key of the mutated table, with a snapshot of the legal
/// target values (empty for self-references, which are checked against
/// the mutated table's final state instead).
struct OutboundFk {
    column_index: usize,
    target_table: String,
    target_column: String,
    /// Index of the target column within the mutated table's own
    /// schema when the FK is a self-reference.
    self_target_index: Option<usize>,
    /// Legal values snapshot for foreign targets.
    target_values: Vec<Value>,
}

/// Collects the mutated table's outbound foreign keys with target-value
/// snapshots.
fn outbound_fks(
    catalog: &mut Catalog,
    canonical: &str,
    schema: &TableSchema,
) -> Result<Vec<OutboundFk>> {
    let mut fks = Vec::new();
    for (index, column) in schema.columns.iter().enumerate() {
        let Some(fk) = &column.references else {
            continue;
        };
        let self_ref = fk.table.eq_ignore_ascii_case(canonical);
        let self_target_index = if self_ref {
            Some(
                schema
                    .columns
                    .iter()
                    .position(|c| c.name.eq_ignore_ascii_case(&fk.column))
                    .ok_or_else(|| SemanticError::UnknownColumn(fk.column.clone()))?,
            )
        } else {
            None
        };
        let target_values = if self_ref {
            Vec::new()
        } else {
            catalog
                .rows(&fk.table)?
                .iter()
                .map(|r| r.get(&fk.column).cloned().unwrap_or(Value::Null))
                .collect()
        };
        fks.push(OutboundFk {
            column_index: index,
            target_table: fk.table.clone(),
            target_column: fk.column.clone(),
            self_target_index,
            target_values,
        });
    }
    Ok(fks)
}

/// One foreign key elsewhere in the catalog that points at the mutated
/// table.
struct InboundFk {
    referrer: String,
    referrer_column: String,
    /// Index of the referenced column within the mutated table.
    target_index: usize,
    /// The referrer's current FK values (empty for self-references).
    referrer_values: Vec<Value>,
    self_referrer_index: Option<usize>,
}

/// Collects foreign keys across the catalog that target `canonical`.
fn inbound_fks(
    catalog: &mut Catalog,
    canonical: &str,
    schema: &TableSchema,
) -> Result<Vec<InboundFk>> {
    let mut found: Vec<(String, String, String)> = Vec::new();
    for other in catalog.schemas() {
        for (column, fk) in other.foreign_keys() {
            if fk.table.eq_ignore_ascii_case(canonical) {
                found.push((other.name.clone(), column.name.clone(), fk.column.clone()));
            }
        }
    }

    let mut fks = Vec::new();
    for (referrer, referrer_column, target_column) in found {
        let target_index = schema
            .columns
            .iter()
            .position(|c| c.name.eq_ignore_ascii_case(&target_column))
            .ok_or_else(|| SemanticError::UnknownColumn(target_column.clone()))?;
        let self_ref = referrer.eq_ignore_ascii_case(canonical);
        let self_referrer_index = if self_ref {
            schema
                .columns
                .iter()
                .position(|c| c.name.eq_ignore_ascii_case(&referrer_column))
        } else {
            None
        };
        let referrer_values = if self_ref {
            Vec::new()
        } else {
            catalog
                .rows(&referrer)?
                .iter()
                .map(|r| r.get(&referrer_column).cloned().unwrap_or(Value::Null))
                .collect()
        };
        fks.push(InboundFk {
            referrer,
            referrer_column,
            target_index,
            referrer_values,
            self_referrer_index,
        });
    }
    Ok(fks)
}

/// Checks NOT NULL over a candidate row.
fn check_not_null(schema: &TableSchema, canonical: &str, flat: &[Value]) -> Result<()> {
    for (index, column) in schema.columns.iter().enumerate() {
        if column.not_null && flat[index].is_null() {
            return Err(ConstraintError::NotNull {
                table: canonical.to_string(),
                column: column.name.clone(),
            }
            .into());
        }
    }
    Ok(())
}

/// The PK/UNIQUE violation for a duplicate in the given column.
fn duplicate_error(schema: &TableSchema, canonical: &str, index: usize) -> ConstraintError {
    let column = &schema.columns[index];
    if column.primary_key {
        ConstraintError::PrimaryKeyDuplicate {
            table: canonical.to_string(),
            column: column.name.clone(),
        }
    } else {
        ConstraintError::UniqueViolation {
            table: canonical.to_string(),
            column: column.name.clone(),
        }
    }
}

/// Replaces a table's rows and persists, restoring the previous rows in
/// memory when the write fails.
fn commit_rows(
    catalog: &mut Catalog,
    canonical: &str,
    schema: &TableSchema,
    final_rows: Vec<Vec<Value>>,
) -> Result<()> {
    let new_rows: Vec<Row> = final_rows
        .into_iter()
        .map(|flat| row_from_flat(schema, flat))
        .collect();
    let previous = std::mem::replace(catalog.rows_mut(canonical)?, new_rows);
    if let Err(e) = catalog.persist_table(canonical) {
        if let Ok(rows) = catalog.rows_mut(canonical) {
            *rows = previous;
        }
        return Err(e.into());
    }
    Ok(())
}

/// Executes an INSERT statement.
pub(super) fn insert(catalog: &mut Catalog, stmt: &InsertStatement) -> Result<MutationReport> {
    let canonical = resolve_table(catalog, &stmt.table)?;
    let schema = catalog.schema(&canonical)?.clone();

    // Positional assignment uses schema order; a named list maps each
    // value to its column, leaving the rest NULL.
    let target_indices: Vec<usize> = if stmt.columns.is_empty() {
        (0..schema.columns.len()).collect()
    } else {
        let mut indices = Vec::with_capacity(stmt.columns.len());
        for name in &stmt.columns {
            let index = schema
                .columns
                .iter()
                .position(|c| c.name.eq_ignore_ascii_case(name))
                .ok_or_else(|| SemanticError::UnknownColumn(name.clone()))?;
            if indices.contains(&index) {
                return Err(SemanticError::DuplicateColumn(name.clone()).into());
            }
            indices.push(index);
        }
        indices
    };

    let existing = flat_rows(catalog, &canonical, &schema)?;
    let fks = outbound_fks(catalog, &canonical, &schema)?;

    let unique_indices: Vec<usize> = schema
        .columns
        .iter()
        .enumerate()
        .filter(|(_, c)| c.primary_key || c.unique)
        .map(|(i, _)| i)
        .collect();

    let mut accepted: Vec<Vec<Value>> = Vec::with_capacity(stmt.rows.len());
    for literals in &stmt.rows {
        if literals.len() != target_indices.len() {
            return Err(TypeError::new(format!(
                "INSERT row has {} value(s) but {} column(s) were expected",
                literals.len(),
                target_indices.len()
            ))
            .into());
        }

        let mut flat = vec![Value::Null; schema.columns.len()];
        for (literal, &index) in literals.iter().zip(&target_indices) {
            let column = &schema.columns[index];
            let value = literal_value(literal);
            if !column.column_type.accepts(&value) {
                return Err(TypeError::new(format!(
                    "cannot assign {} to {} column {}.{}",
                    value.type_name(),
                    column.column_type,
                    canonical,
                    column.name
                ))
                .into());
            }
            flat[index] = column.column_type.coerce(value);
        }

        check_not_null(&schema, &canonical, &flat)?;

        for &index in &unique_indices {
            let value = &flat[index];
            if value.is_null() {
                continue;
            }
            if existing
                .iter()
                .chain(accepted.iter())
                .any(|r| r[index].same_value(value))
            {
                return Err(duplicate_error(&schema, &canonical, index).into());
            }
        }

        for fk in &fks {
            let value = &flat[fk.column_index];
            if value.is_null() {
                continue;
            }
            let found = match fk.self_target_index {
                Some(target) => existing
                    .iter()
                    .chain(accepted.iter())
                    .chain(std::iter::once(&flat))
                    .any(|r| r[target].same_value(value)),
                None => fk.target_values.iter().any(|v| v.same_value(value)),
            };
            if !found {
                return Err(ConstraintError::ForeignKeyMissing {
                    table: fk.target_table.clone(),
                    column: fk.target_column.clone(),
                    value: value.to_string(),
                }
                .into());
            }
        }

        accepted.push(flat);
    }

    let inserted = accepted.len() as u64;
    let mut final_rows = existing;
    final_rows.extend(accepted);
    commit_rows(catalog, &canonical, &schema, final_rows)?;

    Ok(MutationReport::new(
        inserted,
        format!("Inserted {inserted} row(s) into {canonical}"),
    ))
}

/// Executes an UPDATE statement.
pub(super) fn update(catalog: &mut Catalog, stmt: &UpdateStatement) -> Result<MutationReport> {
    let canonical = resolve_table(catalog, &stmt.table)?;
    let schema = catalog.schema(&canonical)?.clone();
    let scope = Scope::single(canonical.clone(), schema.column_names());

    let snapshot = flat_rows(catalog, &canonical, &schema)?;
    let fks = outbound_fks(catalog, &canonical, &schema)?;
    let inbound = inbound_fks(catalog, &canonical, &schema)?;

    // Resolve SET targets once.
    let mut assignment_indices = Vec::with_capacity(stmt.assignments.len());
    for assignment in &stmt.assignments {
        let index = schema
            .columns
            .iter()
            .position(|c| c.name.eq_ignore_ascii_case(&assignment.column))
            .ok_or_else(|| SemanticError::UnknownColumn(assignment.column.clone()))?;
        assignment_indices.push((index, assignment));
    }

    // Candidate selection runs on original values.
    let mut candidates = Vec::new();
    for (row_index, row) in snapshot.iter().enumerate() {
        let selected = match &stmt.where_clause {
            Some(predicate) => truthy(&eval(predicate, &scope, row)?),
            None => true,
        };
        if selected {
            candidates.push(row_index);
        }
    }

    // Each candidate's new row is computed in its pre-update context,
    // so SET a = b, b = a swaps.
    let mut final_rows = snapshot.clone();
    for &row_index in &candidates {
        let old = &snapshot[row_index];
        let mut new = old.clone();
        for (column_index, assignment) in &assignment_indices {
            let column = &schema.columns[*column_index];
            let value = eval(&assignment.value, &scope, old)?;
            if !column.column_type.accepts(&value) {
                return Err(TypeError::new(format!(
                    "cannot assign {} to {} column {}.{}",
                    value.type_name(),
                    column.column_type,
                    canonical,
                    column.name
                ))
                .into());
            }
            new[*column_index] = column.column_type.coerce(value);
        }
        check_not_null(&schema, &canonical, &new)?;
        final_rows[row_index] = new;
    }

    // PK/UNIQUE over the final table state.
    for (index, column) in schema.columns.iter().enumerate() {
        if !column.primary_key && !column.unique {
            continue;
        }
        for (a, row_a) in final_rows.iter().enumerate() {
            if row_a[index].is_null() {
                continue;
            }
            if final_rows[..a].iter().any(|r| r[index].same_value(&row_a[index])) {
                return Err(duplicate_error(&schema, &canonical, index).into());
            }
        }
    }

    // Outbound foreign keys of the updated rows.
    for fk in &fks {
        for &row_index in &candidates {
            let value = &final_rows[row_index][fk.column_index];
            if value.is_null() {
                continue;
            }
            let found = match fk.self_target_index {
                Some(target) => final_rows.iter().any(|r| r[target].same_value(value)),
                None => fk.target_values.iter().any(|v| v.same_value(value)),
            };
            if !found {
                return Err(ConstraintError::ForeignKeyMissing {
                    table: fk.target_table.clone(),
                    column: fk.target_column.clone(),
                    value: value.to_string(),
                }
                .into());
            }
        }
    }

    // A key update that would orphan referrers is rejected.
    for fk in &inbound {
        for &row_index in &candidates {
            let old_value = &snapshot[row_index][fk.target_index];
            if old_value.is_null() {
                continue;
            }
            if final_rows
                .iter()
                .any(|r| r[fk.target_index].same_value(old_value))
            {
                continue; // some row still carries the key
            }
            let referenced = match fk.self_referrer_index {
                Some(referrer_index) => final_rows
                    .iter()
                    .any(|r| r[referrer_index].same_value(old_value)),
                None => fk.referrer_values.iter().any(|v| v.same_value(old_value)),
            };
            if referenced {
                return Err(ConstraintError::StillReferenced {
                    table: canonical.clone(),
                    referrer: fk.referrer.clone(),
                    column: fk.referrer_column.clone(),
                }
                .into());
            }
        }
    }

    let updated = candidates.len() as u64;
    commit_rows(catalog, &canonical, &schema, final_rows)?;

    Ok(MutationReport::new(
        updated,
        format!("Updated {updated} row(s)"),
    ))
}

/// Executes a DELETE statement.
pub(super) fn delete(catalog: &mut Catalog, stmt: &DeleteStatement) -> Result<MutationReport> {
    let canonical = resolve_table(catalog, &stmt.table)?;
    let schema = catalog.schema(&canonical)?.clone();
    let scope = Scope::single(canonical.clone(), schema.column_names());

    let snapshot = flat_rows(catalog, &canonical, &schema)?;
    let inbound = inbound_fks(catalog, &canonical, &schema)?;

    let mut deleted = Vec::new();
    let mut surviving = Vec::new();
    for row in snapshot {
        let selected = match &stmt.where_clause {
            Some(predicate) => truthy(&eval(predicate, &scope, &row)?),
            None => true,
        };
        if selected {
            deleted.push(row);
        } else {
            surviving.push(row);
        }
    }

    // A deleted key may not leave referrers behind.
    for fk in &inbound {
        for row in &deleted {
            let value = &row[fk.target_index];
            if value.is_null() {
                continue;
            }
            if surviving
                .iter()
                .any(|r| r[fk.target_index].same_value(value))
            {
                continue; // another surviving row carries the key
            }
            let referenced = match fk.self_referrer_index {
                Some(referrer_index) => surviving
                    .iter()
                    .any(|r| r[referrer_index].same_value(value)),
                None => fk.referrer_values.iter().any(|v| v.same_value(value)),
            };
            if referenced {
                return Err(ConstraintError::StillReferenced {
                    table: canonical.clone(),
                    referrer: fk.referrer.clone(),
                    column: fk.referrer_column.clone(),
                }
                .into());
            }
        }
    }

    let removed = deleted.len() as u64;
    commit_rows(catalog, &canonical, &schema, surviving)?;

    Ok(MutationReport::new(
        removed,
        format!("Deleted {removed} row(s)"),
    ))
}
