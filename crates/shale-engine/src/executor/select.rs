//! The SELECT pipeline: from/join → where → group/aggregate → project
//! → order → distinct.
//!
//! Joins are nested-loop over materialized row sets; intermediate rows
//! are flat value vectors aligned with the statement's [`Scope`]. Small
//! data sets are the design point, so no indexes and no hash joins.

use shale_sql::ast::{
    AggregateFunc, ColumnRef, Expr, Join, JoinKind, OrderDirection, SelectItem, SelectStatement,
};
use shale_store::{Catalog, Value};

use super::eval::{apply_binary, eval, literal_value, truthy, Scope};
use super::ResultSet;
use crate::error::{EngineError, Result, SemanticError, TypeError};

/// How one select item produces output values.
enum ItemPlan<'a> {
    /// Wildcard expansion: copy these scope indices through.
    Columns(Vec<usize>),
    /// Evaluate an expression.
    Expr(&'a Expr),
}

/// Executes a SELECT statement.
pub(super) fn execute(catalog: &mut Catalog, stmt: &SelectStatement) -> Result<ResultSet> {
    // From: the base table's rows, tagged with its binding.
    let base = resolve_table(catalog, &stmt.from.name)?;
    let base_schema = catalog.schema(&base)?.clone();
    let mut scope = Scope::new();
    scope.push(stmt.from.binding(), base_schema.column_names())?;

    let mut working: Vec<Vec<Value>> = catalog
        .rows(&base)?
        .iter()
        .map(|row| {
            base_schema
                .columns
                .iter()
                .map(|c| row.get(&c.name).cloned().unwrap_or(Value::Null))
                .collect()
        })
        .collect();

    // Joins, applied left to right.
    for join in &stmt.joins {
        let right = resolve_table(catalog, &join.table.name)?;
        let right_schema = catalog.schema(&right)?.clone();
        let right_rows: Vec<Vec<Value>> = catalog
            .rows(&right)?
            .iter()
            .map(|row| {
                right_schema
                    .columns
                    .iter()
                    .map(|c| row.get(&c.name).cloned().unwrap_or(Value::Null))
                    .collect()
            })
            .collect();

        let left_width = scope.width();
        scope.push(join.table.binding(), right_schema.column_names())?;
        working = join_rows(&scope, working, left_width, right_rows, join)?;
    }

    // Where: two-valued predicate filter.
    if let Some(predicate) = &stmt.where_clause {
        let mut kept = Vec::with_capacity(working.len());
        for row in working {
            if truthy(&eval(predicate, &scope, &row)?) {
                kept.push(row);
            }
        }
        working = kept;
    }

    let has_aggregates = stmt.items.iter().any(|item| {
        matches!(item, SelectItem::Expr { expr, .. } if expr.contains_aggregate())
    });

    let (labels, plans) = project_plan(&stmt.items, &scope)?;

    // Group & aggregate, or plain projection.
    let mut output: Vec<(Vec<Value>, Vec<Value>)> = if !stmt.group_by.is_empty() || has_aggregates
    {
        project_grouped(stmt, &scope, &working, &labels, &plans)?
    } else {
        project_rows(stmt, &scope, &working, &labels, &plans)?
    };

    // Order: stable sort; nulls last for ASC, first for DESC.
    if !stmt.order_by.is_empty() {
        let directions: Vec<OrderDirection> =
            stmt.order_by.iter().map(|o| o.direction).collect();
        output.sort_by(|a, b| {
            for (key, direction) in directions.iter().enumerate() {
                let ordering = a.1[key].sort_cmp(&b.1[key], true);
                let ordering = match direction {
                    OrderDirection::Asc => ordering,
                    OrderDirection::Desc => ordering.reverse(),
                };
                if ordering != std::cmp::Ordering::Equal {
                    return ordering;
                }
            }
            std::cmp::Ordering::Equal
        });
    }

    let mut rows: Vec<Vec<Value>> = output.into_iter().map(|(row, _)| row).collect();

    // Distinct: structural dedup after projection.
    if stmt.distinct {
        let mut unique: Vec<Vec<Value>> = Vec::with_capacity(rows.len());
        for row in rows {
            let seen = unique.iter().any(|kept| {
                kept.len() == row.len()
                    && kept.iter().zip(&row).all(|(a, b)| a.same_value(b))
            });
            if !seen {
                unique.push(row);
            }
        }
        rows = unique;
    }

    Ok(ResultSet {
        columns: labels,
        rows,
    })
}

fn resolve_table(catalog: &Catalog, name: &str) -> Result<String> {
    catalog
        .resolve(name)
        .map(str::to_string)
        .ok_or_else(|| SemanticError::UnknownTable(name.to_string()).into())
}

/// Nested-loop join of the working set with one right-hand table.
fn join_rows(
    scope: &Scope,
    working: Vec<Vec<Value>>,
    left_width: usize,
    right_rows: Vec<Vec<Value>>,
    join: &Join,
) -> Result<Vec<Vec<Value>>> {
    let right_width = scope.width() - left_width;
    let mut next = Vec::new();
    let mut right_matched = vec![false; right_rows.len()];

    for left_row in &working {
        let mut matched = false;
        for (right_index, right_row) in right_rows.iter().enumerate() {
            let mut combined = left_row.clone();
            combined.extend(right_row.iter().cloned());
            if truthy(&eval(&join.on, scope, &combined)?) {
                next.push(combined);
                matched = true;
                right_matched[right_index] = true;
            }
        }
        if !matched && matches!(join.kind, JoinKind::Left | JoinKind::Full) {
            let mut padded = left_row.clone();
            padded.extend(std::iter::repeat(Value::Null).take(right_width));
            next.push(padded);
        }
    }

    if matches!(join.kind, JoinKind::Right | JoinKind::Full) {
        for (right_index, right_row) in right_rows.iter().enumerate() {
            if !right_matched[right_index] {
                let mut padded = vec![Value::Null; left_width];
                padded.extend(right_row.iter().cloned());
                next.push(padded);
            }
        }
    }

    Ok(next)
}

/// Computes output labels and per-item projection plans.
///
/// Wildcards expand in join order; a column name appearing in more than
/// one table in scope gets a qualified label.
fn project_plan<'a>(
    items: &'a [SelectItem],
    scope: &Scope,
) -> Result<(Vec<String>, Vec<ItemPlan<'a>>)> {
    let mut labels = Vec::new();
    let mut plans = Vec::new();

    for item in items {
        match item {
            SelectItem::Wildcard { table } => {
                let mut indices = Vec::new();
                for (binding, column, index) in scope.columns() {
                    if let Some(qualifier) = table {
                        if !binding.eq_ignore_ascii_case(qualifier) {
                            continue;
                        }
                    }
                    labels.push(if scope.is_ambiguous(column) {
                        format!("{binding}.{column}")
                    } else {
                        column.to_string()
                    });
                    indices.push(index);
                }
                if indices.is_empty() {
                    if let Some(qualifier) = table {
                        return Err(SemanticError::UnknownTable(qualifier.clone()).into());
                    }
                }
                plans.push(ItemPlan::Columns(indices));
            }
            SelectItem::Expr { expr, alias } => {
                let label = alias.clone().unwrap_or_else(|| match expr {
                    Expr::Column { name, .. } => name.clone(),
                    other => other.to_string(),
                });
                labels.push(label);
                plans.push(ItemPlan::Expr(expr));
            }
        }
    }

    Ok((labels, plans))
}

/// Projects ungrouped rows, carrying each output row's sort keys.
fn project_rows(
    stmt: &SelectStatement,
    scope: &Scope,
    working: &[Vec<Value>],
    labels: &[String],
    plans: &[ItemPlan<'_>],
) -> Result<Vec<(Vec<Value>, Vec<Value>)>> {
    let mut output = Vec::with_capacity(working.len());

    for row in working {
        let mut values = Vec::with_capacity(labels.len());
        for plan in plans {
            match plan {
                ItemPlan::Columns(indices) => {
                    values.extend(indices.iter().map(|&i| row[i].clone()));
                }
                ItemPlan::Expr(expr) => values.push(eval(expr, scope, row)?),
            }
        }

        let mut keys = Vec::with_capacity(stmt.order_by.len());
        for order in &stmt.order_by {
            let key = match output_column(labels, &order.column) {
                Some(index) => values[index].clone(),
                None => {
                    let index = scope.resolve(order.column.table.as_deref(), &order.column.name)?;
                    row[index].clone()
                }
            };
            keys.push(key);
        }

        output.push((values, keys));
    }

    Ok(output)
}

/// Projects grouped rows: one output row per group.
fn project_grouped(
    stmt: &SelectStatement,
    scope: &Scope,
    working: &[Vec<Value>],
    labels: &[String],
    plans: &[ItemPlan<'_>],
) -> Result<Vec<(Vec<Value>, Vec<Value>)>> {
    let key_indices: Vec<usize> = stmt
        .group_by
        .iter()
        .map(|c| scope.resolve(c.table.as_deref(), &c.name))
        .collect::<Result<_>>()?;

    // Non-aggregated output must be functionally determined by the
    // group keys.
    for plan in plans {
        match plan {
            ItemPlan::Columns(_) => {
                return Err(SemanticError::UngroupedColumn(String::from("*")).into());
            }
            ItemPlan::Expr(expr) => validate_grouped_expr(expr, scope, &key_indices)?,
        }
    }

    // Partition preserving first-occurrence order.
    let mut groups: Vec<(Vec<Value>, Vec<usize>)> = Vec::new();
    for (row_index, row) in working.iter().enumerate() {
        let key: Vec<Value> = key_indices.iter().map(|&i| row[i].clone()).collect();
        match groups
            .iter_mut()
            .find(|(k, _)| k.iter().zip(&key).all(|(a, b)| a.same_value(b)))
        {
            Some((_, members)) => members.push(row_index),
            None => groups.push((key, vec![row_index])),
        }
    }

    // With aggregates but no GROUP BY, the whole input is one group.
    if groups.is_empty() && key_indices.is_empty() {
        groups.push((Vec::new(), Vec::new()));
    }

    let mut output = Vec::with_capacity(groups.len());
    for (_, members) in &groups {
        let rows: Vec<&Vec<Value>> = members.iter().map(|&i| &working[i]).collect();

        let mut values = Vec::with_capacity(labels.len());
        for plan in plans {
            match plan {
                ItemPlan::Columns(_) => unreachable!("wildcards rejected above"),
                ItemPlan::Expr(expr) => values.push(eval_grouped(expr, scope, &rows)?),
            }
        }

        let mut keys = Vec::with_capacity(stmt.order_by.len());
        for order in &stmt.order_by {
            let key = match output_column(labels, &order.column) {
                Some(index) => values[index].clone(),
                None => {
                    let index = scope.resolve(order.column.table.as_deref(), &order.column.name)?;
                    if !key_indices.contains(&index) {
                        return Err(
                            SemanticError::UngroupedColumn(order.column.to_string()).into()
                        );
                    }
                    rows.first().map_or(Value::Null, |row| row[index].clone())
                }
            };
            keys.push(key);
        }

        output.push((values, keys));
    }

    Ok(output)
}

/// Matches an ORDER BY reference against the output column labels.
fn output_column(labels: &[String], column: &ColumnRef) -> Option<usize> {
    let wanted = column.to_string();
    labels
        .iter()
        .position(|label| label.eq_ignore_ascii_case(&wanted))
}

/// Rejects column references that are neither inside an aggregate nor
/// group keys.
fn validate_grouped_expr(expr: &Expr, scope: &Scope, key_indices: &[usize]) -> Result<()> {
    match expr {
        Expr::Literal(_) | Expr::Aggregate { .. } => Ok(()),
        Expr::Column { table, name, .. } => {
            let index = scope.resolve(table.as_deref(), name)?;
            if key_indices.contains(&index) {
                Ok(())
            } else {
                Err(SemanticError::UngroupedColumn(name.clone()).into())
            }
        }
        Expr::Binary { left, right, .. } => {
            validate_grouped_expr(left, scope, key_indices)?;
            validate_grouped_expr(right, scope, key_indices)
        }
        Expr::Unary { operand, .. } => validate_grouped_expr(operand, scope, key_indices),
        Expr::IsNull { expr, .. } => validate_grouped_expr(expr, scope, key_indices),
    }
}

/// Evaluates a select expression over a whole group.
fn eval_grouped(expr: &Expr, scope: &Scope, rows: &[&Vec<Value>]) -> Result<Value> {
    match expr {
        Expr::Literal(literal) => Ok(literal_value(literal)),

        // Validated as a group key: constant within the group.
        Expr::Column { table, name, .. } => {
            let index = scope.resolve(table.as_deref(), name)?;
            Ok(rows.first().map_or(Value::Null, |row| row[index].clone()))
        }

        Expr::Aggregate { func, arg } => aggregate(*func, arg.as_deref(), scope, rows),

        Expr::Binary { left, op, right } => {
            let lhs = eval_grouped(left, scope, rows)?;
            let rhs = eval_grouped(right, scope, rows)?;
            apply_binary(*op, &lhs, &rhs)
        }

        Expr::Unary { operand, .. } => match eval_grouped(operand, scope, rows)? {
            Value::Int(n) => Ok(Value::Int(-n)),
            Value::Float(x) => Ok(Value::Float(-x)),
            Value::Null => Ok(Value::Null),
            other => {
                Err(TypeError::new(format!("cannot negate {}", other.type_name())).into())
            }
        },

        Expr::IsNull { expr, negated } => {
            let value = eval_grouped(expr, scope, rows)?;
            Ok(Value::Bool(value.is_null() != *negated))
        }
    }
}

/// Computes one aggregate over a group.
///
/// COUNT(*) counts rows including nulls; COUNT(expr) counts non-null;
/// SUM/AVG are numeric and skip nulls; MIN/MAX skip nulls and require
/// comparable inputs. Over an empty (or all-null) input, COUNT is 0 and
/// the rest are NULL; AVG always yields FLOAT.
fn aggregate(
    func: AggregateFunc,
    arg: Option<&Expr>,
    scope: &Scope,
    rows: &[&Vec<Value>],
) -> Result<Value> {
    let Some(arg) = arg else {
        // COUNT(*)
        return Ok(Value::Int(rows.len() as i64));
    };

    let mut values = Vec::with_capacity(rows.len());
    for row in rows {
        let value = eval(arg, scope, row)?;
        if !value.is_null() {
            values.push(value);
        }
    }

    match func {
        AggregateFunc::Count => Ok(Value::Int(values.len() as i64)),

        AggregateFunc::Sum | AggregateFunc::Avg => {
            if values.is_empty() {
                return Ok(Value::Null);
            }
            let mut sum = 0.0;
            let mut all_int = true;
            for value in &values {
                match value {
                    Value::Int(_) => {}
                    Value::Float(_) => all_int = false,
                    other => {
                        return Err(TypeError::new(format!(
                            "{} requires numeric values, got {}",
                            func.as_str(),
                            other.type_name()
                        ))
                        .into());
                    }
                }
                sum += value.as_number().expect("numeric");
            }
            if func == AggregateFunc::Avg {
                return Ok(Value::Float(sum / values.len() as f64));
            }
            if all_int {
                let mut total: i64 = 0;
                for value in &values {
                    let Value::Int(n) = value else { unreachable!() };
                    total = total.checked_add(*n).ok_or_else(|| {
                        EngineError::from(TypeError::new("integer overflow in SUM"))
                    })?;
                }
                Ok(Value::Int(total))
            } else {
                Ok(Value::Float(sum))
            }
        }

        AggregateFunc::Min | AggregateFunc::Max => {
            let mut best: Option<Value> = None;
            for value in values {
                match &best {
                    None => best = Some(value),
                    Some(current) => {
                        let ordering = value.compare(current).ok_or_else(|| {
                            EngineError::from(TypeError::new(format!(
                                "cannot compare {} and {} in {}",
                                value.type_name(),
                                current.type_name(),
                                func.as_str()
                            )))
                        })?;
                        let better = match func {
                            AggregateFunc::Min => ordering.is_lt(),
                            _ => ordering.is_gt(),
                        };
                        if better {
                            best = Some(value);
                        }
                    }
                }
            }
            Ok(best.unwrap_or(Value::Null))
        }
    }
}
