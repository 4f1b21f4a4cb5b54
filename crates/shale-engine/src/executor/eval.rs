//! Name resolution scope and row-context expression evaluation.

use shale_sql::ast::{BinaryOp, Expr, Literal, UnaryOp};
use shale_store::Value;

use crate::error::{Result, SemanticError, TypeError};

/// The tables visible to an expression, in join order.
///
/// Rows evaluated against a scope are flat `Vec<Value>`s holding the
/// scope's columns in order: all columns of the first table, then all
/// columns of the second, and so on.
#[derive(Debug, Default)]
pub struct Scope {
    tables: Vec<ScopeTable>,
}

#[derive(Debug)]
struct ScopeTable {
    binding: String,
    columns: Vec<String>,
}

impl Scope {
    /// Creates an empty scope.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a scope over a single table.
    #[must_use]
    pub fn single(binding: impl Into<String>, columns: Vec<String>) -> Self {
        let mut scope = Self::new();
        scope
            .push(binding, columns)
            .expect("first binding cannot collide");
        scope
    }

    /// Adds a table to the scope.
    ///
    /// # Errors
    ///
    /// Returns [`SemanticError::DuplicateAlias`] when the binding name
    /// is already taken.
    pub fn push(&mut self, binding: impl Into<String>, columns: Vec<String>) -> Result<()> {
        let binding = binding.into();
        if self
            .tables
            .iter()
            .any(|t| t.binding.eq_ignore_ascii_case(&binding))
        {
            return Err(SemanticError::DuplicateAlias(binding).into());
        }
        self.tables.push(ScopeTable { binding, columns });
        Ok(())
    }

    /// Total number of columns across all tables.
    #[must_use]
    pub fn width(&self) -> usize {
        self.tables.iter().map(|t| t.columns.len()).sum()
    }

    /// Resolves a (possibly qualified) column name to its flat index.
    ///
    /// An unqualified name must match exactly one table in scope.
    ///
    /// # Errors
    ///
    /// [`SemanticError::UnknownTable`] for an unknown qualifier,
    /// [`SemanticError::UnknownColumn`] when nothing matches, and
    /// [`SemanticError::AmbiguousColumn`] when an unqualified name
    /// matches more than one table.
    pub fn resolve(&self, table: Option<&str>, name: &str) -> Result<usize> {
        match table {
            Some(qualifier) => {
                let mut offset = 0;
                for t in &self.tables {
                    if t.binding.eq_ignore_ascii_case(qualifier) {
                        return t
                            .columns
                            .iter()
                            .position(|c| c.eq_ignore_ascii_case(name))
                            .map(|i| offset + i)
                            .ok_or_else(|| {
                                SemanticError::UnknownColumn(format!("{qualifier}.{name}")).into()
                            });
                    }
                    offset += t.columns.len();
                }
                Err(SemanticError::UnknownTable(qualifier.to_string()).into())
            }
            None => {
                let mut found = None;
                let mut offset = 0;
                for t in &self.tables {
                    if let Some(i) = t.columns.iter().position(|c| c.eq_ignore_ascii_case(name)) {
                        if found.is_some() {
                            return Err(SemanticError::AmbiguousColumn(name.to_string()).into());
                        }
                        found = Some(offset + i);
                    }
                    offset += t.columns.len();
                }
                found.ok_or_else(|| SemanticError::UnknownColumn(name.to_string()).into())
            }
        }
    }

    /// Iterates over `(binding, column, flat_index)` in join order.
    pub fn columns(&self) -> impl Iterator<Item = (&str, &str, usize)> {
        let mut entries = Vec::with_capacity(self.width());
        let mut offset = 0;
        for t in &self.tables {
            for (i, c) in t.columns.iter().enumerate() {
                entries.push((t.binding.as_str(), c.as_str(), offset + i));
            }
            offset += t.columns.len();
        }
        entries.into_iter()
    }

    /// Whether an unqualified column name matches more than one table.
    #[must_use]
    pub fn is_ambiguous(&self, name: &str) -> bool {
        self.tables
            .iter()
            .filter(|t| t.columns.iter().any(|c| c.eq_ignore_ascii_case(name)))
            .count()
            > 1
    }
}

/// Converts an AST literal into a runtime value.
#[must_use]
pub fn literal_value(literal: &Literal) -> Value {
    match literal {
        Literal::Integer(n) => Value::Int(*n),
        Literal::Float(x) => Value::Float(*x),
        Literal::Str(s) => Value::Text(s.clone()),
        Literal::Boolean(b) => Value::Bool(*b),
        Literal::Null => Value::Null,
    }
}

/// Predicate truth: only `TRUE` passes; `NULL` and non-booleans do not.
#[must_use]
pub const fn truthy(value: &Value) -> bool {
    matches!(value, Value::Bool(true))
}

/// Evaluates an expression against one row.
///
/// Aggregate calls are rejected here; grouped evaluation lives in the
/// SELECT pipeline.
///
/// # Errors
///
/// Semantic errors from name resolution, or a [`TypeError`] from an
/// invalid arithmetic operand.
pub fn eval(expr: &Expr, scope: &Scope, row: &[Value]) -> Result<Value> {
    match expr {
        Expr::Literal(literal) => Ok(literal_value(literal)),

        Expr::Column { table, name, .. } => {
            let index = scope.resolve(table.as_deref(), name)?;
            Ok(row[index].clone())
        }

        Expr::Binary { left, op, right } => {
            let lhs = eval(left, scope, row)?;
            let rhs = eval(right, scope, row)?;
            apply_binary(*op, &lhs, &rhs)
        }

        Expr::Unary {
            op: UnaryOp::Neg,
            operand,
        } => match eval(operand, scope, row)? {
            Value::Int(n) => Ok(Value::Int(-n)),
            Value::Float(x) => Ok(Value::Float(-x)),
            Value::Null => Ok(Value::Null),
            other => Err(TypeError::new(format!("cannot negate {}", other.type_name())).into()),
        },

        Expr::Aggregate { .. } => Err(SemanticError::AggregateNotAllowed.into()),

        Expr::IsNull { expr, negated } => {
            let value = eval(expr, scope, row)?;
            Ok(Value::Bool(value.is_null() != *negated))
        }
    }
}

/// Applies a binary operator to two evaluated operands.
///
/// Comparisons are two-valued: anything involving NULL, and any
/// mismatched-type comparison, is false. Arithmetic propagates NULL and
/// requires numeric operands.
pub fn apply_binary(op: BinaryOp, lhs: &Value, rhs: &Value) -> Result<Value> {
    match op {
        BinaryOp::And => Ok(Value::Bool(truthy(lhs) && truthy(rhs))),
        BinaryOp::Or => Ok(Value::Bool(truthy(lhs) || truthy(rhs))),

        BinaryOp::Eq => Ok(Value::Bool(lhs.eq_value(rhs))),
        BinaryOp::NotEq => Ok(Value::Bool(
            !lhs.is_null() && !rhs.is_null() && !lhs.same_value(rhs),
        )),
        BinaryOp::Lt | BinaryOp::LtEq | BinaryOp::Gt | BinaryOp::GtEq => {
            let outcome = match lhs.compare(rhs) {
                Some(ordering) => match op {
                    BinaryOp::Lt => ordering.is_lt(),
                    BinaryOp::LtEq => ordering.is_le(),
                    BinaryOp::Gt => ordering.is_gt(),
                    _ => ordering.is_ge(),
                },
                None => false,
            };
            Ok(Value::Bool(outcome))
        }

        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div => {
            apply_arithmetic(op, lhs, rhs)
        }
    }
}

fn apply_arithmetic(op: BinaryOp, lhs: &Value, rhs: &Value) -> Result<Value> {
    if lhs.is_null() || rhs.is_null() {
        return Ok(Value::Null);
    }

    if let (Value::Int(a), Value::Int(b)) = (lhs, rhs) {
        let result = match op {
            BinaryOp::Add => a.checked_add(*b),
            BinaryOp::Sub => a.checked_sub(*b),
            BinaryOp::Mul => a.checked_mul(*b),
            BinaryOp::Div => {
                if *b == 0 {
                    return Err(TypeError::new("division by zero").into());
                }
                a.checked_div(*b)
            }
            _ => unreachable!("non-arithmetic operator"),
        };
        return result.map(Value::Int).ok_or_else(|| {
            TypeError::new(format!("integer overflow in {} {} {}", a, op.as_str(), b)).into()
        });
    }

    let (Some(a), Some(b)) = (lhs.as_number(), rhs.as_number()) else {
        return Err(TypeError::new(format!(
            "cannot apply {} to {} and {}",
            op.as_str(),
            lhs.type_name(),
            rhs.type_name()
        ))
        .into());
    };

    let result = match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div => {
            if b == 0.0 {
                return Err(TypeError::new("division by zero").into());
            }
            a / b
        }
        _ => unreachable!("non-arithmetic operator"),
    };
    Ok(Value::Float(result))
}
