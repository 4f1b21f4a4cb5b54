//! Comprehensive parser integration tests.
//!
//! Covers the statement grammar with realistic SQL, including the error
//! paths a client is most likely to hit.

use shale_sql::ast::{
    AggregateFunc, BinaryOp, CreateTableStatement, DeleteStatement, Expr, InsertStatement,
    JoinKind, Literal, OrderDirection, SelectItem, SelectStatement, Statement, TypeName,
    UpdateStatement,
};
use shale_sql::{parse, SqlError};

// ===================================================================
// Helper functions
// ===================================================================

fn parse_one(sql: &str) -> Statement {
    let mut statements =
        parse(sql).unwrap_or_else(|e| panic!("Failed to parse: {sql}\nError: {e}"));
    assert_eq!(statements.len(), 1, "expected one statement in: {sql}");
    statements.remove(0)
}

fn parse_err(sql: &str) -> SqlError {
    parse(sql).expect_err(&format!("Expected parse error for: {sql}"))
}

fn parse_select(sql: &str) -> SelectStatement {
    match parse_one(sql) {
        Statement::Select(s) => s,
        other => panic!("Expected SELECT, got {other:?}"),
    }
}

fn parse_insert(sql: &str) -> InsertStatement {
    match parse_one(sql) {
        Statement::Insert(i) => i,
        other => panic!("Expected INSERT, got {other:?}"),
    }
}

fn parse_update(sql: &str) -> UpdateStatement {
    match parse_one(sql) {
        Statement::Update(u) => u,
        other => panic!("Expected UPDATE, got {other:?}"),
    }
}

fn parse_delete(sql: &str) -> DeleteStatement {
    match parse_one(sql) {
        Statement::Delete(d) => d,
        other => panic!("Expected DELETE, got {other:?}"),
    }
}

fn parse_create(sql: &str) -> CreateTableStatement {
    match parse_one(sql) {
        Statement::CreateTable(c) => c,
        other => panic!("Expected CREATE TABLE, got {other:?}"),
    }
}

// ===================================================================
// SELECT — column selection and aliases
// ===================================================================

#[test]
fn select_star() {
    let s = parse_select("SELECT * FROM users");
    assert_eq!(s.items.len(), 1);
    assert!(matches!(s.items[0], SelectItem::Wildcard { table: None }));
}

#[test]
fn select_qualified_star() {
    let s = parse_select("SELECT u.* FROM users u");
    assert!(matches!(
        &s.items[0],
        SelectItem::Wildcard { table: Some(t) } if t == "u"
    ));
}

#[test]
fn select_named_columns() {
    let s = parse_select("SELECT id, name, email FROM users");
    assert_eq!(s.items.len(), 3);
    for item in &s.items {
        assert!(matches!(item, SelectItem::Expr { expr: Expr::Column { .. }, alias: None }));
    }
}

#[test]
fn select_aliases_with_and_without_as() {
    let s = parse_select("SELECT id AS user_id, name username FROM users");
    let SelectItem::Expr { alias: a0, .. } = &s.items[0] else {
        panic!("expected expr item");
    };
    let SelectItem::Expr { alias: a1, .. } = &s.items[1] else {
        panic!("expected expr item");
    };
    assert_eq!(a0.as_deref(), Some("user_id"));
    assert_eq!(a1.as_deref(), Some("username"));
}

#[test]
fn select_literal_item() {
    let s = parse_select("SELECT 1, 'x' FROM users");
    assert!(matches!(
        &s.items[0],
        SelectItem::Expr { expr: Expr::Literal(Literal::Integer(1)), .. }
    ));
}

#[test]
fn select_distinct() {
    assert!(parse_select("SELECT DISTINCT name FROM users").distinct);
    assert!(!parse_select("SELECT name FROM users").distinct);
}

// ===================================================================
// SELECT — joins
// ===================================================================

#[test]
fn chained_joins_keep_order() {
    let s = parse_select(
        "SELECT * FROM a \
         JOIN b ON a.id = b.aid \
         LEFT JOIN c ON b.id = c.bid \
         FULL OUTER JOIN d ON c.id = d.cid",
    );
    assert_eq!(s.joins.len(), 3);
    assert_eq!(s.joins[0].kind, JoinKind::Inner);
    assert_eq!(s.joins[1].kind, JoinKind::Left);
    assert_eq!(s.joins[2].kind, JoinKind::Full);
    assert_eq!(s.joins[1].table.name, "c");
}

#[test]
fn join_requires_on() {
    parse_err("SELECT * FROM a JOIN b");
}

#[test]
fn join_on_predicate_shape() {
    let s = parse_select("SELECT * FROM users u JOIN orders o ON u.id = o.uid");
    let Expr::Binary { op, left, right } = &s.joins[0].on else {
        panic!("expected binary ON predicate");
    };
    assert_eq!(*op, BinaryOp::Eq);
    assert!(matches!(left.as_ref(), Expr::Column { table: Some(t), .. } if t == "u"));
    assert!(matches!(right.as_ref(), Expr::Column { table: Some(t), .. } if t == "o"));
}

// ===================================================================
// SELECT — grouping, ordering, aggregates
// ===================================================================

#[test]
fn group_by_multiple_keys() {
    let s = parse_select("SELECT city, country, COUNT(*) FROM users GROUP BY city, country");
    assert_eq!(s.group_by.len(), 2);
    assert_eq!(s.group_by[0].name, "city");
}

#[test]
fn order_by_directions() {
    let s = parse_select("SELECT * FROM users ORDER BY name DESC, id");
    assert_eq!(s.order_by.len(), 2);
    assert_eq!(s.order_by[0].direction, OrderDirection::Desc);
    assert_eq!(s.order_by[1].direction, OrderDirection::Asc);
}

#[test]
fn aggregate_functions() {
    let s = parse_select("SELECT COUNT(*), SUM(total), AVG(total), MIN(total), MAX(total) FROM o");
    let funcs: Vec<AggregateFunc> = s
        .items
        .iter()
        .map(|item| match item {
            SelectItem::Expr {
                expr: Expr::Aggregate { func, .. },
                ..
            } => *func,
            other => panic!("expected aggregate, got {other:?}"),
        })
        .collect();
    assert_eq!(
        funcs,
        vec![
            AggregateFunc::Count,
            AggregateFunc::Sum,
            AggregateFunc::Avg,
            AggregateFunc::Min,
            AggregateFunc::Max,
        ]
    );
}

// ===================================================================
// Predicates
// ===================================================================

#[test]
fn comparison_operators() {
    for op in ["=", "!=", "<>", "<", "<=", ">", ">="] {
        let s = parse_select(&format!("SELECT * FROM t WHERE a {op} 1"));
        assert!(s.where_clause.is_some(), "operator {op}");
    }
}

#[test]
fn between_with_following_conjunct() {
    // The AND after the BETWEEN bounds belongs to the outer predicate.
    let s = parse_select("SELECT * FROM t WHERE age BETWEEN 18 AND 65 AND active = TRUE");
    let Some(Expr::Binary { op, left, .. }) = &s.where_clause else {
        panic!("expected binary WHERE clause");
    };
    assert_eq!(*op, BinaryOp::And);
    // left side is the desugared BETWEEN
    let Expr::Binary { op: inner_op, .. } = left.as_ref() else {
        panic!("expected desugared BETWEEN");
    };
    assert_eq!(*inner_op, BinaryOp::And);
}

#[test]
fn null_predicates() {
    let s = parse_select("SELECT * FROM t WHERE a IS NULL OR b IS NOT NULL");
    let Some(Expr::Binary { op: BinaryOp::Or, left, right }) = &s.where_clause else {
        panic!("expected OR");
    };
    assert!(matches!(left.as_ref(), Expr::IsNull { negated: false, .. }));
    assert!(matches!(right.as_ref(), Expr::IsNull { negated: true, .. }));
}

#[test]
fn parenthesized_predicate_overrides_precedence() {
    let s = parse_select("SELECT * FROM t WHERE (a = 1 OR b = 2) AND c = 3");
    let Some(Expr::Binary { op, .. }) = &s.where_clause else {
        panic!("expected binary WHERE clause");
    };
    assert_eq!(*op, BinaryOp::And);
}

// ===================================================================
// INSERT / UPDATE / DELETE
// ===================================================================

#[test]
fn insert_multi_row() {
    let i = parse_insert("INSERT INTO users VALUES (1, 'Alice'), (2, 'Bob'), (3, NULL)");
    assert_eq!(i.rows.len(), 3);
    assert_eq!(i.rows[2][1], Literal::Null);
}

#[test]
fn insert_column_list() {
    let i = parse_insert("INSERT INTO users (name) VALUES ('Alice')");
    assert_eq!(i.columns, vec!["name"]);
}

#[test]
fn update_swap_assignments_parse() {
    let u = parse_update("UPDATE t SET a = b, b = a");
    assert_eq!(u.assignments.len(), 2);
    assert!(u.where_clause.is_none());
    assert!(matches!(&u.assignments[0].value, Expr::Column { name, .. } if name == "b"));
}

#[test]
fn update_arithmetic_assignment() {
    let u = parse_update("UPDATE items SET stock = stock - 1 WHERE id = 7");
    assert!(matches!(
        &u.assignments[0].value,
        Expr::Binary { op: BinaryOp::Sub, .. }
    ));
}

#[test]
fn delete_without_where() {
    let d = parse_delete("DELETE FROM logs");
    assert!(d.where_clause.is_none());
}

// ===================================================================
// DDL
// ===================================================================

#[test]
fn create_table_full_constraints() {
    let c = parse_create(
        "CREATE TABLE orders (\
            id INT PRIMARY KEY, \
            uid INT NOT NULL REFERENCES users(id), \
            total FLOAT, \
            paid BOOLEAN, \
            note TEXT UNIQUE)",
    );
    assert_eq!(c.columns.len(), 5);
    assert_eq!(c.columns[2].data_type, TypeName::Float);
    assert_eq!(c.columns[3].data_type, TypeName::Boolean);
    let fk = c.columns[1].references.as_ref().expect("fk");
    assert_eq!(fk.table, "users");
    assert_eq!(fk.column, "id");
}

#[test]
fn create_table_requires_type() {
    parse_err("CREATE TABLE t (id)");
}

// ===================================================================
// Multi-statement scripts and failure shapes
// ===================================================================

#[test]
fn script_with_comments_and_trailing_semicolon() {
    let statements = parse(
        "-- schema\n\
         CREATE TABLE t (id INT PRIMARY KEY);\n\
         /* seed */ INSERT INTO t VALUES (1);\n\
         SELECT * FROM t;",
    )
    .unwrap();
    assert_eq!(statements.len(), 3);
}

#[test]
fn lex_and_parse_errors_are_distinguished() {
    assert!(matches!(parse_err("SELECT 'open"), SqlError::Lex(_)));
    assert!(matches!(parse_err("SELECT * FORM t"), SqlError::Parse(_)));
}

#[test]
fn parse_error_carries_position() {
    let SqlError::Parse(err) = parse_err("SELECT *\nFORM t") else {
        panic!("expected parse error");
    };
    assert_eq!(err.pos.line, 2);
}
