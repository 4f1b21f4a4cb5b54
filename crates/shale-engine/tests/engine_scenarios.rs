//! End-to-end engine scenarios: schema + data + joins + constraints,
//! exercised through the `Database` façade against a temp directory.

use serde_json::json;
use shale_engine::{Database, DatabaseConfig, ExecuteOutcome};

fn database() -> (tempfile::TempDir, Database) {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open(DatabaseConfig::new(dir.path())).unwrap();
    (dir, db)
}

fn ok(db: &Database, sql: &str) -> ExecuteOutcome {
    let outcome = db.execute(sql, None);
    assert!(outcome.success, "query failed: {sql}\n{:?}", outcome.error);
    outcome
}

fn fail(db: &Database, sql: &str) -> String {
    let outcome = db.execute(sql, None);
    assert!(!outcome.success, "expected failure: {sql}");
    outcome.error.unwrap()
}

/// Seeds the users/o tables shared by most scenarios below.
fn seed_users_and_orders(db: &Database) {
    ok(db, "CREATE TABLE users(id INT PRIMARY KEY, name TEXT)");
    ok(db, "INSERT INTO users VALUES (1,'Alice')");
    ok(db, "INSERT INTO users VALUES (2,'Bob')");
    ok(
        db,
        "CREATE TABLE o(id INT PRIMARY KEY, uid INT REFERENCES users(id))",
    );
}

#[test]
fn create_insert_select() {
    let (_dir, db) = database();
    ok(&db, "CREATE TABLE users(id INT PRIMARY KEY, name TEXT)");
    ok(&db, "INSERT INTO users VALUES (1,'Alice')");
    ok(&db, "INSERT INTO users VALUES (2,'Bob')");

    let outcome = ok(&db, "SELECT * FROM users");
    assert_eq!(
        outcome.columns,
        Some(vec![String::from("id"), String::from("name")])
    );
    assert_eq!(
        outcome.result.unwrap(),
        vec![
            json!({"id": 1, "name": "Alice"}),
            json!({"id": 2, "name": "Bob"}),
        ]
    );
}

#[test]
fn primary_key_duplicate_leaves_table_unchanged() {
    let (_dir, db) = database();
    ok(&db, "CREATE TABLE users(id INT PRIMARY KEY, name TEXT)");
    ok(&db, "INSERT INTO users VALUES (1,'Alice'), (2,'Bob')");

    let error = fail(&db, "INSERT INTO users VALUES (1,'X')");
    assert!(error.starts_with("ConstraintError:"), "{error}");

    let outcome = ok(&db, "SELECT * FROM users");
    assert_eq!(outcome.result.unwrap().len(), 2);
}

#[test]
fn foreign_key_violation_on_insert() {
    let (_dir, db) = database();
    seed_users_and_orders(&db);

    let error = fail(&db, "INSERT INTO o VALUES (1, 99)");
    assert!(error.starts_with("ConstraintError:"), "{error}");

    ok(&db, "INSERT INTO o VALUES (1, 1)");
}

#[test]
fn null_foreign_key_is_allowed() {
    let (_dir, db) = database();
    seed_users_and_orders(&db);
    ok(&db, "INSERT INTO o VALUES (1, NULL)");

    let outcome = ok(&db, "SELECT * FROM o WHERE uid IS NULL");
    assert_eq!(outcome.result.unwrap().len(), 1);
}

#[test]
fn inner_join_with_aggregate() {
    let (_dir, db) = database();
    seed_users_and_orders(&db);
    ok(&db, "INSERT INTO o VALUES (1,1),(2,1),(3,2)");

    let outcome = ok(
        &db,
        "SELECT u.name, COUNT(o.id) AS n FROM users u INNER JOIN o ON u.id=o.uid \
         GROUP BY u.name ORDER BY u.name ASC",
    );
    assert_eq!(
        outcome.columns,
        Some(vec![String::from("name"), String::from("n")])
    );
    assert_eq!(
        outcome.result.unwrap(),
        vec![
            json!({"name": "Alice", "n": 2}),
            json!({"name": "Bob", "n": 1}),
        ]
    );
}

#[test]
fn left_join_preserves_unmatched_left_rows() {
    let (_dir, db) = database();
    seed_users_and_orders(&db);
    ok(&db, "INSERT INTO o VALUES (1,1),(2,1),(3,2)");
    ok(&db, "INSERT INTO users VALUES (3,'Carol')");

    let outcome = ok(
        &db,
        "SELECT u.id, COUNT(o.id) AS n FROM users u LEFT JOIN o ON u.id=o.uid \
         GROUP BY u.id ORDER BY u.id ASC",
    );
    assert_eq!(
        outcome.result.unwrap(),
        vec![
            json!({"id": 1, "n": 2}),
            json!({"id": 2, "n": 1}),
            json!({"id": 3, "n": 0}),
        ]
    );
}

#[test]
fn right_and_full_joins_pad_with_nulls() {
    let (_dir, db) = database();
    seed_users_and_orders(&db);
    // an order with a NULL uid matches nobody but must survive RIGHT/FULL
    ok(&db, "INSERT INTO o VALUES (1,1),(9,NULL)");
    ok(&db, "INSERT INTO users VALUES (3,'Carol')");

    let outcome = ok(
        &db,
        "SELECT u.name, o.id FROM users u RIGHT JOIN o ON u.id=o.uid",
    );
    let rows = outcome.result.unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0], json!({"name": "Alice", "id": 1}));
    assert_eq!(rows[1], json!({"name": null, "id": 9}));

    let outcome = ok(
        &db,
        "SELECT u.name, o.id FROM users u FULL OUTER JOIN o ON u.id=o.uid",
    );
    let rows = outcome.result.unwrap();
    // matched pair once, unmatched Bob and Carol with null order,
    // unmatched NULL-uid order with null user
    assert_eq!(rows.len(), 4);
    assert!(rows.contains(&json!({"name": "Bob", "id": null})));
    assert!(rows.contains(&json!({"name": null, "id": 9})));
}

#[test]
fn delete_blocked_by_referrer() {
    let (_dir, db) = database();
    seed_users_and_orders(&db);
    ok(&db, "INSERT INTO o VALUES (1,1),(2,1),(3,2)");

    let error = fail(&db, "DELETE FROM users WHERE id=1");
    assert!(error.starts_with("ConstraintError:"), "{error}");

    assert_eq!(ok(&db, "SELECT * FROM users").result.unwrap().len(), 2);
    assert_eq!(ok(&db, "SELECT * FROM o").result.unwrap().len(), 3);

    // deleting the referrers first unblocks the user row
    ok(&db, "DELETE FROM o WHERE uid=1");
    let outcome = ok(&db, "DELETE FROM users WHERE id=1");
    assert_eq!(outcome.affected_rows, Some(1));
}

#[test]
fn update_swaps_via_pre_update_context() {
    let (_dir, db) = database();
    ok(&db, "CREATE TABLE p(id INT PRIMARY KEY, a INT, b INT)");
    ok(&db, "INSERT INTO p VALUES (1, 10, 20)");

    ok(&db, "UPDATE p SET a=b, b=a WHERE id=1");
    assert_eq!(
        ok(&db, "SELECT a, b FROM p").result.unwrap(),
        vec![json!({"a": 20, "b": 10})]
    );
}

#[test]
fn update_key_blocked_while_referenced() {
    let (_dir, db) = database();
    seed_users_and_orders(&db);
    ok(&db, "INSERT INTO o VALUES (1,1)");

    let error = fail(&db, "UPDATE users SET id=5 WHERE id=1");
    assert!(error.starts_with("ConstraintError:"), "{error}");

    // an unreferenced key moves freely
    let outcome = ok(&db, "UPDATE users SET id=5 WHERE id=2");
    assert_eq!(outcome.affected_rows, Some(1));
}

#[test]
fn update_rolls_back_entirely_on_late_failure() {
    let (_dir, db) = database();
    ok(&db, "CREATE TABLE t(id INT PRIMARY KEY, v INT NOT NULL)");
    ok(&db, "INSERT INTO t VALUES (1, 10), (2, 20)");

    // both candidates land on the same key, so the whole statement fails
    let error = fail(&db, "UPDATE t SET id = 2 WHERE v >= 10");
    assert!(error.starts_with("ConstraintError:"), "{error}");

    assert_eq!(
        ok(&db, "SELECT id FROM t ORDER BY id ASC").result.unwrap(),
        vec![json!({"id": 1}), json!({"id": 2})]
    );
}

#[test]
fn idempotent_delete_and_update() {
    let (_dir, db) = database();
    ok(&db, "CREATE TABLE t(id INT PRIMARY KEY, v INT)");
    ok(&db, "INSERT INTO t VALUES (1, 1), (2, 2), (3, 1)");

    let first = ok(&db, "DELETE FROM t WHERE v = 1");
    assert_eq!(first.affected_rows, Some(2));
    let second = ok(&db, "DELETE FROM t WHERE v = 1");
    assert_eq!(second.affected_rows, Some(0));

    let first = ok(&db, "UPDATE t SET v = 2 WHERE v = 2");
    assert_eq!(first.affected_rows, Some(1));
    assert_eq!(
        ok(&db, "SELECT v FROM t").result.unwrap(),
        vec![json!({"v": 2})]
    );
}

#[test]
fn not_null_and_type_checks() {
    let (_dir, db) = database();
    ok(
        &db,
        "CREATE TABLE t(id INT PRIMARY KEY, name TEXT NOT NULL, score FLOAT)",
    );

    let error = fail(&db, "INSERT INTO t VALUES (1, NULL, 1.0)");
    assert!(error.starts_with("ConstraintError:"), "{error}");

    let error = fail(&db, "INSERT INTO t VALUES (1, 2, 1.0)");
    assert!(error.starts_with("TypeError:"), "{error}");

    // integer widens into FLOAT
    ok(&db, "INSERT INTO t VALUES (1, 'a', 3)");
    assert_eq!(
        ok(&db, "SELECT score FROM t").result.unwrap(),
        vec![json!({"score": 3.0})]
    );
}

#[test]
fn insert_with_named_columns_defaults_to_null() {
    let (_dir, db) = database();
    ok(&db, "CREATE TABLE t(id INT PRIMARY KEY, a TEXT, b INT)");
    ok(&db, "INSERT INTO t (b, id) VALUES (7, 1)");

    assert_eq!(
        ok(&db, "SELECT * FROM t").result.unwrap(),
        vec![json!({"id": 1, "a": null, "b": 7})]
    );
}

#[test]
fn multi_row_insert_is_all_or_nothing() {
    let (_dir, db) = database();
    ok(&db, "CREATE TABLE t(id INT PRIMARY KEY)");

    // the third row collides with the first, so none may land
    let error = fail(&db, "INSERT INTO t VALUES (1), (2), (1)");
    assert!(error.starts_with("ConstraintError:"), "{error}");

    assert_eq!(ok(&db, "SELECT * FROM t").result.unwrap().len(), 0);
}

#[test]
fn distinct_and_order_by() {
    let (_dir, db) = database();
    ok(&db, "CREATE TABLE t(id INT PRIMARY KEY, v TEXT)");
    ok(
        &db,
        "INSERT INTO t VALUES (1,'b'), (2,'a'), (3,'b'), (4,NULL)",
    );

    let outcome = ok(&db, "SELECT DISTINCT v FROM t ORDER BY v ASC");
    assert_eq!(
        outcome.result.unwrap(),
        vec![json!({"v": "a"}), json!({"v": "b"}), json!({"v": null})]
    );

    let outcome = ok(&db, "SELECT DISTINCT v FROM t ORDER BY v DESC");
    assert_eq!(
        outcome.result.unwrap(),
        vec![json!({"v": null}), json!({"v": "b"}), json!({"v": "a"})]
    );
}

#[test]
fn where_between_and_comparisons() {
    let (_dir, db) = database();
    ok(&db, "CREATE TABLE t(id INT PRIMARY KEY, v FLOAT)");
    ok(
        &db,
        "INSERT INTO t VALUES (1, 1.5), (2, 2.5), (3, 3.5), (4, NULL)",
    );

    let outcome = ok(&db, "SELECT id FROM t WHERE v BETWEEN 2 AND 3");
    assert_eq!(outcome.result.unwrap(), vec![json!({"id": 2})]);

    // NULL never compares true, in either direction
    let outcome = ok(&db, "SELECT id FROM t WHERE v != 99");
    assert_eq!(outcome.result.unwrap().len(), 3);
}

#[test]
fn ambiguous_and_unknown_columns() {
    let (_dir, db) = database();
    seed_users_and_orders(&db);

    let error = fail(
        &db,
        "SELECT id FROM users u INNER JOIN o ON u.id = o.uid",
    );
    assert!(error.contains("ambiguous column"), "{error}");

    let error = fail(&db, "SELECT ghost FROM users");
    assert!(error.contains("unknown column"), "{error}");
}

#[test]
fn group_by_violation_is_semantic() {
    let (_dir, db) = database();
    seed_users_and_orders(&db);

    let error = fail(&db, "SELECT name, COUNT(*) FROM users");
    assert!(error.starts_with("SemanticError:"), "{error}");
}

#[test]
fn aggregates_over_groups() {
    let (_dir, db) = database();
    ok(&db, "CREATE TABLE s(id INT PRIMARY KEY, g TEXT, v FLOAT)");
    ok(
        &db,
        "INSERT INTO s VALUES (1,'a',1.0), (2,'a',3.0), (3,'b',5.0), (4,'b',NULL)",
    );

    let outcome = ok(
        &db,
        "SELECT g, COUNT(*) AS c, COUNT(v) AS cv, SUM(v) AS s, AVG(v) AS a, \
         MIN(v) AS lo, MAX(v) AS hi FROM s GROUP BY g ORDER BY g ASC",
    );
    assert_eq!(
        outcome.result.unwrap(),
        vec![
            json!({"g": "a", "c": 2, "cv": 2, "s": 4.0, "a": 2.0, "lo": 1.0, "hi": 3.0}),
            json!({"g": "b", "c": 2, "cv": 1, "s": 5.0, "a": 5.0, "lo": 5.0, "hi": 5.0}),
        ]
    );
}

#[test]
fn aggregate_without_group_by_forms_one_group() {
    let (_dir, db) = database();
    ok(&db, "CREATE TABLE t(id INT PRIMARY KEY, v INT)");
    ok(&db, "INSERT INTO t VALUES (1, 10), (2, 20)");

    let outcome = ok(&db, "SELECT COUNT(*) AS n, SUM(v) AS total FROM t");
    assert_eq!(
        outcome.result.unwrap(),
        vec![json!({"n": 2, "total": 30})]
    );
}

#[test]
fn persistence_round_trip_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    {
        let db = Database::open(DatabaseConfig::new(dir.path())).unwrap();
        ok(&db, "CREATE TABLE users(id INT PRIMARY KEY, name TEXT)");
        ok(&db, "INSERT INTO users VALUES (1,'Alice'), (2,'Bob')");
        ok(
            &db,
            "CREATE TABLE o(id INT PRIMARY KEY, uid INT REFERENCES users(id))",
        );
        ok(&db, "INSERT INTO o VALUES (1, 2)");
    }

    let db = Database::open(DatabaseConfig::new(dir.path())).unwrap();
    assert_eq!(db.tables().len(), 2);
    assert_eq!(
        ok(&db, "SELECT name FROM users ORDER BY id ASC")
            .result
            .unwrap(),
        vec![json!({"name": "Alice"}), json!({"name": "Bob"})]
    );

    // foreign keys survive the reload too
    let error = fail(&db, "INSERT INTO o VALUES (2, 99)");
    assert!(error.starts_with("ConstraintError:"), "{error}");
    let error = fail(&db, "DELETE FROM users WHERE id=2");
    assert!(error.starts_with("ConstraintError:"), "{error}");
}

#[test]
fn table_names_are_case_insensitive() {
    let (_dir, db) = database();
    ok(&db, "CREATE TABLE Users(id INT PRIMARY KEY)");
    ok(&db, "INSERT INTO USERS VALUES (1)");

    let outcome = ok(&db, "SELECT * FROM users");
    assert_eq!(outcome.result.unwrap().len(), 1);

    // canonical casing is preserved in the listing
    assert_eq!(db.tables()[0].name, "Users");
}

#[test]
fn drop_table_then_recreate() {
    let (_dir, db) = database();
    ok(&db, "CREATE TABLE t(id INT PRIMARY KEY)");
    ok(&db, "INSERT INTO t VALUES (1)");
    ok(&db, "DROP TABLE t");

    ok(&db, "CREATE TABLE t(id INT PRIMARY KEY)");
    assert_eq!(ok(&db, "SELECT * FROM t").result.unwrap().len(), 0);
}
