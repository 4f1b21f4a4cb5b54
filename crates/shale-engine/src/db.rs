//! The database façade.
//!
//! A [`Database`] is the one handle the outside world talks to: it owns
//! the catalog behind a process-wide mutex, runs raw SQL through
//! lex → parse → execute, measures wall time, and keeps a bounded
//! per-session history of executed queries. There is no global state;
//! the HTTP layer constructs one `Database` at startup and shares it.

use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use shale_sql::parse;
use shale_store::{Catalog, ColumnSchema};

use crate::error::EngineError;
use crate::executor::{Executor, ResultSet, StatementOutcome};

/// Tunables for a [`Database`].
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Root directory for `schema.json` and the table files.
    pub root: PathBuf,
    /// Queries longer than this many bytes are rejected unexecuted.
    pub max_query_length: usize,
    /// Result sets are truncated to this many rows.
    pub max_result_rows: usize,
    /// Per-session history ring size.
    pub history_capacity: usize,
}

impl DatabaseConfig {
    /// Creates a config with default limits.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            max_query_length: 64 * 1024,
            max_result_rows: 10_000,
            history_capacity: 100,
        }
    }
}

/// The uniform result envelope for one `execute` call.
#[derive(Debug, Clone, Serialize)]
pub struct ExecuteOutcome {
    /// Whether every statement succeeded.
    pub success: bool,
    /// Rows of the last SELECT, as JSON objects; `null` otherwise.
    pub result: Option<Vec<serde_json::Value>>,
    /// Column labels of the last SELECT.
    pub columns: Option<Vec<String>>,
    /// Total rows touched by mutations.
    pub affected_rows: Option<u64>,
    /// Wall time of the whole call, in milliseconds.
    pub time_ms: f64,
    /// The last mutation's summary message.
    pub message: Option<String>,
    /// `"<Kind>: <detail>"` on failure.
    pub error: Option<String>,
}

/// One history record.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryEntry {
    /// The raw SQL text.
    pub query: String,
    /// When the query ran.
    pub timestamp: DateTime<Utc>,
    /// Whether it succeeded.
    pub success: bool,
    /// Wall time in milliseconds.
    pub time_ms: f64,
    /// Rows touched, for mutations.
    pub affected_rows: Option<u64>,
}

/// The response of a history lookup.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryResponse {
    /// The session the entries belong to.
    pub session_id: String,
    /// Most-recent-first entries, up to the requested limit.
    pub queries: Vec<HistoryEntry>,
    /// Total entries recorded for the session.
    pub total: usize,
}

/// One table's schema, for the tables listing.
#[derive(Debug, Clone, Serialize)]
pub struct TableInfo {
    /// Canonical table name.
    pub name: String,
    /// Ordered column schemas.
    pub columns: Vec<ColumnSchema>,
}

/// Locks a mutex, recovering the guard if a previous holder panicked.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Session key used when the caller supplies none.
const DEFAULT_SESSION: &str = "default";

/// The engine façade: catalog + history behind process-wide locks.
pub struct Database {
    config: DatabaseConfig,
    catalog: Mutex<Catalog>,
    history: Mutex<HashMap<String, VecDeque<HistoryEntry>>>,
}

impl Database {
    /// Opens (or creates) the database rooted at `config.root`.
    ///
    /// # Errors
    ///
    /// Returns an [`EngineError::Io`] when the root directory or the
    /// schema file cannot be read.
    pub fn open(config: DatabaseConfig) -> Result<Self, EngineError> {
        let catalog = Catalog::open(config.root.clone())?;
        info!(root = %config.root.display(), "opened database");
        Ok(Self {
            config,
            catalog: Mutex::new(catalog),
            history: Mutex::new(HashMap::new()),
        })
    }

    /// Runs a (possibly multi-statement) SQL string and returns the
    /// uniform envelope.
    ///
    /// Statements run sequentially and stop at the first failure;
    /// `result`/`columns` reflect the last SELECT, `affected_rows` sums
    /// the mutations, `message` is the last mutation's summary. The
    /// call never fails — errors are reported inside the envelope.
    pub fn execute(&self, sql: &str, session: Option<&str>) -> ExecuteOutcome {
        let started = Instant::now();

        let outcome = if sql.len() > self.config.max_query_length {
            ExecuteOutcome {
                success: false,
                result: None,
                columns: None,
                affected_rows: None,
                time_ms: elapsed_ms(started),
                message: None,
                error: Some(format!(
                    "QueryTooLong: query exceeds {} bytes",
                    self.config.max_query_length
                )),
            }
        } else {
            match self.run(sql) {
                Ok((result, columns, affected_rows, message)) => ExecuteOutcome {
                    success: true,
                    result,
                    columns,
                    affected_rows,
                    time_ms: elapsed_ms(started),
                    message,
                    error: None,
                },
                Err(e) => {
                    warn!(kind = e.kind(), error = %e, "statement failed");
                    ExecuteOutcome {
                        success: false,
                        result: None,
                        columns: None,
                        affected_rows: None,
                        time_ms: elapsed_ms(started),
                        message: None,
                        error: Some(format!("{}: {}", e.kind(), e)),
                    }
                }
            }
        };

        self.record(session, sql, &outcome);
        outcome
    }

    /// Lex → parse → execute under the catalog lock.
    #[allow(clippy::type_complexity)]
    fn run(
        &self,
        sql: &str,
    ) -> Result<
        (
            Option<Vec<serde_json::Value>>,
            Option<Vec<String>>,
            Option<u64>,
            Option<String>,
        ),
        EngineError,
    > {
        let statements = parse(sql).map_err(EngineError::from)?;

        // The lock spans the whole script; it is released on every
        // exit path when the guard drops.
        let mut catalog = lock(&self.catalog);

        let mut last_select: Option<ResultSet> = None;
        let mut affected_rows: Option<u64> = None;
        let mut message: Option<String> = None;

        for statement in &statements {
            match Executor::new(&mut catalog).execute(statement)? {
                StatementOutcome::Rows(result_set) => last_select = Some(result_set),
                StatementOutcome::Mutation(report) => {
                    affected_rows = Some(affected_rows.unwrap_or(0) + report.affected_rows);
                    message = Some(report.message);
                }
            }
        }

        let (result, columns) = match last_select {
            Some(mut result_set) => {
                if result_set.rows.len() > self.config.max_result_rows {
                    debug!(
                        dropped = result_set.rows.len() - self.config.max_result_rows,
                        "truncating result set"
                    );
                    result_set.rows.truncate(self.config.max_result_rows);
                }
                let rows = result_set
                    .rows
                    .iter()
                    .map(|row| row_object(&result_set.columns, row))
                    .collect();
                (Some(rows), Some(result_set.columns))
            }
            None => (None, None),
        };

        Ok((result, columns, affected_rows, message))
    }

    /// Returns the most recent queries for a session, newest first.
    #[must_use]
    pub fn history(&self, session: Option<&str>, limit: usize) -> HistoryResponse {
        let key = session.unwrap_or(DEFAULT_SESSION);
        let history = lock(&self.history);
        let ring = history.get(key);
        HistoryResponse {
            session_id: key.to_string(),
            queries: ring
                .map(|ring| ring.iter().rev().take(limit).cloned().collect())
                .unwrap_or_default(),
            total: ring.map_or(0, VecDeque::len),
        }
    }

    /// Deletes the data directory and recreates it empty.
    ///
    /// Query history is a session log, not database state, and
    /// survives a reset.
    ///
    /// # Errors
    ///
    /// Returns an [`EngineError::Io`] from the filesystem.
    pub fn reset(&self) -> Result<(), EngineError> {
        let mut catalog = lock(&self.catalog);
        catalog.reset()?;
        info!("database reset");
        Ok(())
    }

    /// Lists every table's schema.
    #[must_use]
    pub fn tables(&self) -> Vec<TableInfo> {
        let catalog = lock(&self.catalog);
        catalog
            .schemas()
            .map(|schema| TableInfo {
                name: schema.name.clone(),
                columns: schema.columns.clone(),
            })
            .collect()
    }

    /// Appends an entry to the session's bounded history ring.
    fn record(&self, session: Option<&str>, sql: &str, outcome: &ExecuteOutcome) {
        let entry = HistoryEntry {
            query: sql.to_string(),
            timestamp: Utc::now(),
            success: outcome.success,
            time_ms: outcome.time_ms,
            affected_rows: outcome.affected_rows,
        };

        let mut history = lock(&self.history);
        let ring = history
            .entry(session.unwrap_or(DEFAULT_SESSION).to_string())
            .or_default();
        while ring.len() >= self.config.history_capacity {
            ring.pop_front();
        }
        ring.push_back(entry);
    }
}

fn elapsed_ms(started: Instant) -> f64 {
    started.elapsed().as_secs_f64() * 1000.0
}

/// Zips column labels and values into a JSON object.
fn row_object(columns: &[String], values: &[shale_store::Value]) -> serde_json::Value {
    let mut object = serde_json::Map::with_capacity(columns.len());
    for (column, value) in columns.iter().zip(values) {
        let json = serde_json::to_value(value).unwrap_or(serde_json::Value::Null);
        object.insert(column.clone(), json);
    }
    serde_json::Value::Object(object)
}
