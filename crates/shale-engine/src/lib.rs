//! # shale-engine
//!
//! The execution half of the shale SQL engine: an [`Executor`] that
//! runs parsed statements against a [`shale_store::Catalog`], and a
//! [`Database`] façade that owns the catalog, serializes statements
//! behind a process-wide lock, measures wall time, and keeps a bounded
//! per-session history of executed queries.
//!
//! ```no_run
//! use shale_engine::{Database, DatabaseConfig};
//!
//! let db = Database::open(DatabaseConfig::new("./data")).unwrap();
//! let outcome = db.execute("SELECT 1 + 1 AS two FROM t", None);
//! assert!(outcome.time_ms >= 0.0);
//! ```

pub mod db;
pub mod error;
pub mod executor;

pub use db::{Database, DatabaseConfig, ExecuteOutcome, HistoryEntry, HistoryResponse, TableInfo};
pub use error::{ConstraintError, EngineError, SemanticError, TypeError};
pub use executor::{Executor, MutationReport, ResultSet, StatementOutcome};
