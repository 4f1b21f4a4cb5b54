//! # shale-store
//!
//! The storage layer of the shale engine: the [`Value`] model, table
//! [`schema`] types, and the [`Catalog`] — an in-memory table store
//! persisted as human-readable JSON files.
//!
//! On disk, a catalog root directory holds `schema.json` (an object
//! keyed by table name) and one `<table>.json` per table (an array of
//! row objects). Every successful mutation rewrites the affected file
//! with an atomic replace: the new content is written to a sibling temp
//! file which is then renamed over the target, so partial files are
//! never observable.
//!
//! The catalog exclusively owns the in-memory rows; query results are
//! copies, and mutation goes through [`Catalog`] methods only.

pub mod catalog;
pub mod error;
pub mod schema;
pub mod value;

pub use catalog::{Catalog, Row};
pub use error::{Result, StoreError};
pub use schema::{ColumnSchema, ColumnType, ForeignKey, TableSchema};
pub use value::Value;
