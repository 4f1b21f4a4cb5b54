//! The catalog: table schemas and rows, persisted as JSON files.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, StoreError};
use crate::schema::{ColumnSchema, TableSchema};
use crate::value::Value;

/// One stored row: a mapping from canonical column name to value.
///
/// A `BTreeMap` keeps the on-disk key order deterministic.
pub type Row = BTreeMap<String, Value>;

/// Name of the schema file inside the catalog root.
const SCHEMA_FILE: &str = "schema.json";

/// The per-table entry inside `schema.json`.
#[derive(Deserialize)]
struct SchemaEntry {
    columns: Vec<ColumnSchema>,
}

#[derive(Serialize)]
struct SchemaEntryRef<'a> {
    columns: &'a [ColumnSchema],
}

/// A table: its schema plus lazily-loaded, cached rows.
struct Table {
    schema: TableSchema,
    /// `None` until the data file has been read.
    rows: Option<Vec<Row>>,
}

/// The persistent set of table schemas and rows.
///
/// The catalog owns a root directory holding `schema.json` and one
/// `<table>.json` per table. Table names are matched case-insensitively
/// on input but stored canonically.
pub struct Catalog {
    root: PathBuf,
    tables: BTreeMap<String, Table>,
}

impl Catalog {
    /// Opens a catalog rooted at `root`, creating the directory if
    /// needed and reading `schema.json` when present.
    ///
    /// Row files are read lazily, on first access per table; a missing
    /// data file means an empty table.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] on filesystem failures or a malformed
    /// schema file.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;

        let schema_path = root.join(SCHEMA_FILE);
        let mut tables = BTreeMap::new();
        if schema_path.exists() {
            let bytes = fs::read(&schema_path)?;
            let entries: BTreeMap<String, SchemaEntry> = serde_json::from_slice(&bytes)?;
            for (name, entry) in entries {
                let schema = TableSchema::new(name.clone(), entry.columns);
                tables.insert(name, Table { schema, rows: None });
            }
            debug!(tables = tables.len(), path = %schema_path.display(), "loaded catalog schema");
        }

        Ok(Self { root, tables })
    }

    /// The catalog's root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Canonical names of all tables, in sorted order.
    #[must_use]
    pub fn table_names(&self) -> Vec<&str> {
        self.tables.keys().map(String::as_str).collect()
    }

    /// Iterates over all table schemas.
    pub fn schemas(&self) -> impl Iterator<Item = &TableSchema> {
        self.tables.values().map(|t| &t.schema)
    }

    /// Resolves a table name case-insensitively to its canonical form.
    #[must_use]
    pub fn resolve(&self, name: &str) -> Option<&str> {
        self.tables
            .keys()
            .find(|k| k.eq_ignore_ascii_case(name))
            .map(String::as_str)
    }

    /// Returns the schema of a table.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::UnknownTable`] if no table matches.
    pub fn schema(&self, name: &str) -> Result<&TableSchema> {
        let canonical = self
            .resolve(name)
            .ok_or_else(|| StoreError::UnknownTable(name.to_string()))?;
        Ok(&self.tables[canonical].schema)
    }

    /// Adds a new table and persists the schema plus an empty data
    /// file.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::TableExists`] if a table of this name (in
    /// any casing) already exists.
    pub fn create_table(&mut self, schema: TableSchema) -> Result<()> {
        if self.resolve(&schema.name).is_some() {
            return Err(StoreError::TableExists(schema.name));
        }

        let name = schema.name.clone();
        self.tables.insert(
            name.clone(),
            Table {
                schema,
                rows: Some(Vec::new()),
            },
        );
        self.persist_schema()?;
        self.persist_table(&name)?;
        debug!(table = %name, "created table");
        Ok(())
    }

    /// Removes a table, its schema entry, and its data file.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::UnknownTable`] if no table matches.
    pub fn drop_table(&mut self, name: &str) -> Result<()> {
        let canonical = self
            .resolve(name)
            .ok_or_else(|| StoreError::UnknownTable(name.to_string()))?
            .to_string();

        self.tables.remove(&canonical);
        self.persist_schema()?;

        let path = self.table_path(&canonical);
        if path.exists() {
            fs::remove_file(&path)?;
        }
        debug!(table = %canonical, "dropped table");
        Ok(())
    }

    /// Returns the rows of a table, loading them from disk on first
    /// access.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::UnknownTable`] for an unknown table, or an
    /// I/O / JSON error from the lazy load.
    pub fn rows(&mut self, name: &str) -> Result<&[Row]> {
        let canonical = self.ensure_loaded(name)?;
        Ok(self.tables[&canonical].rows.as_deref().unwrap_or(&[]))
    }

    /// Mutable access to a table's rows, loading them on first access.
    ///
    /// Callers must follow a successful mutation with
    /// [`Catalog::persist_table`].
    ///
    /// # Errors
    ///
    /// Same as [`Catalog::rows`].
    pub fn rows_mut(&mut self, name: &str) -> Result<&mut Vec<Row>> {
        let canonical = self.ensure_loaded(name)?;
        Ok(self
            .tables
            .get_mut(&canonical)
            .expect("resolved table")
            .rows
            .get_or_insert_with(Vec::new))
    }

    /// Writes a table's cached rows to its data file with an atomic
    /// replace.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::UnknownTable`] for an unknown table, or an
    /// I/O / JSON error from serialization or the write.
    pub fn persist_table(&mut self, name: &str) -> Result<()> {
        let canonical = self.ensure_loaded(name)?;
        let rows = self.tables[&canonical].rows.as_deref().unwrap_or(&[]);
        let bytes = serde_json::to_vec_pretty(rows)?;
        let path = self.table_path(&canonical);
        write_atomic(&path, &bytes)?;
        debug!(table = %canonical, rows = rows.len(), "persisted table");
        Ok(())
    }

    /// Writes `schema.json` with an atomic replace.
    ///
    /// # Errors
    ///
    /// Returns an I/O / JSON error from serialization or the write.
    pub fn persist_schema(&self) -> Result<()> {
        let entries: BTreeMap<&str, SchemaEntryRef<'_>> = self
            .tables
            .iter()
            .map(|(name, table)| {
                (
                    name.as_str(),
                    SchemaEntryRef {
                        columns: &table.schema.columns,
                    },
                )
            })
            .collect();
        let bytes = serde_json::to_vec_pretty(&entries)?;
        write_atomic(&self.root.join(SCHEMA_FILE), &bytes)
    }

    /// Deletes the root directory and recreates it empty, discarding
    /// all in-memory state.
    ///
    /// # Errors
    ///
    /// Returns an I/O error from the directory removal or creation.
    pub fn reset(&mut self) -> Result<()> {
        self.tables.clear();
        match fs::remove_dir_all(&self.root) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        fs::create_dir_all(&self.root)?;
        debug!(root = %self.root.display(), "reset catalog");
        Ok(())
    }

    /// Loads a table's rows if they are not cached yet, returning the
    /// canonical name.
    fn ensure_loaded(&mut self, name: &str) -> Result<String> {
        let canonical = self
            .resolve(name)
            .ok_or_else(|| StoreError::UnknownTable(name.to_string()))?
            .to_string();

        let path = self.table_path(&canonical);
        let table = self.tables.get_mut(&canonical).expect("resolved table");
        if table.rows.is_none() {
            let rows = if path.exists() {
                let bytes = fs::read(&path)?;
                serde_json::from_slice(&bytes)?
            } else {
                Vec::new()
            };
            debug!(table = %canonical, rows = rows.len(), "loaded table rows");
            table.rows = Some(rows);
        }

        Ok(canonical)
    }

    /// Path of a table's data file.
    fn table_path(&self, canonical: &str) -> PathBuf {
        self.root.join(format!("{canonical}.json"))
    }
}

/// Writes `bytes` to `path` via a sibling temp file and rename, so a
/// partial file is never observable at `path`.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)?;
    Ok(())
}
