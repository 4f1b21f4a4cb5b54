//! Error types for the storage layer.

/// Errors that can occur while loading or persisting the catalog.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The named table does not exist in the catalog.
    #[error("Table not found: {0}")]
    UnknownTable(String),

    /// A table with this name already exists.
    #[error("Table already exists: {0}")]
    TableExists(String),

    /// Filesystem error while reading or writing catalog files.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A catalog file held malformed JSON.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;
