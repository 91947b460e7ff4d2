use thiserror::Error;

/// Errors that can occur when reading or writing marketplace records.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The requested row does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: i64 },

    /// A write that must touch exactly one row touched a different number.
    #[error("Unexpected behavior detected when updating {entity} {id} (total rows affected: {affected})")]
    RowCountMismatch {
        entity: &'static str,
        id: i64,
        affected: u64,
    },

    /// A uniqueness rule was violated (e.g. a second invoice for a transaction).
    #[error("Duplicate {entity} for key {key}")]
    Duplicate { entity: &'static str, key: i64 },

    /// A stored column holds a value the record type cannot represent.
    #[error("Invalid value {value} in column {column}")]
    InvalidColumn { column: &'static str, value: i64 },

    /// The backend refused the operation (used by the in-memory store's
    /// failure injection).
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl StoreError {
    /// Returns true if the error reports a missing row.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
