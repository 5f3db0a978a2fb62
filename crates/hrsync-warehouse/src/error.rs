//! Warehouse error types.

/// Errors produced by [`Warehouse`](crate::Warehouse) operations.
#[derive(Debug, thiserror::Error)]
pub enum WarehouseError {
    /// `SQLite` failure annotated with the statement kind and table.
    #[error("sqlite error during {op} on {table}: {source}")]
    Sqlite {
        op: &'static str,
        table: String,
        #[source]
        source: rusqlite::Error,
    },

    /// Opening the database failed.
    #[error("failed to open warehouse: {0}")]
    Open(#[source] rusqlite::Error),

    /// File-system I/O failure (e.g. creating the database directory).
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal mutex was poisoned by a panicked thread.
    #[error("warehouse lock poisoned")]
    LockPoisoned,

    /// Invalid identifier or a row that does not fit the declared schema.
    #[error("schema error: {0}")]
    Schema(String),

    /// A value could not be converted to or from its column type.
    #[error("cannot convert column '{column}': {reason}")]
    Conversion { column: String, reason: String },
}

impl WarehouseError {
    pub(crate) fn sqlite(op: &'static str, table: &str, source: rusqlite::Error) -> Self {
        Self::Sqlite {
            op,
            table: table.to_string(),
            source,
        }
    }

    pub(crate) fn conversion(column: &str, reason: impl Into<String>) -> Self {
        Self::Conversion {
            column: column.to_string(),
            reason: reason.into(),
        }
    }
}

/// Convenience alias used throughout this crate.
pub type Result<T> = std::result::Result<T, WarehouseError>;
