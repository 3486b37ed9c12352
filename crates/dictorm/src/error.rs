//! Error types for dictorm

use crate::dialect::Backend;
use thiserror::Error;

/// Result type alias for dictorm operations
pub type OrmResult<T> = Result<T, OrmError>;

/// Error types for database operations
#[derive(Debug, Error)]
pub enum OrmError {
    /// A SQL-generating operation ran before a connection was bound
    #[error("Not connected: bind a connection to the session before running queries")]
    NotConnected,

    /// The bound connection does not map to a known backend
    #[error("Unsupported backend: {0}")]
    UnsupportedBackend(String),

    /// Execution failed on the first attempt and again on the fresh-cursor retry
    #[error("Query execution failed on {backend} (after retry): {source}; sql: {sql}")]
    QueryExecution {
        backend: Backend,
        sql: String,
        #[source]
        source: Box<OrmError>,
    },

    /// PostgreSQL driver error
    #[error("Postgres error: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    /// SQLite driver error
    #[cfg(feature = "sqlite")]
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Generic driver-level failure (used by custom `Connection` implementations)
    #[error("Driver error: {0}")]
    Driver(String),

    /// Row decode/mapping error
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Query timeout error
    #[error("Query timeout after {0:?}")]
    Timeout(std::time::Duration),

    /// Configuration error
    #[error("Config error: {0}")]
    Config(String),
}

impl OrmError {
    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a driver error
    pub fn driver(message: impl Into<String>) -> Self {
        Self::Driver(message.into())
    }

    /// Check if this is a not connected error
    pub fn is_not_connected(&self) -> bool {
        matches!(self, Self::NotConnected)
    }

    /// Check if this is an unsupported backend error
    pub fn is_unsupported_backend(&self) -> bool {
        matches!(self, Self::UnsupportedBackend(_))
    }

    /// Check if this is a query execution error (failed after retry)
    pub fn is_query_execution(&self) -> bool {
        matches!(self, Self::QueryExecution { .. })
    }

    /// Check if this is a timeout error
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}
