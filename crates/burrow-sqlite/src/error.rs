//! Error types for the SQLite backend

use burrow_query::QueryError;
use thiserror::Error;

/// SQLite backend error type
#[derive(Error, Debug)]
pub enum SqliteError {
    /// Database connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Invalid operation, e.g. executing a query with no pool or source table
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// Underlying rusqlite error
    #[error("SQLite error: {0}")]
    Rusqlite(#[from] rusqlite::Error),

    /// Query building error
    #[error(transparent)]
    Query(#[from] QueryError),
}

/// Result type for SQLite operations
pub type SqliteResult<T> = Result<T, SqliteError>;
