//! Error types for the reconciliation engine.
//!
//! Parsing and merging never produce errors: malformed input degrades to empty
//! values. These variants cover the store adapter, configuration loading and
//! custom catalogue construction.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the reconciliation engine.
#[derive(Debug, Error)]
pub enum ReconcileError {
    // Database errors
    #[error("Database error: {message}")]
    Database {
        message: String,
        #[source]
        source: Option<rusqlite::Error>,
    },

    #[error("Schema error for table {table}: {message}")]
    Schema { table: String, message: String },

    // File system errors
    #[error("IO error at {path:?}: {message}")]
    Io {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },

    // Serialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    // Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invalid catalogue entry for {field}: {message}")]
    Catalogue { field: String, message: String },

    // Generic errors
    #[error("{0}")]
    Other(String),
}

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, ReconcileError>;

impl From<std::io::Error> for ReconcileError {
    fn from(err: std::io::Error) -> Self {
        ReconcileError::Io {
            message: err.to_string(),
            path: None,
            source: Some(err),
        }
    }
}

impl From<serde_json::Error> for ReconcileError {
    fn from(err: serde_json::Error) -> Self {
        ReconcileError::Json {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<rusqlite::Error> for ReconcileError {
    fn from(err: rusqlite::Error) -> Self {
        ReconcileError::Database {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl ReconcileError {
    /// Create an IO error with path context.
    pub fn io_with_path(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        ReconcileError::Io {
            message: err.to_string(),
            path: Some(path.into()),
            source: Some(err),
        }
    }

    /// Whether the error is tied to a single row and the batch may continue.
    ///
    /// Constraint violations and type mismatches are row-local; a lost
    /// connection or a missing table is not.
    pub fn is_row_local(&self) -> bool {
        match self {
            ReconcileError::Database {
                source: Some(rusqlite::Error::SqliteFailure(err, _)),
                ..
            } => err.code == rusqlite::ErrorCode::ConstraintViolation,
            ReconcileError::Database {
                source: Some(rusqlite::Error::InvalidColumnType(..)),
                ..
            } => true,
            _ => false,
        }
    }
}
