//! Error types for the storage layer.
//!
//! All errors are propagated via [`DbError`], which wraps the underlying
//! [`sqlx`], I/O and [`serde_json`] errors.

use std::path::PathBuf;

/// Errors that can occur in a storage backend.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// A `PostgreSQL` operation failed.
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] sqlx::Error),

    /// Reading or writing the ledger file failed.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// The file being accessed.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The ledger file could not be encoded or decoded as a whole.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl DbError {
    /// Attach a path to an I/O error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
