//! Store error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur when loading or saving the store file.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Reading or writing the store file failed.
    #[error("store I/O error on {path}: {source}")]
    Io {
        /// File involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The store file is not valid JSON for a store.
    #[error("store format error: {0}")]
    Format(#[from] serde_json::Error),
}

/// Result type alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
