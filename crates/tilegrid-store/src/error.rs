//! Store error types.

use thiserror::Error;

/// Result type alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors surfaced by a store endpoint.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An external tool (`psql`, `raster2pgsql`) reported failure. Raw
    /// output is carried verbatim for the batch failure report.
    #[error("{tool} failed (exit code {code}): {stderr}")]
    Tool {
        tool: String,
        stdout: String,
        stderr: String,
        code: i32,
    },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}
