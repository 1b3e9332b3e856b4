//! Ingestion error types.

use thiserror::Error;

use tilegrid_core::{ConfigError, TemplateError};
use tilegrid_store::StoreError;

/// Result type alias for ingestion operations.
pub type IngestResult<T> = Result<T, IngestError>;

/// Errors raised while ingesting a product.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("product not found: {0}")]
    ProductNotFound(String),

    #[error("failed to list images under {path}: {source}")]
    ImageList {
        path: String,
        source: std::io::Error,
    },

    /// Batch-level preprocess failed — the endpoint is abandoned before
    /// any partition is attempted.
    #[error("preprocess failed on '{database}': {source}")]
    Preprocess {
        database: String,
        source: StoreError,
    },

    /// Catalog lookup failed during the idempotence check.
    #[error("catalog lookup failed for {pathname}: {source}")]
    Lookup {
        pathname: String,
        source: StoreError,
    },

    /// Bulk raster-to-tile load failed for one image.
    #[error("tile load failed for {pathname}: {source}")]
    Load {
        pathname: String,
        source: StoreError,
    },

    /// Transactional postprocess failed for one image.
    #[error("postprocess failed for {pathname}: {source}")]
    Postprocess {
        pathname: String,
        source: StoreError,
    },

    /// The pathname carries no parseable acquisition timestamp.
    #[error("no acquisition timestamp in pathname: {0}")]
    Timestamp(String),

    /// A worker task aborted (panicked) before reporting a result.
    #[error("worker aborted: {0}")]
    Worker(String),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// A partition that stopped early, with the image that stopped it.
#[derive(Debug)]
pub struct PartitionFailure {
    pub partition: usize,
    pub pathname: String,
    pub error: IngestError,
}

impl std::fmt::Display for PartitionFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "partition {} failed at {}: {}",
            self.partition, self.pathname, self.error
        )
    }
}
