//! tilegrid-ingest — the concurrent, idempotent raster-ingestion engine.
//!
//! Given a repository and a product, the [`Ingester`] runs a two-phase
//! load against every configured store endpoint: a batch-level
//! preprocess script (idempotent DDL and metadata registration), then a
//! fixed pool of workers, one per contiguous partition of the product's
//! image list. Each worker skips images already in the catalog, bulk
//! loads the rest into a per-image staging table, and commits the
//! catalog record through a transactional postprocess script.
//!
//! Failure policy: a failed image stops only its own partition; sibling
//! partitions run to completion, nothing is rolled back, and the batch
//! report enumerates exactly what failed where.
//!
//! # Components
//!
//! - **`partition`** — contiguous near-equal splitting of the image list
//! - **`worker`** — the per-partition idempotent load loop
//! - **`coordinator`** — per-endpoint orchestration and reporting
//! - **`progress`** — message-passing completion events

pub mod coordinator;
pub mod error;
pub mod partition;
pub mod progress;
mod worker;

pub use coordinator::{BatchReport, Ingester, StoreReport};
pub use error::{IngestError, IngestResult, PartitionFailure};
pub use partition::partition;
pub use progress::{ImageOutcome, ProgressCallback, ProgressEvent};
