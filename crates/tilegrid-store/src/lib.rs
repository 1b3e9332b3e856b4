//! tilegrid-store — the store capability behind raster ingestion.
//!
//! The ingestion engine talks to a store endpoint through the [`Store`]
//! trait: single commands and queries, transactional multi-statement
//! scripts, a bulk raster-to-tile load, and the catalog lookup that makes
//! ingestion idempotent.
//!
//! Two implementations:
//!
//! - **`PgStore`** — a live PostGIS endpoint. Queries and single commands
//!   go through an `sqlx` connection pool; script transactions and the
//!   bulk tile load shell out to `psql` and `raster2pgsql`, the same
//!   tools an operator would run by hand.
//! - **`MemoryStore`** — an in-process fake for worker and coordinator
//!   tests: records every call, keeps the catalog in a set, and supports
//!   per-pathname failure injection.

pub mod error;
pub mod memory;
pub mod pg;
pub mod store;
pub mod tool;

pub use error::{StoreError, StoreResult};
pub use memory::{LoadCall, MemoryStore};
pub use pg::PgStore;
pub use store::Store;
pub use tool::ToolOutput;
