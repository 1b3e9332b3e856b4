//! The `Store` trait — the capability contract ingestion workers consume.

use async_trait::async_trait;

use crate::error::StoreResult;
use crate::tool::ToolOutput;

/// One spatial-database endpoint targeted by ingestion.
///
/// Implementations own their connections; workers share an endpoint only
/// through `Arc<dyn Store>`, and the catalog table's consistency is
/// delegated to the store's transaction mechanism.
#[async_trait]
pub trait Store: Send + Sync {
    /// The database name this endpoint targets (the `DATABASE` parameter).
    fn database(&self) -> &str;

    /// Execute a single autocommitted command.
    async fn execute(&self, sql: &str) -> StoreResult<()>;

    /// Run a query and collect the first column of every row as text.
    async fn query_strings(&self, sql: &str) -> StoreResult<Vec<String>>;

    /// Execute a multi-statement script as a single transaction.
    ///
    /// Either every statement commits or none do; a failed script leaves
    /// the endpoint unchanged apart from already-committed images.
    async fn run_script(&self, sql: &str) -> StoreResult<ToolOutput>;

    /// Bulk-load a raster as spatially indexed tiles into a staging table.
    async fn load_raster(
        &self,
        pathname: &str,
        schema: &str,
        temp_table: &str,
        tile_size: &str,
    ) -> StoreResult<ToolOutput>;

    /// Idempotence check: does the catalog already hold `pathname`?
    async fn is_ingested(&self, schema: &str, pathname: &str) -> StoreResult<bool>;

    /// Row count of `schema.table`.
    async fn record_count(&self, schema: &str, table: &str) -> StoreResult<i64>;

    /// Whether `schema.table` exists.
    async fn table_exists(&self, schema: &str, table: &str) -> StoreResult<bool>;
}
