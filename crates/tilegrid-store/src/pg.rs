//! Live PostGIS store endpoint.
//!
//! Queries and single commands go through an `sqlx` pool with bound
//! parameters wherever the value is data; schema and table names are the
//! structural exception and are interpolated from validated identifiers.
//! Script transactions and the bulk tile load shell out to `psql` and
//! `raster2pgsql`.

use std::path::Path;

use async_trait::async_trait;
use sqlx::Row;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use tracing::{debug, info};

use tilegrid_core::StoreConfig;

use crate::error::StoreResult;
use crate::store::Store;
use crate::tool::{ToolOutput, check, run_tool};

/// A PostGIS endpoint described by a `StoreConfig`.
pub struct PgStore {
    config: StoreConfig,
    pool: PgPool,
}

impl PgStore {
    /// Connect a small pool to the endpoint.
    pub async fn connect(config: &StoreConfig) -> StoreResult<Self> {
        let mut options = PgConnectOptions::new()
            .host(&config.host)
            .port(config.port())
            .database(&config.database);
        if let Some(user) = &config.user {
            options = options.username(user);
        }
        if let Some(password) = &config.password {
            options = options.password(password);
        }

        let pool = PgPoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await?;

        info!(
            host = %config.host,
            database = %config.database,
            "connected to store endpoint"
        );
        Ok(Self {
            config: config.clone(),
            pool,
        })
    }

    /// `psql` argument list for executing `script` as one transaction.
    fn psql_args(&self, script: &Path) -> Vec<String> {
        let mut args = vec![
            "-h".to_string(),
            self.config.host.clone(),
            "-p".to_string(),
            self.config.port().to_string(),
            "-d".to_string(),
            self.config.database.clone(),
        ];
        if let Some(user) = &self.config.user {
            args.push("-U".to_string());
            args.push(user.clone());
        }
        args.extend([
            "-v".to_string(),
            "ON_ERROR_STOP=1".to_string(),
            "-1".to_string(),
            "-f".to_string(),
            script.display().to_string(),
        ]);
        args
    }

    /// Credentials passed to child processes rather than the global env.
    fn tool_envs(&self) -> Vec<(&'static str, String)> {
        match &self.config.password {
            Some(password) => vec![("PGPASSWORD", password.clone())],
            None => Vec::new(),
        }
    }

    async fn run_psql_file(&self, script: &Path) -> StoreResult<ToolOutput> {
        let output = run_tool("psql", &self.psql_args(script), &self.tool_envs()).await?;
        check("psql", output)
    }
}

#[async_trait]
impl Store for PgStore {
    fn database(&self) -> &str {
        &self.config.database
    }

    async fn execute(&self, sql: &str) -> StoreResult<()> {
        sqlx::query(sql).execute(&self.pool).await?;
        Ok(())
    }

    async fn query_strings(&self, sql: &str) -> StoreResult<Vec<String>> {
        let rows = sqlx::query(sql).fetch_all(&self.pool).await?;
        let mut values = Vec::with_capacity(rows.len());
        for row in rows {
            values.push(row.try_get::<String, _>(0)?);
        }
        Ok(values)
    }

    async fn run_script(&self, sql: &str) -> StoreResult<ToolOutput> {
        // psql reads the script from disk; the temp dir is released on
        // return whether the transaction commits or not.
        let dir = tempfile::tempdir()?;
        let script = dir.path().join("script.sql");
        std::fs::write(&script, sql)?;
        self.run_psql_file(&script).await
    }

    async fn load_raster(
        &self,
        pathname: &str,
        schema: &str,
        temp_table: &str,
        tile_size: &str,
    ) -> StoreResult<ToolOutput> {
        // -R registers the file out-of-db, -d drops/recreates the staging
        // table, -F adds a filename column, -Y uses COPY for speed.
        let args = vec![
            "-R".to_string(),
            "-d".to_string(),
            "-F".to_string(),
            "-Y".to_string(),
            "-t".to_string(),
            tile_size.to_string(),
            pathname.to_string(),
            format!("{schema}.{temp_table}"),
        ];
        let generated = check("raster2pgsql", run_tool("raster2pgsql", &args, &[]).await?)?;

        debug!(pathname, temp_table, "raster2pgsql script generated");
        self.run_script(&generated.stdout).await
    }

    async fn is_ingested(&self, schema: &str, pathname: &str) -> StoreResult<bool> {
        let sql = format!("SELECT EXISTS (SELECT 1 FROM {schema}.cat WHERE pathname = $1)");
        let row = sqlx::query(&sql).bind(pathname).fetch_one(&self.pool).await?;
        Ok(row.try_get::<bool, _>(0)?)
    }

    async fn record_count(&self, schema: &str, table: &str) -> StoreResult<i64> {
        let sql = format!("SELECT COUNT(*) FROM {schema}.{table}");
        let row = sqlx::query(&sql).fetch_one(&self.pool).await?;
        Ok(row.try_get::<i64, _>(0)?)
    }

    async fn table_exists(&self, schema: &str, table: &str) -> StoreResult<bool> {
        let row = sqlx::query(
            "SELECT EXISTS (SELECT 1 FROM information_schema.tables \
             WHERE table_schema = $1 AND table_name = $2)",
        )
        .bind(schema)
        .bind(table)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.try_get::<bool, _>(0)?)
    }
}
