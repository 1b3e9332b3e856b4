//! In-memory store fake for ingestion tests.
//!
//! Records every call, keeps the catalog as a set keyed by
//! `schema:pathname`, and understands enough SQL to commit catalog
//! records from executed scripts — an `INSERT INTO <schema>.cat ...
//! VALUES ('<pathname>' ...)` statement inside a successful script adds
//! the pathname, mirroring the invariant that only a committed
//! postprocess creates a catalog record.

use std::collections::HashSet;
use std::sync::{LazyLock, Mutex};

use async_trait::async_trait;
use regex::Regex;

use crate::error::{StoreError, StoreResult};
use crate::store::Store;
use crate::tool::ToolOutput;

static CAT_INSERT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"INSERT INTO ([A-Za-z0-9_]+)\.cat\b[^;]*VALUES\s*\(\s*'([^']+)'")
        .expect("catalog insert regex")
});

/// One recorded `load_raster` invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadCall {
    pub pathname: String,
    pub schema: String,
    pub temp_table: String,
    pub tile_size: String,
}

#[derive(Default)]
struct Inner {
    catalog: HashSet<String>,
    loads: Vec<LoadCall>,
    scripts: Vec<String>,
    commands: Vec<String>,
    fail_loads: HashSet<String>,
    fail_scripts: HashSet<String>,
}

/// Thread-safe in-process store.
pub struct MemoryStore {
    database: String,
    inner: Mutex<Inner>,
}

fn catalog_key(schema: &str, pathname: &str) -> String {
    format!("{schema}:{pathname}")
}

impl MemoryStore {
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            inner: Mutex::new(Inner::default()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // A poisoned lock means a test already panicked; propagate.
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Seed the catalog, as if `pathname` had been ingested previously.
    pub fn preload(&self, schema: &str, pathname: &str) {
        self.lock().catalog.insert(catalog_key(schema, pathname));
    }

    /// Make `load_raster` fail for `pathname`.
    pub fn fail_load_on(&self, pathname: &str) {
        self.lock().fail_loads.insert(pathname.to_string());
    }

    /// Make `run_script` fail for any script mentioning `pathname`.
    pub fn fail_script_on(&self, pathname: &str) {
        self.lock().fail_scripts.insert(pathname.to_string());
    }

    pub fn is_catalogued(&self, schema: &str, pathname: &str) -> bool {
        self.lock().catalog.contains(&catalog_key(schema, pathname))
    }

    pub fn catalog_len(&self) -> usize {
        self.lock().catalog.len()
    }

    pub fn loads(&self) -> Vec<LoadCall> {
        self.lock().loads.clone()
    }

    pub fn load_count(&self) -> usize {
        self.lock().loads.len()
    }

    pub fn scripts(&self) -> Vec<String> {
        self.lock().scripts.clone()
    }

    pub fn script_count(&self) -> usize {
        self.lock().scripts.len()
    }
}

#[async_trait]
impl Store for MemoryStore {
    fn database(&self) -> &str {
        &self.database
    }

    async fn execute(&self, sql: &str) -> StoreResult<()> {
        self.lock().commands.push(sql.to_string());
        Ok(())
    }

    async fn query_strings(&self, sql: &str) -> StoreResult<Vec<String>> {
        self.lock().commands.push(sql.to_string());
        Ok(Vec::new())
    }

    async fn run_script(&self, sql: &str) -> StoreResult<ToolOutput> {
        let mut inner = self.lock();
        if inner.fail_scripts.iter().any(|p| sql.contains(p.as_str())) {
            return Err(StoreError::Tool {
                tool: "psql".to_string(),
                stdout: String::new(),
                stderr: "ERROR: injected script failure".to_string(),
                code: 3,
            });
        }
        for caps in CAT_INSERT_RE.captures_iter(sql) {
            let key = catalog_key(&caps[1], &caps[2]);
            inner.catalog.insert(key);
        }
        inner.scripts.push(sql.to_string());
        Ok(ToolOutput::default())
    }

    async fn load_raster(
        &self,
        pathname: &str,
        schema: &str,
        temp_table: &str,
        tile_size: &str,
    ) -> StoreResult<ToolOutput> {
        let mut inner = self.lock();
        if inner.fail_loads.contains(pathname) {
            return Err(StoreError::Tool {
                tool: "raster2pgsql".to_string(),
                stdout: String::new(),
                stderr: "ERROR: injected load failure".to_string(),
                code: 1,
            });
        }
        inner.loads.push(LoadCall {
            pathname: pathname.to_string(),
            schema: schema.to_string(),
            temp_table: temp_table.to_string(),
            tile_size: tile_size.to_string(),
        });
        Ok(ToolOutput::default())
    }

    async fn is_ingested(&self, schema: &str, pathname: &str) -> StoreResult<bool> {
        Ok(self.is_catalogued(schema, pathname))
    }

    async fn record_count(&self, schema: &str, table: &str) -> StoreResult<i64> {
        if table != "cat" {
            return Ok(0);
        }
        let prefix = format!("{schema}:");
        let count = self
            .lock()
            .catalog
            .iter()
            .filter(|key| key.starts_with(&prefix))
            .count();
        Ok(count as i64)
    }

    async fn table_exists(&self, schema: &str, table: &str) -> StoreResult<bool> {
        let needle = format!("{schema}.{table}");
        Ok(self.lock().scripts.iter().any(|s| s.contains(&needle)))
    }
}
