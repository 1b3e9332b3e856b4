//! The batch coordinator.
//!
//! One batch ingests one product into every store endpoint the
//! repository targets. Per endpoint: assemble the batch parameters, run
//! the preprocess script once, partition the image list, launch one
//! worker per partition, aggregate progress over the channel, and join
//! everything into a `StoreReport`. Worker failures never cancel sibling
//! partitions and nothing already committed is rolled back.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{error, info, warn};

use tilegrid_core::{ParamKey, ParamMap, Product, Repository};
use tilegrid_store::Store;

use crate::error::{IngestError, IngestResult, PartitionFailure};
use crate::partition::partition;
use crate::progress::{ImageOutcome, ProgressCallback, ProgressEvent};
use crate::worker::{Task, run_partition};

/// Default worker count per endpoint.
const DEFAULT_WORKERS: usize = 6;

/// Ingestion outcome for one store endpoint.
#[derive(Debug)]
pub struct StoreReport {
    pub database: String,
    /// Images loaded and committed by this run.
    pub ingested: usize,
    /// Images already catalogued and skipped.
    pub skipped: usize,
    /// Partitions that stopped early.
    pub failures: Vec<PartitionFailure>,
    /// Set when the batch-level preprocess failed; no partitions ran.
    pub preprocess_error: Option<IngestError>,
}

impl StoreReport {
    pub fn success(&self) -> bool {
        self.failures.is_empty() && self.preprocess_error.is_none()
    }
}

/// Aggregate outcome across every endpoint of the batch.
#[derive(Debug)]
pub struct BatchReport {
    pub product: String,
    pub images: usize,
    pub stores: Vec<StoreReport>,
}

impl BatchReport {
    pub fn success(&self) -> bool {
        self.stores.iter().all(StoreReport::success)
    }

    pub fn total_ingested(&self) -> usize {
        self.stores.iter().map(|s| s.ingested).sum()
    }

    pub fn total_skipped(&self) -> usize {
        self.stores.iter().map(|s| s.skipped).sum()
    }
}

/// Coordinates concurrent, idempotent ingestion of a product.
pub struct Ingester {
    repo: Arc<Repository>,
    workers: usize,
    on_progress: Option<ProgressCallback>,
}

impl Ingester {
    pub fn new(repo: Arc<Repository>) -> Self {
        Self {
            repo,
            workers: DEFAULT_WORKERS,
            on_progress: None,
        }
    }

    /// Override the per-endpoint worker count.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Attach an observer for completion events.
    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.on_progress = Some(callback);
        self
    }

    /// Ingest `product_name` into every endpoint in `stores`.
    ///
    /// Returns `Err` only for configuration-level problems (unknown
    /// product, unreadable image root, unrenderable template). Store
    /// failures are carried inside the report instead.
    pub async fn ingest(
        &self,
        product_name: &str,
        stores: &[Arc<dyn Store>],
    ) -> IngestResult<BatchReport> {
        let product = self
            .repo
            .product(product_name)
            .ok_or_else(|| IngestError::ProductNotFound(product_name.to_string()))?;

        let images = self
            .repo
            .list_product_images(product)
            .map_err(|source| IngestError::ImageList {
                path: self.repo.path().display().to_string(),
                source,
            })?;

        info!(
            repository = self.repo.name(),
            product = product_name,
            images = images.len(),
            stores = stores.len(),
            workers = self.workers,
            "batch started"
        );

        let mut reports = Vec::with_capacity(stores.len());
        for store in stores {
            reports.push(self.ingest_store(product, store.clone(), &images).await?);
        }

        let report = BatchReport {
            product: product_name.to_string(),
            images: images.len(),
            stores: reports,
        };
        info!(
            product = product_name,
            ingested = report.total_ingested(),
            skipped = report.total_skipped(),
            success = report.success(),
            "batch finished"
        );
        Ok(report)
    }

    /// Run the two-phase load against one endpoint.
    async fn ingest_store(
        &self,
        product: &Product,
        store: Arc<dyn Store>,
        images: &[String],
    ) -> IngestResult<StoreReport> {
        let database = store.database().to_string();
        let params = self.batch_params(product, &database);

        // Phase one: idempotent DDL and metadata registration. A store
        // error abandons this endpoint before any partition is built.
        let script = self.repo.templates().preprocess().render(&params)?;
        if let Err(source) = store.run_script(&script).await {
            error!(database = %database, error = %source, "preprocess failed, endpoint abandoned");
            return Ok(StoreReport {
                database: database.clone(),
                ingested: 0,
                skipped: 0,
                failures: Vec::new(),
                preprocess_error: Some(IngestError::Preprocess { database, source }),
            });
        }

        // Phase two: one worker per contiguous partition.
        let partitions = partition(images.to_vec(), self.workers);
        let (tx, mut rx) = mpsc::channel::<ProgressEvent>(64);

        let callback = self.on_progress.clone();
        let aggregator = tokio::spawn(async move {
            let mut ingested = 0usize;
            let mut skipped = 0usize;
            while let Some(event) = rx.recv().await {
                match event.outcome {
                    ImageOutcome::Ingested => ingested += 1,
                    ImageOutcome::Skipped => skipped += 1,
                }
                if let Some(cb) = &callback {
                    cb(&event);
                }
            }
            (ingested, skipped)
        });

        let postprocess = self.repo.templates().postprocess().clone();
        let mut handles = Vec::with_capacity(partitions.len());
        for (index, part) in partitions.into_iter().enumerate() {
            let task = Task {
                index,
                images: part,
                params: params.clone(),
            };
            handles.push(tokio::spawn(run_partition(
                task,
                store.clone(),
                postprocess.clone(),
                tx.clone(),
            )));
        }
        drop(tx);

        let mut failures = Vec::new();
        for (index, handle) in handles.into_iter().enumerate() {
            match handle.await {
                Ok(Some(failure)) => failures.push(failure),
                Ok(None) => {}
                Err(join_err) => {
                    // A panicked worker is reported like any other
                    // partition failure, with no pathname attribution.
                    warn!(partition = index, error = %join_err, "worker task aborted");
                    failures.push(PartitionFailure {
                        partition: index,
                        pathname: "(unknown)".to_string(),
                        error: IngestError::Worker(join_err.to_string()),
                    });
                }
            }
        }
        let (ingested, skipped) = aggregator.await.unwrap_or((0, 0));

        info!(
            database = %store.database(),
            ingested,
            skipped,
            failures = failures.len(),
            "endpoint finished"
        );
        Ok(StoreReport {
            database,
            ingested,
            skipped,
            failures,
            preprocess_error: None,
        })
    }

    /// Batch-level parameters shared by every worker on one endpoint.
    fn batch_params(&self, product: &Product, database: &str) -> ParamMap {
        let mut params = ParamMap::new();
        params
            .set(ParamKey::Database, database)
            .set(ParamKey::Schema, self.repo.name())
            .set(ParamKey::Product, product.name())
            .set(ParamKey::ProductData, product.sql_record())
            .set(ParamKey::MeasurementData, product.measurement_sql_records())
            .set(ParamKey::TileSize, product.tile_size());
        params
    }
}
