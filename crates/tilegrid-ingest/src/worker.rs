//! The per-partition ingestion worker.
//!
//! A worker owns its partition outright and processes it strictly in
//! order: catalog lookup, parameter assembly, bulk tile load into a
//! unique staging table, then the transactional postprocess script that
//! commits the catalog record. The first failing image ends the
//! partition — staging state may be inconsistent after a partial
//! failure, so skip-and-continue is not safe.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, error, info};
use uuid::Uuid;

use tilegrid_core::{ParamKey, ParamMap, Template, pathname as pathname_util};
use tilegrid_store::Store;

use crate::error::{IngestError, PartitionFailure};
use crate::progress::{ImageOutcome, ProgressEvent};

/// One partition's worth of work, created fresh per batch and owned
/// exclusively by its worker.
pub(crate) struct Task {
    pub index: usize,
    pub images: Vec<String>,
    /// Batch-level parameters, cloned and extended per image.
    pub params: ParamMap,
}

/// Process every image in the partition, emitting one progress event per
/// completion. Returns the failure that stopped the partition, if any.
pub(crate) async fn run_partition(
    task: Task,
    store: Arc<dyn Store>,
    postprocess: Template,
    progress: mpsc::Sender<ProgressEvent>,
) -> Option<PartitionFailure> {
    debug!(
        partition = task.index,
        images = task.images.len(),
        "partition started"
    );

    for pathname in &task.images {
        match ingest_image(&task, store.as_ref(), &postprocess, pathname).await {
            Ok(outcome) => {
                let _ = progress
                    .send(ProgressEvent {
                        partition: task.index,
                        pathname: pathname.clone(),
                        outcome,
                    })
                    .await;
            }
            Err(err) => {
                error!(
                    partition = task.index,
                    pathname = %pathname,
                    error = %err,
                    "image ingestion failed; abandoning remainder of partition"
                );
                return Some(PartitionFailure {
                    partition: task.index,
                    pathname: pathname.clone(),
                    error: err,
                });
            }
        }
    }

    debug!(partition = task.index, "partition complete");
    None
}

/// Idempotent single-image load.
async fn ingest_image(
    task: &Task,
    store: &dyn Store,
    postprocess: &Template,
    pathname: &str,
) -> Result<ImageOutcome, IngestError> {
    let schema = task.params.require(ParamKey::Schema)?.to_string();
    let tile_size = task.params.require(ParamKey::TileSize)?.to_string();

    let ingested = store
        .is_ingested(&schema, pathname)
        .await
        .map_err(|source| IngestError::Lookup {
            pathname: pathname.to_string(),
            source,
        })?;
    if ingested {
        debug!(pathname, "already catalogued, skipping");
        return Ok(ImageOutcome::Skipped);
    }

    let params = image_params(&task.params, pathname)?;
    let temp_table = params.require(ParamKey::TempTable)?.to_string();

    store
        .load_raster(pathname, &schema, &temp_table, &tile_size)
        .await
        .map_err(|source| IngestError::Load {
            pathname: pathname.to_string(),
            source,
        })?;

    let script = postprocess.render(&params)?;
    store
        .run_script(&script)
        .await
        .map_err(|source| IngestError::Postprocess {
            pathname: pathname.to_string(),
            source,
        })?;

    info!(pathname, temp_table, "image ingested");
    Ok(ImageOutcome::Ingested)
}

/// Per-image parameter map: the batch map plus pathname-derived values
/// and a staging-table name unique across concurrent workers.
fn image_params(batch: &ParamMap, pathname: &str) -> Result<ParamMap, IngestError> {
    let timestamp = pathname_util::timestamp(pathname)
        .ok_or_else(|| IngestError::Timestamp(pathname.to_string()))?;
    let dir = std::path::Path::new(pathname)
        .parent()
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut params = batch.clone();
    params
        .set(ParamKey::Pathname, pathname)
        .set(ParamKey::Path, dir)
        .set(ParamKey::Timestamp, timestamp)
        .set(ParamKey::TempTable, temp_table_name());
    Ok(params)
}

fn temp_table_name() -> String {
    format!("t_{}", Uuid::new_v4().simple())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tilegrid_store::MemoryStore;

    const POSTPROCESS: &str = "\
INSERT INTO !SCHEMA!.!PRODUCT! (obs_time, rast) \
SELECT '!TIMESTAMP!', rast FROM !SCHEMA!.!TEMP_TABLE!;\n\
DROP TABLE !SCHEMA!.!TEMP_TABLE!;\n\
INSERT INTO !SCHEMA!.cat (pathname, obs_time) VALUES ('!PATHNAME!', '!TIMESTAMP!');";

    fn batch_params() -> ParamMap {
        let mut params = ParamMap::new();
        params
            .set(ParamKey::Database, "geo")
            .set(ParamKey::Schema, "demo")
            .set(ParamKey::Product, "pan")
            .set(ParamKey::ProductData, "( 'pan', '', '' )")
            .set(ParamKey::MeasurementData, "( 'dn', '', '', '' )")
            .set(ParamKey::TileSize, "512x512");
        params
    }

    fn task(index: usize, images: &[&str]) -> Task {
        Task {
            index,
            images: images.iter().map(|s| s.to_string()).collect(),
            params: batch_params(),
        }
    }

    fn postprocess() -> Template {
        Template::parse(POSTPROCESS)
    }

    #[tokio::test]
    async fn ingests_in_order_and_commits_catalog() {
        let store = Arc::new(MemoryStore::new("geo"));
        let (tx, mut rx) = mpsc::channel(16);

        let images = [
            "/ard/20200101_101500/pan_1.tif",
            "/ard/20200102_101500/pan_2.tif",
        ];
        let failure =
            run_partition(task(0, &images), store.clone(), postprocess(), tx).await;
        assert!(failure.is_none());

        assert_eq!(store.load_count(), 2);
        assert!(store.is_catalogued("demo", images[0]));
        assert!(store.is_catalogued("demo", images[1]));

        // Events arrive in partition order.
        let first = rx.recv().await.unwrap();
        assert_eq!(first.pathname, images[0]);
        assert_eq!(first.outcome, ImageOutcome::Ingested);
        let second = rx.recv().await.unwrap();
        assert_eq!(second.pathname, images[1]);
    }

    #[tokio::test]
    async fn catalogued_image_is_skipped_without_load() {
        let store = Arc::new(MemoryStore::new("geo"));
        let image = "/ard/20200101_101500/pan_1.tif";
        store.preload("demo", image);

        let (tx, mut rx) = mpsc::channel(16);
        let failure = run_partition(task(0, &[image]), store.clone(), postprocess(), tx).await;
        assert!(failure.is_none());

        assert_eq!(store.load_count(), 0);
        assert_eq!(store.script_count(), 0);
        assert_eq!(rx.recv().await.unwrap().outcome, ImageOutcome::Skipped);
    }

    #[tokio::test]
    async fn load_failure_stops_partition() {
        let store = Arc::new(MemoryStore::new("geo"));
        let images = [
            "/ard/20200101_101500/pan_1.tif",
            "/ard/20200102_101500/pan_2.tif",
            "/ard/20200103_101500/pan_3.tif",
        ];
        store.fail_load_on(images[1]);

        let (tx, _rx) = mpsc::channel(16);
        let failure = run_partition(task(4, &images), store.clone(), postprocess(), tx)
            .await
            .unwrap();

        assert_eq!(failure.partition, 4);
        assert_eq!(failure.pathname, images[1]);
        assert!(matches!(failure.error, IngestError::Load { .. }));

        // The image before the failure is committed; the one after is
        // never attempted. The rejected pan_2 attempt is not recorded.
        assert!(store.is_catalogued("demo", images[0]));
        assert!(!store.is_catalogued("demo", images[2]));
        assert_eq!(store.load_count(), 1);
    }

    #[tokio::test]
    async fn postprocess_failure_stops_partition() {
        let store = Arc::new(MemoryStore::new("geo"));
        let images = [
            "/ard/20200101_101500/pan_1.tif",
            "/ard/20200102_101500/pan_2.tif",
        ];
        store.fail_script_on(images[0]);

        let (tx, _rx) = mpsc::channel(16);
        let failure = run_partition(task(0, &images), store.clone(), postprocess(), tx)
            .await
            .unwrap();

        assert_eq!(failure.pathname, images[0]);
        assert!(matches!(failure.error, IngestError::Postprocess { .. }));
        assert_eq!(store.catalog_len(), 0);
    }

    #[tokio::test]
    async fn pathname_without_timestamp_fails_before_load() {
        let store = Arc::new(MemoryStore::new("geo"));
        let (tx, _rx) = mpsc::channel(16);

        let failure = run_partition(
            task(0, &["/ard/no-timestamp/pan.tif"]),
            store.clone(),
            postprocess(),
            tx,
        )
        .await
        .unwrap();

        assert!(matches!(failure.error, IngestError::Timestamp(_)));
        assert_eq!(store.load_count(), 0);
    }

    #[tokio::test]
    async fn empty_partition_completes_silently() {
        let store = Arc::new(MemoryStore::new("geo"));
        let (tx, mut rx) = mpsc::channel(16);

        let failure = run_partition(task(0, &[]), store, postprocess(), tx).await;
        assert!(failure.is_none());
        assert!(rx.recv().await.is_none());
    }

    #[test]
    fn temp_table_names_are_unique_and_sql_safe() {
        let a = temp_table_name();
        let b = temp_table_name();
        assert_ne!(a, b);
        assert!(a.starts_with("t_"));
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'));
    }

    #[test]
    fn image_params_extend_batch_map() {
        let params = image_params(&batch_params(), "/ard/20200308_101522/pan_1.tif").unwrap();
        assert_eq!(params.get(ParamKey::Pathname).unwrap(), "/ard/20200308_101522/pan_1.tif");
        assert_eq!(params.get(ParamKey::Path).unwrap(), "/ard/20200308_101522");
        assert_eq!(params.get(ParamKey::Timestamp).unwrap(), "2020-03-08 10:15:22");
        // Batch values survive the clone.
        assert_eq!(params.get(ParamKey::Schema).unwrap(), "demo");
    }
}
