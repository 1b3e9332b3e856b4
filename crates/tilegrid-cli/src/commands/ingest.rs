use std::path::Path;
use std::sync::Arc;

use anyhow::bail;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use tilegrid_core::{Config, Repository};
use tilegrid_ingest::Ingester;
use tilegrid_store::{PgStore, Store};

pub async fn run(
    config_path: &Path,
    repository: &str,
    product: &str,
    workers: usize,
) -> anyhow::Result<()> {
    let config = Config::from_file(config_path)?;
    let base_dir = config_path.parent().unwrap_or_else(|| Path::new("."));
    let repo = Arc::new(Repository::load(config.repository(repository)?, base_dir)?);

    let mut stores: Vec<Arc<dyn Store>> = Vec::with_capacity(repo.stores().len());
    for store_config in repo.stores() {
        stores.push(Arc::new(PgStore::connect(store_config).await?));
    }
    info!(stores = stores.len(), workers, "endpoints connected");

    // The ingester enumerates the image list itself; the bar tracks
    // completions and the totals come from the report.
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::with_template("{spinner} {pos} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );

    let tick = bar.clone();
    let ingester = Ingester::new(repo)
        .with_workers(workers)
        .with_progress(Arc::new(move |event| {
            tick.set_message(event.pathname.clone());
            tick.inc(1);
        }));

    let report = ingester.ingest(product, &stores).await?;
    bar.finish_and_clear();

    println!(
        "{} image(s): {} ingested, {} skipped across {} store(s)",
        report.images,
        report.total_ingested(),
        report.total_skipped(),
        report.stores.len()
    );
    for store_report in &report.stores {
        if let Some(err) = &store_report.preprocess_error {
            eprintln!("✗ {}: {err}", store_report.database);
        }
        for failure in &store_report.failures {
            eprintln!("✗ {}: {failure}", store_report.database);
        }
    }

    if !report.success() {
        bail!("ingestion completed with failures");
    }
    println!("✓ Ingestion complete");
    Ok(())
}
