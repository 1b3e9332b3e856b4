use std::path::Path;

use tilegrid_core::{Config, Repository};

pub fn run(config_path: &Path, repository: Option<&str>) -> anyhow::Result<()> {
    let config = Config::from_file(config_path)?;

    let Some(name) = repository else {
        for repo_name in config.repository_names() {
            println!("{repo_name}");
        }
        return Ok(());
    };

    let base_dir = config_path.parent().unwrap_or_else(|| Path::new("."));
    let repo = Repository::load(config.repository(name)?, base_dir)?;

    println!("{} ({})", repo.name(), repo.path().display());
    for product_name in repo.product_names() {
        // Loaded repositories always resolve their own product names.
        let Some(product) = repo.product(product_name) else {
            continue;
        };
        println!("  {} (tile size {})", product.name(), product.tile_size());
        for measurement in product.measurements() {
            println!("    {} [{}]", measurement.name, measurement.units);
        }
    }
    Ok(())
}
