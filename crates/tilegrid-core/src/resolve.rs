//! Product image enumeration.
//!
//! Walks the repository root and matches each file's full pathname
//! against the product pattern. Results are sorted so partitioning is
//! reproducible across runs.

use std::io;
use std::path::Path;

use tracing::debug;
use walkdir::WalkDir;

use crate::types::Product;

/// List the pathnames under `root` that belong to `product`.
pub fn list_product_images(root: &Path, product: &Product) -> io::Result<Vec<String>> {
    let mut images = Vec::new();
    for entry in WalkDir::new(root) {
        let entry = entry.map_err(io::Error::other)?;
        if !entry.file_type().is_file() {
            continue;
        }
        let pathname = entry.path().to_string_lossy().into_owned();
        if product.pattern().is_match(&pathname) {
            images.push(pathname);
        }
    }
    images.sort();
    debug!(
        product = product.name(),
        root = %root.display(),
        images = images.len(),
        "enumerated product images"
    );
    Ok(images)
}
