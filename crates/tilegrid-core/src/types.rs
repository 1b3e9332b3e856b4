//! Repository, product, and measurement domain objects.
//!
//! Built from the raw descriptor by [`Repository::load`], which compiles
//! product patterns, reads the template files, and validates every
//! template token against the parameter schema. A repository that loads
//! successfully can always render its operations.

use std::path::{Path, PathBuf};

use regex::Regex;
use tracing::debug;

use crate::config::RepositoryConfig;
use crate::error::{ConfigError, ConfigResult};
use crate::template::TemplateSet;
use crate::{StoreConfig, resolve};

/// A named image collection with its stores and command templates.
#[derive(Debug, Clone)]
pub struct Repository {
    name: String,
    path: PathBuf,
    credentials: Option<String>,
    products: Vec<Product>,
    stores: Vec<StoreConfig>,
    templates: TemplateSet,
}

/// One product within a repository. The pattern enumerates its member
/// images; the name doubles as the raster table name in the store.
#[derive(Debug, Clone)]
pub struct Product {
    name: String,
    description: String,
    keywords: String,
    pattern: Regex,
    tile_size: String,
    measurements: Vec<Measurement>,
}

/// Measurement metadata — carried into the store, no behavior.
#[derive(Debug, Clone)]
pub struct Measurement {
    pub name: String,
    pub description: String,
    pub keywords: String,
    pub units: String,
}

/// Default GDAL tile dimensions when a product leaves them out.
const DEFAULT_TILE_SIZE: &str = "512x512";

impl Repository {
    /// Build a repository from its descriptor.
    ///
    /// Template paths are resolved relative to `base_dir` (the descriptor
    /// file's directory). Fails on a missing template operation, an
    /// unreadable template file, an unknown template token, or an invalid
    /// product pattern.
    pub fn load(config: &RepositoryConfig, base_dir: &Path) -> ConfigResult<Self> {
        let preprocess = read_template(config, base_dir, "preprocess")?;
        let postprocess = read_template(config, base_dir, "postprocess")?;
        let templates = TemplateSet::new(preprocess, postprocess)?;

        let mut products = Vec::with_capacity(config.products.len());
        for item in &config.products {
            let pattern =
                Regex::new(&item.pattern).map_err(|source| ConfigError::InvalidPattern {
                    product: item.name.clone(),
                    source,
                })?;
            products.push(Product {
                name: item.name.clone(),
                description: item.description.clone().unwrap_or_default(),
                keywords: item.keywords.clone().unwrap_or_default(),
                pattern,
                tile_size: item
                    .tile_size
                    .clone()
                    .unwrap_or_else(|| DEFAULT_TILE_SIZE.to_string()),
                measurements: item
                    .measurements
                    .iter()
                    .map(|m| Measurement {
                        name: m.name.clone(),
                        description: m.description.clone().unwrap_or_default(),
                        keywords: m.keywords.clone().unwrap_or_default(),
                        units: m.units.clone().unwrap_or_default(),
                    })
                    .collect(),
            });
        }

        debug!(
            repository = %config.name,
            products = products.len(),
            stores = config.stores.len(),
            "repository loaded"
        );

        Ok(Self {
            name: config.name.clone(),
            path: PathBuf::from(&config.path),
            credentials: config.credentials.clone(),
            products,
            stores: config.stores.clone(),
            templates,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Root path under which product images live.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn credentials(&self) -> Option<&str> {
        self.credentials.as_deref()
    }

    pub fn stores(&self) -> &[StoreConfig] {
        &self.stores
    }

    pub fn templates(&self) -> &TemplateSet {
        &self.templates
    }

    pub fn product_names(&self) -> Vec<&str> {
        self.products.iter().map(|p| p.name.as_str()).collect()
    }

    pub fn product(&self, name: &str) -> Option<&Product> {
        self.products.iter().find(|p| p.name == name)
    }

    /// Enumerate the product's member images under the repository root,
    /// in deterministic (sorted) order.
    pub fn list_product_images(&self, product: &Product) -> std::io::Result<Vec<String>> {
        resolve::list_product_images(&self.path, product)
    }
}

fn read_template(
    config: &RepositoryConfig,
    base_dir: &Path,
    operation: &str,
) -> ConfigResult<String> {
    let relative = config
        .templates
        .get(operation)
        .ok_or_else(|| ConfigError::MissingTemplate {
            repository: config.name.clone(),
            operation: operation.to_string(),
        })?;
    let path = base_dir.join(relative);
    std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })
}

impl Product {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn keywords(&self) -> &str {
        &self.keywords
    }

    pub fn pattern(&self) -> &Regex {
        &self.pattern
    }

    pub fn tile_size(&self) -> &str {
        &self.tile_size
    }

    pub fn measurements(&self) -> &[Measurement] {
        &self.measurements
    }

    /// Product identity as a SQL record literal for the `PRODUCT_DATA`
    /// parameter, e.g. `( 'pan', 'panchromatic', 'optical' )`.
    pub fn sql_record(&self) -> String {
        format!(
            "( '{}', '{}', '{}' )",
            escape(&self.name),
            escape(&self.description),
            escape(&self.keywords)
        )
    }

    /// Measurement metadata as comma-separated SQL record literals for the
    /// `MEASUREMENT_DATA` parameter.
    pub fn measurement_sql_records(&self) -> String {
        self.measurements
            .iter()
            .map(|m| {
                format!(
                    "( '{}', '{}', '{}', '{}' )",
                    escape(&m.name),
                    escape(&m.description),
                    escape(&m.keywords),
                    escape(&m.units)
                )
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Double single quotes for embedding in a SQL string literal.
fn escape(value: &str) -> String {
    value.replace('\'', "''")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use std::fs;

    const DESCRIPTOR: &str = r#"
[[repository]]
name = "demo"
path = "/data/ard"

  [[repository.products]]
  name = "pan"
  description = "panchromatic"
  keywords = "optical"
  pattern = '.*pan.*\.tif$'

    [[repository.products.measurements]]
    name = "dn"
    description = "digital number"
    keywords = "raw"
    units = "1"

    [[repository.products.measurements]]
    name = "toa"
    description = "top of atmosphere"
    keywords = "reflectance"
    units = "percent"

  [[repository.stores]]
  host = "localhost"
  database = "geo"

  [repository.templates]
  preprocess = "preprocess.sql"
  postprocess = "postprocess.sql"
"#;

    fn write_templates(dir: &Path) {
        fs::write(dir.join("preprocess.sql"), "CREATE SCHEMA IF NOT EXISTS !SCHEMA!;").unwrap();
        fs::write(
            dir.join("postprocess.sql"),
            "INSERT INTO !SCHEMA!.cat (pathname) VALUES ('!PATHNAME!');",
        )
        .unwrap();
    }

    fn load_demo(dir: &Path) -> Repository {
        let config: Config = toml::from_str(DESCRIPTOR).unwrap();
        Repository::load(config.repository("demo").unwrap(), dir).unwrap()
    }

    #[test]
    fn load_builds_products_and_templates() {
        let dir = tempfile::tempdir().unwrap();
        write_templates(dir.path());

        let repo = load_demo(dir.path());
        assert_eq!(repo.name(), "demo");
        assert_eq!(repo.product_names(), vec!["pan"]);

        let product = repo.product("pan").unwrap();
        assert_eq!(product.tile_size(), "512x512");
        assert!(product.pattern().is_match("/data/ard/x/pan_01.tif"));
        assert_eq!(product.measurements().len(), 2);
    }

    #[test]
    fn missing_template_operation_fails() {
        let dir = tempfile::tempdir().unwrap();
        write_templates(dir.path());

        let config: Config = toml::from_str(DESCRIPTOR).unwrap();
        let mut repo_cfg = config.repository("demo").unwrap().clone();
        repo_cfg.templates.remove("postprocess");

        let err = Repository::load(&repo_cfg, dir.path()).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MissingTemplate { operation, .. } if operation == "postprocess"
        ));
    }

    #[test]
    fn unreadable_template_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        // Only the preprocess file exists.
        fs::write(dir.path().join("preprocess.sql"), "SELECT 1;").unwrap();

        let config: Config = toml::from_str(DESCRIPTOR).unwrap();
        let err = Repository::load(config.repository("demo").unwrap(), dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn invalid_product_pattern_fails() {
        let dir = tempfile::tempdir().unwrap();
        write_templates(dir.path());

        let config: Config = toml::from_str(DESCRIPTOR).unwrap();
        let mut repo_cfg = config.repository("demo").unwrap().clone();
        repo_cfg.products[0].pattern = "([".to_string();

        let err = Repository::load(&repo_cfg, dir.path()).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidPattern { product, .. } if product == "pan"
        ));
    }

    #[test]
    fn sql_records_escape_quotes() {
        let dir = tempfile::tempdir().unwrap();
        write_templates(dir.path());

        let config: Config = toml::from_str(DESCRIPTOR).unwrap();
        let mut repo_cfg = config.repository("demo").unwrap().clone();
        repo_cfg.products[0].description = Some("o'brien's band".to_string());

        let repo = Repository::load(&repo_cfg, dir.path()).unwrap();
        let record = repo.product("pan").unwrap().sql_record();
        assert_eq!(record, "( 'pan', 'o''brien''s band', 'optical' )");
    }

    #[test]
    fn measurement_records_are_comma_separated() {
        let dir = tempfile::tempdir().unwrap();
        write_templates(dir.path());

        let repo = load_demo(dir.path());
        let records = repo.product("pan").unwrap().measurement_sql_records();
        assert_eq!(
            records,
            "( 'dn', 'digital number', 'raw', '1' ), \
             ( 'toa', 'top of atmosphere', 'reflectance', 'percent' )"
        );
    }
}
