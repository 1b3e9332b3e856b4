//! TOML repository descriptor parser.
//!
//! The descriptor declares one or more repositories, each with its
//! products, store endpoints, and command-template file paths. It is
//! loaded once and immutable for the lifetime of a batch. Template paths
//! are resolved relative to the descriptor file.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

/// Top-level descriptor: a list of repositories.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(rename = "repository")]
    pub repositories: Vec<RepositoryConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryConfig {
    pub name: String,
    /// Root path under which product images live.
    pub path: String,
    pub description: Option<String>,
    pub keywords: Option<String>,
    /// Reference to the credentials used for remote image listing.
    pub credentials: Option<String>,
    pub products: Vec<ProductConfig>,
    /// Store endpoints; may be empty for a repository used only for
    /// listing.
    #[serde(default)]
    pub stores: Vec<StoreConfig>,
    /// Operation name → template file path.
    pub templates: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductConfig {
    pub name: String,
    pub description: Option<String>,
    pub keywords: Option<String>,
    /// Regular expression matched against full image pathnames.
    pub pattern: String,
    pub tile_size: Option<String>,
    #[serde(default)]
    pub measurements: Vec<MeasurementConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeasurementConfig {
    pub name: String,
    pub description: Option<String>,
    pub keywords: Option<String>,
    pub units: Option<String>,
}

/// One PostGIS store endpoint targeted by ingestion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub host: String,
    pub port: Option<u16>,
    pub database: String,
    pub user: Option<String>,
    pub password: Option<String>,
}

impl StoreConfig {
    /// Default PostgreSQL port when the descriptor leaves it out.
    pub fn port(&self) -> u16 {
        self.port.unwrap_or(5432)
    }
}

impl Config {
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// All configured repository names.
    pub fn repository_names(&self) -> Vec<&str> {
        self.repositories.iter().map(|r| r.name.as_str()).collect()
    }

    /// Find a repository descriptor by name.
    pub fn repository(&self, name: &str) -> ConfigResult<&RepositoryConfig> {
        self.repositories
            .iter()
            .find(|r| r.name == name)
            .ok_or_else(|| ConfigError::RepositoryNotFound(name.to_string()))
    }
}
