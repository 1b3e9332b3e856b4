//! tilegrid-core — repository descriptors, config parsing, and SQL templates.
//!
//! A *repository* is a named collection of earth-observation image products
//! backed by one or more PostGIS store endpoints. This crate parses the
//! declarative TOML descriptor into typed objects, compiles product
//! file-matching patterns, loads the parameterized SQL command templates,
//! and validates every template token against the closed parameter schema
//! at load time — a missing or unknown token is a configuration error, not
//! a runtime surprise.
//!
//! # Components
//!
//! - **`config`** — serde structs for the TOML repository descriptor
//! - **`types`** — `Repository`, `Product`, `Measurement` domain objects
//! - **`params`** — `ParamKey` / `ParamMap`, the closed substitution schema
//! - **`template`** — `!TOKEN!` command-script templates
//! - **`resolve`** — product image enumeration from the filesystem
//! - **`pathname`** — acquisition-timestamp extraction from image pathnames

pub mod config;
pub mod error;
pub mod params;
pub mod pathname;
pub mod resolve;
pub mod template;
pub mod types;

pub use config::{Config, MeasurementConfig, ProductConfig, RepositoryConfig, StoreConfig};
pub use error::{ConfigError, ConfigResult, TemplateError};
pub use params::{ParamKey, ParamMap};
pub use template::{Template, TemplateSet};
pub use types::{Measurement, Product, Repository};
