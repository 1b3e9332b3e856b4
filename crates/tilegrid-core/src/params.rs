//! The closed parameter schema for command templates.
//!
//! Template substitution is driven by a fixed, enumerated set of keys
//! rather than a free-form string map, so a typo in a template token is
//! caught when the repository loads instead of producing a half-rendered
//! script at ingestion time.

use std::collections::HashMap;

use crate::error::TemplateError;

/// A recognized substitution key.
///
/// Batch-level keys are assembled once per store endpoint; image-level
/// keys are rebuilt for every image from a clone of the batch map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamKey {
    /// Target database name.
    Database,
    /// Target schema — the repository name.
    Schema,
    /// Product name, doubling as the product raster table name.
    Product,
    /// Product metadata as a SQL record literal.
    ProductData,
    /// Measurement metadata as comma-separated SQL record literals.
    MeasurementData,
    /// Raster tile dimensions, e.g. `512x512`.
    TileSize,
    /// Full pathname of the image being ingested.
    Pathname,
    /// Directory portion of the image pathname.
    Path,
    /// Acquisition timestamp parsed from the pathname.
    Timestamp,
    /// Per-image staging table for the bulk tile load.
    TempTable,
}

/// Keys available to the batch-level `preprocess` operation.
pub const BATCH_KEYS: &[ParamKey] = &[
    ParamKey::Database,
    ParamKey::Schema,
    ParamKey::Product,
    ParamKey::ProductData,
    ParamKey::MeasurementData,
    ParamKey::TileSize,
];

/// Keys available to the per-image `postprocess` operation — the batch
/// keys plus the image-specific ones.
pub const IMAGE_KEYS: &[ParamKey] = &[
    ParamKey::Database,
    ParamKey::Schema,
    ParamKey::Product,
    ParamKey::ProductData,
    ParamKey::MeasurementData,
    ParamKey::TileSize,
    ParamKey::Pathname,
    ParamKey::Path,
    ParamKey::Timestamp,
    ParamKey::TempTable,
];

impl ParamKey {
    /// The uppercase token spelling used inside templates.
    pub fn token(&self) -> &'static str {
        match self {
            ParamKey::Database => "DATABASE",
            ParamKey::Schema => "SCHEMA",
            ParamKey::Product => "PRODUCT",
            ParamKey::ProductData => "PRODUCT_DATA",
            ParamKey::MeasurementData => "MEASUREMENT_DATA",
            ParamKey::TileSize => "TILE_SIZE",
            ParamKey::Pathname => "PATHNAME",
            ParamKey::Path => "PATH",
            ParamKey::Timestamp => "TIMESTAMP",
            ParamKey::TempTable => "TEMP_TABLE",
        }
    }

    /// Map a template token back to its key, if it is part of the schema.
    pub fn from_token(token: &str) -> Option<ParamKey> {
        IMAGE_KEYS.iter().copied().find(|k| k.token() == token)
    }
}

impl std::fmt::Display for ParamKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.token())
    }
}

/// A map of parameter values keyed by `ParamKey`.
///
/// Cloned per image; never shared mutably across workers.
#[derive(Debug, Clone, Default)]
pub struct ParamMap {
    values: HashMap<ParamKey, String>,
}

impl ParamMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a parameter value, replacing any previous one.
    pub fn set(&mut self, key: ParamKey, value: impl Into<String>) -> &mut Self {
        self.values.insert(key, value.into());
        self
    }

    /// Look up a parameter value.
    pub fn get(&self, key: ParamKey) -> Option<&str> {
        self.values.get(&key).map(String::as_str)
    }

    /// Look up a parameter value, failing with the token name if absent.
    pub fn require(&self, key: ParamKey) -> Result<&str, TemplateError> {
        self.get(key)
            .ok_or_else(|| TemplateError::MissingParam(key.token().to_string()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
