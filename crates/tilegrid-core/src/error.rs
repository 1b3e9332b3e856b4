//! Error types for repository configuration and template rendering.

use thiserror::Error;

/// Result type alias for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors raised while loading a repository descriptor.
///
/// All of these are fatal at startup — no batch is attempted against a
/// repository whose descriptor failed to load.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },

    #[error("repository not found: {0}")]
    RepositoryNotFound(String),

    #[error("missing '{operation}' template for repository '{repository}'")]
    MissingTemplate {
        repository: String,
        operation: String,
    },

    #[error("unknown token !{token}! in '{operation}' template")]
    UnknownToken { operation: String, token: String },

    #[error("invalid pattern for product '{product}': {source}")]
    InvalidPattern {
        product: String,
        source: regex::Error,
    },
}

/// Errors raised while rendering a command template.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// A template token had no value in the parameter map. Substitution
    /// never leaves a literal placeholder in an executed script.
    #[error("no value for template token !{0}!")]
    MissingParam(String),

    /// A token that does not belong to the parameter schema at all.
    #[error("unrecognized template token !{0}!")]
    UnknownToken(String),
}
