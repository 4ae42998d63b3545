//! Typed errors for configuration loading.

use thiserror::Error;

/// Errors raised while loading or validating a site configuration.
/// Fatal for the one config, never for the registry: the loader logs
/// and skips the offending site.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required field missing or empty
    #[error("missing required field `{field}` in site config `{site}`")]
    MissingField { site: String, field: String },

    /// URL or bonus pattern failed to compile
    #[error("invalid regex in site config `{site}`: {pattern}: {source}")]
    InvalidPattern {
        site: String,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// CSS selector failed to parse
    #[error("invalid selector in site config `{site}`: {selector}")]
    InvalidSelector { site: String, selector: String },

    /// Config file could not be read
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    /// Config JSON could not be deserialized
    #[error("failed to parse config JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for config operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
