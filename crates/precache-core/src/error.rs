//! Core error types.

/// Errors raised while building core values.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("version identifier must not be empty")]
    EmptyVersion,

    #[error("invalid asset URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("duplicate manifest entry: {0}")]
    DuplicateAsset(String),
}

/// Errors raised while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse TOML config {path}: {source}")]
    Toml {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to parse JSON config {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("missing required setting: {0}")]
    Missing(&'static str),

    #[error(transparent)]
    Invalid(#[from] CoreError),
}
