//! Storage error types.

use precache_net::NetworkError;

/// Result type for storage operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Storage operation errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// An asset could not be fetched during population.
    #[error("failed to fetch {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: NetworkError,
    },

    /// An asset answered with a non-2xx status during population.
    #[error("unexpected status {status} for {url}")]
    BadStatus { url: String, status: u16 },

    /// Only GET requests can be stored.
    #[error("request is not cacheable: {0}")]
    NotCacheable(String),

    /// The cache behind a handle no longer exists.
    #[error("cache '{0}' was deleted")]
    CacheDeleted(String),

    /// Backend storage error.
    #[error("storage I/O error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to serialize/deserialize the storage file.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
