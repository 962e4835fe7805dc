//! Worker error types.

use std::time::Duration;

use precache_core::Signal;
use precache_net::NetworkError;
use precache_store::StoreError;

/// Error type for lifecycle handling.
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    /// Precache population failed; the version must not activate.
    #[error("install of version {version} failed: {source}")]
    Install {
        version: String,
        #[source]
        source: StoreError,
    },

    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// Network failure on a cache miss, passed through unchanged.
    #[error(transparent)]
    Network(#[from] NetworkError),

    #[error("{signal} handler did not settle within {after:?}")]
    Timeout { signal: Signal, after: Duration },

    /// A waiting version's cache disappeared before it could take control.
    #[error("cache '{0}' is missing; refusing to activate")]
    MissingCache(String),

    #[error("no handler registered for {0}")]
    Unhandled(Signal),

    #[error("{handler} handler cannot handle a {event} event")]
    EventMismatch { handler: Signal, event: Signal },
}
