//! Storage capability traits.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::try_join_all;
use precache_core::{AssetRequest, RequestKey, StoredResponse};
use precache_net::Network;
use tracing::debug;

use crate::error::{StoreError, StoreResult};

/// A lookup hit and the cache it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheMatch {
    pub cache_name: String,
    pub response: StoredResponse,
}

/// One named cache.
#[async_trait]
pub trait NamedCache: Send + Sync {
    /// Cache name.
    fn name(&self) -> &str;

    /// Stored response for `request`, if any.
    async fn lookup(&self, request: &AssetRequest) -> StoreResult<Option<StoredResponse>>;

    /// Keys of all stored entries.
    async fn keys(&self) -> StoreResult<Vec<RequestKey>>;

    /// Store a batch of entries in one write. Either every entry is stored or none is.
    async fn put_all(&self, entries: Vec<(AssetRequest, StoredResponse)>) -> StoreResult<()>;

    /// Fetch every request and store the results in one batch.
    ///
    /// Fails without writing anything if any request errors or answers with
    /// a non-2xx status.
    async fn add_all(&self, network: &dyn Network, requests: &[AssetRequest]) -> StoreResult<usize> {
        let fetches = requests.iter().map(|request| async move {
            let url = request.url().to_string();
            let response = network
                .fetch(request)
                .await
                .map_err(|source| StoreError::Fetch {
                    url: url.clone(),
                    source,
                })?;

            if !response.is_ok() {
                return Err(StoreError::BadStatus {
                    url,
                    status: response.status,
                });
            }
            Ok((request.clone(), response))
        });

        let entries = try_join_all(fetches).await?;
        let count = entries.len();
        self.put_all(entries).await?;

        debug!(cache = self.name(), count, "cache populated");
        Ok(count)
    }
}

/// The set of named caches owned by one origin.
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Open a cache, creating it if absent.
    async fn open(&self, name: &str) -> StoreResult<Arc<dyn NamedCache>>;

    /// Whether a cache exists.
    async fn has(&self, name: &str) -> StoreResult<bool>;

    /// Names of all caches, in creation order.
    async fn keys(&self) -> StoreResult<Vec<String>>;

    /// Delete a cache. Returns `false` if it did not exist.
    async fn delete(&self, name: &str) -> StoreResult<bool>;

    /// Look `request` up in every cache, in creation order; first hit wins.
    async fn lookup_all(&self, request: &AssetRequest) -> StoreResult<Option<CacheMatch>>;
}

#[async_trait]
impl<S: CacheStorage + ?Sized> CacheStorage for Arc<S> {
    async fn open(&self, name: &str) -> StoreResult<Arc<dyn NamedCache>> {
        (**self).open(name).await
    }

    async fn has(&self, name: &str) -> StoreResult<bool> {
        (**self).has(name).await
    }

    async fn keys(&self) -> StoreResult<Vec<String>> {
        (**self).keys().await
    }

    async fn delete(&self, name: &str) -> StoreResult<bool> {
        (**self).delete(name).await
    }

    async fn lookup_all(&self, request: &AssetRequest) -> StoreResult<Option<CacheMatch>> {
        (**self).lookup_all(request).await
    }
}
