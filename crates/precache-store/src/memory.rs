//! In-memory storage backend.

use std::sync::Arc;

use async_trait::async_trait;
use precache_core::AssetRequest;

use crate::error::StoreResult;
use crate::state::StateStore;
use crate::storage::{CacheMatch, CacheStorage, NamedCache};

/// Process-local storage. Contents are lost when dropped.
#[derive(Debug, Clone)]
pub struct MemoryStorage {
    store: Arc<StateStore>,
}

impl MemoryStorage {
    /// Create an empty storage.
    pub fn new() -> Self {
        Self {
            store: Arc::new(StateStore::in_memory()),
        }
    }

    /// Entry counts per cache, in creation order.
    pub async fn summary(&self) -> Vec<(String, usize)> {
        self.store.summary().await
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheStorage for MemoryStorage {
    async fn open(&self, name: &str) -> StoreResult<Arc<dyn NamedCache>> {
        Ok(Arc::new(self.store.open(name).await?))
    }

    async fn has(&self, name: &str) -> StoreResult<bool> {
        Ok(self.store.has(name).await)
    }

    async fn keys(&self) -> StoreResult<Vec<String>> {
        Ok(self.store.keys().await)
    }

    async fn delete(&self, name: &str) -> StoreResult<bool> {
        self.store.delete(name).await
    }

    async fn lookup_all(&self, request: &AssetRequest) -> StoreResult<Option<CacheMatch>> {
        Ok(self.store.lookup_all(request).await)
    }
}
