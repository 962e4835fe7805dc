//! File-backed storage backend.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use precache_core::AssetRequest;
use tracing::debug;

use crate::error::StoreResult;
use crate::state::StateStore;
use crate::storage::{CacheMatch, CacheStorage, NamedCache};

/// Storage persisted to a single JSON file.
///
/// Every write replaces the file through a rename, so the file always holds
/// a complete snapshot. Caches survive restarts until deleted.
#[derive(Debug, Clone)]
pub struct FsStorage {
    store: Arc<StateStore>,
}

impl FsStorage {
    /// Open the storage file, starting empty if it does not exist yet.
    pub async fn load(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        let store = StateStore::load(path).await?;
        debug!(path = %path.display(), "storage opened");
        Ok(Self {
            store: Arc::new(store),
        })
    }

    /// Path of the storage file.
    pub fn path(&self) -> PathBuf {
        self.store.path().map(Path::to_path_buf).unwrap_or_default()
    }

    /// Entry counts per cache, in creation order.
    pub async fn summary(&self) -> Vec<(String, usize)> {
        self.store.summary().await
    }
}

#[async_trait]
impl CacheStorage for FsStorage {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use precache_core::StoredResponse;

    fn get(url: &str) -> AssetRequest {
        AssetRequest::parse_get(url).unwrap()
    }

    #[tokio::test]
    async fn test_missing_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FsStorage::load(dir.path().join("caches.json")).await.unwrap();

        assert!(storage.keys().await.unwrap().is_empty());
        assert!(!dir.path().join("caches.json").exists());
    }

    #[tokio::test]
    async fn test_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("caches.json");
        let req = get("https://example.com/app.wasm");

        {
            let storage = FsStorage::load(&path).await.unwrap();
            let cache = storage.open("app-A").await.unwrap();
            cache
                .put_all(vec![(
                    req.clone(),
                    StoredResponse::new(200)
                        .with_header("content-type", "application/wasm")
                        .with_body(vec![0u8, 97, 115, 109]),
                )])
                .await
                .unwrap();
        }

        let reopened = FsStorage::load(&path).await.unwrap();
        assert_eq!(reopened.keys().await.unwrap(), vec!["app-A"]);

        let hit = reopened.lookup_all(&req).await.unwrap().unwrap();
        assert_eq!(hit.response.body, vec![0u8, 97, 115, 109]);
        assert_eq!(hit.response.header("Content-Type"), Some("application/wasm"));
        assert_eq!(reopened.summary().await, vec![("app-A".to_string(), 1)]);
    }

    #[tokio::test]
    async fn test_delete_is_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("caches.json");

        let storage = FsStorage::load(&path).await.unwrap();
        storage.open("app-A").await.unwrap();
        storage.open("app-B").await.unwrap();
        storage.delete("app-A").await.unwrap();

        let reopened = FsStorage::load(&path).await.unwrap();
        assert_eq!(reopened.keys().await.unwrap(), vec!["app-B"]);
    }

    #[tokio::test]
    async fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("caches.json");
        std::fs::write(&path, "not json").unwrap();

        let err = FsStorage::load(&path).await.unwrap_err();
        assert!(matches!(err, StoreError::Serialization(_)));
    }
}
