//! Shared cache state used by every backend.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use precache_core::{AssetRequest, RequestKey, StoredResponse};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::{StoreError, StoreResult};
use crate::storage::{CacheMatch, NamedCache};

/// A stored entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedEntry {
    pub key: RequestKey,
    pub response: StoredResponse,
    pub stored_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheRecord {
    name: String,
    created_at: DateTime<Utc>,
    #[serde(default)]
    entries: BTreeMap<String, CachedEntry>,
}

impl CacheRecord {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            created_at: Utc::now(),
            entries: BTreeMap::new(),
        }
    }

    fn get(&self, key: &RequestKey) -> Option<&CachedEntry> {
        self.entries.get(&key.to_string())
    }
}

/// Every cache, in creation order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StorageState {
    #[serde(default)]
    caches: Vec<CacheRecord>,
}

impl StorageState {
    fn find(&self, name: &str) -> Option<&CacheRecord> {
        self.caches.iter().find(|c| c.name == name)
    }

    fn find_mut(&mut self, name: &str) -> Option<&mut CacheRecord> {
        self.caches.iter_mut().find(|c| c.name == name)
    }
}

/// State engine shared by storage handles and cache handles.
///
/// Writes are applied to a copy, persisted (when backed by a file), and only
/// then swapped in, so a failed write leaves both memory and disk untouched.
#[derive(Debug)]
pub(crate) struct StateStore {
    state: RwLock<StorageState>,
    path: Option<PathBuf>,
}

impl StateStore {
    pub(crate) fn in_memory() -> Self {
        Self {
            state: RwLock::new(StorageState::default()),
            path: None,
        }
    }

    pub(crate) async fn load(path: &Path) -> StoreResult<Self> {
        let state = match tokio::fs::read(path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => StorageState::default(),
            Err(source) => {
                return Err(StoreError::Io {
                    path: path.display().to_string(),
                    source,
                })
            }
        };

        Ok(Self {
            state: RwLock::new(state),
            path: Some(path.to_path_buf()),
        })
    }

    pub(crate) fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    async fn write<R>(&self, f: impl FnOnce(&mut StorageState) -> StoreResult<R>) -> StoreResult<R> {
        let mut guard = self.state.write().await;
        let mut next = guard.clone();
        let result = f(&mut next)?;
        if let Some(path) = &self.path {
            persist(path, &next).await?;
        }
        *guard = next;
        Ok(result)
    }

    pub(crate) async fn open(self: &Arc<Self>, name: &str) -> StoreResult<CacheHandle> {
        let exists = self.state.read().await.find(name).is_some();
        if !exists {
            self.write(|state| {
                if state.find(name).is_none() {
                    state.caches.push(CacheRecord::new(name));
                }
                Ok(())
            })
            .await?;
        }

        Ok(CacheHandle {
            name: name.to_string(),
            store: Arc::clone(self),
        })
    }

    pub(crate) async fn has(&self, name: &str) -> bool {
        self.state.read().await.find(name).is_some()
    }

    pub(crate) async fn keys(&self) -> Vec<String> {
        self.state
            .read()
            .await
            .caches
            .iter()
            .map(|c| c.name.clone())
            .collect()
    }

    pub(crate) async fn delete(&self, name: &str) -> StoreResult<bool> {
        if !self.has(name).await {
            return Ok(false);
        }
        self.write(|state| {
            let before = state.caches.len();
            state.caches.retain(|c| c.name != name);
            Ok(state.caches.len() != before)
        })
        .await
    }

    pub(crate) async fn lookup_all(&self, request: &AssetRequest) -> Option<CacheMatch> {
        if !request.is_cacheable() {
            return None;
        }
        let key = request.key();
        let state = self.state.read().await;
        state.caches.iter().find_map(|cache| {
            cache.get(&key).map(|entry| CacheMatch {
                cache_name: cache.name.clone(),
                response: entry.response.clone(),
            })
        })
    }

    /// Entry counts per cache, in creation order.
    pub(crate) async fn summary(&self) -> Vec<(String, usize)> {
        self.state
            .read()
            .await
            .caches
            .iter()
            .map(|c| (c.name.clone(), c.entries.len()))
            .collect()
    }
}

async fn persist(path: &Path, state: &StorageState) -> StoreResult<()> {
    let io_err = |source| StoreError::Io {
        path: path.display().to_string(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
    }

    let bytes = serde_json::to_vec(state)?;
    let tmp = path.with_extension("tmp");
    tokio::fs::write(&tmp, bytes).await.map_err(io_err)?;
    tokio::fs::rename(&tmp, path).await.map_err(io_err)?;
    Ok(())
}

/// Handle to one named cache inside a storage backend.
#[derive(Debug, Clone)]
pub struct CacheHandle {
    name: String,
    store: Arc<StateStore>,
}

#[async_trait]
impl NamedCache for CacheHandle {
    fn name(&self) -> &str {
        &self.name
    }

    async fn lookup(&self, request: &AssetRequest) -> StoreResult<Option<StoredResponse>> {
        if !request.is_cacheable() {
            return Ok(None);
        }
        let key = request.key();
        let state = self.store.state.read().await;
        Ok(state
            .find(&self.name)
            .and_then(|cache| cache.get(&key))
            .map(|entry| entry.response.clone()))
    }

    async fn keys(&self) -> StoreResult<Vec<RequestKey>> {
        let state = self.store.state.read().await;
        let cache = state
            .find(&self.name)
            .ok_or_else(|| StoreError::CacheDeleted(self.name.clone()))?;
        Ok(cache.entries.values().map(|e| e.key.clone()).collect())
    }

    async fn put_all(&self, entries: Vec<(AssetRequest, StoredResponse)>) -> StoreResult<()> {
        if let Some((request, _)) = entries.iter().find(|(r, _)| !r.is_cacheable()) {
            return Err(StoreError::NotCacheable(request.key().to_string()));
        }

        let now = Utc::now();
        self.store
            .write(|state| {
                let cache = state
                    .find_mut(&self.name)
                    .ok_or_else(|| StoreError::CacheDeleted(self.name.clone()))?;
                for (request, response) in entries {
                    let key = request.key();
                    cache.entries.insert(
                        key.to_string(),
                        CachedEntry {
                            key,
                            response,
                            stored_at: now,
                        },
                    );
                }
                Ok(())
            })
            .await
    }
}
