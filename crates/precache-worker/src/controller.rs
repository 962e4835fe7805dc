//! The cache lifecycle controller.

use futures::future::{join_all, BoxFuture, FutureExt};
use precache_core::{AssetRequest, CacheName, ControllerConfig, Signal, StoredResponse, VersionId};
use precache_net::Network;
use precache_store::CacheStorage;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::WorkerError;
use crate::table::{Effect, Event, HandlerTable};

/// Result of a successful install.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstallOutcome {
    /// Cache holding this version's assets.
    pub cache_name: CacheName,
    /// Number of assets stored.
    pub cached: usize,
    /// Whether the version asked to be promoted without waiting.
    pub skip_waiting: bool,
}

/// Result of an activation cleanup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ActivationReport {
    /// Caches removed.
    pub deleted: Vec<String>,
    /// Caches whose deletion failed. They are logged and left in place.
    pub failed: Vec<String>,
}

/// Where a fetch response came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase", tag = "source", content = "cache")]
pub enum ResponseSource {
    /// Served from the named cache.
    Cache(String),
    /// Forwarded to the network.
    Network,
}

/// A fetch response and its source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOutcome {
    pub response: StoredResponse,
    pub source: ResponseSource,
}

impl FetchOutcome {
    pub fn is_from_cache(&self) -> bool {
        matches!(self.source, ResponseSource::Cache(_))
    }
}

/// One controller version: immutable configuration plus the storage and
/// network capabilities it runs against.
pub struct CacheController<S, N> {
    config: ControllerConfig,
    storage: S,
    network: N,
}

impl<S: CacheStorage, N: Network> CacheController<S, N> {
    /// Create a controller.
    pub fn new(config: ControllerConfig, storage: S, network: N) -> Self {
        Self {
            config,
            storage,
            network,
        }
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn version(&self) -> &VersionId {
        self.config.version()
    }

    pub fn cache_name(&self) -> &CacheName {
        self.config.cache_name()
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Open this version's cache and populate it with every manifest asset.
    ///
    /// Population is all-or-nothing. On failure a cache created by this call
    /// is removed again, leaving the cache set as it was.
    pub async fn install(&self) -> Result<InstallOutcome, WorkerError> {
        let version = self.version();
        let name = self.cache_name();
        info!(%version, cache = %name, "installing app worker {}", version);

        let existed = self.storage.has(name.as_str()).await?;
        let cache = self.storage.open(name.as_str()).await?;
        let requests = self.config.manifest().requests();

        match cache.add_all(&self.network, &requests).await {
            Ok(cached) => {
                info!(%version, cache = %name, cached, "precache complete");
                Ok(InstallOutcome {
                    cache_name: name.clone(),
                    cached,
                    skip_waiting: self.config.skip_waiting(),
                })
            }
            Err(source) => {
                warn!(%version, cache = %name, error = %source, "precache failed");
                if !existed {
                    if let Err(e) = self.storage.delete(name.as_str()).await {
                        warn!(cache = %name, error = %e, "failed to remove incomplete cache");
                    }
                }
                Err(WorkerError::Install {
                    version: version.to_string(),
                    source,
                })
            }
        }
    }

    /// Delete every cache other than this version's.
    ///
    /// A failed deletion is logged and reported, and does not fail activation.
    pub async fn activate(&self) -> Result<ActivationReport, WorkerError> {
        let version = self.version();
        let current = self.cache_name();

        if !self.storage.has(current.as_str()).await? {
            warn!(%version, cache = %current, "activating without a precached cache");
        }

        let stale: Vec<String> = self
            .storage
            .keys()
            .await?
            .into_iter()
            .filter(|name| current != name.as_str())
            .collect();

        let results = join_all(stale.iter().map(|name| self.storage.delete(name))).await;

        let mut report = ActivationReport::default();
        for (name, result) in stale.into_iter().zip(results) {
            match result {
                Ok(true) => {
                    debug!(cache = %name, "deleted stale cache");
                    report.deleted.push(name);
                }
                Ok(false) => debug!(cache = %name, "stale cache already gone"),
                Err(e) => {
                    warn!(cache = %name, error = %e, "failed to delete stale cache");
                    report.failed.push(name);
                }
            }
        }

        info!(%version, deleted = report.deleted.len(), "app worker {} is activated", version);
        Ok(report)
    }

    /// Remove this version's cache after an abandoned install.
    pub async fn discard(&self) -> Result<bool, WorkerError> {
        let removed = self.storage.delete(self.cache_name().as_str()).await?;
        if removed {
            debug!(cache = %self.cache_name(), "discarded cache of abandoned install");
        }
        Ok(removed)
    }

    /// Answer a request from any cache, falling back to the network on a miss.
    ///
    /// Network results are returned as-is and never stored.
    pub async fn fetch(&self, request: &AssetRequest) -> Result<FetchOutcome, WorkerError> {
        if let Some(hit) = self.storage.lookup_all(request).await? {
            debug!(url = %request.url(), cache = %hit.cache_name, "cache hit");
            return Ok(FetchOutcome {
                response: hit.response,
                source: ResponseSource::Cache(hit.cache_name),
            });
        }

        debug!(url = %request.url(), "cache miss, forwarding to network");
        let response = self.network.fetch(request).await?;
        Ok(FetchOutcome {
            response,
            source: ResponseSource::Network,
        })
    }

    /// The signal table every controller version registers at startup.
    pub fn handler_table() -> HandlerTable<Self> {
        HandlerTable::new()
            .on(Signal::Install, handle_install::<S, N>)
            .on(Signal::Activate, handle_activate::<S, N>)
            .on(Signal::Fetch, handle_fetch::<S, N>)
    }
}

fn handle_install<S: CacheStorage, N: Network>(
    controller: &CacheController<S, N>,
    event: Event,
) -> BoxFuture<'_, Result<Effect, WorkerError>> {
    async move {
        match event {
            Event::Install => controller.install().await.map(Effect::Installed),
            other => Err(mismatch(Signal::Install, &other)),
        }
    }
    .boxed()
}

fn handle_activate<S: CacheStorage, N: Network>(
    controller: &CacheController<S, N>,
    event: Event,
) -> BoxFuture<'_, Result<Effect, WorkerError>> {
    async move {
        match event {
            Event::Activate => controller.activate().await.map(Effect::Activated),
            other => Err(mismatch(Signal::Activate, &other)),
        }
    }
    .boxed()
}

fn handle_fetch<S: CacheStorage, N: Network>(
    controller: &CacheController<S, N>,
    event: Event,
) -> BoxFuture<'_, Result<Effect, WorkerError>> {
    async move {
        match event {
            Event::Fetch(request) => controller.fetch(&request).await.map(Effect::Responded),
            other => Err(mismatch(Signal::Fetch, &other)),
        }
    }
    .boxed()
}

fn mismatch(handler: Signal, event: &Event) -> WorkerError {
    WorkerError::EventMismatch {
        handler,
        event: event.signal(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use precache_core::AssetManifest;
    use precache_net::{NetworkError, StaticNetwork};
    use precache_store::MemoryStorage;

    const ASSETS: [&str; 3] = [
        "https://example.com/app/",
        "https://example.com/app/app.css",
        "https://example.com/app/web/app.wasm",
    ];

    fn network() -> Arc<StaticNetwork> {
        let mut network = StaticNetwork::new();
        for url in ASSETS {
            network = network.with_body(url, url);
        }
        Arc::new(network)
    }

    fn controller(
        version: &str,
        storage: &MemoryStorage,
        network: &Arc<StaticNetwork>,
    ) -> CacheController<MemoryStorage, Arc<StaticNetwork>> {
        let config = ControllerConfig::new(
            VersionId::new(version).unwrap(),
            AssetManifest::new(ASSETS).unwrap(),
        );
        CacheController::new(config, storage.clone(), Arc::clone(network))
    }

    #[tokio::test]
    async fn test_install_precaches_manifest() {
        let storage = MemoryStorage::new();
        let network = network();
        let ctl = controller("A", &storage, &network);

        let outcome = ctl.install().await.unwrap();
        assert_eq!(outcome.cache_name.as_str(), "app-A");
        assert_eq!(outcome.cached, 3);
        assert!(outcome.skip_waiting);

        let cache = storage.open("app-A").await.unwrap();
        for url in ASSETS {
            let req = AssetRequest::parse_get(url).unwrap();
            assert!(cache.lookup(&req).await.unwrap().is_some());
        }
    }

    #[tokio::test]
    async fn test_failed_install_leaves_no_cache() {
        let storage = MemoryStorage::new();
        let network = network();
        network.set_route(
            ASSETS[1],
            precache_net::Route::Fail(NetworkError::Connection("down".to_string())),
        );
        let ctl = controller("A", &storage, &network);

        let err = ctl.install().await.unwrap_err();
        assert!(matches!(err, WorkerError::Install { ref version, .. } if version == "A"));
        assert!(storage.keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_reinstall_keeps_existing_cache() {
        let storage = MemoryStorage::new();
        let network = network();
        let ctl = controller("A", &storage, &network);
        ctl.install().await.unwrap();

        network.set_route(
            ASSETS[0],
            precache_net::Route::Fail(NetworkError::Connection("down".to_string())),
        );
        ctl.install().await.unwrap_err();

        assert_eq!(storage.summary().await, vec![("app-A".to_string(), 3)]);
    }

    #[tokio::test]
    async fn test_activate_keeps_only_current() {
        let storage = MemoryStorage::new();
        storage.open("app-old").await.unwrap();
        storage.open("unrelated").await.unwrap();
        let network = network();
        let ctl = controller("A", &storage, &network);
        ctl.install().await.unwrap();

        let report = ctl.activate().await.unwrap();
        assert_eq!(report.deleted, vec!["app-old", "unrelated"]);
        assert!(report.failed.is_empty());
        assert_eq!(storage.keys().await.unwrap(), vec!["app-A"]);

        let again = ctl.activate().await.unwrap();
        assert_eq!(again, ActivationReport::default());
        assert_eq!(storage.keys().await.unwrap(), vec!["app-A"]);
    }

    #[tokio::test]
    async fn test_fetch_hit_skips_network() {
        let storage = MemoryStorage::new();
        let network = network();
        let ctl = controller("A", &storage, &network);
        ctl.install().await.unwrap();
        network.reset_calls();

        let req = AssetRequest::parse_get(ASSETS[2]).unwrap();
        let outcome = ctl.fetch(&req).await.unwrap();

        assert_eq!(outcome.source, ResponseSource::Cache("app-A".to_string()));
        assert_eq!(outcome.response.body, ASSETS[2].as_bytes());
        assert_eq!(network.call_count(), 0);
    }

    #[tokio::test]
    async fn test_fetch_miss_does_not_populate() {
        let storage = MemoryStorage::new();
        let network = network();
        let ctl = controller("A", &storage, &network);
        ctl.install().await.unwrap();

        let url = "https://example.com/api/state";
        network.set_route(url, precache_net::Route::Respond(StoredResponse::new(503)));
        let req = AssetRequest::parse_get(url).unwrap();

        let first = ctl.fetch(&req).await.unwrap();
        assert_eq!(first.source, ResponseSource::Network);
        assert_eq!(first.response.status, 503);

        let second = ctl.fetch(&req).await.unwrap();
        assert!(!second.is_from_cache());
        assert_eq!(network.calls_for(url), 2);
    }

    #[test]
    fn test_handler_table_registers_all_signals() {
        let table = CacheController::<MemoryStorage, Arc<StaticNetwork>>::handler_table();
        for signal in Signal::ALL {
            assert!(table.get(signal).is_some());
        }
    }

    #[tokio::test]
    async fn test_handler_rejects_wrong_event() {
        let storage = MemoryStorage::new();
        let network = network();
        let ctl = controller("A", &storage, &network);

        let err = handle_install(&ctl, Event::Activate).await.unwrap_err();
        assert!(matches!(
            err,
            WorkerError::EventMismatch {
                handler: Signal::Install,
                event: Signal::Activate
            }
        ));
    }
}
