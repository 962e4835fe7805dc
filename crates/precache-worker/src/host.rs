//! Host-side version lifecycle.
//!
//! Drives controller versions through install, waiting, activation and
//! retirement. Install and activate are awaited until they settle, bounded by
//! a timeout; an elapsed timeout counts as failure.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use precache_core::{AssetRequest, LifecycleSettings, Signal, VersionId, WorkerState};
use precache_net::Network;
use precache_store::CacheStorage;
use tracing::{info, warn};

use crate::controller::{ActivationReport, FetchOutcome, InstallOutcome, ResponseSource};
use crate::error::WorkerError;
use crate::table::Worker;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Registration of controller versions for one origin.
pub struct Registration<S, N> {
    active: Option<Arc<Worker<S, N>>>,
    waiting: Option<(Arc<Worker<S, N>>, bool)>,
    history: Vec<(VersionId, WorkerState)>,
    open_clients: usize,
    install_timeout: Duration,
    activate_timeout: Duration,
    network: Arc<dyn Network>,
}

impl<S: CacheStorage, N: Network> Registration<S, N> {
    /// Create an empty registration. `network` serves uncontrolled requests.
    pub fn new(network: Arc<dyn Network>) -> Self {
        Self {
            active: None,
            waiting: None,
            history: Vec::new(),
            open_clients: 0,
            install_timeout: DEFAULT_TIMEOUT,
            activate_timeout: DEFAULT_TIMEOUT,
            network,
        }
    }

    /// Apply timeouts from lifecycle settings.
    pub fn with_settings(self, settings: &LifecycleSettings) -> Self {
        self.with_install_timeout(settings.install_timeout())
            .with_activate_timeout(settings.activate_timeout())
    }

    pub fn with_install_timeout(mut self, timeout: Duration) -> Self {
        self.install_timeout = timeout;
        self
    }

    pub fn with_activate_timeout(mut self, timeout: Duration) -> Self {
        self.activate_timeout = timeout;
        self
    }

    /// Set the number of open clients controlled by the active version.
    ///
    /// A waiting version that did not request skip-waiting activates only
    /// once this drops to zero.
    pub fn set_open_clients(&mut self, count: usize) {
        self.open_clients = count;
    }

    /// Version in control of clients.
    pub fn active_version(&self) -> Option<&VersionId> {
        self.active.as_ref().map(|w| w.version())
    }

    /// Installed version waiting for activation.
    pub fn waiting_version(&self) -> Option<&VersionId> {
        self.waiting.as_ref().map(|(w, _)| w.version())
    }

    /// Latest recorded state of a version.
    pub fn state_of(&self, version: &VersionId) -> Option<WorkerState> {
        self.history
            .iter()
            .rev()
            .find(|(v, _)| v == version)
            .map(|(_, s)| *s)
    }

    /// Every state transition, oldest first.
    pub fn history(&self) -> &[(VersionId, WorkerState)] {
        &self.history
    }

    /// Install a new version and activate it if it is eligible.
    pub async fn register(&mut self, worker: Worker<S, N>) -> Result<WorkerState, WorkerError> {
        let version = worker.version().clone();
        self.install(worker).await?;
        self.try_activate().await?;
        Ok(self.state_of(&version).unwrap_or(WorkerState::Installed))
    }

    /// Run the install handler. On success the version becomes the waiting
    /// version; on failure or timeout it is discarded and nothing else changes.
    ///
    /// Only a cache created by this attempt is removed. A cache that already
    /// existed keeps its previous, complete contents.
    pub async fn install(&mut self, worker: Worker<S, N>) -> Result<InstallOutcome, WorkerError> {
        let version = worker.version().clone();
        let cache_name = worker.controller().cache_name().clone();
        let existed = worker.controller().storage().has(cache_name.as_str()).await?;
        self.record(&version, WorkerState::Installing);

        let result = settle(Signal::Install, self.install_timeout, worker.install()).await;
        let outcome = match result {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(%version, error = %e, "install failed, discarding version");
                if !existed {
                    self.discard(&worker).await;
                }
                let superseded = self
                    .waiting
                    .as_ref()
                    .is_some_and(|(waiting, _)| waiting.controller().cache_name() == &cache_name);
                if superseded {
                    self.waiting = None;
                }
                self.record(&version, WorkerState::Redundant);
                return Err(e);
            }
        };

        self.record(&version, WorkerState::Installed);
        if let Some((previous, _)) = self.waiting.take() {
            let previous = previous.version().clone();
            if previous != version {
                self.record(&previous, WorkerState::Redundant);
            }
        }
        self.waiting = Some((Arc::new(worker), outcome.skip_waiting));
        Ok(outcome)
    }

    /// Activate the waiting version if it asked to skip waiting, if nothing
    /// is active, or if no clients are open. Returns the activation report
    /// when an activation ran.
    pub async fn try_activate(&mut self) -> Result<Option<ActivationReport>, WorkerError> {
        let eligible = match &self.waiting {
            Some((_, skip_waiting)) => {
                *skip_waiting || self.active.is_none() || self.open_clients == 0
            }
            None => false,
        };
        if !eligible {
            return Ok(None);
        }
        self.activate_waiting().await.map(Some)
    }

    /// All clients closed; promote a waiting version.
    pub async fn release_clients(&mut self) -> Result<Option<ActivationReport>, WorkerError> {
        self.open_clients = 0;
        self.try_activate().await
    }

    async fn activate_waiting(&mut self) -> Result<ActivationReport, WorkerError> {
        let Some((worker, _)) = self.waiting.take() else {
            return Ok(ActivationReport::default());
        };
        let version = worker.version().clone();
        let cache_name = worker.controller().cache_name();

        if !worker.controller().storage().has(cache_name.as_str()).await? {
            warn!(%version, cache = %cache_name, "waiting version lost its cache");
            self.record(&version, WorkerState::Redundant);
            return Err(WorkerError::MissingCache(cache_name.to_string()));
        }

        // The new version controls clients from here on, even if cleanup fails.
        self.record(&version, WorkerState::Activating);
        if let Some(previous) = self.active.replace(Arc::clone(&worker)) {
            let previous = previous.version().clone();
            self.record(&previous, WorkerState::Redundant);
        }

        let result = settle(Signal::Activate, self.activate_timeout, worker.activate()).await;
        self.record(&version, WorkerState::Activated);

        match result {
            Ok(report) => {
                info!(%version, "version in control");
                Ok(report)
            }
            Err(e) => {
                warn!(%version, error = %e, "activation cleanup did not complete");
                Err(e)
            }
        }
    }

    /// Route a client request to the active version, or straight to the
    /// network when no version is in control.
    pub async fn fetch(&self, request: AssetRequest) -> Result<FetchOutcome, WorkerError> {
        match &self.active {
            Some(worker) => worker.fetch(request).await,
            None => {
                let response = self.network.fetch(&request).await?;
                Ok(FetchOutcome {
                    response,
                    source: ResponseSource::Network,
                })
            }
        }
    }

    async fn discard(&self, worker: &Worker<S, N>) {
        let in_use = self
            .active
            .as_ref()
            .is_some_and(|active| active.controller().cache_name() == worker.controller().cache_name());
        if in_use {
            return;
        }
        if let Err(e) = worker.controller().discard().await {
            warn!(version = %worker.version(), error = %e, "failed to discard cache");
        }
    }

    fn record(&mut self, version: &VersionId, state: WorkerState) {
        self.history.push((version.clone(), state));
    }
}

async fn settle<T>(
    signal: Signal,
    after: Duration,
    work: impl Future<Output = Result<T, WorkerError>>,
) -> Result<T, WorkerError> {
    match tokio::time::timeout(after, work).await {
        Ok(result) => result,
        Err(_) => Err(WorkerError::Timeout { signal, after }),
    }
}
