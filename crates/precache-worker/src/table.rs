//! Signal registration and dispatch.

use std::collections::HashMap;

use futures::future::BoxFuture;
use precache_core::{AssetRequest, Signal, VersionId};
use precache_net::Network;
use precache_store::CacheStorage;

use crate::controller::{ActivationReport, CacheController, FetchOutcome, InstallOutcome};
use crate::error::WorkerError;

/// A lifecycle signal delivered to a worker.
#[derive(Debug, Clone)]
pub enum Event {
    Install,
    Activate,
    Fetch(AssetRequest),
}

impl Event {
    pub fn signal(&self) -> Signal {
        match self {
            Self::Install => Signal::Install,
            Self::Activate => Signal::Activate,
            Self::Fetch(_) => Signal::Fetch,
        }
    }
}

/// What a handler produced.
#[derive(Debug, Clone)]
pub enum Effect {
    Installed(InstallOutcome),
    Activated(ActivationReport),
    Responded(FetchOutcome),
}

/// A handler: a function of the controller and one event.
pub type Handler<C> = for<'a> fn(&'a C, Event) -> BoxFuture<'a, Result<Effect, WorkerError>>;

/// Table mapping each signal to its handler, built once at startup.
pub struct HandlerTable<C> {
    handlers: HashMap<Signal, Handler<C>>,
}

impl<C> HandlerTable<C> {
    /// Create an empty table.
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register the handler for a signal, replacing any previous one.
    pub fn on(mut self, signal: Signal, handler: Handler<C>) -> Self {
        self.handlers.insert(signal, handler);
        self
    }

    /// Handler registered for a signal.
    pub fn get(&self, signal: Signal) -> Option<Handler<C>> {
        self.handlers.get(&signal).copied()
    }

    /// Registered signals, in declaration order.
    pub fn signals(&self) -> Vec<Signal> {
        Signal::ALL
            .into_iter()
            .filter(|s| self.handlers.contains_key(s))
            .collect()
    }
}

impl<C> Default for HandlerTable<C> {
    fn default() -> Self {
        Self::new()
    }
}

/// A controller version with its registered handlers.
pub struct Worker<S, N> {
    controller: CacheController<S, N>,
    handlers: HandlerTable<CacheController<S, N>>,
}

impl<S: CacheStorage, N: Network> Worker<S, N> {
    /// Wrap a controller and register its handlers.
    pub fn new(controller: CacheController<S, N>) -> Self {
        Self {
            controller,
            handlers: CacheController::handler_table(),
        }
    }

    pub fn controller(&self) -> &CacheController<S, N> {
        &self.controller
    }

    pub fn version(&self) -> &VersionId {
        self.controller.version()
    }

    /// Route an event to its registered handler.
    pub async fn dispatch(&self, event: Event) -> Result<Effect, WorkerError> {
        let signal = event.signal();
        let handler = self
            .handlers
            .get(signal)
            .ok_or(WorkerError::Unhandled(signal))?;
        handler(&self.controller, event).await
    }

    /// Dispatch an install signal.
    pub async fn install(&self) -> Result<InstallOutcome, WorkerError> {
        match self.dispatch(Event::Install).await? {
            Effect::Installed(outcome) => Ok(outcome),
            other => Err(unexpected(Signal::Install, &other)),
        }
    }

    /// Dispatch an activate signal.
    pub async fn activate(&self) -> Result<ActivationReport, WorkerError> {
        match self.dispatch(Event::Activate).await? {
            Effect::Activated(report) => Ok(report),
            other => Err(unexpected(Signal::Activate, &other)),
        }
    }

    /// Dispatch a fetch signal.
    pub async fn fetch(&self, request: AssetRequest) -> Result<FetchOutcome, WorkerError> {
        match self.dispatch(Event::Fetch(request)).await? {
            Effect::Responded(outcome) => Ok(outcome),
            other => Err(unexpected(Signal::Fetch, &other)),
        }
    }
}

fn unexpected(handler: Signal, effect: &Effect) -> WorkerError {
    let event = match effect {
        Effect::Installed(_) => Signal::Install,
        Effect::Activated(_) => Signal::Activate,
        Effect::Responded(_) => Signal::Fetch,
    };
    WorkerError::EventMismatch { handler, event }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;

    struct Counter;

    fn answer(_: &Counter, _: Event) -> BoxFuture<'_, Result<Effect, WorkerError>> {
        async { Err(WorkerError::Unhandled(Signal::Fetch)) }.boxed()
    }

    #[test]
    fn test_event_signal() {
        assert_eq!(Event::Install.signal(), Signal::Install);
        assert_eq!(Event::Activate.signal(), Signal::Activate);
        let req = AssetRequest::parse_get("https://example.com/").unwrap();
        assert_eq!(Event::Fetch(req).signal(), Signal::Fetch);
    }

    #[test]
    fn test_table_registration() {
        let table = HandlerTable::<Counter>::new().on(Signal::Fetch, answer);
        assert_eq!(table.signals(), vec![Signal::Fetch]);
        assert!(table.get(Signal::Install).is_none());
        assert!(table.get(Signal::Fetch).is_some());
    }

    #[tokio::test]
    async fn test_registered_handler_runs() {
        let table = HandlerTable::<Counter>::new().on(Signal::Fetch, answer);
        let handler = table.get(Signal::Fetch).unwrap();
        let err = handler(&Counter, Event::Activate).await.unwrap_err();
        assert!(matches!(err, WorkerError::Unhandled(Signal::Fetch)));
    }
}
