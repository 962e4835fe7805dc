//! Table-driven network (for tests and local simulation).

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use precache_core::{AssetRequest, RequestKey, StoredResponse};

use crate::client::Network;
use crate::error::NetworkError;

/// How a routed URL behaves.
#[derive(Debug, Clone)]
pub enum Route {
    /// Answer with a response.
    Respond(StoredResponse),
    /// Fail with a network error.
    Fail(NetworkError),
    /// Never settle.
    Hang,
}

/// Network that answers from a fixed table keyed by URL.
///
/// Unrouted URLs fail with a connection error. Every call is recorded.
#[derive(Debug, Default)]
pub struct StaticNetwork {
    routes: Mutex<HashMap<String, Route>>,
    calls: Mutex<Vec<RequestKey>>,
}

impl StaticNetwork {
    /// Create an empty network.
    pub fn new() -> Self {
        Self::default()
    }

    /// Route `url` to a response.
    pub fn with_response(self, url: &str, response: StoredResponse) -> Self {
        self.set_route(url, Route::Respond(response));
        self
    }

    /// Route `url` to a 200 response with `body`.
    pub fn with_body(self, url: &str, body: &str) -> Self {
        self.with_response(url, StoredResponse::new(200).with_body(body.as_bytes()))
    }

    /// Route `url` to a connection failure.
    pub fn with_failure(self, url: &str) -> Self {
        self.set_route(
            url,
            Route::Fail(NetworkError::Connection(format!("unreachable: {}", url))),
        );
        self
    }

    /// Route `url` to a request that never settles.
    pub fn with_hang(self, url: &str) -> Self {
        self.set_route(url, Route::Hang);
        self
    }

    /// Replace the route for `url`.
    pub fn set_route(&self, url: &str, route: Route) {
        lock(&self.routes).insert(url.to_string(), route);
    }

    /// All requests seen so far.
    pub fn calls(&self) -> Vec<RequestKey> {
        lock(&self.calls).clone()
    }

    /// Number of requests seen so far.
    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }

    /// Number of requests seen for `url`.
    pub fn calls_for(&self, url: &str) -> usize {
        lock(&self.calls).iter().filter(|k| k.url == url).count()
    }

    /// Forget recorded calls.
    pub fn reset_calls(&self) {
        lock(&self.calls).clear();
    }
}

#[async_trait]
impl Network for StaticNetwork {
    async fn fetch(&self, request: &AssetRequest) -> Result<StoredResponse, NetworkError> {
        let key = request.key();
        lock(&self.calls).push(key.clone());

        let route = lock(&self.routes).get(&key.url).cloned();
        match route {
            Some(Route::Respond(resp)) => Ok(resp.with_url(key.url)),
            Some(Route::Fail(err)) => Err(err),
            Some(Route::Hang) => futures::future::pending().await,
            None => Err(NetworkError::Connection(format!("no route to {}", key.url))),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
