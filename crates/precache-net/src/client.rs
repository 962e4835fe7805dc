//! The network capability and its HTTP implementation.

use std::sync::Arc;

use async_trait::async_trait;
use precache_core::{AssetRequest, NetworkSettings, StoredResponse};
use tracing::debug;

use crate::error::NetworkError;

/// Outbound fetch capability.
#[async_trait]
pub trait Network: Send + Sync {
    /// Send a request as-is and return whatever the network produced.
    async fn fetch(&self, request: &AssetRequest) -> Result<StoredResponse, NetworkError>;
}

#[async_trait]
impl<N: Network + ?Sized> Network for Arc<N> {
    async fn fetch(&self, request: &AssetRequest) -> Result<StoredResponse, NetworkError> {
        (**self).fetch(request).await
    }
}

/// HTTP client backed by reqwest.
#[derive(Debug, Clone)]
pub struct HttpNetwork {
    client: reqwest::Client,
}

impl HttpNetwork {
    /// Create a client from network settings.
    pub fn new(settings: &NetworkSettings) -> Result<Self, NetworkError> {
        let client = reqwest::Client::builder()
            .timeout(settings.timeout())
            .user_agent(settings.user_agent.as_str())
            .build()
            .map_err(|e| NetworkError::Request(e.to_string()))?;
        Ok(Self { client })
    }

    /// Wrap an existing reqwest client.
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Network for HttpNetwork {
    async fn fetch(&self, request: &AssetRequest) -> Result<StoredResponse, NetworkError> {
        let mut builder = self
            .client
            .request(request.method().clone(), request.url().clone());

        for (name, value) in request.headers() {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body() {
            builder = builder.body(body.to_vec());
        }

        let resp = builder.send().await.map_err(classify)?;

        let status = resp.status().as_u16();
        let url = resp.url().to_string();
        let headers = resp
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let body = resp.bytes().await.map_err(classify)?.to_vec();

        debug!(url = %request.url(), status, bytes = body.len(), "network response");

        Ok(StoredResponse {
            status,
            headers,
            body,
            url: Some(url),
        })
    }
}

fn classify(err: reqwest::Error) -> NetworkError {
    if err.is_timeout() {
        NetworkError::Timeout(err.to_string())
    } else if err.is_connect() {
        NetworkError::Connection(err.to_string())
    } else {
        NetworkError::Request(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_network_from_settings() {
        let settings = NetworkSettings::default();
        assert!(HttpNetwork::new(&settings).is_ok());
    }

    #[tokio::test]
    async fn test_connection_refused_is_an_error() {
        let settings = NetworkSettings {
            timeout_ms: 2_000,
            ..NetworkSettings::default()
        };
        let network = HttpNetwork::new(&settings).unwrap();

        // Port 9 (discard) is not expected to accept HTTP on loopback.
        let request = AssetRequest::parse_get("http://127.0.0.1:9/app.js").unwrap();
        assert!(network.fetch(&request).await.is_err());
    }
}
