//! Request and response values flowing through the cache.

use http::Method;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::CoreError;

/// HTTP header list, kept in wire order.
pub type HeaderList = Vec<(String, String)>;

/// An outgoing resource request made by a controlled client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetRequest {
    method: Method,
    url: Url,
    headers: HeaderList,
    body: Option<Vec<u8>>,
}

impl AssetRequest {
    /// Create a request with an explicit method.
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: Vec::new(),
            body: None,
        }
    }

    /// Create a GET request.
    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    /// Parse an absolute URL into a GET request.
    pub fn parse_get(url: &str) -> Result<Self, CoreError> {
        let url = Url::parse(url).map_err(|e| CoreError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self::get(url))
    }

    /// Add a request header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Attach a request body.
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn body(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }

    /// Only GET requests are stored in or served from a cache.
    pub fn is_cacheable(&self) -> bool {
        self.method == Method::GET
    }

    /// The key this request is stored under.
    pub fn key(&self) -> RequestKey {
        let mut url = self.url.clone();
        url.set_fragment(None);
        RequestKey {
            method: self.method.as_str().to_string(),
            url: url.into(),
        }
    }
}

/// Cache key: method plus URL without fragment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RequestKey {
    pub method: String,
    pub url: String,
}

impl std::fmt::Display for RequestKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}

/// A response as stored in a cache or returned from the network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response headers.
    #[serde(default)]
    pub headers: HeaderList,
    /// Response body.
    #[serde(with = "body_base64")]
    pub body: Vec<u8>,
    /// Final URL after redirects, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl StoredResponse {
    /// Create an empty response with a status code.
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: Vec::new(),
            url: None,
        }
    }

    /// Add a header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Set the body.
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Set the final URL.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Whether the status is in the 2xx range.
    pub fn is_ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// First header value matching `name`, case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

mod body_base64 {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(body: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(body))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_strips_fragment() {
        let req = AssetRequest::parse_get("https://example.com/app.css#top").unwrap();
        let key = req.key();
        assert_eq!(key.method, "GET");
        assert_eq!(key.url, "https://example.com/app.css");
        assert_eq!(key.to_string(), "GET https://example.com/app.css");
    }

    #[test]
    fn test_key_keeps_query() {
        let a = AssetRequest::parse_get("https://example.com/app.js?v=1").unwrap();
        let b = AssetRequest::parse_get("https://example.com/app.js?v=2").unwrap();
        assert_ne!(a.key(), b.key());
    }

    #[test]
    fn test_only_get_is_cacheable() {
        let url = Url::parse("https://example.com/api").unwrap();
        assert!(AssetRequest::get(url.clone()).is_cacheable());
        assert!(!AssetRequest::new(Method::POST, url.clone()).is_cacheable());
        assert!(!AssetRequest::new(Method::HEAD, url).is_cacheable());
    }

    #[test]
    fn test_parse_get_rejects_relative() {
        assert!(matches!(
            AssetRequest::parse_get("/app.css"),
            Err(CoreError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn test_response_is_ok() {
        assert!(StoredResponse::new(200).is_ok());
        assert!(StoredResponse::new(204).is_ok());
        assert!(!StoredResponse::new(304).is_ok());
        assert!(!StoredResponse::new(404).is_ok());
        assert!(!StoredResponse::new(500).is_ok());
    }

    #[test]
    fn test_response_header_lookup() {
        let resp = StoredResponse::new(200).with_header("Content-Type", "text/css");
        assert_eq!(resp.header("content-type"), Some("text/css"));
        assert_eq!(resp.header("etag"), None);
    }

    #[test]
    fn test_response_body_serializes_as_base64() {
        let resp = StoredResponse::new(200).with_body(b"hello".to_vec());
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["body"], "aGVsbG8=");

        let back: StoredResponse = serde_json::from_value(json).unwrap();
        assert_eq!(back.body, b"hello");
    }
}
