//! Version identity of a deployed asset set.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Prefix used for cache names unless configured otherwise.
pub const DEFAULT_CACHE_PREFIX: &str = "app-";

/// Opaque identifier of one deployed asset set, usually a content hash.
///
/// Only equality is meaningful; the contents are never inspected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VersionId(String);

impl VersionId {
    /// Create a version identifier. Blank identifiers are rejected.
    pub fn new(id: impl Into<String>) -> Result<Self, CoreError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(CoreError::EmptyVersion);
        }
        Ok(Self(id))
    }

    /// Get the identifier string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for VersionId {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<VersionId> for String {
    fn from(value: VersionId) -> Self {
        value.0
    }
}

impl std::fmt::Display for VersionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Name of the cache holding one version's assets.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheName(String);

impl CacheName {
    /// Derive the cache name for a version with the default prefix.
    pub fn for_version(version: &VersionId) -> Self {
        Self::with_prefix(DEFAULT_CACHE_PREFIX, version)
    }

    /// Derive the cache name for a version with a custom prefix.
    ///
    /// The prefix is fixed for a deployment, so `prefix + version` is
    /// injective over versions.
    pub fn with_prefix(prefix: &str, version: &VersionId) -> Self {
        Self(format!("{}{}", prefix, version.as_str()))
    }

    /// Get the cache name string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for CacheName {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for CacheName {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl std::fmt::Display for CacheName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
