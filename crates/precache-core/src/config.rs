//! File and environment configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::ConfigError;
use crate::manifest::AssetManifest;
use crate::version::{CacheName, VersionId, DEFAULT_CACHE_PREFIX};

/// Environment variable overriding the configured version identifier.
pub const VERSION_ENV: &str = "PRECACHE_VERSION";

/// Config file names searched for, in order.
pub const CONFIG_FILE_NAMES: [&str; 3] = ["precache.toml", ".precache.toml", "precache.json"];

/// Contents of a `precache.toml` / `precache.json` file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Version identifier of the asset set, usually a content hash.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Prefix prepended to the version to form the cache name.
    #[serde(default = "default_prefix")]
    pub cache_prefix: String,

    /// Origin relative asset paths resolve against.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<Url>,

    /// Asset manifest entries.
    #[serde(default)]
    pub assets: Vec<String>,

    #[serde(default)]
    pub storage: StorageSettings,

    #[serde(default)]
    pub network: NetworkSettings,

    #[serde(default)]
    pub lifecycle: LifecycleSettings,
}

fn default_prefix() -> String {
    DEFAULT_CACHE_PREFIX.to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: None,
            cache_prefix: default_prefix(),
            origin: None,
            assets: Vec::new(),
            storage: StorageSettings::default(),
            network: NetworkSettings::default(),
            lifecycle: LifecycleSettings::default(),
        }
    }
}

impl Settings {
    /// Load settings from a file. `.json` files are parsed as JSON, anything
    /// else as TOML.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let display = path.display().to_string();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: display.clone(),
            source,
        })?;

        if path.extension().is_some_and(|e| e == "json") {
            serde_json::from_str(&content).map_err(|source| ConfigError::Json {
                path: display,
                source,
            })
        } else {
            toml::from_str(&content).map_err(|source| ConfigError::Toml {
                path: display,
                source,
            })
        }
    }

    /// Find a config file in `start` or any parent directory.
    pub fn find(start: &Path) -> Option<PathBuf> {
        let mut current = start.to_path_buf();
        loop {
            for name in CONFIG_FILE_NAMES {
                let candidate = current.join(name);
                if candidate.is_file() {
                    return Some(candidate);
                }
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(self) -> Self {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable source.
    pub fn apply_env_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(version) = lookup(VERSION_ENV).filter(|v| !v.trim().is_empty()) {
            self.version = Some(version);
        }
        self
    }

    /// Build the immutable controller configuration.
    pub fn controller_config(&self) -> Result<ControllerConfig, ConfigError> {
        let version = self.version.clone().ok_or(ConfigError::Missing("version"))?;
        let version = VersionId::new(version)?;
        let manifest = AssetManifest::resolve(self.origin.as_ref(), &self.assets)?;

        Ok(ControllerConfig::new(version, manifest)
            .with_cache_prefix(&self.cache_prefix)
            .with_skip_waiting(self.lifecycle.skip_waiting))
    }
}

/// Persistent storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSettings {
    /// File holding all named caches.
    #[serde(default = "default_storage_path")]
    pub path: PathBuf,
}

fn default_storage_path() -> PathBuf {
    PathBuf::from(".precache").join("caches.json")
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            path: default_storage_path(),
        }
    }
}

/// Outbound network settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkSettings {
    /// Per-request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// User agent sent with requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_user_agent() -> String {
    concat!("precache/", env!("CARGO_PKG_VERSION")).to_string()
}

impl NetworkSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            user_agent: default_user_agent(),
        }
    }
}

/// Lifecycle settings applied by the host.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleSettings {
    /// Promote a freshly installed version without waiting for clients to close.
    #[serde(default = "default_true")]
    pub skip_waiting: bool,

    /// Seconds an install may take before it is discarded.
    #[serde(default = "default_lifecycle_timeout")]
    pub install_timeout_secs: u64,

    /// Seconds an activation may take before it is discarded.
    #[serde(default = "default_lifecycle_timeout")]
    pub activate_timeout_secs: u64,
}

fn default_true() -> bool {
    true
}

fn default_lifecycle_timeout() -> u64 {
    30
}

impl LifecycleSettings {
    pub fn install_timeout(&self) -> Duration {
        Duration::from_secs(self.install_timeout_secs)
    }

    pub fn activate_timeout(&self) -> Duration {
        Duration::from_secs(self.activate_timeout_secs)
    }
}

impl Default for LifecycleSettings {
    fn default() -> Self {
        Self {
            skip_waiting: true,
            install_timeout_secs: default_lifecycle_timeout(),
            activate_timeout_secs: default_lifecycle_timeout(),
        }
    }
}

/// Immutable configuration injected into a controller at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerConfig {
    version: VersionId,
    cache_name: CacheName,
    manifest: AssetManifest,
    skip_waiting: bool,
}

impl ControllerConfig {
    /// Create a configuration with the default cache prefix and skip-waiting enabled.
    pub fn new(version: VersionId, manifest: AssetManifest) -> Self {
        Self {
            cache_name: CacheName::for_version(&version),
            version,
            manifest,
            skip_waiting: true,
        }
    }

    /// Use a custom cache prefix.
    pub fn with_cache_prefix(mut self, prefix: &str) -> Self {
        self.cache_name = CacheName::with_prefix(prefix, &self.version);
        self
    }

    /// Set whether install requests immediate promotion.
    pub fn with_skip_waiting(mut self, skip_waiting: bool) -> Self {
        self.skip_waiting = skip_waiting;
        self
    }

    pub fn version(&self) -> &VersionId {
        &self.version
    }

    pub fn cache_name(&self) -> &CacheName {
        &self.cache_name
    }

    pub fn manifest(&self) -> &AssetManifest {
        &self.manifest
    }

    pub fn skip_waiting(&self) -> bool {
        self.skip_waiting
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
version = "5e5b9e78a09a765c948b1c51c506bead285e7dac"
origin = "https://richardwooding.github.io"
assets = [
    "/gameoflife",
    "/gameoflife/app.css",
    "https://storage.googleapis.com/murlok-github/icon-192.png",
]

[lifecycle]
install_timeout_secs = 10
"#;

    #[test]
    fn test_parse_toml_with_defaults() {
        let settings: Settings = toml::from_str(SAMPLE).unwrap();

        assert_eq!(settings.cache_prefix, "app-");
        assert_eq!(settings.assets.len(), 3);
        assert!(settings.lifecycle.skip_waiting);
        assert_eq!(settings.lifecycle.install_timeout(), Duration::from_secs(10));
        assert_eq!(settings.lifecycle.activate_timeout(), Duration::from_secs(30));
        assert_eq!(settings.network.timeout(), Duration::from_millis(20_000));
    }

    #[test]
    fn test_controller_config_from_settings() {
        let settings: Settings = toml::from_str(SAMPLE).unwrap();
        let config = settings.controller_config().unwrap();

        assert_eq!(
            config.cache_name().as_str(),
            "app-5e5b9e78a09a765c948b1c51c506bead285e7dac"
        );
        assert_eq!(config.manifest().len(), 3);
        assert!(config.skip_waiting());
    }

    #[test]
    fn test_missing_version() {
        let settings = Settings::default();
        assert!(matches!(
            settings.controller_config(),
            Err(ConfigError::Missing("version"))
        ));
    }

    #[test]
    fn test_env_overrides_version() {
        let settings: Settings = toml::from_str(SAMPLE).unwrap();
        let settings = settings.apply_env_from(|key| {
            (key == VERSION_ENV).then(|| "deadbeef".to_string())
        });
        assert_eq!(settings.version.as_deref(), Some("deadbeef"));

        let config = settings.controller_config().unwrap();
        assert_eq!(config.cache_name().as_str(), "app-deadbeef");
    }

    #[test]
    fn test_blank_env_is_ignored() {
        let settings: Settings = toml::from_str(SAMPLE).unwrap();
        let settings = settings.apply_env_from(|_| Some("  ".to_string()));
        assert_eq!(
            settings.version.as_deref(),
            Some("5e5b9e78a09a765c948b1c51c506bead285e7dac")
        );
    }

    #[test]
    fn test_custom_prefix() {
        let mut settings: Settings = toml::from_str(SAMPLE).unwrap();
        settings.cache_prefix = "gameoflife-".to_string();
        settings.version = Some("A".to_string());

        let config = settings.controller_config().unwrap();
        assert_eq!(config.cache_name().as_str(), "gameoflife-A");
    }

    #[test]
    fn test_load_and_find_json() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();

        let path = dir.path().join("precache.json");
        std::fs::write(
            &path,
            r#"{"version": "A", "assets": ["https://example.com/app.js"]}"#,
        )
        .unwrap();

        let found = Settings::find(&nested).unwrap();
        assert_eq!(found, path);

        let settings = Settings::load(&found).unwrap();
        assert_eq!(settings.version.as_deref(), Some("A"));
        assert_eq!(settings.storage.path, PathBuf::from(".precache/caches.json"));
    }

    #[test]
    fn test_load_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("precache.toml");
        std::fs::write(&path, "assets = 3").unwrap();

        assert!(matches!(Settings::load(&path), Err(ConfigError::Toml { .. })));
    }
}
