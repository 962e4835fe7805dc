//! CLI execution context.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context as _, Result};
use precache_core::{ControllerConfig, Settings};
use precache_net::HttpNetwork;
use precache_store::FsStorage;
use precache_worker::{CacheController, Worker};

use crate::output::Output;

/// Worker type every command runs.
pub type CliWorker = Worker<FsStorage, Arc<HttpNetwork>>;

/// Execution context for CLI commands.
pub struct Context {
    /// Loaded settings, with environment and flag overrides applied.
    pub settings: Settings,
    /// Output handler.
    pub output: Output,
    /// Config file the settings came from, if any.
    pub config_file: Option<PathBuf>,
    /// Directory relative paths in the settings resolve against.
    pub base_dir: PathBuf,
}

impl Context {
    /// Load context from a config file.
    ///
    /// Without an explicit path the working directory and its parents are
    /// searched. A version passed on the command line wins over both the file
    /// and the environment.
    pub fn load(config_path: Option<&str>, version: Option<String>, output: Output) -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to get current directory")?;

        let config_file = match config_path {
            Some(path) => Some(resolve(&cwd, Path::new(path))),
            None => Settings::find(&cwd),
        };

        let settings = match &config_file {
            Some(path) => Settings::load(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?,
            None => Settings::default(),
        };

        let mut settings = settings.apply_env();
        if let Some(version) = version {
            settings.version = Some(version);
        }

        let base_dir = config_file
            .as_deref()
            .and_then(Path::parent)
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or(cwd);

        if let Some(path) = &config_file {
            output.debug(&format!("Using config {}", path.display()));
        }

        Ok(Self {
            settings,
            output,
            config_file,
            base_dir,
        })
    }

    /// Immutable controller configuration for the configured version.
    pub fn controller_config(&self) -> Result<ControllerConfig> {
        self.settings
            .controller_config()
            .context("Invalid precache configuration")
    }

    /// Path of the storage file.
    pub fn storage_path(&self) -> PathBuf {
        resolve(&self.base_dir, &self.settings.storage.path)
    }

    /// Open the persistent cache storage.
    pub async fn storage(&self) -> Result<FsStorage> {
        let path = self.storage_path();
        self.output.debug(&format!("Opening storage {}", path.display()));
        FsStorage::load(&path)
            .await
            .with_context(|| format!("Failed to open storage at {}", path.display()))
    }

    /// Build the outbound HTTP client.
    pub fn network(&self) -> Result<Arc<HttpNetwork>> {
        let network = HttpNetwork::new(&self.settings.network).context("Failed to build HTTP client")?;
        Ok(Arc::new(network))
    }

    /// Build a worker for the configured version.
    pub async fn worker(&self, network: Arc<HttpNetwork>) -> Result<CliWorker> {
        let config = self.controller_config()?;
        let storage = self.storage().await?;
        Ok(Worker::new(CacheController::new(config, storage, network)))
    }
}

/// Resolve a path relative to `base` unless it is already absolute.
fn resolve(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_keeps_absolute_paths() {
        let base = Path::new("/srv/app");
        assert_eq!(resolve(base, Path::new("/tmp/c.json")), PathBuf::from("/tmp/c.json"));
        assert_eq!(
            resolve(base, Path::new(".precache/caches.json")),
            PathBuf::from("/srv/app/.precache/caches.json")
        );
    }

    #[test]
    fn test_load_explicit_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("precache.toml");
        std::fs::write(
            &path,
            r#"
version = "abc123"
origin = "https://example.com/app/"
assets = ["", "app.css"]

[storage]
path = "store/caches.json"
"#,
        )
        .unwrap();

        let ctx = Context::load(path.to_str(), None, Output::new(false, true)).unwrap();
        assert_eq!(ctx.base_dir, dir.path());
        assert_eq!(ctx.storage_path(), dir.path().join("store/caches.json"));

        let config = ctx.controller_config().unwrap();
        assert_eq!(config.cache_name().as_str(), "app-abc123");
        assert_eq!(config.manifest().len(), 2);
    }

    #[test]
    fn test_version_flag_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("precache.toml");
        std::fs::write(&path, "version = \"old\"\nassets = [\"https://example.com/\"]\n").unwrap();

        let ctx = Context::load(path.to_str(), Some("new".to_string()), Output::new(false, true))
            .unwrap();
        let config = ctx.controller_config().unwrap();
        assert_eq!(config.version().as_str(), "new");
    }
}
