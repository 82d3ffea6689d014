//! Configuration management for shellcache

pub mod schema;

pub use schema::Config;

use crate::error::{ShellcacheError, ShellcacheResult};
use crate::journal::Journal;
use crate::manifest::ResourceManifest;
use crate::network::{DirectoryNetwork, HttpNetwork, Network};
use crate::path::Scope;
use crate::store::{CacheStorage, CacheVersion, DiskStorage};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tracing::{debug, info};

/// Configuration manager
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a new config manager with default path
    pub fn new() -> Self {
        Self {
            config_path: Self::default_config_path(),
        }
    }

    /// Create a config manager with a custom path
    pub fn with_path(path: PathBuf) -> Self {
        Self { config_path: path }
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("shellcache")
            .join("config.toml")
    }

    /// Get the default state directory path
    pub fn default_state_dir() -> PathBuf {
        dirs::state_dir()
            .or_else(dirs::data_local_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("shellcache")
    }

    /// Load configuration, using defaults if the file does not exist
    pub async fn load(&self) -> ShellcacheResult<Config> {
        if !self.config_path.exists() {
            debug!("Config file not found, using defaults");
            return Ok(Config::default());
        }

        self.load_from_file(&self.config_path).await
    }

    /// Load configuration from a specific file
    pub async fn load_from_file(&self, path: &Path) -> ShellcacheResult<Config> {
        let content = fs::read_to_string(path).await.map_err(|e| {
            ShellcacheError::io(format!("reading config from {}", path.display()), e)
        })?;

        let config: Config =
            toml::from_str(&content).map_err(|e| ShellcacheError::ConfigInvalid {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        validate(&config).map_err(|reason| ShellcacheError::ConfigInvalid {
            path: path.to_path_buf(),
            reason,
        })?;
        Ok(config)
    }

    /// Save configuration to file
    pub async fn save(&self, config: &Config) -> ShellcacheResult<()> {
        self.ensure_config_dir().await?;

        let content = toml::to_string_pretty(config)?;
        fs::write(&self.config_path, content).await.map_err(|e| {
            ShellcacheError::io(
                format!("writing config to {}", self.config_path.display()),
                e,
            )
        })?;

        info!("Configuration saved to {}", self.config_path.display());
        Ok(())
    }

    /// Write the default configuration, refusing to overwrite unless forced
    pub async fn init(&self, force: bool) -> ShellcacheResult<Config> {
        if self.config_path.exists() && !force {
            return Err(ShellcacheError::ConfigExists(self.config_path.clone()));
        }
        let config = Config::default();
        self.save(&config).await?;
        Ok(config)
    }

    /// Ensure the config directory exists
    async fn ensure_config_dir(&self) -> ShellcacheResult<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| ShellcacheError::ConfigDirCreate {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
        }
        Ok(())
    }

    /// Get the config file path
    pub fn path(&self) -> &Path {
        &self.config_path
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

fn validate(config: &Config) -> Result<(), String> {
    if !matches!(config.general.log_format.as_str(), "text" | "json") {
        return Err(format!(
            "general.log_format must be \"text\" or \"json\", got {:?}",
            config.general.log_format
        ));
    }
    if config.cache.prefix.is_empty() {
        return Err("cache.prefix must not be empty".to_string());
    }
    if config.cache.version.is_empty() {
        return Err("cache.version must not be empty".to_string());
    }
    Ok(())
}

impl Config {
    /// State directory, honouring `cache.state_dir`
    pub fn state_dir(&self) -> PathBuf {
        self.cache
            .state_dir
            .clone()
            .unwrap_or_else(ConfigManager::default_state_dir)
    }

    /// Root of the on-disk cache namespaces
    pub fn cache_dir(&self) -> PathBuf {
        self.state_dir().join("caches")
    }

    pub fn registration_path(&self) -> PathBuf {
        self.state_dir().join("registration.json")
    }

    pub fn journal_path(&self) -> PathBuf {
        self.state_dir().join("journal.log")
    }

    pub fn journal(&self) -> Journal {
        Journal::new(self.general.journal, self.journal_path())
    }

    pub fn scope(&self) -> ShellcacheResult<Scope> {
        Scope::new(&self.origin.base_url)
    }

    /// The configured version under the configured prefix
    pub fn version(&self) -> CacheVersion {
        self.version_tagged(&self.cache.version)
    }

    pub fn version_tagged(&self, tag: &str) -> CacheVersion {
        CacheVersion::new(self.cache.prefix.clone(), tag)
    }

    pub fn resource_manifest(&self) -> ResourceManifest {
        ResourceManifest::new(&self.manifest.critical, &self.manifest.full)
    }

    pub fn storage(&self) -> Arc<dyn CacheStorage> {
        Arc::new(DiskStorage::new(self.cache_dir()))
    }

    /// Directory origin when configured, HTTP otherwise
    pub fn network(&self) -> ShellcacheResult<Arc<dyn Network>> {
        Ok(match &self.origin.directory {
            Some(root) => Arc::new(DirectoryNetwork::new(root.clone(), self.scope()?)),
            None => Arc::new(HttpNetwork::new()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn load_default_when_missing() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nonexistent.toml");
        let manager = ConfigManager::with_path(path);

        let config = manager.load().await.unwrap();
        assert_eq!(config.cache.version, "v5");
    }

    #[tokio::test]
    async fn save_and_load_roundtrip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        let manager = ConfigManager::with_path(path);

        let mut config = Config::default();
        config.cache.version = "v6".to_string();

        manager.save(&config).await.unwrap();
        let loaded = manager.load().await.unwrap();

        assert_eq!(loaded.cache.version, "v6");
        assert_eq!(loaded.version().cache_name(), "router-cache-v6");
    }

    #[tokio::test]
    async fn init_refuses_to_overwrite() {
        let temp = TempDir::new().unwrap();
        let manager = ConfigManager::with_path(temp.path().join("config.toml"));

        manager.init(false).await.unwrap();
        assert!(matches!(
            manager.init(false).await,
            Err(ShellcacheError::ConfigExists(_))
        ));
        manager.init(true).await.unwrap();
    }

    #[tokio::test]
    async fn rejects_unknown_log_format() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "[general]\nlog_format = \"xml\"\n").unwrap();

        let err = ConfigManager::with_path(path).load().await.unwrap_err();
        assert!(matches!(err, ShellcacheError::ConfigInvalid { .. }));
    }

    #[test]
    fn state_paths_follow_override() {
        let mut config = Config::default();
        config.cache.state_dir = Some(PathBuf::from("/tmp/shellcache-state"));

        assert_eq!(config.cache_dir(), PathBuf::from("/tmp/shellcache-state/caches"));
        assert_eq!(
            config.registration_path(),
            PathBuf::from("/tmp/shellcache-state/registration.json")
        );
    }

    #[test]
    fn builds_manifest_and_scope() {
        let mut config = Config::default();
        config.origin.base_url = "https://example.org/router".to_string();

        assert_eq!(config.scope().unwrap().base().as_str(), "https://example.org/router/");
        assert_eq!(config.resource_manifest().len(), ResourceManifest::builtin().len());
    }
}
