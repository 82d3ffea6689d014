//! Configuration schema for shellcache
//!
//! Configuration is stored at `~/.config/shellcache/config.toml`

use crate::manifest::{DEFAULT_CRITICAL, DEFAULT_FULL};
use crate::store::DEFAULT_PREFIX;
use crate::worker::DEFAULT_INSTALL_CONCURRENCY;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default cache version tag
pub const DEFAULT_VERSION: &str = "v5";

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Where shell resources come from
    pub origin: OriginConfig,

    /// Cache namespace and install settings
    pub cache: CacheConfig,

    /// The application shell
    pub manifest: ManifestConfig,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log format: "text" or "json"
    pub log_format: String,

    /// Append lifecycle events to the journal
    pub journal: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_format: "text".to_string(),
            journal: true,
        }
    }
}

/// Origin settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OriginConfig {
    /// Deployment base URL; requests outside it are not intercepted
    pub base_url: String,

    /// Serve the origin from a local directory instead of over HTTP
    pub directory: Option<PathBuf>,
}

impl Default for OriginConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/".to_string(),
            directory: None,
        }
    }
}

/// Cache settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Namespace prefix shared by every version of the application
    pub prefix: String,

    /// Version tag; bump to discard every cached resource
    pub version: String,

    /// Override for the state directory
    pub state_dir: Option<PathBuf>,

    /// Manifest fetches in flight during install
    pub install_concurrency: usize,

    /// Activate a freshly installed version without waiting
    pub skip_waiting: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.to_string(),
            version: DEFAULT_VERSION.to_string(),
            state_dir: None,
            install_concurrency: DEFAULT_INSTALL_CONCURRENCY,
            skip_waiting: true,
        }
    }
}

/// Resource manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ManifestConfig {
    /// Served cache-first
    pub critical: Vec<String>,

    /// Populated at install
    pub full: Vec<String>,
}

impl Default for ManifestConfig {
    fn default() -> Self {
        Self {
            critical: DEFAULT_CRITICAL.iter().map(|s| s.to_string()).collect(),
            full: DEFAULT_FULL.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = Config::default();
        let toml = toml::to_string_pretty(&config).unwrap();
        assert!(toml.contains("[general]"));
        assert!(toml.contains("[manifest]"));
        assert!(toml.contains("router-cache-"));
    }

    #[test]
    fn config_deserializes_empty() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.cache.version, "v5");
        assert_eq!(config.manifest.critical.len(), DEFAULT_CRITICAL.len());
        assert!(config.cache.skip_waiting);
    }

    #[test]
    fn config_deserializes_partial() {
        let toml = r#"
            [cache]
            version = "v6"

            [origin]
            directory = "/srv/router"
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.cache.version, "v6");
        assert_eq!(config.cache.prefix, "router-cache-");
        assert_eq!(config.origin.directory, Some(PathBuf::from("/srv/router")));
        assert_eq!(config.manifest.full.len(), DEFAULT_FULL.len());
    }
}
