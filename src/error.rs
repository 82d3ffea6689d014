//! Error types for shellcache
//!
//! All modules use `ShellcacheResult<T>` as their return type. Network
//! failures have their own type (`FetchError`) because the interceptor
//! recovers from them instead of propagating.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for shellcache operations
pub type ShellcacheResult<T> = Result<T, ShellcacheError>;

/// All errors that can occur in shellcache
#[derive(Error, Debug)]
pub enum ShellcacheError {
    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Configuration file already exists: {0}")]
    ConfigExists(PathBuf),

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid origin URL {url}: {reason}")]
    OriginInvalid { url: String, reason: String },

    // Cache store errors
    #[error("Failed to open cache store {name}: {reason}")]
    StoreOpen { name: String, reason: String },

    #[error("Cache store {name} failed: {reason}")]
    Store { name: String, reason: String },

    #[error("Corrupt cache entry {path}: {reason}")]
    EntryCorrupt { path: PathBuf, reason: String },

    // Worker lifecycle errors
    #[error("No active worker")]
    NoActiveWorker,

    #[error("No worker is waiting to activate")]
    NoWaitingWorker,

    #[error("Unknown control message: {0}")]
    UnknownMessage(String),

    // Request errors
    #[error("Unknown HTTP method: {0}")]
    InvalidMethod(String),

    #[error("Request failed: {0}")]
    Fetch(#[from] crate::network::FetchError),

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl ShellcacheError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a store-open error
    pub fn store_open(name: impl Into<String>, reason: impl ToString) -> Self {
        Self::StoreOpen {
            name: name.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a store operation error
    pub fn store(name: impl Into<String>, reason: impl ToString) -> Self {
        Self::Store {
            name: name.into(),
            reason: reason.to_string(),
        }
    }

    /// Whether the error leaves the previously active version in charge
    pub fn keeps_previous_version(&self) -> bool {
        matches!(self, Self::StoreOpen { .. } | Self::Store { .. } | Self::Io { .. })
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::NoActiveWorker => Some("Run: shellcache install"),
            Self::NoWaitingWorker => Some("Install a new cache version first"),
            Self::ConfigExists(_) => Some("Use --force to overwrite"),
            Self::StoreOpen { .. } => Some("Check that the state directory is writable"),
            Self::ConfigInvalid { .. } => Some("Run: shellcache config show"),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = ShellcacheError::store_open("router-cache-v5", "permission denied");
        assert_eq!(
            err.to_string(),
            "Failed to open cache store router-cache-v5: permission denied"
        );
    }

    #[test]
    fn error_hint() {
        assert_eq!(
            ShellcacheError::NoActiveWorker.hint(),
            Some("Run: shellcache install")
        );
        assert_eq!(ShellcacheError::UnknownMessage("x".into()).hint(), None);
    }

    #[test]
    fn store_failures_keep_previous_version() {
        assert!(ShellcacheError::store_open("a", "b").keeps_previous_version());
        assert!(!ShellcacheError::NoWaitingWorker.keeps_previous_version());
    }
}
