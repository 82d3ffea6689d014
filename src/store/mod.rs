//! Versioned cache storage
//!
//! A `CacheStorage` holds named namespaces; each namespace is a `CacheStore`
//! mapping request identities to response snapshots. One namespace per
//! `CacheVersion` is current; activation deletes the rest.
//!
//! # Guarantees
//!
//! - `put` replaces an entry as a whole, never partially
//! - concurrent writers to the same key resolve last-write-wins
//! - namespaces without the application prefix are never listed as stale

mod disk;
mod memory;

pub use disk::DiskStorage;
pub use memory::MemoryStorage;

use crate::error::ShellcacheResult;
use crate::http::Response;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

/// Namespace prefix shared by every version of the shell cache
pub const DEFAULT_PREFIX: &str = "router-cache-";

/// One generation of cached resources
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheVersion {
    prefix: String,
    tag: String,
}

impl CacheVersion {
    pub fn new(prefix: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            tag: tag.into(),
        }
    }

    /// Version under the default prefix
    pub fn tagged(tag: impl Into<String>) -> Self {
        Self::new(DEFAULT_PREFIX, tag)
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Namespace name (`<prefix><tag>`)
    pub fn cache_name(&self) -> String {
        format!("{}{}", self.prefix, self.tag)
    }

    /// Whether a namespace belongs to this application
    pub fn owns(&self, name: &str) -> bool {
        name.starts_with(&self.prefix)
    }

    /// Whether a namespace is an obsolete generation of this application
    pub fn is_stale(&self, name: &str) -> bool {
        self.owns(name) && name != self.cache_name()
    }
}

impl fmt::Display for CacheVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.cache_name())
    }
}

/// A single namespace of request identity -> response snapshot
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Namespace name
    fn name(&self) -> &str;

    /// Stored response for an exact key
    async fn lookup(&self, key: &str) -> ShellcacheResult<Option<Response>>;

    /// Store or overwrite an entry
    async fn put(&self, key: &str, response: &Response) -> ShellcacheResult<()>;

    /// Remove an entry, returning whether it existed
    async fn delete(&self, key: &str) -> ShellcacheResult<bool>;

    /// All stored keys
    async fn keys(&self) -> ShellcacheResult<Vec<String>>;
}

/// The set of namespaces for one origin
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Open a namespace, creating it if absent
    async fn open(&self, name: &str) -> ShellcacheResult<Arc<dyn CacheStore>>;

    /// Whether a namespace exists
    async fn has(&self, name: &str) -> ShellcacheResult<bool>;

    /// Delete a namespace and all its entries, returning whether it existed
    async fn delete(&self, name: &str) -> ShellcacheResult<bool>;

    /// All namespace names, sorted
    async fn names(&self) -> ShellcacheResult<Vec<String>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_names() {
        let version = CacheVersion::tagged("v5");
        assert_eq!(version.cache_name(), "router-cache-v5");
        assert_eq!(version.to_string(), "router-cache-v5");
        assert_eq!(version.tag(), "v5");
    }

    #[test]
    fn stale_only_within_prefix() {
        let version = CacheVersion::tagged("v5");
        assert!(version.is_stale("router-cache-v4"));
        assert!(!version.is_stale("router-cache-v5"));
        assert!(!version.is_stale("other-app-v1"));
        assert!(version.owns("router-cache-v1"));
    }
}
