//! On-disk cache storage
//!
//! # Layout
//!
//! ```text
//! <state_dir>/caches/{namespace}/
//!   {sha256(key)[..16]}.json   # one stored entry
//! ```
//!
//! Entries are written to a temp file and renamed into place, so a reader
//! sees either the old snapshot or the new one.

use super::{CacheStorage, CacheStore};
use crate::error::{ShellcacheError, ShellcacheResult};
use crate::http::{Method, Response};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tracing::{debug, warn};

/// Serialized form of one entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredEntry {
    /// Request identity key
    pub key: String,
    /// Request method (always GET for intercepted reads)
    pub method: Method,
    /// When the snapshot was written
    pub stored_at: DateTime<Utc>,
    pub response: Response,
}

/// Cache storage rooted at a directory
#[derive(Debug, Clone)]
pub struct DiskStorage {
    root: PathBuf,
}

impl DiskStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn namespace_dir(&self, name: &str) -> ShellcacheResult<PathBuf> {
        validate_name(name)?;
        Ok(self.root.join(name))
    }
}

/// Namespace names become directory names
fn validate_name(name: &str) -> ShellcacheResult<()> {
    let invalid = name.is_empty()
        || name.starts_with('.')
        || name.contains(['/', '\\'])
        || name.contains("..");
    if invalid {
        return Err(ShellcacheError::store_open(name, "invalid namespace name"));
    }
    Ok(())
}

/// File name for a key: first 16 hex chars of its SHA256
fn entry_file_name(key: &str) -> String {
    let digest = Sha256::digest(key.as_bytes());
    format!("{}.json", hex::encode(&digest[..8]))
}

#[async_trait]
impl CacheStorage for DiskStorage {
    async fn open(&self, name: &str) -> ShellcacheResult<Arc<dyn CacheStore>> {
        let dir = self.namespace_dir(name)?;
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| ShellcacheError::store_open(name, e))?;

        debug!("Opened cache store {} at {}", name, dir.display());
        Ok(Arc::new(DiskCache {
            name: name.to_string(),
            dir,
        }))
    }

    async fn has(&self, name: &str) -> ShellcacheResult<bool> {
        let dir = self.namespace_dir(name)?;
        Ok(fs::metadata(&dir).await.is_ok_and(|m| m.is_dir()))
    }

    async fn delete(&self, name: &str) -> ShellcacheResult<bool> {
        let dir = self.namespace_dir(name)?;
        match fs::remove_dir_all(&dir).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(ShellcacheError::store(name, e)),
        }
    }

    async fn names(&self) -> ShellcacheResult<Vec<String>> {
        let mut entries = match fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(vec![]),
            Err(e) => {
                return Err(ShellcacheError::io(
                    format!("reading cache root {}", self.root.display()),
                    e,
                ))
            }
        };

        let mut names = vec![];
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| ShellcacheError::io("reading cache root entry", e))?
        {
            let is_dir = entry.file_type().await.is_ok_and(|t| t.is_dir());
            if let (true, Some(name)) = (is_dir, entry.file_name().to_str()) {
                names.push(name.to_string());
            }
        }

        names.sort();
        Ok(names)
    }
}

/// One namespace directory
pub struct DiskCache {
    name: String,
    dir: PathBuf,
}

impl DiskCache {
    async fn read_entry(&self, path: &Path) -> ShellcacheResult<Option<StoredEntry>> {
        let content = match fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(ShellcacheError::store(&self.name, e)),
        };

        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| ShellcacheError::EntryCorrupt {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })
    }

    async fn write_atomic(&self, path: &Path, content: &str) -> ShellcacheResult<()> {
        let temp_path = path.with_extension(format!("{}.tmp", uuid::Uuid::new_v4().simple()));

        fs::write(&temp_path, content)
            .await
            .map_err(|e| ShellcacheError::store(&self.name, format!("writing temp file: {}", e)))?;

        if let Err(e) = fs::rename(&temp_path, path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(ShellcacheError::store(
                &self.name,
                format!("renaming temp file: {}", e),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl CacheStore for DiskCache {
    fn name(&self) -> &str {
        &self.name
    }

    async fn lookup(&self, key: &str) -> ShellcacheResult<Option<Response>> {
        let path = self.dir.join(entry_file_name(key));
        let entry = self.read_entry(&path).await?;

        // A different key under the same file name is a digest collision
        Ok(entry.filter(|e| e.key == key).map(|e| e.response))
    }

    async fn put(&self, key: &str, response: &Response) -> ShellcacheResult<()> {
        let entry = StoredEntry {
            key: key.to_string(),
            method: Method::Get,
            stored_at: Utc::now(),
            response: response.clone(),
        };
        let content = serde_json::to_string_pretty(&entry)?;
        self.write_atomic(&self.dir.join(entry_file_name(key)), &content)
            .await?;

        debug!(cache = %self.name, key, "stored entry");
        Ok(())
    }

    async fn delete(&self, key: &str) -> ShellcacheResult<bool> {
        let path = self.dir.join(entry_file_name(key));
        match self.read_entry(&path).await? {
            Some(entry) if entry.key == key => {}
            _ => return Ok(false),
        }

        match fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(ShellcacheError::store(&self.name, e)),
        }
    }

    async fn keys(&self) -> ShellcacheResult<Vec<String>> {
        let mut dir = match fs::read_dir(&self.dir).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(vec![]),
            Err(e) => return Err(ShellcacheError::store(&self.name, e)),
        };

        let mut keys = vec![];
        while let Some(file) = dir
            .next_entry()
            .await
            .map_err(|e| ShellcacheError::store(&self.name, e))?
        {
            let path = file.path();
            if path.extension().is_none_or(|ext| ext != "json") {
                continue;
            }
            match self.read_entry(&path).await {
                Ok(Some(entry)) => keys.push(entry.key),
                Ok(None) => {}
                Err(e) => warn!("Skipping unreadable cache entry: {}", e),
            }
        }

        keys.sort();
        Ok(keys)
    }
}
