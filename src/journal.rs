//! Lifecycle journal
//!
//! Appends one JSON line per install or activation event to
//! `journal.log` in the state directory. Write failures only warn.

use chrono::Utc;
use std::path::{Path, PathBuf};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing::warn;

pub const INSTALL_COMPLETED: &str = "install.completed";
pub const INSTALL_FAILED: &str = "install.failed";
pub const ACTIVATE_COMPLETED: &str = "activate.completed";

/// Append-only JSON lines log of lifecycle events
pub struct Journal {
    enabled: bool,
    path: PathBuf,
}

impl Journal {
    pub fn new(enabled: bool, path: impl Into<PathBuf>) -> Self {
        Self {
            enabled,
            path: path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record an event
    pub async fn record(&self, event: &str, data: &serde_json::Value) {
        if !self.enabled {
            return;
        }

        let entry = serde_json::json!({
            "timestamp": Utc::now().to_rfc3339(),
            "event": event,
            "data": data,
        });

        let mut line = match serde_json::to_string(&entry) {
            Ok(s) => s,
            Err(e) => {
                warn!("Failed to serialize journal event: {}", e);
                return;
            }
        };
        line.push('\n');

        if let Err(e) = self.append(&line).await {
            warn!("Failed to write journal {}: {}", self.path.display(), e);
        }
    }

    async fn append(&self, line: &str) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;

        file.write_all(line.as_bytes()).await?;
        file.flush().await
    }
}
