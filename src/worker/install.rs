//! Installation and activation of a cache version
//!
//! Install opens the version's namespace and populates it from the
//! manifest. Individual resources may fail; the namespace itself may not.
//! Activation purges every other namespace of the application and claims
//! the open clients.

use crate::error::ShellcacheResult;
use crate::http::Request;
use crate::manifest::{ManifestEntry, ResourceManifest};
use crate::network::Network;
use crate::path::Scope;
use crate::store::{CacheStorage, CacheStore, CacheVersion};
use crate::worker::intercept::Interceptor;
use crate::worker::lifecycle::ClientSet;
use futures_util::stream::{self, StreamExt};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Default number of manifest fetches in flight during install
pub const DEFAULT_INSTALL_CONCURRENCY: usize = 4;

/// Result of populating one manifest entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PopulateOutcome {
    Cached { key: String },
    Failed { url: String, reason: String },
}

/// Summary of an install
#[derive(Debug, Clone)]
pub struct InstallReport {
    pub version: CacheVersion,
    /// Storage keys populated
    pub cached: Vec<String>,
    /// Manifest URLs that could not be populated, with reasons
    pub failed: Vec<(String, String)>,
    /// The worker asks to take control without waiting
    pub skip_waiting: bool,
}

impl InstallReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Summary of an activation
#[derive(Debug, Clone)]
pub struct ActivationReport {
    pub version: CacheVersion,
    /// Stale namespaces deleted
    pub purged: Vec<String>,
    /// Clients now controlled by this version
    pub claimed: usize,
}

/// Populates and activates one cache version
pub struct InstallationController {
    version: CacheVersion,
    scope: Scope,
    manifest: Arc<ResourceManifest>,
    storage: Arc<dyn CacheStorage>,
    network: Arc<dyn Network>,
    concurrency: usize,
    skip_waiting: bool,
}

impl InstallationController {
    pub fn new(
        version: CacheVersion,
        scope: Scope,
        manifest: Arc<ResourceManifest>,
        storage: Arc<dyn CacheStorage>,
        network: Arc<dyn Network>,
    ) -> Self {
        Self {
            version,
            scope,
            manifest,
            storage,
            network,
            concurrency: DEFAULT_INSTALL_CONCURRENCY,
            skip_waiting: true,
        }
    }

    /// Limit concurrent fetches during population (minimum 1)
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Whether install asks to skip the waiting phase
    pub fn with_skip_waiting(mut self, skip_waiting: bool) -> Self {
        self.skip_waiting = skip_waiting;
        self
    }

    pub fn version(&self) -> &CacheVersion {
        &self.version
    }

    pub fn manifest(&self) -> &ResourceManifest {
        &self.manifest
    }

    /// Interceptor serving this version
    pub fn interceptor(&self) -> Interceptor {
        Interceptor::new(
            self.version.clone(),
            self.scope.clone(),
            self.manifest.clone(),
            self.storage.clone(),
            self.network.clone(),
        )
    }

    /// Install without progress reporting
    pub async fn install(&self) -> ShellcacheResult<InstallReport> {
        self.install_with_progress(&|_| {}).await
    }

    /// Open the namespace and populate it, reporting each entry as it settles
    pub async fn install_with_progress(
        &self,
        on_progress: &(dyn Fn(&PopulateOutcome) + Send + Sync),
    ) -> ShellcacheResult<InstallReport> {
        let name = self.version.cache_name();
        let store = self.storage.open(&name).await?;

        info!(
            "Installing {} ({} resources)",
            name,
            self.manifest.len()
        );

        let outcomes: Vec<PopulateOutcome> = stream::iter(self.manifest.entries())
            .map(|entry| self.populate(store.as_ref(), entry))
            .buffer_unordered(self.concurrency)
            .inspect(|outcome| on_progress(outcome))
            .collect()
            .await;

        let mut report = InstallReport {
            version: self.version.clone(),
            cached: vec![],
            failed: vec![],
            skip_waiting: self.skip_waiting,
        };
        for outcome in outcomes {
            match outcome {
                PopulateOutcome::Cached { key } => report.cached.push(key),
                PopulateOutcome::Failed { url, reason } => report.failed.push((url, reason)),
            }
        }

        if !report.is_complete() {
            warn!(
                "Could not cache {} of {} resources for {}",
                report.failed.len(),
                self.manifest.len(),
                name
            );
        }
        info!("Installed {}: {} cached", name, report.cached.len());
        Ok(report)
    }

    /// Fetch and store one entry; every failure is reported, never raised
    async fn populate(&self, store: &dyn CacheStore, entry: &ManifestEntry) -> PopulateOutcome {
        let failed = |reason: String| {
            warn!("Failed to cache {}: {}", entry.url, reason);
            PopulateOutcome::Failed {
                url: entry.url.clone(),
                reason,
            }
        };

        let url = match self.scope.resolve(&entry.identity) {
            Ok(url) => url,
            Err(e) => return failed(e.to_string()),
        };

        let response = match self.network.fetch(&Request::get(url)).await {
            Ok(response) if response.is_ok() => response,
            Ok(response) => {
                return failed(format!(
                    "HTTP {} {}",
                    response.status, response.status_text
                ))
            }
            Err(e) => return failed(e.to_string()),
        };

        let key = entry.identity.key();
        if let Err(e) = store.put(&key, &response).await {
            return failed(e.to_string());
        }

        debug!("Cached {} ({} bytes)", key, response.body.len());
        PopulateOutcome::Cached { key }
    }

    /// Purge stale namespaces and claim all clients
    pub async fn activate(&self, clients: &ClientSet) -> ShellcacheResult<ActivationReport> {
        let name = self.version.cache_name();
        self.storage.open(&name).await?;

        let mut purged = vec![];
        for stale in self
            .storage
            .names()
            .await?
            .into_iter()
            .filter(|n| self.version.is_stale(n))
        {
            if self.storage.delete(&stale).await? {
                info!("Deleted stale cache {}", stale);
                purged.push(stale);
            }
        }

        let claimed = clients.claim(&self.version).await;
        info!("Activated {}, controlling {} client(s)", name, claimed);

        Ok(ActivationReport {
            version: self.version.clone(),
            purged,
            claimed,
        })
    }
}
