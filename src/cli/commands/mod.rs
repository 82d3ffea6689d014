//! CLI command implementations

pub mod config;
pub mod fetch;
pub mod install;
pub mod list;
pub mod skip_waiting;
pub mod status;

pub use config::execute as config;
pub use fetch::execute as fetch;
pub use install::execute as install;
pub use list::execute as list;
pub use skip_waiting::execute as skip_waiting;
pub use status::execute as status;

use crate::config::Config;
use crate::error::ShellcacheResult;
use crate::manifest::ResourceManifest;
use crate::network::Network;
use crate::path::Scope;
use crate::store::CacheStorage;
use crate::worker::{InstallationController, Registration, RegistrationRecord};
use std::sync::Arc;

/// Everything a command needs to rebuild the registration from disk
pub(crate) struct Workspace<'a> {
    config: &'a Config,
    scope: Scope,
    manifest: Arc<ResourceManifest>,
    storage: Arc<dyn CacheStorage>,
}

impl<'a> Workspace<'a> {
    pub(crate) fn open(config: &'a Config) -> ShellcacheResult<Self> {
        Ok(Self {
            config,
            scope: config.scope()?,
            manifest: Arc::new(config.resource_manifest()),
            storage: config.storage(),
        })
    }

    pub(crate) fn scope(&self) -> &Scope {
        &self.scope
    }

    pub(crate) fn storage(&self) -> &Arc<dyn CacheStorage> {
        &self.storage
    }

    /// Controller for a version tag talking to `network`
    pub(crate) fn controller(&self, tag: &str, network: Arc<dyn Network>) -> InstallationController {
        InstallationController::new(
            self.config.version_tagged(tag),
            self.scope.clone(),
            self.manifest.clone(),
            self.storage.clone(),
            network,
        )
        .with_concurrency(self.config.cache.install_concurrency)
        .with_skip_waiting(self.config.cache.skip_waiting)
    }

    pub(crate) async fn record(&self) -> ShellcacheResult<RegistrationRecord> {
        RegistrationRecord::load(&self.config.registration_path()).await
    }

    /// The persisted registration, with every worker using `network`
    pub(crate) async fn registration(
        &self,
        network: Arc<dyn Network>,
    ) -> ShellcacheResult<Registration> {
        let record = self.record().await?;
        Ok(Registration::restore(&record, |tag| {
            self.controller(tag, network.clone())
        }))
    }

    pub(crate) async fn save(&self, registration: &Registration) -> ShellcacheResult<()> {
        registration
            .record()
            .save(&self.config.registration_path())
            .await
    }
}
