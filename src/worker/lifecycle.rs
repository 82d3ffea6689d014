//! Worker lifecycle: registration, waiting, activation, client control
//!
//! A registration has at most one active and one waiting worker. A newly
//! installed worker activates at once when it skips waiting or nothing is
//! active yet; otherwise it waits for a `SKIP_WAITING` control message.
//! A worker that fails to install becomes redundant and the active one
//! keeps serving.

use crate::error::{ShellcacheError, ShellcacheResult};
use crate::store::CacheVersion;
use crate::worker::install::{
    ActivationReport, InstallReport, InstallationController, PopulateOutcome,
};
use crate::worker::intercept::Interceptor;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Worker states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerState {
    Parsed,
    Installing,
    /// Installed and waiting to activate
    Installed,
    Activating,
    Activated,
    Redundant,
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Parsed => "parsed",
            Self::Installing => "installing",
            Self::Installed => "installed",
            Self::Activating => "activating",
            Self::Activated => "activated",
            Self::Redundant => "redundant",
        };
        write!(f, "{}", name)
    }
}

/// Messages a page may post to the worker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ControlMessage {
    /// Activate the waiting worker now
    SkipWaiting,
}

impl ControlMessage {
    /// Parse a JSON message such as `{"type":"SKIP_WAITING"}`
    pub fn parse(json: &str) -> ShellcacheResult<Self> {
        serde_json::from_str(json).map_err(|_| ShellcacheError::UnknownMessage(json.to_string()))
    }
}

/// Identifier of an open page session
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClientId(Uuid);

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Open page sessions and the version controlling each
#[derive(Debug, Default)]
pub struct ClientSet {
    clients: RwLock<BTreeMap<ClientId, Option<CacheVersion>>>,
}

impl ClientSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new, uncontrolled session
    pub async fn connect(&self) -> ClientId {
        let id = ClientId(Uuid::new_v4());
        self.clients.write().await.insert(id, None);
        id
    }

    /// Version controlling a session
    pub async fn controller(&self, id: ClientId) -> Option<CacheVersion> {
        self.clients.read().await.get(&id).cloned().flatten()
    }

    /// Put every session under `version`, returning how many there are
    pub async fn claim(&self, version: &CacheVersion) -> usize {
        let mut clients = self.clients.write().await;
        for controller in clients.values_mut() {
            *controller = Some(version.clone());
        }
        clients.len()
    }
}

/// Persisted view of a registration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrationRecord {
    /// Tag of the active version
    pub active: Option<String>,
    /// Tag of the version waiting to activate
    pub waiting: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl Default for RegistrationRecord {
    fn default() -> Self {
        Self {
            active: None,
            waiting: None,
            updated_at: Utc::now(),
        }
    }
}

impl RegistrationRecord {
    /// Load from file; a missing file is an empty registration
    pub async fn load(path: &Path) -> ShellcacheResult<Self> {
        if !path.exists() {
            debug!("No registration record at {}", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).await.map_err(|e| {
            ShellcacheError::io(format!("reading registration {}", path.display()), e)
        })?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Save to file
    pub async fn save(&self, path: &Path) -> ShellcacheResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| ShellcacheError::io("creating state directory", e))?;
        }

        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content).await.map_err(|e| {
            ShellcacheError::io(format!("writing registration {}", path.display()), e)
        })
    }
}

/// Outcome of registering a worker
#[derive(Debug)]
pub enum RegisterOutcome {
    /// The version is already active; nothing was installed
    Unchanged,
    /// Installed and now waiting for `SKIP_WAITING`
    Waiting(InstallReport),
    /// Installed and activated
    Activated(InstallReport, ActivationReport),
}

struct Worker {
    controller: Arc<InstallationController>,
    state: WorkerState,
}

/// The worker registration for one scope
pub struct Registration {
    clients: ClientSet,
    active: Option<Worker>,
    waiting: Option<Worker>,
}

impl Registration {
    pub fn new() -> Self {
        Self {
            clients: ClientSet::new(),
            active: None,
            waiting: None,
        }
    }

    /// Rebuild from a persisted record; `build` makes the controller for a tag
    pub fn restore(
        record: &RegistrationRecord,
        build: impl Fn(&str) -> InstallationController,
    ) -> Self {
        let worker = |tag: &String, state| Worker {
            controller: Arc::new(build(tag.as_str())),
            state,
        };
        Self {
            clients: ClientSet::new(),
            active: record
                .active
                .as_ref()
                .map(|tag| worker(tag, WorkerState::Activated)),
            waiting: record
                .waiting
                .as_ref()
                .map(|tag| worker(tag, WorkerState::Installed)),
        }
    }

    /// Current state as a persistable record
    pub fn record(&self) -> RegistrationRecord {
        RegistrationRecord {
            active: self.active_version().map(|v| v.tag().to_string()),
            waiting: self.waiting_version().map(|v| v.tag().to_string()),
            updated_at: Utc::now(),
        }
    }

    pub fn clients(&self) -> &ClientSet {
        &self.clients
    }

    pub fn active_version(&self) -> Option<&CacheVersion> {
        self.active.as_ref().map(|w| w.controller.version())
    }

    pub fn waiting_version(&self) -> Option<&CacheVersion> {
        self.waiting.as_ref().map(|w| w.controller.version())
    }

    /// State of the worker for a version, if it is active or waiting
    pub fn state_of(&self, version: &CacheVersion) -> Option<WorkerState> {
        [&self.active, &self.waiting]
            .into_iter()
            .flatten()
            .find(|w| w.controller.version() == version)
            .map(|w| w.state)
    }

    /// Interceptor of the active version
    pub fn interceptor(&self) -> ShellcacheResult<Interceptor> {
        self.active
            .as_ref()
            .map(|w| w.controller.interceptor())
            .ok_or(ShellcacheError::NoActiveWorker)
    }

    /// Install a worker and activate it when allowed
    pub async fn register(
        &mut self,
        controller: InstallationController,
    ) -> ShellcacheResult<RegisterOutcome> {
        self.register_with_progress(controller, &|_| {}).await
    }

    pub async fn register_with_progress(
        &mut self,
        controller: InstallationController,
        on_progress: &(dyn Fn(&PopulateOutcome) + Send + Sync),
    ) -> ShellcacheResult<RegisterOutcome> {
        if self.active_version() == Some(controller.version()) {
            debug!("{} already active", controller.version());
            return Ok(RegisterOutcome::Unchanged);
        }

        let mut worker = Worker {
            controller: Arc::new(controller),
            state: WorkerState::Parsed,
        };

        worker.state = WorkerState::Installing;
        let report = match worker.controller.install_with_progress(on_progress).await {
            Ok(report) => report,
            Err(e) => {
                worker.state = WorkerState::Redundant;
                warn!(
                    "Install of {} failed, worker is {}: {}",
                    worker.controller.version(),
                    worker.state,
                    e
                );
                return Err(e);
            }
        };
        worker.state = WorkerState::Installed;

        // A newer install supersedes whatever was waiting
        self.retire_waiting();

        if report.skip_waiting || self.active.is_none() {
            let activation = self.activate(worker).await?;
            return Ok(RegisterOutcome::Activated(report, activation));
        }

        self.waiting = Some(worker);
        info!(
            "{} installed, waiting for SKIP_WAITING",
            report.version
        );
        Ok(RegisterOutcome::Waiting(report))
    }

    fn retire_waiting(&mut self) {
        if let Some(mut previous) = self.waiting.take() {
            previous.state = WorkerState::Redundant;
            debug!(
                "{} superseded while waiting, now {}",
                previous.controller.version(),
                previous.state
            );
        }
    }

    /// Activate the waiting worker
    pub async fn skip_waiting(&mut self) -> ShellcacheResult<ActivationReport> {
        let worker = self.waiting.take().ok_or(ShellcacheError::NoWaitingWorker)?;
        self.activate(worker).await
    }

    /// Handle a control message from a page
    pub async fn post_message(
        &mut self,
        message: ControlMessage,
    ) -> ShellcacheResult<ActivationReport> {
        match message {
            ControlMessage::SkipWaiting => self.skip_waiting().await,
        }
    }

    async fn activate(&mut self, mut worker: Worker) -> ShellcacheResult<ActivationReport> {
        worker.state = WorkerState::Activating;
        let report = match worker.controller.activate(&self.clients).await {
            Ok(report) => report,
            Err(e) => {
                warn!(
                    "Activation of {} failed: {}",
                    worker.controller.version(),
                    e
                );
                return Err(e);
            }
        };
        worker.state = WorkerState::Activated;

        if let Some(mut previous) = self.active.replace(worker) {
            previous.state = WorkerState::Redundant;
            debug!(
                "{} is now {}",
                previous.controller.version(),
                previous.state
            );
        }
        Ok(report)
    }
}

impl Default for Registration {
    fn default() -> Self {
        Self::new()
    }
}
