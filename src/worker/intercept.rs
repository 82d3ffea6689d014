//! Request interception
//!
//! Every same-origin GET under the scope is answered from the cache, the
//! network, or the offline placeholder. The decision table lives in
//! [`decide`], a pure function of what has been observed so far; the
//! [`Interceptor`] performs the requested action, records the result and
//! asks again until a response is chosen.
//!
//! | Class | Cache | Network | Result |
//! |-------|-------|---------|--------|
//! | critical | hit (query ignored) | - | cached, background refresh |
//! | any | - | ok | network (2xx stored) |
//! | any | exact or alias hit | failed | cached |
//! | critical | query-insensitive hit | failed | cached |
//! | any | miss | failed | 503 placeholder |

use crate::http::{Method, Request, Response};
use crate::manifest::{Priority, ResourceManifest};
use crate::network::{FetchError, Network};
use crate::path::{PathIdentity, Scope};
use crate::store::{CacheStorage, CacheStore, CacheVersion};
use std::fmt;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Result of one cache probe
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Probe {
    #[default]
    Pending,
    Missed,
    Found(Response),
}

/// Everything learned about a request so far
#[derive(Debug, Clone, Default)]
pub struct Observations {
    /// Lookup under the storage key
    pub exact: Probe,
    /// Network outcome, once fetched
    pub network: Option<Result<Response, FetchError>>,
    /// Lookup under the alias keys
    pub aliases: Probe,
    /// Lookup ignoring the query string
    pub loose: Probe,
}

/// Where a response came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSource {
    Cache,
    Network,
    Placeholder,
}

impl fmt::Display for ResponseSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cache => write!(f, "cache"),
            Self::Network => write!(f, "network"),
            Self::Placeholder => write!(f, "offline placeholder"),
        }
    }
}

/// The chosen response and its cache side effects
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub response: Response,
    pub source: ResponseSource,
    /// Snapshot to store under the request's key before responding
    pub write_through: Option<Response>,
    /// Refresh the entry from the network without delaying the response
    pub refresh: bool,
}

impl Resolution {
    fn cached(response: Response, refresh: bool) -> Self {
        Self {
            response,
            source: ResponseSource::Cache,
            write_through: None,
            refresh,
        }
    }
}

/// Next step for a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    LookupExact,
    Fetch,
    LookupAliases,
    LookupIgnoringQuery,
    Respond(Resolution),
}

/// Decide the next step from the observations made so far
pub fn decide(priority: Priority, seen: &Observations) -> Action {
    let exact = match &seen.exact {
        Probe::Pending => return Action::LookupExact,
        Probe::Found(cached) => Some(cached),
        Probe::Missed => None,
    };

    if let (Priority::Critical, Some(cached)) = (priority, exact) {
        return Action::Respond(Resolution::cached(cached.clone(), true));
    }

    match &seen.network {
        None => return Action::Fetch,
        Some(Ok(fresh)) => {
            let unchanged = exact.is_some_and(|cached| same_content(cached, fresh));
            return Action::Respond(Resolution {
                response: fresh.clone(),
                source: ResponseSource::Network,
                write_through: (fresh.is_ok() && !unchanged).then(|| fresh.clone()),
                refresh: false,
            });
        }
        Some(Err(_)) => {}
    }

    if let Some(cached) = exact {
        return Action::Respond(Resolution::cached(cached.clone(), false));
    }

    match &seen.aliases {
        Probe::Pending => return Action::LookupAliases,
        Probe::Found(cached) => return Action::Respond(Resolution::cached(cached.clone(), false)),
        Probe::Missed => {}
    }

    if priority == Priority::Critical {
        match &seen.loose {
            Probe::Pending => return Action::LookupIgnoringQuery,
            Probe::Found(cached) => {
                return Action::Respond(Resolution::cached(cached.clone(), false))
            }
            Probe::Missed => {}
        }
    }

    Action::Respond(Resolution {
        response: Response::offline(),
        source: ResponseSource::Placeholder,
        write_through: None,
        refresh: false,
    })
}

/// Status and body decide whether a fresh copy replaces the stored one
fn same_content(cached: &Response, fresh: &Response) -> bool {
    cached.status == fresh.status && cached.body == fresh.body
}

/// Outcome of intercepting one request
#[derive(Debug)]
pub enum Intercepted {
    /// Not ours: the caller performs the request normally
    Passthrough(Request),
    Responded(Handled),
}

/// A request the interceptor answered
#[derive(Debug)]
pub struct Handled {
    pub response: Response,
    pub source: ResponseSource,
    pub priority: Priority,
    /// Background refresh, when one was started
    pub refresh: Option<JoinHandle<()>>,
}

/// Runtime policy engine for one cache version
#[derive(Clone)]
pub struct Interceptor {
    version: CacheVersion,
    scope: Scope,
    manifest: Arc<ResourceManifest>,
    storage: Arc<dyn CacheStorage>,
    network: Arc<dyn Network>,
}

impl Interceptor {
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
        }
    }

    pub fn version(&self) -> &CacheVersion {
        &self.version
    }

    /// Identity and priority of a request, or `None` when it is not intercepted
    pub fn classify(&self, request: &Request) -> Option<(PathIdentity, Priority)> {
        if request.method() != Method::Get {
            return None;
        }
        let identity = self.scope.identify(request.url())?;
        let priority = self.manifest.classify(&identity);
        Some((identity, priority))
    }

    /// Answer a request; never fails for an intercepted request
    pub async fn handle(&self, request: Request) -> Intercepted {
        let Some((identity, priority)) = self.classify(&request) else {
            debug!("Passing through {} {}", request.method(), request.url());
            return Intercepted::Passthrough(request);
        };

        // Critical entries are keyed without the query, so cache-busting
        // queries land on the installed copy
        let identity = match priority {
            Priority::Critical => identity.with_query(None),
            Priority::Ordinary => identity,
        };
        let store = self.open_store().await;
        let key = identity.key();
        let mut seen = Observations::default();

        loop {
            match decide(priority, &seen) {
                Action::LookupExact => seen.exact = probe(store.as_ref(), &key).await,
                Action::Fetch => seen.network = Some(self.network.fetch(&request).await),
                Action::LookupAliases => {
                    seen.aliases = probe_any(store.as_ref(), &identity.alias_keys()).await
                }
                Action::LookupIgnoringQuery => {
                    seen.loose = probe_ignoring_query(store.as_ref(), &identity).await
                }
                Action::Respond(resolution) => {
                    return Intercepted::Responded(
                        self.finish(request, key, priority, store, resolution).await,
                    );
                }
            }
        }
    }

    async fn finish(
        &self,
        request: Request,
        key: String,
        priority: Priority,
        store: Option<Arc<dyn CacheStore>>,
        resolution: Resolution,
    ) -> Handled {
        if let (Some(snapshot), Some(store)) = (&resolution.write_through, &store) {
            if let Err(e) = store.put(&key, snapshot).await {
                warn!("Failed to cache {}: {}", key, e);
            }
        }

        let refresh = match store {
            Some(store) if resolution.refresh => Some(tokio::spawn(refresh_entry(
                self.network.clone(),
                store,
                request,
                key.clone(),
                resolution.response.clone(),
            ))),
            _ => None,
        };

        debug!(
            key = %key,
            %priority,
            source = %resolution.source,
            status = resolution.response.status,
            "request answered"
        );
        Handled {
            response: resolution.response,
            source: resolution.source,
            priority,
            refresh,
        }
    }

    /// Open the current namespace; failures degrade to cache misses
    async fn open_store(&self) -> Option<Arc<dyn CacheStore>> {
        match self.storage.open(&self.version.cache_name()).await {
            Ok(store) => Some(store),
            Err(e) => {
                warn!("Cache unavailable, serving without it: {}", e);
                None
            }
        }
    }
}

async fn probe(store: Option<&Arc<dyn CacheStore>>, key: &str) -> Probe {
    let Some(store) = store else {
        return Probe::Missed;
    };
    match store.lookup(key).await {
        Ok(Some(response)) => Probe::Found(response),
        Ok(None) => Probe::Missed,
        Err(e) => {
            warn!("Cache lookup for {} failed: {}", key, e);
            Probe::Missed
        }
    }
}

async fn probe_any(store: Option<&Arc<dyn CacheStore>>, keys: &[String]) -> Probe {
    for key in keys {
        if let found @ Probe::Found(_) = probe(store, key).await {
            return found;
        }
    }
    Probe::Missed
}

/// Stored keys naming the same path, unqueried ones first
async fn probe_ignoring_query(
    store: Option<&Arc<dyn CacheStore>>,
    identity: &PathIdentity,
) -> Probe {
    let Some(cache) = store else {
        return Probe::Missed;
    };
    let keys = match cache.keys().await {
        Ok(keys) => keys,
        Err(e) => {
            warn!("Listing cache keys failed: {}", e);
            return Probe::Missed;
        }
    };

    let mut candidates: Vec<String> = keys
        .into_iter()
        .filter(|k| identity.matches_key_ignoring_query(k))
        .collect();
    candidates.sort_by_key(|k| k.contains('?'));

    probe_any(store, &candidates).await
}

/// Re-fetch a served entry and overwrite it when the content changed
async fn refresh_entry(
    network: Arc<dyn Network>,
    store: Arc<dyn CacheStore>,
    request: Request,
    key: String,
    served: Response,
) {
    match network.fetch(&request).await {
        Ok(fresh) if fresh.is_ok() => {
            if same_content(&served, &fresh) {
                debug!("Refresh of {} unchanged", key);
                return;
            }
            match store.put(&key, &fresh).await {
                Ok(()) => debug!("Refreshed {}", key),
                Err(e) => warn!("Failed to store refreshed {}: {}", key, e),
            }
        }
        Ok(fresh) => debug!("Refresh of {} returned {}, keeping cache", key, fresh.status),
        Err(e) => debug!("Refresh of {} failed, keeping cache: {}", key, e),
    }
}
