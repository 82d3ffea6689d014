//! Test doubles shared by unit tests

use crate::http::{Request, Response};
use crate::network::{FetchError, Network};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;
use url::Url;

pub(crate) const BASE: &str = "https://example.org/";

pub(crate) fn url(path: &str) -> Url {
    Url::parse(BASE).unwrap().join(path).unwrap()
}

pub(crate) fn ok(body: &str) -> Response {
    Response::new(200)
        .with_status_text("OK")
        .with_header("content-type", "text/plain")
        .with_body(body)
}

/// Network that answers from a table keyed by URL path
#[derive(Default)]
pub(crate) struct ScriptedNetwork {
    routes: Mutex<HashMap<String, Response>>,
    offline: AtomicBool,
    calls: AtomicUsize,
    gate: Option<Arc<Semaphore>>,
}

impl ScriptedNetwork {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Network whose fetches block until the returned semaphore gets permits
    pub(crate) fn gated() -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        let network = Self {
            gate: Some(gate.clone()),
            ..Self::default()
        };
        (network, gate)
    }

    pub(crate) fn route(self, path: &str, response: Response) -> Self {
        self.set(path, response);
        self
    }

    pub(crate) fn set(&self, path: &str, response: Response) {
        self.routes
            .lock()
            .unwrap()
            .insert(path.to_string(), response);
    }

    pub(crate) fn go_offline(&self) {
        self.offline.store(true, Ordering::SeqCst);
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Network for ScriptedNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }
        if self.offline.load(Ordering::SeqCst) {
            return Err(FetchError::Offline);
        }

        let routes = self.routes.lock().unwrap();
        Ok(routes
            .get(request.url().path())
            .cloned()
            .unwrap_or_else(|| Response::new(404).with_status_text("Not Found")))
    }
}
