//! Network access for the cache layer
//!
//! `Network` is the fetch seam used by installation and interception.
//! A fetch that reaches the server is `Ok` whatever the status; only
//! transport failures are errors, so callers decide what a 404 means.

use crate::http::{Method, Request, Response};
use crate::path::Scope;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Transport-level fetch failure
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("Network unreachable for {url}: {reason}")]
    Unreachable { url: String, reason: String },

    #[error("Failed to read response body from {url}: {reason}")]
    Body { url: String, reason: String },

    #[error("Method {method} not supported by this network")]
    UnsupportedMethod { method: Method },

    #[error("Offline")]
    Offline,
}

/// Abstract network interface
#[async_trait]
pub trait Network: Send + Sync {
    /// Fetch a request, resolving to whatever response the server sent
    async fn fetch(&self, request: &Request) -> Result<Response, FetchError>;
}

/// HTTP network backed by `ureq`
#[derive(Debug, Clone)]
pub struct HttpNetwork {
    agent: ureq::Agent,
}

impl HttpNetwork {
    pub fn new() -> Self {
        let config = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .build();
        Self {
            agent: ureq::Agent::new_with_config(config),
        }
    }
}

impl Default for HttpNetwork {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Network for HttpNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, FetchError> {
        let agent = self.agent.clone();
        let method = request.method();
        let url = request.url().to_string();

        let joined = tokio::task::spawn_blocking({
            let url = url.clone();
            move || fetch_blocking(&agent, method, &url)
        })
        .await;

        joined.unwrap_or_else(|e| {
            Err(FetchError::Unreachable {
                url,
                reason: format!("fetch task failed: {}", e),
            })
        })
    }
}

fn fetch_blocking(agent: &ureq::Agent, method: Method, url: &str) -> Result<Response, FetchError> {
    let result = match method {
        Method::Get => agent.get(url).call(),
        Method::Head => agent.head(url).call(),
        other => return Err(FetchError::UnsupportedMethod { method: other }),
    };

    let mut response = result.map_err(|e| FetchError::Unreachable {
        url: url.to_string(),
        reason: e.to_string(),
    })?;

    let status = response.status();
    let headers = response
        .headers()
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect();

    let body = if method == Method::Head {
        Vec::new()
    } else {
        response
            .body_mut()
            .read_to_vec()
            .map_err(|e| FetchError::Body {
                url: url.to_string(),
                reason: e.to_string(),
            })?
    };

    debug!("{} {} -> {}", method, url, status.as_u16());
    Ok(Response {
        status: status.as_u16(),
        status_text: status.canonical_reason().unwrap_or_default().to_string(),
        headers,
        body,
    })
}

/// Serves the shell from a local build directory, as a static host would
///
/// Paths under the scope map onto files below `root`; the root document
/// and directories resolve to `index.html`. Missing files are 404 responses.
#[derive(Debug, Clone)]
pub struct DirectoryNetwork {
    root: PathBuf,
    scope: Scope,
}

impl DirectoryNetwork {
    pub fn new(root: impl Into<PathBuf>, scope: Scope) -> Self {
        Self {
            root: root.into(),
            scope,
        }
    }

    fn file_for(&self, request: &Request) -> Option<PathBuf> {
        let identity = self.scope.identify(request.url())?;
        let relative = identity.canonical().trim_start_matches("./");
        if relative.split('/').any(|segment| segment == ".." || segment.is_empty()) {
            return None;
        }
        Some(self.root.join(relative))
    }
}

#[async_trait]
impl Network for DirectoryNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, FetchError> {
        if !matches!(request.method(), Method::Get | Method::Head) {
            return Err(FetchError::UnsupportedMethod {
                method: request.method(),
            });
        }

        let Some(mut path) = self.file_for(request) else {
            return Ok(not_found());
        };
        if tokio::fs::metadata(&path).await.is_ok_and(|m| m.is_dir()) {
            path = path.join("index.html");
        }

        match tokio::fs::read(&path).await {
            Ok(body) => {
                let response = Response::new(200)
                    .with_status_text("OK")
                    .with_header("content-type", content_type(&path))
                    .with_header("content-length", body.len().to_string());
                if request.method() == Method::Head {
                    Ok(response)
                } else {
                    Ok(response.with_body(body))
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(not_found()),
            Err(e) => Err(FetchError::Unreachable {
                url: request.url().to_string(),
                reason: e.to_string(),
            }),
        }
    }
}

fn not_found() -> Response {
    Response::new(404)
        .with_status_text("Not Found")
        .with_header("content-type", "text/plain; charset=utf-8")
        .with_body("Not Found")
}

/// Content type from the file extension
fn content_type(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("html") => "text/html; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("js") => "text/javascript; charset=utf-8",
        Some("json") => "application/json",
        Some("webmanifest") => "application/manifest+json",
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("ico") => "image/x-icon",
        _ => "application/octet-stream",
    }
}

/// A network with no connectivity
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineNetwork;

#[async_trait]
impl Network for OfflineNetwork {
    async fn fetch(&self, _request: &Request) -> Result<Response, FetchError> {
        Err(FetchError::Offline)
    }
}
