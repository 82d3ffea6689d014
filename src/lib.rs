//! shellcache - offline cache for an installable web application shell
//!
//! Installs a versioned snapshot of a static application shell into a
//! namespaced cache, then answers requests for it: critical resources
//! cache-first with a background refresh, everything else network-first
//! with a cache fallback, and a 503 placeholder when both fail.

pub mod cli;
pub mod config;
pub mod error;
pub mod http;
pub mod journal;
pub mod manifest;
pub mod network;
pub mod path;
pub mod store;
pub mod ui;
pub mod worker;

#[cfg(test)]
mod testing;

pub use error::{ShellcacheError, ShellcacheResult};
