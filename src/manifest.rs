//! Resource manifest for the application shell
//!
//! Two flat lists of relative URLs: the critical subset, served cache-first,
//! and the full shell, populated best-effort at install time. Entries that
//! normalize to the same identity are merged, and `critical` wins.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::path::PathIdentity;

/// Shell resources that must stay available offline
pub const DEFAULT_CRITICAL: &[&str] = &[
    "./",
    "./index.html",
    "./styles.css",
    "./app.js",
    "./i18n/i18n.js",
    "./i18n/ru.json",
    "./i18n/en.json",
    "./data/router-db.json",
];

/// Every resource that belongs to the installable shell
pub const DEFAULT_FULL: &[&str] = &[
    "./",
    "./index.html",
    "./styles.css",
    "./app.js",
    "./i18n/i18n.js",
    "./i18n/ru.json",
    "./i18n/en.json",
    "./data/router-db.json",
    "./site.webmanifest",
    "./favicon.svg",
    "./favicon.ico",
    "./favicon-16x16.png",
    "./favicon-32x32.png",
    "./apple-touch-icon.png",
    "./android-chrome-192x192.png",
    "./android-chrome-512x512.png",
    "./assets/svg/router.svg",
    "./assets/svg/huawei.svg",
    "./assets/svg/zte.svg",
    "./assets/svg/routericon.svg",
    "./assets/svg/routerlogo.svg",
    "./assets/svg/YandexInt/Yanintlogo1.svg",
    "./assets/svg/YandexInt/Yanintlogo2.svg",
    "./assets/svg/YandexInt/Yanintlogo3.svg",
];

/// Serving priority of a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Served cache-first with a background refresh
    Critical,
    /// Served network-first with cache fallback
    Ordinary,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Critical => write!(f, "critical"),
            Self::Ordinary => write!(f, "ordinary"),
        }
    }
}

/// One declared shell resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    /// URL as written in the manifest
    pub url: String,
    pub identity: PathIdentity,
    pub priority: Priority,
}

/// The application shell, in declaration order
#[derive(Debug, Clone, Default)]
pub struct ResourceManifest {
    entries: Vec<ManifestEntry>,
}

impl ResourceManifest {
    /// Build from the critical subset and the full list
    ///
    /// Critical URLs missing from the full list are still part of the shell.
    pub fn new<C, F>(critical: C, full: F) -> Self
    where
        C: IntoIterator,
        C::Item: AsRef<str>,
        F: IntoIterator,
        F::Item: AsRef<str>,
    {
        let mut manifest = Self::default();
        for url in critical {
            manifest.insert(url.as_ref(), Priority::Critical);
        }
        for url in full {
            manifest.insert(url.as_ref(), Priority::Ordinary);
        }
        manifest
    }

    /// The built-in router-reference shell
    pub fn builtin() -> Self {
        Self::new(DEFAULT_CRITICAL, DEFAULT_FULL)
    }

    fn insert(&mut self, url: &str, priority: Priority) {
        let identity = match url.split_once('?') {
            Some((path, query)) => PathIdentity::new(path).with_query(Some(query)),
            None => PathIdentity::new(url),
        };
        match self
            .entries
            .iter_mut()
            .find(|e| e.identity.key() == identity.key())
        {
            Some(existing) => {
                if priority == Priority::Critical {
                    existing.priority = Priority::Critical;
                }
            }
            None => self.entries.push(ManifestEntry {
                url: url.to_string(),
                identity,
                priority,
            }),
        }
    }

    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Priority of a request identity; anything undeclared is ordinary
    pub fn classify(&self, identity: &PathIdentity) -> Priority {
        let declared_critical = self.entries.iter().any(|e| {
            e.priority == Priority::Critical
                && (identity.matches_path(e.identity.canonical())
                    || e.identity.aliases().iter().any(|a| identity.matches_path(a)))
        });

        if declared_critical {
            Priority::Critical
        } else {
            Priority::Ordinary
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_merges_root_spellings() {
        let manifest = ResourceManifest::builtin();
        let roots = manifest
            .entries()
            .iter()
            .filter(|e| e.identity.is_root())
            .count();
        assert_eq!(roots, 1);
        assert_eq!(manifest.len(), DEFAULT_FULL.len() - 1);
        let critical = manifest
            .entries()
            .iter()
            .filter(|e| e.priority == Priority::Critical)
            .count();
        assert_eq!(critical, DEFAULT_CRITICAL.len() - 1);
    }

    #[test]
    fn critical_wins_over_ordinary() {
        let manifest = ResourceManifest::new(["app.js"], ["./app.js", "./logo.svg"]);
        assert_eq!(manifest.len(), 2);
        assert_eq!(manifest.entries()[0].priority, Priority::Critical);
        assert_eq!(manifest.entries()[1].priority, Priority::Ordinary);
    }

    #[test]
    fn classify_by_any_spelling() {
        let manifest = ResourceManifest::new(["./index.html", "./app.js"], ["./logo.svg"]);

        for path in ["/", "/index.html", "./", "index.html"] {
            assert_eq!(
                manifest.classify(&PathIdentity::new(path)),
                Priority::Critical,
                "path {:?}",
                path
            );
        }
        assert_eq!(manifest.classify(&PathIdentity::new("/app.js")), Priority::Critical);
        assert_eq!(manifest.classify(&PathIdentity::new("/logo.svg")), Priority::Ordinary);
        assert_eq!(manifest.classify(&PathIdentity::new("/unknown.js")), Priority::Ordinary);
    }

    #[test]
    fn critical_only_urls_join_the_shell() {
        let manifest = ResourceManifest::new(["./data/router-db.json"], Vec::<String>::new());
        assert_eq!(manifest.len(), 1);
        assert_eq!(manifest.entries()[0].url, "./data/router-db.json");
    }
}
