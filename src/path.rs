//! Path normalization for cache identities
//!
//! The same resource reaches the cache under several spellings: manifest
//! entries are relative (`./app.js`), live requests are absolute
//! (`/app.js`), and the root document may be `/`, `./` or `index.html`.
//! Every spelling normalizes to one canonical identity, and the remaining
//! spellings are kept as aliases for lookups against entries stored under
//! another convention.

use url::Url;

use crate::error::{ShellcacheError, ShellcacheResult};

/// Prefix marking a path as relative to the deployment scope
pub const RELATIVE_MARKER: &str = "./";

/// File name of the root document
pub const ROOT_DOCUMENT: &str = "index.html";

/// Canonical identity of a path plus the aliases it may be stored under
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathIdentity {
    canonical: String,
    aliases: Vec<String>,
    query: Option<String>,
}

impl PathIdentity {
    /// Normalize a raw path (`/`, `/index.html`, `app.js`, `./app.js`)
    pub fn new(raw: &str) -> Self {
        let bare = bare_path(raw);

        if bare.is_empty() || bare == ROOT_DOCUMENT {
            return Self {
                canonical: format!("{}{}", RELATIVE_MARKER, ROOT_DOCUMENT),
                aliases: vec![
                    format!("/{}", ROOT_DOCUMENT),
                    ROOT_DOCUMENT.to_string(),
                    RELATIVE_MARKER.to_string(),
                    "/".to_string(),
                ],
                query: None,
            };
        }

        Self {
            canonical: format!("{}{}", RELATIVE_MARKER, bare),
            aliases: vec![format!("/{}", bare), bare.to_string()],
            query: None,
        }
    }

    /// Attach a query string; empty queries are dropped
    pub fn with_query(mut self, query: Option<&str>) -> Self {
        self.query = query.filter(|q| !q.is_empty()).map(str::to_string);
        self
    }

    /// Canonical path form, without query
    pub fn canonical(&self) -> &str {
        &self.canonical
    }

    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    pub fn is_root(&self) -> bool {
        self.canonical == format!("{}{}", RELATIVE_MARKER, ROOT_DOCUMENT)
    }

    /// Storage key: the canonical path plus the query, if any
    pub fn key(&self) -> String {
        with_query(&self.canonical, self.query.as_deref())
    }

    /// Alias keys carrying the same query as the storage key
    pub fn alias_keys(&self) -> Vec<String> {
        self.aliases
            .iter()
            .map(|alias| with_query(alias, self.query.as_deref()))
            .collect()
    }

    /// Whether a path (no query) is one of this identity's spellings
    pub fn matches_path(&self, path: &str) -> bool {
        path == self.canonical || self.aliases.iter().any(|a| a == path)
    }

    /// Whether a stored key names this resource, ignoring any query string
    pub fn matches_key_ignoring_query(&self, key: &str) -> bool {
        let path = key.split_once('?').map_or(key, |(path, _)| path);
        self.matches_path(path)
    }
}

/// Strip slashes and relative markers down to the bare path
fn bare_path(raw: &str) -> &str {
    let mut bare = raw.trim_matches('/');
    while let Some(rest) = bare.strip_prefix(RELATIVE_MARKER) {
        bare = rest.trim_start_matches('/');
    }
    if bare == "." {
        ""
    } else {
        bare
    }
}

fn with_query(path: &str, query: Option<&str>) -> String {
    match query {
        Some(q) => format!("{}?{}", path, q),
        None => path.to_string(),
    }
}

/// The deployment scope: the origin and base path the shell is served from
///
/// Manifest paths resolve against the scope, and only requests under the
/// scope's path are intercepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope {
    base: Url,
}

impl Scope {
    /// Build a scope from the configured base URL
    pub fn new(base_url: &str) -> ShellcacheResult<Self> {
        let mut base = Url::parse(base_url).map_err(|e| ShellcacheError::OriginInvalid {
            url: base_url.to_string(),
            reason: e.to_string(),
        })?;

        if base.cannot_be_a_base() {
            return Err(ShellcacheError::OriginInvalid {
                url: base_url.to_string(),
                reason: "URL cannot be used as a base".to_string(),
            });
        }

        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        base.set_query(None);
        base.set_fragment(None);

        Ok(Self { base })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Identity of a URL under this scope, or `None` when it is outside
    pub fn identify(&self, url: &Url) -> Option<PathIdentity> {
        if url.origin() != self.base.origin() {
            return None;
        }

        let scope_path = self.base.path();
        let path = url.path();
        let relative = if let Some(rest) = path.strip_prefix(scope_path) {
            rest
        } else if path == scope_path.trim_end_matches('/') {
            ""
        } else {
            return None;
        };

        Some(PathIdentity::new(relative).with_query(url.query()))
    }

    /// Absolute URL for an identity
    pub fn resolve(&self, identity: &PathIdentity) -> ShellcacheResult<Url> {
        let mut url =
            self.base
                .join(identity.canonical())
                .map_err(|e| ShellcacheError::OriginInvalid {
                    url: self.base.to_string(),
                    reason: e.to_string(),
                })?;
        url.set_query(identity.query());
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_spellings_share_identity() {
        let forms = ["/", "", "./", ".", "/index.html", "index.html", "./index.html"];
        for form in forms {
            let identity = PathIdentity::new(form);
            assert_eq!(identity.canonical(), "./index.html", "form {:?}", form);
            assert!(identity.is_root());
        }
    }

    #[test]
    fn relative_marker_added_once() {
        assert_eq!(PathIdentity::new("app.js").canonical(), "./app.js");
        assert_eq!(PathIdentity::new("./app.js").canonical(), "./app.js");
        assert_eq!(PathIdentity::new("/app.js").canonical(), "./app.js");
        assert_eq!(PathIdentity::new("/i18n/ru.json/").canonical(), "./i18n/ru.json");
    }

    #[test]
    fn aliases_cover_other_conventions() {
        let identity = PathIdentity::new("./assets/svg/zte.svg");
        assert_eq!(
            identity.aliases(),
            &["/assets/svg/zte.svg".to_string(), "assets/svg/zte.svg".to_string()]
        );
        assert!(identity.matches_path("/assets/svg/zte.svg"));
        assert!(identity.matches_path("assets/svg/zte.svg"));
        assert!(!identity.matches_path("/assets/svg/huawei.svg"));
    }

    #[test]
    fn nested_index_is_not_root() {
        let identity = PathIdentity::new("/docs/index.html");
        assert!(!identity.is_root());
        assert_eq!(identity.canonical(), "./docs/index.html");
    }

    #[test]
    fn query_carried_in_keys() {
        let identity = PathIdentity::new("/").with_query(Some("_refresh=1"));
        assert_eq!(identity.key(), "./index.html?_refresh=1");
        assert!(identity
            .alias_keys()
            .contains(&"/?_refresh=1".to_string()));
        assert!(identity.matches_key_ignoring_query("./index.html"));
        assert!(identity.matches_key_ignoring_query("./?v=3"));
    }

    #[test]
    fn empty_query_dropped() {
        let identity = PathIdentity::new("app.js").with_query(Some(""));
        assert_eq!(identity.key(), "./app.js");
    }

    #[test]
    fn scope_identifies_requests_under_base_path() {
        let scope = Scope::new("https://example.org/routers").unwrap();
        assert_eq!(scope.base().as_str(), "https://example.org/routers/");

        let url = Url::parse("https://example.org/routers/app.js").unwrap();
        assert_eq!(scope.identify(&url).unwrap().canonical(), "./app.js");

        let root = Url::parse("https://example.org/routers").unwrap();
        assert!(scope.identify(&root).unwrap().is_root());

        let outside = Url::parse("https://example.org/other/app.js").unwrap();
        assert!(scope.identify(&outside).is_none());

        let foreign = Url::parse("https://cdn.example.net/routers/app.js").unwrap();
        assert!(scope.identify(&foreign).is_none());
    }

    #[test]
    fn scope_resolves_identities() {
        let scope = Scope::new("https://example.org/routers/").unwrap();
        let url = scope.resolve(&PathIdentity::new("./i18n/en.json")).unwrap();
        assert_eq!(url.as_str(), "https://example.org/routers/i18n/en.json");

        let root = scope.resolve(&PathIdentity::new("./")).unwrap();
        assert_eq!(root.as_str(), "https://example.org/routers/index.html");
    }

    #[test]
    fn scope_rejects_garbage() {
        assert!(Scope::new("not a url").is_err());
        assert!(Scope::new("mailto:admin@example.org").is_err());
    }
}
