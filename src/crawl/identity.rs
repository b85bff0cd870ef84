use std::collections::HashSet;
use std::fmt;

use serde::Serialize;
use url::Url;

/// Normalized URL used as the unit of visited tracking.
///
/// The fragment is always dropped; the query string is dropped when the
/// policy says so. Navigation keeps using the original URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct PageIdentity(String);

impl PageIdentity {
    pub fn new(url: &str, strip_query: bool) -> Self {
        match Url::parse(url) {
            Ok(mut parsed) => {
                parsed.set_fragment(None);
                if strip_query {
                    parsed.set_query(None);
                }
                PageIdentity(parsed.to_string())
            }
            Err(_) => {
                let mut raw = url.split('#').next().unwrap_or(url);
                if strip_query {
                    raw = raw.split('?').next().unwrap_or(raw);
                }
                PageIdentity(raw.to_string())
            }
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Path and query flattened into something usable inside a file name.
    pub fn file_stem(&self) -> String {
        let (path, query) = match Url::parse(&self.0) {
            Ok(parsed) => (
                parsed.path().to_string(),
                parsed.query().unwrap_or("").to_string(),
            ),
            Err(_) => (self.0.clone(), String::new()),
        };
        let path = path.trim_matches('/').replace('/', "_");
        let path = if path.is_empty() { "root".to_string() } else { path };
        let stem = if query.is_empty() {
            path
        } else {
            format!("{}_{}", path, query.replace(['=', '&'], "_"))
        };
        stem.chars()
            .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect()
    }
}

impl fmt::Display for PageIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Page identities already claimed by the crawl. Only ever grows.
#[derive(Debug, Clone, Default)]
pub struct VisitedSet {
    identities: HashSet<PageIdentity>,
    order: Vec<PageIdentity>,
}

impl VisitedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim an identity. Returns false if it was already visited.
    pub fn mark(&mut self, identity: &PageIdentity) -> bool {
        if !self.identities.insert(identity.clone()) {
            return false;
        }
        self.order.push(identity.clone());
        true
    }

    pub fn contains(&self, identity: &PageIdentity) -> bool {
        self.identities.contains(identity)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Identities in the order they were marked.
    pub fn in_order(&self) -> &[PageIdentity] {
        &self.order
    }
}

// ============================================================================
// Scope
// ============================================================================

/// Check whether two URLs share the same origin (scheme, host, port).
pub fn is_same_origin(base: &str, candidate: &str) -> bool {
    match (Url::parse(base), Url::parse(candidate)) {
        (Ok(a), Ok(b)) => a.origin().is_tuple() && a.origin() == b.origin(),
        _ => false,
    }
}

/// Resolve `href` against the page it was found on.
pub fn resolve_url(base: &str, href: &str) -> Option<String> {
    let base = Url::parse(base).ok()?;
    base.join(href.trim()).ok().map(|u| u.to_string())
}

/// Whether following `href` from `page_url` would load a page outside `base`.
///
/// Only http(s) targets count; `javascript:`, `mailto:` and unparsable
/// hrefs never load another origin's page.
pub fn leaves_scope(base: &str, page_url: &str, href: &str) -> bool {
    let Some(target) = Url::parse(page_url)
        .ok()
        .and_then(|page| page.join(href.trim()).ok())
    else {
        return false;
    };
    matches!(target.scheme(), "http" | "https") && !is_same_origin(base, target.as_str())
}
