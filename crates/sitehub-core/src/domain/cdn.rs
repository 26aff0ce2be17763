//! Origin routing for the CDN proxy.

use super::CacheKey;

pub const DEFAULT_ORIGIN: &str = "https://cdn.jsdelivr.net";

/// Tailwind's play CDN is a single script served from its own host.
pub const TAILWIND_PREFIX: &str = "tailwindcss/";
pub const TAILWIND_ORIGIN: &str = "https://cdn.tailwindcss.com";

/// Assets fetched eagerly at startup.
const PREWARM_KEYS: &[&str] = &[
    "npm/daisyui@4.12.24/dist/full.min.css",
    "npm/alpinejs@3.13.3/dist/cdn.min.js",
    "npm/crypto-js@4.2.0/crypto-js.min.js",
];

/// A key prefix served by a fixed URL instead of the default origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinnedOrigin {
    pub prefix: String,
    pub url: String,
}

/// Maps cache keys to upstream URLs.
#[derive(Debug, Clone)]
pub struct OriginRoutes {
    default_origin: String,
    pinned: Vec<PinnedOrigin>,
}

impl OriginRoutes {
    pub fn new(default_origin: impl Into<String>) -> Self {
        Self {
            default_origin: default_origin.into().trim_end_matches('/').to_string(),
            pinned: Vec::new(),
        }
    }

    /// `default_origin` plus the built-in pinned routes.
    pub fn standard(default_origin: impl Into<String>) -> Self {
        Self::new(default_origin).with_pinned(TAILWIND_PREFIX, TAILWIND_ORIGIN)
    }

    pub fn with_pinned(mut self, prefix: impl Into<String>, url: impl Into<String>) -> Self {
        self.pinned.push(PinnedOrigin {
            prefix: prefix.into(),
            url: url.into(),
        });
        self
    }

    /// Upstream URL for `key`: the pinned URL when a prefix matches, otherwise
    /// the key appended to the default origin.
    pub fn url_for(&self, key: &CacheKey) -> String {
        self.pinned
            .iter()
            .find(|pin| key.as_str().starts_with(&pin.prefix))
            .map(|pin| pin.url.clone())
            .unwrap_or_else(|| format!("{}/{}", self.default_origin, key))
    }

    pub fn default_origin(&self) -> &str {
        &self.default_origin
    }
}

impl Default for OriginRoutes {
    fn default() -> Self {
        Self::standard(DEFAULT_ORIGIN)
    }
}

/// An asset to fetch before the first request asks for it.
#[derive(Debug, Clone)]
pub struct PrewarmAsset {
    pub key: CacheKey,
    pub url: String,
}

/// The well-known assets every site template pulls in.
pub fn default_prewarm_assets(routes: &OriginRoutes) -> Vec<PrewarmAsset> {
    PREWARM_KEYS
        .iter()
        .filter_map(|raw| CacheKey::parse(raw).ok())
        .map(|key| PrewarmAsset {
            url: routes.url_for(&key),
            key,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_origin_appends_key() {
        let routes = OriginRoutes::default();
        let key = CacheKey::parse("npm/alpinejs@3.13.3/dist/cdn.min.js").unwrap();
        assert_eq!(
            routes.url_for(&key),
            "https://cdn.jsdelivr.net/npm/alpinejs@3.13.3/dist/cdn.min.js"
        );
    }

    #[test]
    fn test_pinned_prefix_uses_fixed_url() {
        let routes = OriginRoutes::default();
        let key = CacheKey::parse("tailwindcss/tailwind.js").unwrap();
        assert_eq!(routes.url_for(&key), "https://cdn.tailwindcss.com");
    }

    #[test]
    fn test_trailing_slash_on_origin() {
        let routes = OriginRoutes::new("http://mirror.local/");
        let key = CacheKey::parse("npm/a.js").unwrap();
        assert_eq!(routes.url_for(&key), "http://mirror.local/npm/a.js");
    }

    #[test]
    fn test_prewarm_assets_follow_routes() {
        let routes = OriginRoutes::new("http://mirror.local");
        let assets = default_prewarm_assets(&routes);
        assert_eq!(assets.len(), 3);
        assert!(assets.iter().all(|a| a.url.starts_with("http://mirror.local/npm/")));
    }
}
