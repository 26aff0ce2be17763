//! Domain-level error types.

use thiserror::Error;

/// A requested CDN path that cannot be used as a cache key.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CacheKeyError {
    #[error("Cache key is empty")]
    Empty,

    #[error("Cache key contains a disallowed segment: {0:?}")]
    InvalidSegment(String),
}

/// Failures while loading the site registry.
#[derive(Debug, Error)]
pub enum SiteConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid site config {path}: {reason}")]
    Invalid { path: String, reason: String },
}
