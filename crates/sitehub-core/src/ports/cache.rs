use async_trait::async_trait;
use std::path::PathBuf;

use super::FetchError;
use crate::domain::CacheKey;

/// Durable asset cache keyed by [`CacheKey`].
///
/// Entries are plain files; once written they are never mutated or evicted.
#[async_trait]
pub trait AssetCache: Send + Sync {
    /// Location of the cached file for `key`, if a regular file exists there.
    async fn resolve(&self, key: &CacheKey) -> Option<PathBuf>;

    /// Fetch `url` into the cache under `key` and return the file location.
    ///
    /// Returns immediately if the entry already exists. Redirects are followed
    /// but the content is always stored under `key`.
    async fn fetch(&self, url: &str, key: &CacheKey) -> Result<PathBuf, FetchError>;
}
