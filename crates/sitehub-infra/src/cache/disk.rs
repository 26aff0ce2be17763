//! On-disk asset cache with single-flight origin fetches.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Url;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use sitehub_core::domain::CacheKey;
use sitehub_core::ports::{AssetCache, BodyStream, FetchError, OriginClient};

use super::inflight::{FetchRole, FlightFailure, InFlightTracker};

pub const DEFAULT_MAX_REDIRECTS: usize = 5;

/// Asset cache mirroring cache keys as files under `root`.
///
/// Downloads stream into a hidden temporary sibling and are renamed into
/// place, so a present file is always complete. Nothing is ever evicted.
pub struct DiskAssetCache {
    root: PathBuf,
    origin: Arc<dyn OriginClient>,
    inflight: InFlightTracker,
    max_redirects: usize,
}

impl DiskAssetCache {
    pub fn new(root: impl Into<PathBuf>, origin: Arc<dyn OriginClient>) -> Self {
        Self {
            root: root.into(),
            origin,
            inflight: InFlightTracker::new(),
            max_redirects: DEFAULT_MAX_REDIRECTS,
        }
    }

    pub fn with_max_redirects(mut self, max_redirects: usize) -> Self {
        self.max_redirects = max_redirects;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn in_flight_count(&self) -> usize {
        self.inflight.in_flight_count()
    }

    async fn ensure_dirs(&self, dest: &Path) -> Result<(), FetchError> {
        fs::create_dir_all(&self.root).await?;
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Follow redirects from `url` and store the final body at `dest`.
    async fn download(&self, url: &str, key: &CacheKey, dest: &Path) -> Result<(), FetchError> {
        let mut current = url.to_string();
        let mut hops = 0;

        loop {
            tracing::info!(url = %current, key = %key, "Downloading CDN file");
            let response = self.origin.get(&current).await?;

            match response.status {
                200 => {
                    write_atomically(dest, response.body).await?;
                    tracing::info!(key = %key, "Downloaded CDN file");
                    return Ok(());
                }
                status @ (301 | 302) => {
                    let location = response
                        .location
                        .ok_or(FetchError::MissingLocation(status))?;
                    hops += 1;
                    if hops > self.max_redirects {
                        return Err(FetchError::TooManyRedirects(self.max_redirects));
                    }
                    current = resolve_location(&current, &location)?;
                    tracing::debug!(key = %key, location = %current, "Following redirect");
                }
                status => return Err(FetchError::Status(status)),
            }
        }
    }
}

async fn is_file(path: &Path) -> bool {
    fs::metadata(path)
        .await
        .map(|meta| meta.is_file())
        .unwrap_or(false)
}

fn resolve_location(current: &str, location: &str) -> Result<String, FetchError> {
    let base = Url::parse(current).map_err(|_| FetchError::InvalidLocation(current.to_string()))?;
    base.join(location)
        .map(String::from)
        .map_err(|_| FetchError::InvalidLocation(location.to_string()))
}

fn temp_path(dest: &Path) -> PathBuf {
    let name = dest
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    dest.with_file_name(format!(".{name}.{}.part", Uuid::new_v4().simple()))
}

/// Temporary download target, deleted on drop unless renamed into place.
///
/// Dropping covers both errors and a fetch future cancelled mid-body.
struct PartialFile {
    path: PathBuf,
    committed: bool,
}

impl PartialFile {
    fn new(dest: &Path) -> Self {
        Self {
            path: temp_path(dest),
            committed: false,
        }
    }
}

impl Drop for PartialFile {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path = ?self.path, error = %e, "Failed to remove partial cache file");
            }
        }
    }
}

/// Stream `body` into a temporary file and rename it over `dest`.
async fn write_atomically(dest: &Path, mut body: BodyStream) -> Result<(), FetchError> {
    let mut partial = PartialFile::new(dest);

    let mut file = fs::File::create(&partial.path).await?;
    while let Some(chunk) = body.next().await {
        file.write_all(&chunk?).await?;
    }
    file.flush().await?;
    file.sync_all().await?;
    drop(file);

    fs::rename(&partial.path, dest).await?;
    partial.committed = true;
    Ok(())
}

#[async_trait]
impl AssetCache for DiskAssetCache {
    async fn resolve(&self, key: &CacheKey) -> Option<PathBuf> {
        let path = key.to_path(&self.root);
        is_file(&path).await.then_some(path)
    }

    async fn fetch(&self, url: &str, key: &CacheKey) -> Result<PathBuf, FetchError> {
        let dest = key.to_path(&self.root);
        self.ensure_dirs(&dest).await?;

        loop {
            if is_file(&dest).await {
                tracing::debug!(key = %key, "CDN cache hit");
                return Ok(dest);
            }

            match self.inflight.try_register(key) {
                FetchRole::Fetcher(guard) => {
                    // A fill may have finished between the check and registration.
                    if is_file(&dest).await {
                        guard.complete(Ok(()));
                        return Ok(dest);
                    }

                    let result = self.download(url, key, &dest).await;
                    guard.complete(result.as_ref().map(|_| ()).map_err(FlightFailure::from));
                    return result.map(|_| dest);
                }
                FetchRole::Waiter(mut rx) => match rx.recv().await {
                    Ok(Ok(())) => return Ok(dest),
                    Ok(Err(failure)) => return Err(failure.into()),
                    Err(_) => {
                        tracing::debug!(key = %key, "In-flight fetch abandoned, retrying");
                        continue;
                    }
                },
            }
        }
    }
}
