//! Upstream origin port.

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;

/// Streamed response body.
pub type BodyStream = BoxStream<'static, Result<Bytes, FetchError>>;

/// A single upstream response. Redirects are surfaced, never followed.
pub struct OriginResponse {
    pub status: u16,
    pub location: Option<String>,
    pub body: BodyStream,
}

impl std::fmt::Debug for OriginResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OriginResponse")
            .field("status", &self.status)
            .field("location", &self.location)
            .finish_non_exhaustive()
    }
}

/// HTTP client used to reach the CDN origins.
#[async_trait]
pub trait OriginClient: Send + Sync {
    /// Issue a GET for `url` without following redirects.
    async fn get(&self, url: &str) -> Result<OriginResponse, FetchError>;
}

/// Upstream fetch errors.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("Failed to download: {0}")]
    Status(u16),

    #[error("Redirect {0} without a Location header")]
    MissingLocation(u16),

    #[error("Invalid redirect target {0}")]
    InvalidLocation(String),

    #[error("Too many redirects (limit {0})")]
    TooManyRedirects(usize),

    #[error("Upstream request timed out")]
    Timeout,

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Cache write failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Concurrent fetch failed: {0}")]
    Coalesced(String),
}
