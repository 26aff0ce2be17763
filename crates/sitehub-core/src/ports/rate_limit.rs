//! Rate limiting port.

use async_trait::async_trait;
use std::time::Duration;

/// Rate limiter trait - per-client request and traffic budgets.
#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Admit one request for `key`. A rejected attempt is not recorded.
    async fn check(&self, key: &str) -> Result<RateLimitResult, RateLimitError>;

    /// Admit a response payload of `bytes` for `key`. A rejected payload is not recorded.
    async fn check_traffic(&self, key: &str, bytes: u64)
    -> Result<RateLimitResult, RateLimitError>;
}

/// Result of a rate limit check.
///
/// `remaining` is measured in the unit of the check: requests for
/// [`RateLimiter::check`], bytes for [`RateLimiter::check_traffic`].
#[derive(Debug, Clone)]
pub struct RateLimitResult {
    pub allowed: bool,
    pub remaining: u64,
    pub reset_after: Duration,
}

/// Rate limit errors.
#[derive(Debug, thiserror::Error)]
pub enum RateLimitError {
    #[error("Backend error: {0}")]
    Backend(String),
}
