//! In-memory sliding-window rate limiter.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use indexmap::IndexMap;
use tokio::sync::Mutex;

use sitehub_core::ports::{RateLimitError, RateLimitResult, RateLimiter};

use super::clock::{Clock, SystemClock};

/// In-memory rate limiter configuration.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Maximum admitted requests per client per window.
    pub max_requests: u32,
    /// Maximum response bytes per client per window.
    pub max_bytes: u64,
    /// Window duration.
    pub window: Duration,
    /// Clients tracked per registry before the oldest-inserted is evicted.
    pub max_clients: usize,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 1000,
            max_bytes: 100 * 1024 * 1024,
            window: Duration::from_secs(60),
            max_clients: 10_000,
        }
    }
}

impl RateLimitConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_requests: std::env::var("RATE_LIMIT_MAX_REQUESTS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_requests),
            max_bytes: std::env::var("RATE_LIMIT_MAX_BYTES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_bytes),
            window: std::env::var("RATE_LIMIT_WINDOW_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.window),
            max_clients: std::env::var("RATE_LIMIT_MAX_CLIENTS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_clients),
        }
    }
}

/// Per-client sliding windows over request timestamps and response sizes.
///
/// Each registry keeps clients in insertion order; when it grows past
/// `max_clients` the oldest-inserted client is dropped, regardless of how
/// recently it was seen. Expired samples are pruned only when their client
/// is inspected again.
///
/// Limits are per-process, not distributed across instances.
pub struct SlidingWindowRateLimiter<C: Clock = SystemClock> {
    config: RateLimitConfig,
    clock: C,
    requests: Mutex<IndexMap<String, VecDeque<Instant>>>,
    traffic: Mutex<IndexMap<String, VecDeque<(Instant, u64)>>>,
}

impl SlidingWindowRateLimiter<SystemClock> {
    pub fn new(config: RateLimitConfig) -> Self {
        Self::with_clock(config, SystemClock)
    }

    pub fn from_env() -> Self {
        Self::new(RateLimitConfig::from_env())
    }
}

impl<C: Clock> SlidingWindowRateLimiter<C> {
    pub fn with_clock(config: RateLimitConfig, clock: C) -> Self {
        Self {
            config,
            clock,
            requests: Mutex::new(IndexMap::new()),
            traffic: Mutex::new(IndexMap::new()),
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Number of clients in the request-count registry.
    pub async fn tracked_clients(&self) -> usize {
        self.requests.lock().await.len()
    }

    /// Number of clients in the traffic registry.
    pub async fn tracked_traffic_clients(&self) -> usize {
        self.traffic.lock().await.len()
    }

    pub async fn is_tracked(&self, key: &str) -> bool {
        self.requests.lock().await.contains_key(key)
    }

    pub async fn is_traffic_tracked(&self, key: &str) -> bool {
        self.traffic.lock().await.contains_key(key)
    }

    fn expired(&self, now: Instant, at: Instant) -> bool {
        now.saturating_duration_since(at) >= self.config.window
    }

    fn reset_after(&self, now: Instant, oldest: Option<Instant>) -> Duration {
        oldest
            .map(|at| {
                self.config
                    .window
                    .saturating_sub(now.saturating_duration_since(at))
            })
            .unwrap_or(Duration::ZERO)
    }

    fn evict_overflow<V>(&self, registry: &mut IndexMap<String, V>) {
        if registry.len() > self.config.max_clients {
            if let Some((evicted, _)) = registry.shift_remove_index(0) {
                tracing::debug!(client = %evicted, "Evicted oldest rate limit entry");
            }
        }
    }
}

#[async_trait]
impl<C: Clock + 'static> RateLimiter for SlidingWindowRateLimiter<C> {
    async fn check(&self, key: &str) -> Result<RateLimitResult, RateLimitError> {
        let now = self.clock.now();
        let limit = u64::from(self.config.max_requests);
        let mut registry = self.requests.lock().await;

        let timestamps = registry.entry(key.to_string()).or_default();
        while timestamps
            .front()
            .is_some_and(|&at| self.expired(now, at))
        {
            timestamps.pop_front();
        }

        let count = timestamps.len() as u64;
        if count >= limit {
            let reset_after = self.reset_after(now, timestamps.front().copied());
            if timestamps.is_empty() {
                // Only admitted requests occupy a registry slot.
                registry.shift_remove(key);
            }
            tracing::warn!(
                client = %key,
                current = count,
                limit,
                "Request rate limit exceeded"
            );
            return Ok(RateLimitResult {
                allowed: false,
                remaining: 0,
                reset_after,
            });
        }

        timestamps.push_back(now);
        let result = RateLimitResult {
            allowed: true,
            remaining: limit - count - 1,
            reset_after: self.reset_after(now, timestamps.front().copied()),
        };

        self.evict_overflow(&mut registry);
        Ok(result)
    }

    async fn check_traffic(
        &self,
        key: &str,
        bytes: u64,
    ) -> Result<RateLimitResult, RateLimitError> {
        let now = self.clock.now();
        let limit = self.config.max_bytes;
        let mut registry = self.traffic.lock().await;

        let samples = registry.entry(key.to_string()).or_default();
        while samples
            .front()
            .is_some_and(|&(at, _)| self.expired(now, at))
        {
            samples.pop_front();
        }

        let current: u64 = samples.iter().map(|&(_, size)| size).sum();
        if current.saturating_add(bytes) > limit {
            let reset_after = self.reset_after(now, samples.front().map(|&(at, _)| at));
            if samples.is_empty() {
                registry.shift_remove(key);
            }
            tracing::warn!(
                client = %key,
                current,
                requested = bytes,
                limit,
                "Bandwidth limit exceeded"
            );
            return Ok(RateLimitResult {
                allowed: false,
                remaining: limit.saturating_sub(current),
                reset_after,
            });
        }

        samples.push_back((now, bytes));
        tracing::debug!(
            client = %key,
            current,
            requested = bytes,
            total = current + bytes,
            limit,
            "Traffic admitted"
        );
        let result = RateLimitResult {
            allowed: true,
            remaining: limit - current - bytes,
            reset_after: self.reset_after(now, samples.front().map(|&(at, _)| at)),
        };

        self.evict_overflow(&mut registry);
        Ok(result)
    }
}
