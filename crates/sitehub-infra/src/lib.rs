//! # Sitehub Infrastructure
//!
//! Concrete implementations of the ports defined in `sitehub-core`:
//! the sliding-window rate limiter, the on-disk CDN asset cache, the HTTP
//! origin client, and the site registry loader.

pub mod cache;
pub mod origin;
pub mod rate_limit;
pub mod sites;

pub use cache::{DiskAssetCache, InFlightTracker};
pub use origin::{HttpOriginClient, OriginClientConfig};
pub use rate_limit::{
    Clock, ManualClock, RateLimitConfig, SlidingWindowRateLimiter, SystemClock,
};
pub use sites::load_registry;
