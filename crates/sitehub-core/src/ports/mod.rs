//! Ports - trait definitions for external dependencies.
//! These are the "interfaces" that infrastructure must implement.

mod cache;
mod origin;
mod rate_limit;

pub use cache::AssetCache;
pub use origin::{BodyStream, FetchError, OriginClient, OriginResponse};
pub use rate_limit::{RateLimitError, RateLimitResult, RateLimiter};
