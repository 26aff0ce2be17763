//! Rate limiting implementations.

mod clock;
mod memory;

pub use clock::{Clock, ManualClock, SystemClock};
pub use memory::{RateLimitConfig, SlidingWindowRateLimiter};
