//! Middleware modules.

pub mod error;
pub mod rate_limit;
pub mod request_guard;

pub use rate_limit::RateLimitMiddleware;
pub use request_guard::RequestGuard;
