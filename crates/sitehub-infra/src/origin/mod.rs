//! Upstream HTTP client.

mod http;

pub use http::{HttpOriginClient, OriginClientConfig};
