//! Observability module - request IDs and client identification.

mod request_id;

pub use request_id::{RequestId, RequestIdMiddleware};
