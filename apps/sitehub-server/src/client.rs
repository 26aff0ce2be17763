//! Per-request client facts used by the rate limiter and the responder.

use actix_web::HttpRequest;
use actix_web::dev::ServiceRequest;
use actix_web::http::header::{ACCEPT_ENCODING, HeaderMap};

/// Partition key for requests whose peer address is unknown.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Client identifier: the source IP of the connection, without the port.
pub fn client_id(req: &HttpRequest) -> String {
    req.peer_addr()
        .map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

pub fn service_client_id(req: &ServiceRequest) -> String {
    client_id(req.request())
}

/// Whether `Accept-Encoding` advertises gzip.
pub fn accepts_gzip(headers: &HeaderMap) -> bool {
    headers
        .get(ACCEPT_ENCODING)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_lowercase().contains("gzip"))
        .unwrap_or(false)
}
