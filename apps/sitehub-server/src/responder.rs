//! Content responder - compression negotiation plus bandwidth accounting.

use std::io::Write;
use std::sync::Arc;

use actix_web::http::StatusCode;
use actix_web::http::header;
use actix_web::{HttpRequest, HttpResponse};
use bytes::Bytes;
use flate2::Compression;
use flate2::write::GzEncoder;

use sitehub_core::domain::mime;
use sitehub_core::ports::RateLimiter;

use crate::client::{accepts_gzip, client_id};
use crate::middleware::error::{AppError, AppResult};

/// Payloads below this size are sent as-is.
pub const MIN_COMPRESS_BYTES: usize = 1024;

/// Payloads above this size are never compressed.
pub const MAX_COMPRESS_BYTES: usize = 5 * 1024 * 1024;

/// Cache directive for immutable, versioned assets.
pub const IMMUTABLE_CACHE_CONTROL: &str = "public, max-age=31536000";

/// Builds final responses for payloads held in memory.
///
/// Every payload is charged against the client's traffic budget at the size
/// actually sent (compressed size when gzip is used). When the budget is
/// exhausted the payload is dropped and a 429 is returned instead.
#[derive(Clone)]
pub struct ContentResponder {
    limiter: Arc<dyn RateLimiter>,
}

fn gzip(payload: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::with_capacity(payload.len() / 2), Compression::default());
    encoder.write_all(payload)?;
    encoder.finish()
}

impl ContentResponder {
    pub fn new(limiter: Arc<dyn RateLimiter>) -> Self {
        Self { limiter }
    }

    /// Respond to `req`, taking the client id and gzip support from it.
    pub async fn respond(
        &self,
        req: &HttpRequest,
        status: StatusCode,
        content_type: &str,
        payload: Bytes,
        cache_control: Option<&str>,
    ) -> AppResult<HttpResponse> {
        self.respond_for(
            &client_id(req),
            accepts_gzip(req.headers()),
            status,
            content_type,
            payload,
            cache_control,
        )
        .await
    }

    pub async fn respond_for(
        &self,
        client: &str,
        gzip_accepted: bool,
        status: StatusCode,
        content_type: &str,
        payload: Bytes,
        cache_control: Option<&str>,
    ) -> AppResult<HttpResponse> {
        let effective_type = mime::with_charset(content_type);
        let compressible = mime::is_compressible(content_type);

        let mut response = HttpResponse::build(status);
        response.insert_header((header::CONTENT_TYPE, effective_type));
        if let Some(directive) = cache_control {
            response.insert_header((header::CACHE_CONTROL, directive));
        }

        if payload.len() > MAX_COMPRESS_BYTES {
            tracing::debug!(
                client,
                size = payload.len(),
                "Large payload, skipping compression"
            );
            self.admit(client, payload.len()).await?;
            return Ok(response.body(payload));
        }

        if compressible {
            response.insert_header((header::VARY, "Accept-Encoding"));
        }

        if payload.len() < MIN_COMPRESS_BYTES || !compressible || !gzip_accepted {
            self.admit(client, payload.len()).await?;
            return Ok(response.body(payload));
        }

        match gzip(&payload) {
            Ok(compressed) => {
                self.admit(client, compressed.len()).await?;
                response.insert_header((header::CONTENT_ENCODING, "gzip"));
                Ok(response.body(compressed))
            }
            Err(e) => {
                tracing::warn!(error = %e, "Compression failed, sending uncompressed");
                self.admit(client, payload.len()).await?;
                Ok(response.body(payload))
            }
        }
    }

    async fn admit(&self, client: &str, bytes: usize) -> AppResult<()> {
        match self.limiter.check_traffic(client, bytes as u64).await {
            Ok(result) if !result.allowed => Err(AppError::BandwidthExceeded),
            Ok(_) => Ok(()),
            Err(e) => {
                tracing::error!(error = %e, "Rate limiter error, failing open");
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::ResponseError;
    use actix_web::body::{BodySize, MessageBody, to_bytes};
    use flate2::read::GzDecoder;
    use sitehub_infra::{RateLimitConfig, SlidingWindowRateLimiter};
    use std::io::Read;

    fn responder(max_bytes: u64) -> ContentResponder {
        let config = RateLimitConfig {
            max_bytes,
            ..RateLimitConfig::default()
        };
        ContentResponder::new(Arc::new(SlidingWindowRateLimiter::new(config)))
    }

    fn css(len: usize) -> Bytes {
        let rule = ".btn { color: #333; padding: 4px 8px; }\n";
        Bytes::from(rule.repeat(len / rule.len() + 1)[..len].to_string())
    }

    async fn send(
        responder: &ContentResponder,
        gzip: bool,
        content_type: &str,
        payload: Bytes,
    ) -> (StatusCode, header::HeaderMap, Bytes, BodySize) {
        let response = responder
            .respond_for("10.0.0.1", gzip, StatusCode::OK, content_type, payload, None)
            .await
            .unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        // Content-Length is written from the body size by the HTTP layer.
        let size = response.body().size();
        let body = to_bytes(response.into_body()).await.unwrap();
        (status, headers, body, size)
    }

    #[actix_web::test]
    async fn test_compresses_text_when_accepted() {
        let responder = responder(u64::MAX);
        let payload = css(2000);

        let (_, headers, body, size) = send(&responder, true, "text/css", payload.clone()).await;

        assert_eq!(headers.get(header::CONTENT_ENCODING).unwrap(), "gzip");
        assert_eq!(size, BodySize::Sized(body.len() as u64));
        assert_eq!(
            headers.get(header::CONTENT_TYPE).unwrap(),
            "text/css; charset=UTF-8"
        );
        assert!(body.len() < 2000);

        let mut decoded = Vec::new();
        GzDecoder::new(&body[..]).read_to_end(&mut decoded).unwrap();
        assert_eq!(decoded, payload);
    }

    #[actix_web::test]
    async fn test_uncompressed_without_accept_encoding() {
        let responder = responder(u64::MAX);
        let (_, headers, body, size) = send(&responder, false, "text/css", css(2000)).await;

        assert!(headers.get(header::CONTENT_ENCODING).is_none());
        assert_eq!(size, BodySize::Sized(2000));
        assert_eq!(body.len(), 2000);
    }

    #[actix_web::test]
    async fn test_large_payload_never_compressed() {
        let responder = responder(u64::MAX);
        let payload = Bytes::from(vec![b'a'; 6 * 1024 * 1024]);

        let (_, headers, body, _) = send(&responder, true, "text/plain", payload).await;

        assert!(headers.get(header::CONTENT_ENCODING).is_none());
        assert_eq!(body.len(), 6 * 1024 * 1024);
    }

    #[actix_web::test]
    async fn test_small_and_binary_payloads_uncompressed() {
        let responder = responder(u64::MAX);

        let (_, headers, body, _) = send(&responder, true, "text/css", css(1023)).await;
        assert!(headers.get(header::CONTENT_ENCODING).is_none());
        assert_eq!(body.len(), 1023);

        let (_, headers, _, _) = send(&responder, true, "font/woff2", Bytes::from(vec![0u8; 4096])).await;
        assert!(headers.get(header::CONTENT_ENCODING).is_none());
        assert_eq!(headers.get(header::CONTENT_TYPE).unwrap(), "font/woff2");
    }

    #[actix_web::test]
    async fn test_budget_charged_at_compressed_size() {
        // 2000 bytes of repetitive CSS gzip to well under 200 bytes.
        let responder = responder(200);
        let (status, _, _, _) = send(&responder, true, "text/css", css(2000)).await;
        assert_eq!(status, StatusCode::OK);

        let err = responder
            .respond_for("10.0.0.1", false, StatusCode::OK, "text/css", css(2000), None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BandwidthExceeded));
        assert_eq!(err.status_code(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[actix_web::test]
    async fn test_cache_control_applied() {
        let responder = responder(u64::MAX);
        let response = responder
            .respond_for(
                "10.0.0.1",
                true,
                StatusCode::OK,
                "application/javascript",
                Bytes::from_static(b"x"),
                Some(IMMUTABLE_CACHE_CONTROL),
            )
            .await
            .unwrap();
        assert_eq!(
            response.headers().get(header::CACHE_CONTROL).unwrap(),
            "public, max-age=31536000"
        );
    }
}
