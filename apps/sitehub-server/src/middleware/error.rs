//! Error handling - maps failures to plain-text HTTP responses.

use std::time::Duration;

use actix_web::http::header::{self, ContentType};
use actix_web::{HttpResponse, ResponseError, http::StatusCode};

use sitehub_core::CacheKeyError;
use sitehub_core::ports::FetchError;

/// Application-level error type.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Bad request")]
    BadRequest,

    #[error("Bad Request: Missing Host header")]
    MissingHost,

    #[error("Payload Too Large")]
    PayloadTooLarge,

    #[error("Forbidden")]
    Forbidden,

    #[error("{0}")]
    NotFound(&'static str),

    #[error("Too Many Requests")]
    TooManyRequests { retry_after: Duration },

    #[error("Bandwidth Limit Exceeded")]
    BandwidthExceeded,

    #[error("Failed to fetch from CDN")]
    Upstream(#[source] FetchError),

    #[error("{message}")]
    Internal {
        message: &'static str,
        #[source]
        source: std::io::Error,
    },
}

impl AppError {
    pub fn internal(message: &'static str, source: std::io::Error) -> Self {
        AppError::Internal { message, source }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest | AppError::MissingHost => StatusCode::BAD_REQUEST,
            AppError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::TooManyRequests { .. } | AppError::BandwidthExceeded => {
                StatusCode::TOO_MANY_REQUESTS
            }
            AppError::Upstream(_) => StatusCode::BAD_GATEWAY,
            AppError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            AppError::Upstream(source) => {
                tracing::error!(error = %source, "CDN proxy error");
            }
            AppError::Internal { message, source } => {
                tracing::error!(error = %source, "{}", message);
            }
            _ => {}
        }

        let mut response = HttpResponse::build(self.status_code());
        response.content_type(ContentType::plaintext());

        if let AppError::TooManyRequests { retry_after } = self {
            // Round up so clients never retry before the window moves.
            let secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
            response
                .insert_header((header::RETRY_AFTER, secs.to_string()))
                .insert_header(("X-RateLimit-Remaining", "0"));
        }

        response.body(self.to_string())
    }
}

impl From<CacheKeyError> for AppError {
    fn from(err: CacheKeyError) -> Self {
        tracing::warn!(error = %err, "Rejected CDN path");
        AppError::BadRequest
    }
}

impl From<FetchError> for AppError {
    fn from(err: FetchError) -> Self {
        match err {
            // The origin answered; storing the body failed locally.
            FetchError::Io(source) => AppError::internal("Failed to write cache file", source),
            other => AppError::Upstream(other),
        }
    }
}

/// Result type alias for handlers.
pub type AppResult<T> = Result<T, AppError>;
