//! CDN proxy: `/cdn/<path>` served from the disk cache, filled on first use.

use actix_web::http::StatusCode;
use actix_web::{HttpRequest, HttpResponse, web};
use bytes::Bytes;

use sitehub_core::domain::{CacheKey, mime};

use crate::middleware::error::{AppError, AppResult};
use crate::observability::RequestId;
use crate::responder::IMMUTABLE_CACHE_CONTROL;
use crate::state::AppState;

/// GET /cdn/{path}
pub async fn proxy(
    req: HttpRequest,
    path: web::Path<String>,
    request_id: RequestId,
    state: web::Data<AppState>,
) -> AppResult<HttpResponse> {
    let key = CacheKey::parse(&path)?;
    let content_type = mime::cdn_content_type(key.extension());

    let data = match state.assets.resolve(&key).await {
        Some(file) => {
            tracing::debug!(%request_id, key = %key, "CDN cache hit");
            tokio::fs::read(&file)
                .await
                .map_err(|e| AppError::internal("Failed to read cache file", e))?
        }
        None => {
            let url = state.routes.url_for(&key);
            tracing::info!(%request_id, key = %key, %url, "CDN cache miss, fetching");
            let file = state.assets.fetch(&url, &key).await?;
            tokio::fs::read(&file)
                .await
                .map_err(|e| AppError::internal("Failed to read downloaded file", e))?
        }
    };

    state
        .responder
        .respond(
            &req,
            StatusCode::OK,
            content_type,
            Bytes::from(data),
            Some(IMMUTABLE_CACHE_CONTROL),
        )
        .await
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use actix_web::http::header;
    use actix_web::test;
    use tempfile::TempDir;

    use sitehub_core::domain::SiteRegistry;
    use sitehub_infra::RateLimitConfig;

    use crate::test_support::{ORIGIN, StaticOrigin, get, init_app, state, write_file};

    const CSS: &str = ".btn{color:red}";

    #[actix_web::test]
    async fn test_miss_fetches_then_hits_cache() {
        let dir = TempDir::new().unwrap();
        let origin = Arc::new(
            StaticOrigin::default().with(&format!("{ORIGIN}/npm/lib@1.0.0/a.css"), CSS),
        );
        let app = init_app!(state(
            &dir,
            origin.clone(),
            SiteRegistry::default(),
            RateLimitConfig::default()
        ));

        for _ in 0..2 {
            let resp = test::call_service(&app, get("/cdn/npm/lib@1.0.0/a.css").to_request()).await;
            assert_eq!(resp.status(), 200);
            assert_eq!(
                resp.headers().get(header::CONTENT_TYPE).unwrap(),
                "text/css; charset=UTF-8"
            );
            assert_eq!(
                resp.headers().get(header::CACHE_CONTROL).unwrap(),
                "public, max-age=31536000"
            );
            assert_eq!(test::read_body(resp).await, CSS.as_bytes());
        }

        assert_eq!(origin.calls(), 1);
        assert!(dir.path().join("cdn/npm/lib@1.0.0/a.css").is_file());
    }

    #[actix_web::test]
    async fn test_serves_existing_cache_entry_without_origin() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "cdn/npm/x/font.woff2", "wOF2");
        let origin = Arc::new(StaticOrigin::default());
        let app = init_app!(state(
            &dir,
            origin.clone(),
            SiteRegistry::default(),
            RateLimitConfig::default()
        ));

        let resp = test::call_service(&app, get("/cdn/npm/x/font.woff2").to_request()).await;
        assert_eq!(resp.status(), 200);
        assert_eq!(resp.headers().get(header::CONTENT_TYPE).unwrap(), "font/woff2");
        assert_eq!(origin.calls(), 0);
    }

    #[actix_web::test]
    async fn test_empty_path_is_bad_request() {
        let dir = TempDir::new().unwrap();
        let app = init_app!(state(
            &dir,
            Arc::new(StaticOrigin::default()),
            SiteRegistry::default(),
            RateLimitConfig::default()
        ));

        let resp = test::call_service(&app, get("/cdn/").to_request()).await;
        assert_eq!(resp.status(), 400);
        assert_eq!(test::read_body(resp).await, "Bad request".as_bytes());
    }

    #[actix_web::test]
    async fn test_traversal_is_bad_request() {
        let dir = TempDir::new().unwrap();
        let app = init_app!(state(
            &dir,
            Arc::new(StaticOrigin::default()),
            SiteRegistry::default(),
            RateLimitConfig::default()
        ));

        let resp = test::call_service(&app, get("/cdn/npm/../../etc/passwd").to_request()).await;
        assert_eq!(resp.status(), 400);
    }

    #[actix_web::test]
    async fn test_upstream_failure_is_bad_gateway() {
        let dir = TempDir::new().unwrap();
        let app = init_app!(state(
            &dir,
            Arc::new(StaticOrigin::default()),
            SiteRegistry::default(),
            RateLimitConfig::default()
        ));

        let resp = test::call_service(&app, get("/cdn/npm/missing.js").to_request()).await;
        assert_eq!(resp.status(), 502);
        assert_eq!(
            test::read_body(resp).await,
            "Failed to fetch from CDN".as_bytes()
        );
        assert!(!dir.path().join("cdn/npm/missing.js").exists());
    }

    #[actix_web::test]
    async fn test_request_limit_returns_429() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "cdn/npm/a.js", "let a = 1;");
        let limits = RateLimitConfig {
            max_requests: 2,
            ..RateLimitConfig::default()
        };
        let app = init_app!(state(
            &dir,
            Arc::new(StaticOrigin::default()),
            SiteRegistry::default(),
            limits
        ));

        for _ in 0..2 {
            let resp = test::call_service(&app, get("/cdn/npm/a.js").to_request()).await;
            assert_eq!(resp.status(), 200);
        }

        let resp = test::call_service(&app, get("/cdn/npm/a.js").to_request()).await;
        assert_eq!(resp.status(), 429);
        assert!(resp.headers().contains_key(header::RETRY_AFTER));
        assert_eq!(test::read_body(resp).await, "Too Many Requests".as_bytes());
    }

    #[actix_web::test]
    async fn test_bandwidth_limit_returns_429() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "cdn/npm/a.js", "let a = 1;");
        let limits = RateLimitConfig {
            max_bytes: 15,
            ..RateLimitConfig::default()
        };
        let app = init_app!(state(
            &dir,
            Arc::new(StaticOrigin::default()),
            SiteRegistry::default(),
            limits
        ));

        let resp = test::call_service(&app, get("/cdn/npm/a.js").to_request()).await;
        assert_eq!(resp.status(), 200);

        let resp = test::call_service(&app, get("/cdn/npm/a.js").to_request()).await;
        assert_eq!(resp.status(), 429);
        assert_eq!(
            test::read_body(resp).await,
            "Bandwidth Limit Exceeded".as_bytes()
        );
    }
}
