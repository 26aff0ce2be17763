//! Shared fixtures for handler tests.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use tempfile::TempDir;

use sitehub_core::domain::{OriginRoutes, SiteRegistry};
use sitehub_core::ports::{FetchError, OriginClient, OriginResponse};
use sitehub_infra::{DiskAssetCache, RateLimitConfig, SlidingWindowRateLimiter};

use crate::state::AppState;

pub const ORIGIN: &str = "http://origin.test";

/// Origin double answering from a fixed table; unknown URLs get a 404.
#[derive(Default)]
pub struct StaticOrigin {
    bodies: HashMap<String, &'static str>,
    calls: AtomicUsize,
}

impl StaticOrigin {
    pub fn with(mut self, url: &str, body: &'static str) -> Self {
        self.bodies.insert(url.to_string(), body);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OriginClient for StaticOrigin {
    async fn get(&self, url: &str) -> Result<OriginResponse, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let (status, body) = match self.bodies.get(url) {
            Some(body) => (200, *body),
            None => (404, ""),
        };
        Ok(OriginResponse {
            status,
            location: None,
            body: futures::stream::once(async move { Ok(Bytes::from_static(body.as_bytes())) })
                .boxed(),
        })
    }
}

pub fn write_file(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

/// State rooted in `dir`: sites under `dir/sites`, CDN cache under `dir/cdn`.
pub fn state(
    dir: &TempDir,
    origin: Arc<StaticOrigin>,
    sites: SiteRegistry,
    limits: RateLimitConfig,
) -> AppState {
    let assets = DiskAssetCache::new(dir.path().join("cdn"), origin);
    AppState::from_parts(
        Arc::new(SlidingWindowRateLimiter::new(limits)),
        Arc::new(assets),
        OriginRoutes::standard(ORIGIN),
        sites,
        dir.path().join("sites"),
    )
}

/// Full middleware stack and routes around `state`, as `main` wires them.
macro_rules! init_app {
    ($state:expr) => {{
        let state: $crate::state::AppState = $state;
        actix_web::test::init_service(
            actix_web::App::new()
                .wrap($crate::middleware::RequestGuard::new(1024 * 1024))
                .wrap($crate::middleware::RateLimitMiddleware::new(state.limiter.clone()))
                .wrap($crate::observability::RequestIdMiddleware)
                .app_data(actix_web::web::Data::new(state))
                .configure($crate::handlers::configure_routes),
        )
        .await
    }};
}

pub(crate) use init_app;

/// Request with the Host header and peer address a real connection carries.
pub fn get(uri: &str) -> actix_web::test::TestRequest {
    actix_web::test::TestRequest::get()
        .uri(uri)
        .insert_header((actix_web::http::header::HOST, "localhost:8080"))
        .peer_addr("10.1.2.3:40000".parse().unwrap())
}
