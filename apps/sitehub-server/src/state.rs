//! Application state - shared across all handlers.

use std::path::PathBuf;
use std::sync::Arc;

use sitehub_core::domain::{OriginRoutes, SiteRegistry};
use sitehub_core::ports::{AssetCache, OriginClient, RateLimiter};
use sitehub_infra::{DiskAssetCache, HttpOriginClient, SlidingWindowRateLimiter, load_registry};

use crate::config::AppConfig;
use crate::responder::ContentResponder;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub limiter: Arc<dyn RateLimiter>,
    pub assets: Arc<dyn AssetCache>,
    pub routes: Arc<OriginRoutes>,
    pub sites: Arc<SiteRegistry>,
    pub sites_root: Arc<PathBuf>,
    pub responder: ContentResponder,
}

impl AppState {
    /// Build the application state from configuration.
    ///
    /// A missing or unreadable `sites.json` leaves the registry empty; the CDN
    /// proxy keeps working.
    pub async fn new(config: &AppConfig) -> anyhow::Result<Self> {
        let limiter: Arc<dyn RateLimiter> =
            Arc::new(SlidingWindowRateLimiter::new(config.rate_limit.clone()));

        let origin: Arc<dyn OriginClient> = Arc::new(HttpOriginClient::new(&config.cdn.origin)?);
        let assets: Arc<dyn AssetCache> = Arc::new(
            DiskAssetCache::new(config.cdn.cache_dir.clone(), origin)
                .with_max_redirects(config.cdn.max_redirects),
        );

        let sites = match load_registry(&config.sites_root).await {
            Ok(registry) => registry,
            Err(e) => {
                tracing::warn!(error = %e, "No site registry loaded, serving CDN only");
                SiteRegistry::default()
            }
        };

        tracing::info!(
            cache_dir = %config.cdn.cache_dir.display(),
            origin = %config.cdn.default_origin,
            "Application state initialized"
        );

        Ok(Self::from_parts(
            limiter,
            assets,
            OriginRoutes::standard(config.cdn.default_origin.clone()),
            sites,
            config.sites_root.clone(),
        ))
    }

    pub fn from_parts(
        limiter: Arc<dyn RateLimiter>,
        assets: Arc<dyn AssetCache>,
        routes: OriginRoutes,
        sites: SiteRegistry,
        sites_root: PathBuf,
    ) -> Self {
        Self {
            responder: ContentResponder::new(limiter.clone()),
            limiter,
            assets,
            routes: Arc::new(routes),
            sites: Arc::new(sites),
            sites_root: Arc::new(sites_root),
        }
    }
}
