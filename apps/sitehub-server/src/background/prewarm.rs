//! Cache pre-warming - fetches well-known assets before the first request
//! asks for them.

use std::sync::Arc;

use sitehub_core::domain::PrewarmAsset;
use sitehub_core::ports::AssetCache;

/// Fetch every asset not already cached. Failures are logged and skipped.
///
/// Returns the number of assets present in the cache afterwards.
pub async fn prewarm(assets: Arc<dyn AssetCache>, items: Vec<PrewarmAsset>) -> usize {
    let mut ready = 0;

    for item in &items {
        if assets.resolve(&item.key).await.is_some() {
            ready += 1;
            continue;
        }

        match assets.fetch(&item.url, &item.key).await {
            Ok(_) => {
                tracing::info!(key = %item.key, "Pre-warmed CDN asset");
                ready += 1;
            }
            Err(e) => tracing::warn!(key = %item.key, url = %item.url, error = %e, "Pre-warm failed"),
        }
    }

    tracing::info!(ready, total = items.len(), "CDN pre-warm finished");
    ready
}
