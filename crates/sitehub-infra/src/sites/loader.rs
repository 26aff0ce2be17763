use std::collections::HashMap;
use std::path::{Path, PathBuf};

use sitehub_core::SiteConfigError;
use sitehub_core::domain::{SiteRegistry, SitesConfig};

pub const SITES_FILE: &str = "sites.json";
pub const SITE_CONFIG_FILE: &str = "config.json";

pub fn site_dir(root: &Path, site: &str) -> PathBuf {
    root.join(site)
}

async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, SiteConfigError> {
    let raw = tokio::fs::read(path)
        .await
        .map_err(|source| SiteConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
    serde_json::from_slice(&raw).map_err(|source| SiteConfigError::Parse {
        path: path.display().to_string(),
        source,
    })
}

async fn load_site_config(root: &Path, site: &str) -> Result<serde_json::Value, SiteConfigError> {
    let path = site_dir(root, site).join(SITE_CONFIG_FILE);
    let value: serde_json::Value = read_json(&path).await?;
    if !value.is_object() {
        return Err(SiteConfigError::Invalid {
            path: path.display().to_string(),
            reason: "expected a JSON object".to_string(),
        });
    }
    Ok(value)
}

/// Load `sites.json` and the `config.json` of every enabled site.
///
/// A broken per-site config is logged and skipped; the site stays routable
/// for static files but `api/config` reports it missing.
pub async fn load_registry(root: &Path) -> Result<SiteRegistry, SiteConfigError> {
    let config: SitesConfig = read_json(&root.join(SITES_FILE)).await?;

    let mut site_configs = HashMap::new();
    for (id, _) in config.sites.iter().filter(|(_, info)| info.enabled) {
        match load_site_config(root, id).await {
            Ok(value) => {
                site_configs.insert(id.clone(), value);
            }
            Err(e) => tracing::warn!(site = %id, error = %e, "Failed to load site config"),
        }
    }

    let registry = SiteRegistry::new(config, site_configs);
    tracing::info!(
        enabled = registry.enabled_count(),
        root = %root.display(),
        "Site registry loaded"
    );
    Ok(registry)
}
