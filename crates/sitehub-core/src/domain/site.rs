//! Site registry model (`sites.json`).

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

fn default_platform_name() -> String {
    "Sitehub".to_string()
}

/// Platform-wide display information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformInfo {
    #[serde(default = "default_platform_name")]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub version: String,
}

impl Default for PlatformInfo {
    fn default() -> Self {
        Self {
            name: default_platform_name(),
            description: String::new(),
            version: String::new(),
        }
    }
}

/// One hosted site as declared in `sites.json`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SiteInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub domains: Vec<String>,
    #[serde(default)]
    pub order: i64,
}

/// Top-level `sites.json`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SitesConfig {
    #[serde(default)]
    pub platform: PlatformInfo,
    #[serde(default)]
    pub sites: BTreeMap<String, SiteInfo>,
    #[serde(default)]
    pub home_site: Option<String>,
    #[serde(default)]
    pub domain_mapping: HashMap<String, String>,
}

/// Loaded sites plus derived lookup tables.
#[derive(Debug, Clone, Default)]
pub struct SiteRegistry {
    config: SitesConfig,
    site_configs: HashMap<String, serde_json::Value>,
    domains: HashMap<String, String>,
}

impl SiteRegistry {
    /// Build the registry. Domains of enabled sites are registered first;
    /// explicit `domain_mapping` entries override them.
    pub fn new(config: SitesConfig, site_configs: HashMap<String, serde_json::Value>) -> Self {
        let mut domains = HashMap::new();

        for (id, info) in config.sites.iter().filter(|(_, info)| info.enabled) {
            for domain in &info.domains {
                domains.insert(domain.to_lowercase(), id.clone());
            }
        }

        for (domain, id) in &config.domain_mapping {
            domains.insert(domain.to_lowercase(), id.clone());
        }

        Self {
            config,
            site_configs,
            domains,
        }
    }

    pub fn platform(&self) -> &PlatformInfo {
        &self.config.platform
    }

    pub fn site(&self, id: &str) -> Option<&SiteInfo> {
        self.config.sites.get(id)
    }

    /// The site only if it exists and is enabled.
    pub fn enabled_site(&self, id: &str) -> Option<&SiteInfo> {
        self.site(id).filter(|info| info.enabled)
    }

    pub fn site_config(&self, id: &str) -> Option<&serde_json::Value> {
        self.site_configs.get(id)
    }

    /// Site mapped to the `Host` header value, ignoring any port.
    pub fn site_for_host(&self, host: &str) -> Option<&str> {
        self.domains
            .get(&strip_port(host).to_lowercase())
            .map(String::as_str)
    }

    /// Sites ordered by `order`, then by id.
    pub fn sorted_sites(&self) -> Vec<(&str, &SiteInfo)> {
        let mut sites: Vec<_> = self
            .config
            .sites
            .iter()
            .map(|(id, info)| (id.as_str(), info))
            .collect();
        sites.sort_by(|(id_a, a), (id_b, b)| a.order.cmp(&b.order).then_with(|| id_a.cmp(id_b)));
        sites
    }

    pub fn enabled_count(&self) -> usize {
        self.config.sites.values().filter(|s| s.enabled).count()
    }
}

/// `example.com:8080` -> `example.com`, `[::1]:8080` -> `[::1]`.
pub fn strip_port(host: &str) -> &str {
    if host.starts_with('[') {
        return match host.find(']') {
            Some(end) => &host[..=end],
            None => host,
        };
    }
    host.split(':').next().unwrap_or(host)
}
