//! Domain model - pure types with no I/O.

pub mod cache_key;
pub mod cdn;
pub mod mime;
pub mod site;

pub use cache_key::CacheKey;
pub use cdn::{OriginRoutes, PrewarmAsset, default_prewarm_assets};
pub use site::{PlatformInfo, SiteInfo, SiteRegistry, SitesConfig};
