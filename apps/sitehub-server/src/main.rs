//! # Sitehub Server
//!
//! Hosts static sites and proxies third-party CDN assets through a local
//! disk cache, behind per-client request and bandwidth limits.

use actix_web::{App, HttpServer, web};
use tracing_actix_web::TracingLogger;

mod background;
mod client;
mod config;
mod handlers;
mod middleware;
mod observability;
mod responder;
mod state;
mod telemetry;

#[cfg(test)]
mod test_support;

use config::{AppConfig, ConfigError};
use middleware::{RateLimitMiddleware, RequestGuard};
use observability::RequestIdMiddleware;
use sitehub_core::domain::default_prewarm_assets;
use state::AppState;
use telemetry::{TelemetryConfig, init_telemetry};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let config = match AppConfig::load() {
        Ok(config) => config,
        // --help, --version and usage errors print and exit the clap way.
        Err(ConfigError::Cli(e)) => e.exit(),
        Err(e) => return Err(e.into()),
    };

    let telemetry = TelemetryConfig::from_env();
    init_telemetry(&telemetry);

    tracing::info!(
        service = %telemetry.service_name,
        addr = %config.addr,
        sites_root = %config.sites_root.display(),
        "Starting Sitehub server"
    );

    let state = AppState::new(&config).await?;
    tracing::info!(
        platform = %state.sites.platform().name,
        sites = state.sites.enabled_count(),
        "Sites ready"
    );

    if config.cdn.prewarm {
        let assets = state.assets.clone();
        let items = default_prewarm_assets(&state.routes);
        actix_rt::spawn(async move {
            background::prewarm(assets, items).await;
        });
    }

    let limiter = state.limiter.clone();
    let max_body_bytes = config.limits.max_body_bytes;

    HttpServer::new(move || {
        App::new()
            .wrap(RequestGuard::new(max_body_bytes))
            .wrap(RateLimitMiddleware::new(limiter.clone()))
            .wrap(TracingLogger::default())
            .wrap(RequestIdMiddleware)
            .app_data(web::Data::new(state.clone()))
            .configure(handlers::configure_routes)
    })
    .client_request_timeout(config.limits.client_request_timeout)
    .keep_alive(config.limits.keep_alive)
    .client_disconnect_timeout(config.limits.client_disconnect_timeout)
    .shutdown_timeout(config.limits.shutdown_timeout.as_secs())
    .bind((config.addr.host.as_str(), config.addr.port))?
    .run()
    .await?;

    tracing::info!("Server stopped");
    Ok(())
}
