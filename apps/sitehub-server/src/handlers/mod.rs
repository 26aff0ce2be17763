//! HTTP handlers and route configuration.

mod cdn;
mod health;
mod sites;

use actix_web::web;

/// Configure all application routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/healthz", web::get().to(health::health_check))
        .route("/cdn/{path:.*}", web::get().to(cdn::proxy))
        .route("/api/sites", web::get().to(sites::list_sites))
        .default_service(web::to(sites::dispatch));
}
