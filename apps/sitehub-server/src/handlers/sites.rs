//! Hosted sites: static files and per-site config, routed by domain or by
//! the first path segment.

use actix_web::http::StatusCode;
use actix_web::http::header::HOST;
use actix_web::{HttpRequest, HttpResponse, web};
use bytes::Bytes;
use serde::Serialize;

use sitehub_core::domain::{PlatformInfo, SiteInfo, mime};
use sitehub_infra::sites::site_dir;

use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

const NOT_FOUND: &str = "404 Not Found";

#[derive(Serialize)]
struct SiteEntry<'a> {
    id: &'a str,
    #[serde(flatten)]
    info: &'a SiteInfo,
}

#[derive(Serialize)]
struct SitesListing<'a> {
    platform: &'a PlatformInfo,
    sites: Vec<SiteEntry<'a>>,
}

/// GET /api/sites
pub async fn list_sites(state: web::Data<AppState>) -> HttpResponse {
    let listing = SitesListing {
        platform: state.sites.platform(),
        sites: state
            .sites
            .sorted_sites()
            .into_iter()
            .map(|(id, info)| SiteEntry { id, info })
            .collect(),
    };
    HttpResponse::Ok().json(listing)
}

fn host_of(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get(HOST)
        .and_then(|v| v.to_str().ok())
        .or_else(|| req.uri().host())
}

/// Fallback for every path not claimed by another route.
///
/// A `Host` mapped to a site serves that site at the root; otherwise the
/// first path segment names the site.
pub async fn dispatch(req: HttpRequest, state: web::Data<AppState>) -> AppResult<HttpResponse> {
    let path = req.path().trim_start_matches('/');

    if let Some(site) = host_of(&req).and_then(|host| state.sites.site_for_host(host)) {
        return serve_site(&req, &state, site, path).await;
    }

    match path.split_once('/') {
        Some((site, rest)) if !site.is_empty() => serve_site(&req, &state, site, rest).await,
        None if !path.is_empty() => serve_site(&req, &state, path, "").await,
        _ => Err(AppError::NotFound(NOT_FOUND)),
    }
}

async fn serve_site(
    req: &HttpRequest,
    state: &AppState,
    site: &str,
    rest: &str,
) -> AppResult<HttpResponse> {
    if state.sites.enabled_site(site).is_none() {
        return Err(AppError::NotFound("Site not found"));
    }

    if let Some(rel) = rest.strip_prefix("static/") {
        return serve_static(req, state, site, rel).await;
    }

    if rest == "api/config" {
        return serve_config(req, state, site).await;
    }

    Err(AppError::NotFound(NOT_FOUND))
}

async fn serve_static(
    req: &HttpRequest,
    state: &AppState,
    site: &str,
    rel: &str,
) -> AppResult<HttpResponse> {
    if rel.split('/').any(|segment| segment == "..") || rel.contains('\\') {
        tracing::warn!(site, path = rel, "Rejected static path");
        return Err(AppError::Forbidden);
    }

    let static_root = site_dir(&state.sites_root, site).join("static");
    let (root, file) = match (
        tokio::fs::canonicalize(&static_root).await,
        tokio::fs::canonicalize(static_root.join(rel)).await,
    ) {
        (Ok(root), Ok(file)) => (root, file),
        _ => return Err(AppError::NotFound(NOT_FOUND)),
    };

    // Symlinks or absolute segments may still point outside the site.
    if !file.starts_with(&root) {
        tracing::warn!(site, path = rel, "Static path escapes site directory");
        return Err(AppError::Forbidden);
    }

    match tokio::fs::metadata(&file).await {
        Ok(meta) if meta.is_file() => {}
        _ => return Err(AppError::NotFound(NOT_FOUND)),
    }

    let data = tokio::fs::read(&file)
        .await
        .map_err(|e| AppError::internal("Failed to read static file", e))?;

    let extension = file
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{}", ext.to_lowercase()));

    state
        .responder
        .respond(
            req,
            StatusCode::OK,
            mime::static_content_type(extension.as_deref()),
            Bytes::from(data),
            None,
        )
        .await
}

async fn serve_config(req: &HttpRequest, state: &AppState, site: &str) -> AppResult<HttpResponse> {
    let config = state
        .sites
        .site_config(site)
        .ok_or(AppError::NotFound("Config not found"))?;

    let body = serde_json::to_vec(config)
        .map_err(|e| AppError::internal("Failed to encode site config", e.into()))?;

    state
        .responder
        .respond(req, StatusCode::OK, "application/json", Bytes::from(body), None)
        .await
}
