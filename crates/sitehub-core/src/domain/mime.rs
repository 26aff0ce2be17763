//! MIME type tables and content-type helpers.

/// Fallback for unknown extensions.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Content types the responder will gzip.
pub const COMPRESSIBLE_TYPES: &[&str] = &[
    "text/html",
    "text/css",
    "application/javascript",
    "application/json",
    "image/svg+xml",
    "text/plain",
    "application/xml",
    "text/xml",
];

const TEXTUAL_PREFIXES: &[&str] = &[
    "text/",
    "application/json",
    "application/javascript",
    "application/xml",
];

/// MIME type for a proxied CDN asset, by extension (including the dot).
pub fn cdn_content_type(extension: Option<&str>) -> &'static str {
    match extension {
        Some(".css") => "text/css",
        Some(".js") => "application/javascript",
        Some(".map") => "application/json",
        Some(".woff") => "font/woff",
        Some(".woff2") => "font/woff2",
        Some(".ttf") => "font/ttf",
        Some(".eot") => "application/vnd.ms-fontobject",
        Some(".svg") => "image/svg+xml",
        _ => OCTET_STREAM,
    }
}

/// MIME type for a site static file, by extension (including the dot).
pub fn static_content_type(extension: Option<&str>) -> &'static str {
    match extension {
        Some(".html") => "text/html",
        Some(".css") => "text/css",
        Some(".js") => "application/javascript",
        Some(".json") => "application/json",
        Some(".png") => "image/png",
        Some(".jpg") | Some(".jpeg") => "image/jpeg",
        Some(".gif") => "image/gif",
        Some(".svg") => "image/svg+xml",
        _ => OCTET_STREAM,
    }
}

/// Media type without parameters, e.g. `text/css; charset=UTF-8` -> `text/css`.
pub fn essence(content_type: &str) -> &str {
    content_type
        .split(';')
        .next()
        .unwrap_or(content_type)
        .trim()
}

/// Append `; charset=UTF-8` to textual types that do not declare a charset.
pub fn with_charset(content_type: &str) -> String {
    if content_type.contains("charset") {
        return content_type.to_string();
    }

    if TEXTUAL_PREFIXES
        .iter()
        .any(|prefix| content_type.starts_with(prefix))
    {
        format!("{content_type}; charset=UTF-8")
    } else {
        content_type.to_string()
    }
}

pub fn is_compressible(content_type: &str) -> bool {
    COMPRESSIBLE_TYPES.contains(&essence(content_type))
}
