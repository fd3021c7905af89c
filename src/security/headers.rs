//! Header manipulation and security headers.
//!
//! # Responsibilities
//! - Strip hop-by-hop headers in both directions
//! - Add CORS headers to every proxied response
//! - Add security response headers
//!
//! # Design Decisions
//! - Multi-valued upstream headers (Set-Cookie) are copied value by value
//! - Headers set by the proxy replace upstream values

use axum::http::{header, HeaderMap, HeaderName, HeaderValue};

use crate::security::cors::{ALLOW_HEADERS, ALLOW_METHODS, EXPOSE_HEADERS, MAX_AGE};

/// Connection-scoped headers never forwarded across the proxy.
pub const HOP_BY_HOP: [&str; 3] = ["connection", "keep-alive", "transfer-encoding"];

/// Request headers that describe the client-facing origin.
pub const ORIGIN_SENSITIVE: [&str; 3] = ["host", "origin", "referer"];

pub fn is_hop_by_hop(name: &HeaderName) -> bool {
    // HeaderName is always lowercase.
    HOP_BY_HOP.contains(&name.as_str())
}

/// Build the client-facing header map from upstream response headers.
pub fn sanitize_response_headers(
    upstream: &HeaderMap,
    content_type: Option<HeaderValue>,
) -> HeaderMap {
    let mut headers = HeaderMap::with_capacity(upstream.len() + 9);

    for (name, value) in upstream.iter() {
        if !is_hop_by_hop(name) {
            headers.append(name.clone(), value.clone());
        }
    }

    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(ALLOW_METHODS),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(ALLOW_HEADERS),
    );
    headers.insert(
        header::ACCESS_CONTROL_EXPOSE_HEADERS,
        HeaderValue::from_static(EXPOSE_HEADERS),
    );
    headers.insert(header::ACCESS_CONTROL_MAX_AGE, HeaderValue::from_static(MAX_AGE));

    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("SAMEORIGIN"));
    headers.insert(
        header::X_XSS_PROTECTION,
        HeaderValue::from_static("1; mode=block"),
    );

    if let Some(content_type) = content_type {
        headers.insert(header::CONTENT_TYPE, content_type);
    }

    headers
}
