//! CORS negotiation.
//!
//! # Responsibilities
//! - Answer browser preflight (`OPTIONS`) requests locally
//! - Decide the allowed origin from the configured allow-list
//! - Provide the CORS header values shared with the response sanitizer

use axum::{
    body::Body,
    http::{header, HeaderMap, HeaderValue, Response, StatusCode},
};

use crate::config::CorsConfig;

pub const ALLOW_METHODS: &str = "GET, POST, PUT, DELETE, HEAD, OPTIONS";

pub const ALLOW_HEADERS: &str = "Content-Type, Authorization, X-Requested-With, Accept, Origin, \
     X-Amz-Date, X-Amz-Content-Sha256, X-Amz-Security-Token";

pub const EXPOSE_HEADERS: &str = "ETag, X-Amz-Request-Id, X-Amz-Id-2";

/// One day, in seconds.
pub const MAX_AGE: &str = "86400";

/// Pick the `Access-Control-Allow-Origin` value for a request origin.
///
/// Returns `None` only in strict mode when the origin is not listed.
pub fn allowed_origin<'a>(request_origin: Option<&'a str>, cors: &'a CorsConfig) -> Option<&'a str> {
    let wildcard = cors.allowed_origins.iter().any(|o| o == "*");
    let listed = request_origin
        .map(|origin| cors.allowed_origins.iter().any(|o| o == origin))
        .unwrap_or(false);

    if wildcard || listed {
        return Some(request_origin.unwrap_or("*"));
    }
    if cors.strict_origins {
        return None;
    }
    cors.allowed_origins.first().map(String::as_str)
}

/// Build the 204 response for a preflight request.
pub fn preflight_response(request_headers: &HeaderMap, cors: &CorsConfig) -> Response<Body> {
    let request_origin = request_headers
        .get(header::ORIGIN)
        .and_then(|v| v.to_str().ok());

    let mut response = Response::new(Body::empty());
    *response.status_mut() = StatusCode::NO_CONTENT;

    let Some(origin) = allowed_origin(request_origin, cors) else {
        tracing::debug!(origin = ?request_origin, "Preflight from unlisted origin");
        return response;
    };

    let headers = response.headers_mut();
    match HeaderValue::from_str(origin) {
        Ok(value) => {
            headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, value);
        }
        Err(_) => return response,
    }
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(ALLOW_METHODS),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(ALLOW_HEADERS),
    );
    headers.insert(header::ACCESS_CONTROL_MAX_AGE, HeaderValue::from_static(MAX_AGE));
    response
}
