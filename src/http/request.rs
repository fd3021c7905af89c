//! Request handling and transformation.
//!
//! # Responsibilities
//! - Retarget the request URI at the upstream (scheme, host, port)
//! - Filter headers that describe the client-facing origin
//! - Prepare the outbound request; the body is streamed, never buffered
//! - Resolve the public origin and client IP for rewriting and logging
//!
//! # Design Decisions
//! - Upstream scheme/authority are parsed once at startup
//! - Original request preserved for logging; modified copy forwarded

use std::net::SocketAddr;

use axum::{
    body::Body,
    http::{
        header,
        uri::{Authority, PathAndQuery, Scheme},
        HeaderMap, HeaderValue, Method, Request, Uri,
    },
};

use crate::config::{ListenerConfig, UpstreamConfig, UpstreamScheme};
use crate::error::ProxyError;
use crate::security::headers::{is_hop_by_hop, ORIGIN_SENSITIVE};

/// Content type the object store expects when a write has none.
pub const DEFAULT_UPLOAD_CONTENT_TYPE: &str = "application/octet-stream";

/// The fixed upstream endpoint, parsed once from configuration.
#[derive(Debug, Clone)]
pub struct UpstreamTarget {
    scheme: Scheme,
    authority: Authority,
    host_header: HeaderValue,
    origin: String,
}

impl UpstreamTarget {
    pub fn from_config(config: &UpstreamConfig) -> Result<Self, ProxyError> {
        let authority: Authority = config.authority().parse()?;
        let host_header = HeaderValue::from_str(authority.as_str())?;
        let scheme = match config.scheme {
            UpstreamScheme::Http => Scheme::HTTP,
            UpstreamScheme::Https => Scheme::HTTPS,
        };

        Ok(Self {
            scheme,
            authority,
            host_header,
            origin: config.origin(),
        })
    }

    /// `scheme://host:port` of the upstream.
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Swap scheme and authority for the upstream's, keeping path and query.
    pub fn retarget(&self, uri: &Uri) -> Result<Uri, ProxyError> {
        let mut parts = uri.clone().into_parts();
        parts.scheme = Some(self.scheme.clone());
        parts.authority = Some(self.authority.clone());
        if parts.path_and_query.is_none() {
            parts.path_and_query = Some(PathAndQuery::from_static("/"));
        }
        Ok(Uri::from_parts(parts)?)
    }
}

/// Methods whose body the object store requires a content type for.
fn is_write(method: &Method) -> bool {
    *method == Method::POST || *method == Method::PUT || *method == Method::PATCH
}

/// Build the request sent to the upstream from the client's request.
pub fn build_upstream_request(
    request: Request<Body>,
    target: &UpstreamTarget,
) -> Result<Request<Body>, ProxyError> {
    let (parts, body) = request.into_parts();
    let uri = target.retarget(&parts.uri)?;

    let mut headers = HeaderMap::with_capacity(parts.headers.len() + 2);
    for (name, value) in parts.headers.iter() {
        if ORIGIN_SENSITIVE.contains(&name.as_str()) || is_hop_by_hop(name) {
            continue;
        }
        headers.append(name.clone(), value.clone());
    }

    headers.insert(header::HOST, target.host_header.clone());

    if is_write(&parts.method) && !headers.contains_key(header::CONTENT_TYPE) {
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static(DEFAULT_UPLOAD_CONTENT_TYPE),
        );
    }

    let mut outbound = Request::new(body);
    *outbound.method_mut() = parts.method;
    *outbound.uri_mut() = uri;
    *outbound.headers_mut() = headers;
    Ok(outbound)
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// `http` or `https`, normalized; anything else is untrusted.
fn web_scheme(scheme: &str) -> Option<&'static str> {
    if scheme.eq_ignore_ascii_case("https") {
        Some("https")
    } else if scheme.eq_ignore_ascii_case("http") {
        Some("http")
    } else {
        None
    }
}

/// The scheme+host the caller used to reach the proxy.
pub fn client_origin(headers: &HeaderMap, uri: &Uri, listener: &ListenerConfig) -> String {
    if let Some(origin) = &listener.public_origin {
        return origin.trim_end_matches('/').to_string();
    }

    let scheme = header_str(headers, "x-forwarded-proto")
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .and_then(web_scheme)
        .or_else(|| uri.scheme_str().and_then(web_scheme))
        .unwrap_or(if listener.tls.is_some() { "https" } else { "http" });

    let host = header_str(headers, "host")
        .or_else(|| uri.authority().map(Authority::as_str))
        .unwrap_or("localhost");

    format!("{}://{}", scheme, host)
}

/// Best-effort client address for access logs.
pub fn client_ip(headers: &HeaderMap, peer: SocketAddr) -> String {
    header_str(headers, "cf-connecting-ip")
        .or_else(|| {
            header_str(headers, "x-forwarded-for")
                .and_then(|v| v.split(',').next())
                .map(str::trim)
        })
        .map(ToString::to_string)
        .unwrap_or_else(|| peer.ip().to_string())
}
