//! Response handling and transformation.
//!
//! # Responsibilities
//! - Classify the upstream response once (redirect, HTML, JSON, generic)
//! - Rewrite upstream-absolute URLs in redirects and HTML
//! - Sanitize headers, add CORS and security headers
//! - Choose the cache policy for generic responses
//!
//! # Design Decisions
//! - Only HTML is buffered; every other body is streamed as-is
//! - Compressed HTML is not rewritable and is treated as generic
//! - Hop-by-hop headers stripped on every branch, redirects included

use axum::{
    body::Body,
    http::{header, HeaderMap, HeaderValue, Method, Response, StatusCode},
};
use tokio::time::Instant;

use crate::config::ProxyConfig;
use crate::error::ProxyError;
use crate::resilience::UpstreamTimeouts;
use crate::rewrite::{rewrite_html, rewrite_location};
use crate::security::headers::sanitize_response_headers;

pub const HTML_CONTENT_TYPE: &str = "text/html; charset=utf-8";
pub const JSON_CONTENT_TYPE: &str = "application/json";
pub const NO_CACHE: &str = "no-cache, no-store, must-revalidate";

/// Per-request inputs to the transformation.
#[derive(Debug, Clone, Copy)]
pub struct TransformContext<'a> {
    /// Scheme+host the client used to reach the proxy.
    pub public_origin: &'a str,
    /// `scheme://host:port` of the upstream.
    pub upstream_origin: &'a str,
    pub method: &'a Method,
    /// Path of the original request.
    pub path: &'a str,
    pub config: &'a ProxyConfig,
    pub timeouts: UpstreamTimeouts,
    /// Upstream deadline, shared with the header wait. Buffered bodies
    /// must arrive before it.
    pub deadline: Instant,
}

/// How an upstream response is turned into the client response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseStrategy {
    /// 3xx with a readable `Location`.
    Redirect { location: String },
    /// Identity-encoded `text/html`, buffered and rewritten.
    Html,
    Json,
    Generic,
}

pub fn is_redirect(status: StatusCode) -> bool {
    matches!(status.as_u16(), 301 | 302 | 303 | 307 | 308)
}

fn content_type(headers: &HeaderMap) -> &str {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
}

/// Whether the body can be decoded as text and rewritten.
pub fn is_text_rewritable(headers: &HeaderMap) -> bool {
    let identity = headers
        .get(header::CONTENT_ENCODING)
        .and_then(|v| v.to_str().ok())
        .map(|enc| enc.trim().is_empty() || enc.trim().eq_ignore_ascii_case("identity"))
        .unwrap_or(true);
    identity && content_type(headers).contains("text/html")
}

impl ResponseStrategy {
    /// Pick the strategy: redirect first, then content type.
    pub fn classify(status: StatusCode, headers: &HeaderMap) -> Self {
        if is_redirect(status) {
            if let Some(location) = headers.get(header::LOCATION).and_then(|v| v.to_str().ok()) {
                return ResponseStrategy::Redirect {
                    location: location.to_string(),
                };
            }
        }

        if is_text_rewritable(headers) {
            ResponseStrategy::Html
        } else if content_type(headers).contains("application/json") {
            ResponseStrategy::Json
        } else {
            ResponseStrategy::Generic
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ResponseStrategy::Redirect { .. } => "redirect",
            ResponseStrategy::Html => "html",
            ResponseStrategy::Json => "json",
            ResponseStrategy::Generic => "generic",
        }
    }

    /// Turn the upstream response into the client response.
    ///
    /// Status and reason phrase are always preserved.
    pub async fn transform(
        self,
        upstream: Response<Body>,
        ctx: &TransformContext<'_>,
    ) -> Result<Response<Body>, ProxyError> {
        let (mut parts, body) = upstream.into_parts();

        match self {
            ResponseStrategy::Redirect { location } => {
                let rewritten =
                    rewrite_location(&location, ctx.upstream_origin, ctx.public_origin);
                let mut headers = sanitize_response_headers(&parts.headers, None);
                match HeaderValue::from_str(&rewritten) {
                    Ok(value) => {
                        headers.insert(header::LOCATION, value);
                    }
                    Err(_) => {
                        tracing::warn!(location = %rewritten, "Rewritten Location is not a valid header");
                    }
                }
                parts.headers = headers;
                Ok(Response::from_parts(parts, body))
            }
            ResponseStrategy::Html => {
                let html_type = HeaderValue::from_static(HTML_CONTENT_TYPE);
                if *ctx.method == Method::HEAD {
                    parts.headers = sanitize_response_headers(&parts.headers, Some(html_type));
                    return Ok(Response::from_parts(parts, body));
                }

                let limit = ctx.config.limits.max_rewrite_body_bytes;
                let bytes = ctx
                    .timeouts
                    .bound_until(ctx.deadline, async {
                        axum::body::to_bytes(body, limit)
                            .await
                            .map_err(ProxyError::Body)
                    })
                    .await?;
                let html = String::from_utf8_lossy(&bytes);
                let rewritten = rewrite_html(&html, ctx.upstream_origin, ctx.public_origin);

                let mut headers = sanitize_response_headers(&parts.headers, Some(html_type));
                headers.remove(header::CONTENT_LENGTH);
                parts.headers = headers;
                Ok(Response::from_parts(parts, Body::from(rewritten)))
            }
            ResponseStrategy::Json => {
                parts.headers = sanitize_response_headers(
                    &parts.headers,
                    Some(HeaderValue::from_static(JSON_CONTENT_TYPE)),
                );
                Ok(Response::from_parts(parts, body))
            }
            ResponseStrategy::Generic => {
                let mut headers = sanitize_response_headers(&parts.headers, None);
                headers.insert(header::CACHE_CONTROL, cache_control(ctx.path, ctx.config));
                parts.headers = headers;
                Ok(Response::from_parts(parts, body))
            }
        }
    }
}

/// Whether the last path segment carries a static-asset extension.
pub fn is_static_asset(path: &str, extensions: &[String]) -> bool {
    let segment = path.rsplit('/').next().unwrap_or(path);
    match segment.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() => {
            extensions
                .iter()
                .any(|e| e.trim_start_matches('.').eq_ignore_ascii_case(ext))
        }
        _ => false,
    }
}

/// Cache-Control for a generic response to `path`.
pub fn cache_control(path: &str, config: &ProxyConfig) -> HeaderValue {
    let cacheable = is_static_asset(path, &config.cache.static_extensions)
        && !path.starts_with(&config.paths.api_prefix)
        && !path.starts_with(&config.paths.console_prefix);

    if cacheable {
        HeaderValue::from_str(&format!("public, max-age={}", config.cache.static_ttl_secs))
            .unwrap_or_else(|_| HeaderValue::from_static(NO_CACHE))
    } else {
        HeaderValue::from_static(NO_CACHE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const UPSTREAM: &str = "http://UPSTREAM:19001";
    const PUBLIC: &str = "https://minio.maywzh.com";

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for &(name, value) in pairs {
            map.append(name, HeaderValue::from_static(value));
        }
        map
    }

    fn upstream(
        status: u16,
        pairs: &[(&'static str, &'static str)],
        body: &'static str,
    ) -> Response<Body> {
        let mut response = Response::new(Body::from(body));
        *response.status_mut() = StatusCode::from_u16(status).unwrap();
        *response.headers_mut() = headers(pairs);
        response
    }

    async fn run(
        response: Response<Body>,
        method: Method,
        path: &str,
        config: &ProxyConfig,
    ) -> (Response<Body>, String) {
        let strategy = ResponseStrategy::classify(response.status(), response.headers());
        let timeouts = UpstreamTimeouts::from_config(&config.timeouts);
        let ctx = TransformContext {
            public_origin: PUBLIC,
            upstream_origin: UPSTREAM,
            method: &method,
            path,
            config,
            timeouts,
            deadline: timeouts.deadline(),
        };
        let out = strategy.transform(response, &ctx).await.unwrap();
        let (parts, body) = out.into_parts();
        let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
        (
            Response::from_parts(parts, Body::empty()),
            String::from_utf8(bytes.to_vec()).unwrap(),
        )
    }

    #[test]
    fn classification_precedence() {
        let redirect = headers(&[("location", "/login"), ("content-type", "text/html")]);
        assert_eq!(
            ResponseStrategy::classify(StatusCode::FOUND, &redirect),
            ResponseStrategy::Redirect {
                location: "/login".into()
            }
        );

        // A redirect without Location falls through to content type.
        let html = headers(&[("content-type", "text/html")]);
        assert_eq!(
            ResponseStrategy::classify(StatusCode::MOVED_PERMANENTLY, &html),
            ResponseStrategy::Html
        );

        // Location on a non-redirect status is ignored.
        assert_eq!(
            ResponseStrategy::classify(StatusCode::CREATED, &redirect),
            ResponseStrategy::Html
        );

        let json = headers(&[("content-type", "application/json; charset=utf-8")]);
        assert_eq!(
            ResponseStrategy::classify(StatusCode::OK, &json),
            ResponseStrategy::Json
        );

        let binary = headers(&[("content-type", "application/octet-stream")]);
        assert_eq!(
            ResponseStrategy::classify(StatusCode::OK, &binary),
            ResponseStrategy::Generic
        );
        assert_eq!(
            ResponseStrategy::classify(StatusCode::OK, &HeaderMap::new()),
            ResponseStrategy::Generic
        );
    }

    #[test]
    fn compressed_html_is_not_rewritable() {
        let gz = headers(&[("content-type", "text/html"), ("content-encoding", "gzip")]);
        assert!(!is_text_rewritable(&gz));
        assert_eq!(
            ResponseStrategy::classify(StatusCode::OK, &gz),
            ResponseStrategy::Generic
        );

        let identity = headers(&[("content-type", "text/html"), ("content-encoding", "identity")]);
        assert!(is_text_rewritable(&identity));
    }

    #[test]
    fn static_asset_detection() {
        let exts = ProxyConfig::default().cache.static_extensions;
        assert!(is_static_asset("/favicon.ico", &exts));
        assert!(is_static_asset("/static/js/main.8f1c.js", &exts));
        assert!(is_static_asset("/fonts/Inter.WOFF2", &exts));
        assert!(!is_static_asset("/bucket/report.pdf", &exts));
        assert!(!is_static_asset("/styles.css/", &exts));
        assert!(!is_static_asset("/v1.2/objects", &exts));
        assert!(!is_static_asset("/", &exts));
    }

    #[test]
    fn configured_extensions_may_carry_a_dot() {
        let exts = vec![".css".to_string(), "JS".to_string()];
        assert!(is_static_asset("/static/site.css", &exts));
        assert!(is_static_asset("/static/app.js", &exts));
        assert!(!is_static_asset("/static/logo.png", &exts));
    }

    #[test]
    fn cache_policy() {
        let config = ProxyConfig::default();
        assert_eq!(cache_control("/favicon.ico", &config), "public, max-age=300");
        assert_eq!(cache_control("/minio/v2/app.js", &config), NO_CACHE);
        assert_eq!(cache_control("/minio/logo.png", &config), NO_CACHE);
        assert_eq!(cache_control("/bucket/object", &config), NO_CACHE);

        let mut config = ProxyConfig::default();
        config.cache.static_ttl_secs = 3600;
        assert_eq!(cache_control("/img/a.png", &config), "public, max-age=3600");
    }

    #[tokio::test]
    async fn redirect_to_upstream_is_rewritten() {
        let config = ProxyConfig::default();
        let response = upstream(
            302,
            &[
                ("location", "http://UPSTREAM:19001/login"),
                ("connection", "close"),
                ("x-amz-request-id", "17A"),
            ],
            "",
        );
        let (out, _) = run(response, Method::GET, "/", &config).await;

        assert_eq!(out.status(), StatusCode::FOUND);
        assert_eq!(out.headers()[header::LOCATION], "https://minio.maywzh.com/login");
        assert_eq!(out.headers()["x-amz-request-id"], "17A");
        assert!(out.headers().get(header::CONNECTION).is_none());
        assert_eq!(out.headers()[header::X_FRAME_OPTIONS], "SAMEORIGIN");
    }

    #[tokio::test]
    async fn relative_and_external_redirects() {
        let config = ProxyConfig::default();
        let (out, _) = run(
            upstream(307, &[("location", "/login")], ""),
            Method::GET,
            "/",
            &config,
        )
        .await;
        assert_eq!(out.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(out.headers()[header::LOCATION], "https://minio.maywzh.com/login");

        let (out, _) = run(
            upstream(301, &[("location", "https://sso.example.com/")], ""),
            Method::GET,
            "/",
            &config,
        )
        .await;
        assert_eq!(out.headers()[header::LOCATION], "https://sso.example.com/");
    }

    #[tokio::test]
    async fn html_body_is_rewritten() {
        let config = ProxyConfig::default();
        let response = upstream(
            200,
            &[
                ("content-type", "text/html"),
                ("content-length", "75"),
                ("transfer-encoding", "chunked"),
            ],
            r#"<img src="/icon.png"><a href="http://UPSTREAM:19001/browser">browse</a>"#,
        );
        let (out, body) = run(response, Method::GET, "/", &config).await;

        assert_eq!(out.status(), StatusCode::OK);
        assert_eq!(out.headers()[header::CONTENT_TYPE], HTML_CONTENT_TYPE);
        assert!(out.headers().get(header::CONTENT_LENGTH).is_none());
        assert!(out.headers().get(header::TRANSFER_ENCODING).is_none());
        assert_eq!(
            body,
            r#"<img src="https://minio.maywzh.com/icon.png"><a href="https://minio.maywzh.com/browser">browse</a>"#
        );
    }

    #[tokio::test]
    async fn oversized_html_fails_as_body_error() {
        let mut config = ProxyConfig::default();
        config.limits.max_rewrite_body_bytes = 8;
        let response = upstream(200, &[("content-type", "text/html")], "<html>too long</html>");
        let timeouts = UpstreamTimeouts::from_config(&config.timeouts);
        let ctx = TransformContext {
            public_origin: PUBLIC,
            upstream_origin: UPSTREAM,
            method: &Method::GET,
            path: "/",
            config: &config,
            timeouts,
            deadline: timeouts.deadline(),
        };
        let result = ResponseStrategy::Html.transform(response, &ctx).await;
        assert!(matches!(result, Err(ProxyError::Body(_))));
    }

    #[tokio::test]
    async fn json_passes_through_with_forced_type() {
        let config = ProxyConfig::default();
        let response = upstream(
            403,
            &[("content-type", "application/json; charset=utf-8"), ("keep-alive", "timeout=5")],
            r#"{"code":"AccessDenied","url":"http://UPSTREAM:19001/x"}"#,
        );
        let (out, body) = run(response, Method::GET, "/api/v1/login", &config).await;

        assert_eq!(out.status(), StatusCode::FORBIDDEN);
        assert_eq!(out.headers()[header::CONTENT_TYPE], JSON_CONTENT_TYPE);
        assert!(out.headers().get("keep-alive").is_none());
        assert!(out.headers().get(header::CACHE_CONTROL).is_none());
        assert_eq!(body, r#"{"code":"AccessDenied","url":"http://UPSTREAM:19001/x"}"#);
    }

    #[tokio::test]
    async fn generic_keeps_content_type_and_sets_cache() {
        let config = ProxyConfig::default();
        let response = upstream(200, &[("content-type", "image/x-icon")], "ICO");
        let (out, body) = run(response, Method::GET, "/favicon.ico", &config).await;

        assert_eq!(out.headers()[header::CONTENT_TYPE], "image/x-icon");
        assert_eq!(out.headers()[header::CACHE_CONTROL], "public, max-age=300");
        assert_eq!(out.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(body, "ICO");

        let response = upstream(200, &[("content-type", "application/javascript")], "x");
        let (out, _) = run(response, Method::GET, "/minio/v2/bundle.js", &config).await;
        assert_eq!(out.headers()[header::CACHE_CONTROL], NO_CACHE);
    }

    #[tokio::test]
    async fn head_html_is_not_buffered() {
        let config = ProxyConfig::default();
        let response = upstream(
            200,
            &[("content-type", "text/html"), ("content-length", "1024")],
            "",
        );
        let (out, _) = run(response, Method::HEAD, "/", &config).await;
        assert_eq!(out.headers()[header::CONTENT_LENGTH], "1024");
        assert_eq!(out.headers()[header::CONTENT_TYPE], HTML_CONTENT_TYPE);
    }
}
