//! Proxy error types and their client-facing fallback responses.

use std::time::Duration;

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use thiserror::Error;

/// Errors raised while forwarding a single request.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// Connection refused, DNS failure, reset, TLS failure...
    #[error("upstream request failed: {0}")]
    Upstream(#[from] hyper_util::client::legacy::Error),

    #[error("upstream did not respond within {0:?}")]
    Timeout(Duration),

    #[error("failed to read upstream body: {0}")]
    Body(#[source] axum::Error),

    #[error("invalid upstream URI: {0}")]
    InvalidUri(#[from] axum::http::uri::InvalidUriParts),

    #[error("invalid upstream authority: {0}")]
    InvalidAuthority(#[from] axum::http::uri::InvalidUri),

    #[error("invalid header value: {0}")]
    InvalidHeader(#[from] axum::http::header::InvalidHeaderValue),
}

impl ProxyError {
    /// Short label used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ProxyError::Upstream(_) => "transport",
            ProxyError::Timeout(_) => "timeout",
            ProxyError::Body(_) => "body",
            ProxyError::InvalidUri(_)
            | ProxyError::InvalidAuthority(_)
            | ProxyError::InvalidHeader(_) => "uri",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::Upstream(_) | ProxyError::Timeout(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::BAD_GATEWAY,
        }
    }
}

/// JSON body returned when the upstream cannot serve a request.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: &'static str,
    /// ISO-8601, millisecond precision, UTC.
    pub timestamp: String,
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (error, message) = match status {
            StatusCode::SERVICE_UNAVAILABLE => {
                ("Service Unavailable", "Unable to connect to MinIO service")
            }
            _ => ("Bad Gateway", "Invalid response from MinIO service"),
        };
        let body = ErrorBody {
            error,
            message,
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        };

        let mut response = (status, Json(body)).into_response();
        response.headers_mut().insert(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        );
        response
    }
}
