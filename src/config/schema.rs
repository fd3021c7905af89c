//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the edge proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address, TLS, public origin).
    pub listener: ListenerConfig,

    /// The object store every request is forwarded to.
    pub upstream: UpstreamConfig,

    /// Path prefixes with special cache treatment.
    pub paths: PathsConfig,

    /// CORS allow-list.
    pub cors: CorsConfig,

    /// Static asset caching.
    pub cache: CacheConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Buffering limits.
    pub limits: LimitsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Optional TLS configuration.
    pub tls: Option<TlsConfig>,

    /// Public origin clients use to reach the proxy (e.g.
    /// "https://minio.example.com"). Derived per request when unset.
    pub public_origin: Option<String>,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            tls: None,
            public_origin: None,
        }
    }
}

/// TLS configuration for the listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TlsConfig {
    /// Path to certificate file (PEM).
    pub cert_path: String,

    /// Path to private key file (PEM).
    pub key_path: String,
}

/// Scheme used for the outbound call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UpstreamScheme {
    #[default]
    Http,
    Https,
}

impl UpstreamScheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpstreamScheme::Http => "http",
            UpstreamScheme::Https => "https",
        }
    }
}

impl std::str::FromStr for UpstreamScheme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "http" | "http:" => Ok(UpstreamScheme::Http),
            "https" | "https:" => Ok(UpstreamScheme::Https),
            other => Err(format!("unsupported upstream scheme '{}'", other)),
        }
    }
}

/// Upstream object store endpoint.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Upstream host name or IP address.
    pub host: String,

    /// Upstream port.
    pub port: u16,

    /// Upstream scheme.
    pub scheme: UpstreamScheme,
}

impl UpstreamConfig {
    /// `host:port`, used for the outbound `Host` header and URI authority.
    pub fn authority(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// `scheme://host:port`, the prefix rewritten out of HTML and redirects.
    pub fn origin(&self) -> String {
        format!("{}://{}", self.scheme.as_str(), self.authority())
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 19001,
            scheme: UpstreamScheme::Http,
        }
    }
}

/// Console and API path prefixes of the object store.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Prefix of the web console; never cached.
    pub console_prefix: String,

    /// Prefix of the API; never cached.
    pub api_prefix: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            console_prefix: "/minio/".to_string(),
            api_prefix: "/minio/v2/".to_string(),
        }
    }
}

/// CORS configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Origins allowed to make cross-origin calls. May contain "*".
    pub allowed_origins: Vec<String>,

    /// When true, preflights from unlisted origins get no CORS headers
    /// instead of the first allowed origin.
    pub strict_origins: bool,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec![
                "https://minio.maywzh.com".to_string(),
                "http://localhost:3000".to_string(),
            ],
            strict_origins: false,
        }
    }
}

/// Cache policy for generic responses.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// `max-age` for cacheable static assets, in seconds.
    pub static_ttl_secs: u64,

    /// File extensions treated as static assets.
    pub static_extensions: Vec<String>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            static_ttl_secs: 300, // 5 minutes
            static_extensions: [
                "css", "js", "png", "jpg", "jpeg", "gif", "ico", "svg", "woff", "woff2", "ttf",
                "eot",
            ]
            .iter()
            .map(|ext| ext.to_string())
            .collect(),
        }
    }
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Upstream connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Deadline for the upstream to return response headers, in seconds.
    pub upstream_secs: u64,

    /// Overall request timeout enforced by middleware, in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            upstream_secs: 30,
            request_secs: 60,
        }
    }
}

/// Buffering limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Largest HTML body buffered for rewriting, in bytes.
    pub max_rewrite_body_bytes: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_rewrite_body_bytes: 8 * 1024 * 1024, // 8MB
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
