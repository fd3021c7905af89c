//! Command-line and environment overrides.

use std::path::PathBuf;

use clap::Parser;

use crate::config::{ProxyConfig, UpstreamScheme};

/// HTTPS edge proxy for an object store on a private port.
#[derive(Debug, Parser)]
#[command(name = "minio-edge-proxy", version, about, long_about = None)]
pub struct Cli {
    /// TOML configuration file
    #[arg(short, long, env = "MINIO_PROXY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Listen address, e.g. 0.0.0.0:8080
    #[arg(long, env = "MINIO_PROXY_BIND")]
    pub bind: Option<String>,

    #[arg(long, env = "MINIO_PROXY_UPSTREAM_HOST")]
    pub upstream_host: Option<String>,

    #[arg(long, env = "MINIO_PROXY_UPSTREAM_PORT")]
    pub upstream_port: Option<u16>,

    /// http or https
    #[arg(long, env = "MINIO_PROXY_UPSTREAM_SCHEME")]
    pub upstream_scheme: Option<UpstreamScheme>,

    /// Comma separated; may include "*"
    #[arg(long, env = "MINIO_PROXY_ALLOWED_ORIGINS", value_delimiter = ',')]
    pub allowed_origins: Vec<String>,

    /// max-age for static assets, in seconds
    #[arg(long, env = "MINIO_PROXY_CACHE_TTL")]
    pub cache_ttl: Option<u64>,

    /// Public origin, when it cannot be derived from request headers
    #[arg(long, env = "MINIO_PROXY_PUBLIC_ORIGIN")]
    pub public_origin: Option<String>,
}

impl Cli {
    /// Apply every override given on the command line or environment.
    pub fn apply(&self, config: &mut ProxyConfig) {
        if let Some(bind) = &self.bind {
            config.listener.bind_address = bind.clone();
        }
        if let Some(host) = &self.upstream_host {
            config.upstream.host = host.clone();
        }
        if let Some(port) = self.upstream_port {
            config.upstream.port = port;
        }
        if let Some(scheme) = self.upstream_scheme {
            config.upstream.scheme = scheme;
        }
        if !self.allowed_origins.is_empty() {
            config.cors.allowed_origins = self
                .allowed_origins
                .iter()
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect();
        }
        if let Some(ttl) = self.cache_ttl {
            config.cache.static_ttl_secs = ttl;
        }
        if let Some(origin) = &self.public_origin {
            config.listener.public_origin = Some(origin.clone());
        }
    }
}
