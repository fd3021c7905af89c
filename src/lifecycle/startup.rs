//! Startup orchestration.
//!
//! # Responsibilities
//! - Load, override and validate configuration
//! - Initialize logging and metrics
//! - Bind the listener and serve until shutdown
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Listeners start last (traffic only when ready)

use std::net::SocketAddr;

use tokio::net::TcpListener;

use crate::cli::Cli;
use crate::config::{load_or_default, validate_config, ConfigError, ProxyConfig};
use crate::http::HttpServer;
use crate::lifecycle::Shutdown;
use crate::net::tls::load_tls_config;
use crate::observability::{logging, metrics};

/// Build the effective configuration: file (or defaults), then CLI/env.
pub fn resolve_config(cli: &Cli) -> Result<ProxyConfig, ConfigError> {
    let mut config = load_or_default(cli.config.as_deref())?;
    cli.apply(&mut config);
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Start the proxy and block until it has shut down.
pub async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = resolve_config(&cli)?;

    logging::init(&config.observability);
    tracing::info!("minio-edge-proxy v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        upstream = %config.upstream.origin(),
        allowed_origins = ?config.cors.allowed_origins,
        upstream_timeout_secs = config.timeouts.upstream_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        let addr: SocketAddr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr);
    }

    let shutdown = Shutdown::new();
    shutdown.trigger_on_signal();

    let tls = config.listener.tls.clone();
    let bind_address: SocketAddr = config.listener.bind_address.parse()?;
    let server = HttpServer::new(config)?;

    match tls {
        Some(tls) => {
            let rustls = load_tls_config(&tls).await?;
            server.run_tls(bind_address, rustls, shutdown.subscribe()).await?;
        }
        None => {
            let listener = TcpListener::bind(bind_address).await?;
            tracing::info!(address = %listener.local_addr()?, "Listening for connections");
            server.run(listener, shutdown.subscribe()).await?;
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
