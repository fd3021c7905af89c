//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the catch-all proxy handler
//! - Wire up middleware (request ID, tracing, request timeout)
//! - Bind server to a plain or TLS listener
//! - Run the per-request pipeline:
//!   preflight → retarget → outbound request → upstream → transform
//! - Observability (access log, metrics, correlation IDs)

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{header, Method, Request},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use axum_server::tls_rustls::RustlsConfig;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::ProxyConfig;
use crate::error::ProxyError;
use crate::http::request::{build_upstream_request, client_ip, client_origin, UpstreamTarget};
use crate::http::response::{ResponseStrategy, TransformContext};
use crate::http::upstream::UpstreamClient;
use crate::observability::metrics;
use crate::resilience::UpstreamTimeouts;
use crate::security::cors::preflight_response;

/// How long in-flight TLS connections get to finish after shutdown.
const TLS_DRAIN_GRACE: Duration = Duration::from_secs(30);

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ProxyConfig>,
    pub target: Arc<UpstreamTarget>,
    pub upstream: UpstreamClient,
}

/// HTTP server for the edge proxy.
pub struct HttpServer {
    router: Router,
    config: Arc<ProxyConfig>,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    ///
    /// The configuration is expected to have passed validation.
    pub fn new(config: ProxyConfig) -> Result<Self, ProxyError> {
        let target = Arc::new(UpstreamTarget::from_config(&config.upstream)?);
        let upstream = UpstreamClient::new(UpstreamTimeouts::from_config(&config.timeouts));
        let config = Arc::new(config);

        let state = AppState {
            config: config.clone(),
            target,
            upstream,
        };

        let router = Self::build_router(&config, state);
        Ok(Self { router, config })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ProxyConfig, state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(proxy_handler))
            .route("/", any(proxy_handler))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(TraceLayer::new_for_http())
                    .layer(TimeoutLayer::new(Duration::from_secs(
                        config.timeouts.request_secs,
                    )))
                    .layer(PropagateRequestIdLayer::x_request_id()),
            )
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            upstream = %self.config.upstream.origin(),
            "HTTP server starting"
        );

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Run the server terminating TLS itself.
    pub async fn run_tls(
        self,
        addr: SocketAddr,
        tls: RustlsConfig,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        tracing::info!(
            address = %addr,
            upstream = %self.config.upstream.origin(),
            "HTTPS server starting"
        );

        let handle = axum_server::Handle::new();
        let drain = handle.clone();
        tokio::spawn(async move {
            let _ = shutdown.recv().await;
            tracing::info!("Shutdown signal received");
            drain.graceful_shutdown(Some(TLS_DRAIN_GRACE));
        });

        axum_server::bind_rustls(addr, tls)
            .handle(handle)
            .serve(self.router.into_make_service_with_connect_info::<SocketAddr>())
            .await?;

        tracing::info!("HTTPS server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }
}

/// Main proxy handler.
/// Answers preflights locally and forwards everything else upstream.
async fn proxy_handler(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    request: Request<Body>,
) -> Response {
    let start_time = Instant::now();
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string();
    let user_agent = request
        .headers()
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
        .to_string();
    let client = client_ip(request.headers(), peer);

    let path = request.uri().path().to_string();
    let method = request.method().clone();

    tracing::debug!(
        request_id = %request_id,
        method = %method,
        path = %path,
        "Proxying request"
    );

    let (response, strategy) = forward(&state, request, &method, &path).await;
    let status = response.status().as_u16();

    tracing::info!(
        request_id = %request_id,
        method = %method,
        path = %path,
        status,
        strategy,
        duration_ms = start_time.elapsed().as_millis() as u64,
        user_agent = %user_agent,
        client_ip = %client,
        "Request completed"
    );
    metrics::record_request(method.as_str(), status, strategy, start_time);

    response
}

/// The request pipeline. Returns the response and the strategy label.
async fn forward(
    state: &AppState,
    request: Request<Body>,
    method: &Method,
    path: &str,
) -> (Response, &'static str) {
    if *method == Method::OPTIONS {
        return (
            preflight_response(request.headers(), &state.config.cors),
            "preflight",
        );
    }

    let public_origin = client_origin(request.headers(), request.uri(), &state.config.listener);

    let result = async {
        let timeouts = state.upstream.timeouts();
        let deadline = timeouts.deadline();
        let outbound = build_upstream_request(request, &state.target)?;
        let upstream = state.upstream.send(outbound, deadline).await?;

        let strategy = ResponseStrategy::classify(upstream.status(), upstream.headers());
        let name = strategy.name();
        let ctx = TransformContext {
            public_origin: &public_origin,
            upstream_origin: state.target.origin(),
            method,
            path,
            config: &state.config,
            timeouts,
            deadline,
        };
        let response = strategy.transform(upstream, &ctx).await?;
        Ok::<_, ProxyError>((response, name))
    }
    .await;

    match result {
        Ok(done) => done,
        Err(err) => {
            tracing::warn!(
                error = %err,
                kind = err.kind(),
                upstream = %state.target.origin(),
                "Upstream request failed"
            );
            metrics::record_upstream_failure(err.kind());
            (err.into_response(), "fallback")
        }
    }
}
