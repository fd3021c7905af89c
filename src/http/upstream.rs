//! Outbound client to the object store.
//!
//! # Responsibilities
//! - Own the pooled HTTP(S) client
//! - Issue exactly one attempt per request under the configured deadline
//! - Hand the response body back as a stream
//!
//! # Design Decisions
//! - hyper's client never follows redirects; 3xx responses reach the
//!   response transformer untouched
//! - `https_or_http` so the upstream scheme is a configuration choice

use axum::{
    body::Body,
    http::{Request, Response},
};
use hyper::body::Incoming;
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tokio::time::Instant;

use crate::error::ProxyError;
use crate::resilience::UpstreamTimeouts;

type HttpsClient = Client<HttpsConnector<HttpConnector>, Body>;

/// Client used for every proxied call.
#[derive(Clone)]
pub struct UpstreamClient {
    client: HttpsClient,
    timeouts: UpstreamTimeouts,
}

impl UpstreamClient {
    pub fn new(timeouts: UpstreamTimeouts) -> Self {
        let mut http = HttpConnector::new();
        http.enforce_http(false);
        http.set_connect_timeout(Some(timeouts.connect));

        let https = HttpsConnectorBuilder::new()
            .with_webpki_roots()
            .https_or_http()
            .enable_http1()
            .wrap_connector(http);

        let client = Client::builder(TokioExecutor::new()).build(https);

        Self { client, timeouts }
    }

    /// Deadlines this client was built with.
    pub fn timeouts(&self) -> UpstreamTimeouts {
        self.timeouts
    }

    /// Send the request; transport failures and timeouts become `ProxyError`.
    ///
    /// Only the wait for response headers is bounded by `deadline` here.
    /// Callers that buffer the body bound that read with the same deadline.
    pub async fn send(
        &self,
        request: Request<Body>,
        deadline: Instant,
    ) -> Result<Response<Body>, ProxyError> {
        let response: Response<Incoming> = self
            .timeouts
            .bound_until(deadline, async {
                self.client.request(request).await.map_err(ProxyError::from)
            })
            .await?;

        let (parts, body) = response.into_parts();
        Ok(Response::from_parts(parts, Body::new(body)))
    }
}
