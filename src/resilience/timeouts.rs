//! Timeout enforcement.
//!
//! # Responsibilities
//! - Wrap upstream calls with a deadline
//! - Cancel the pending call cleanly when the deadline passes
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - Timeout errors are distinct from transport errors
//! - Timed-out requests get the same 503 fallback as unreachable upstreams

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

use crate::config::TimeoutConfig;
use crate::error::ProxyError;

/// Deadlines applied to every upstream call.
#[derive(Debug, Clone, Copy)]
pub struct UpstreamTimeouts {
    /// TCP (and TLS) connection establishment.
    pub connect: Duration,
    /// Time until response headers arrive.
    pub response: Duration,
}

impl UpstreamTimeouts {
    pub fn from_config(config: &TimeoutConfig) -> Self {
        Self {
            connect: Duration::from_secs(config.connect_secs),
            response: Duration::from_secs(config.upstream_secs),
        }
    }

    /// Response deadline for a call starting now.
    pub fn deadline(&self) -> Instant {
        Instant::now() + self.response
    }

    /// Run `fut` under the response deadline.
    pub async fn bound<F, T>(&self, fut: F) -> Result<T, ProxyError>
    where
        F: Future<Output = Result<T, ProxyError>>,
    {
        self.bound_until(self.deadline(), fut).await
    }

    /// Run `fut` until an already-running deadline expires.
    ///
    /// Lets the header wait and a buffered body read share one budget.
    pub async fn bound_until<F, T>(&self, deadline: Instant, fut: F) -> Result<T, ProxyError>
    where
        F: Future<Output = Result<T, ProxyError>>,
    {
        match tokio::time::timeout_at(deadline, fut).await {
            Ok(result) => result,
            Err(_) => Err(ProxyError::Timeout(self.response)),
        }
    }
}
