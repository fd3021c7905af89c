//! minio-edge-proxy
//!
//! Exposes an object store listening on a private, plain-HTTP port
//! through a standard HTTPS origin.
//!
//! ```text
//!   Browser / S3 client
//!        │ HTTPS
//!        ▼
//!   ┌──────────────────────────────────────────────┐
//!   │ OPTIONS? ── yes ──▶ CORS preflight (204)     │
//!   │    │ no                                      │
//!   │ retarget URI ─▶ filter headers ─▶ upstream ──┼──▶ MinIO :19001
//!   │                                      │       │
//!   │ redirect / html / json / generic ◀───┘       │
//!   │ (rewrite Location, rewrite HTML, CORS +      │
//!   │  security headers, cache policy)             │
//!   └──────────────────────────────────────────────┘
//! ```

use clap::Parser;

use minio_edge_proxy::cli::Cli;
use minio_edge_proxy::lifecycle::startup;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    startup::run(Cli::parse()).await
}
