//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (Axum setup, middleware, proxy handler)
//!     → OPTIONS? → security::cors (204 preflight, done)
//!     → request.rs (retarget URI, filter headers, stream body)
//!     → upstream.rs (single attempt under deadline; failure → 503)
//!     → response.rs (redirect / html / json / generic strategy)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;
pub mod upstream;

pub use request::{build_upstream_request, client_origin, UpstreamTarget};
pub use response::{ResponseStrategy, TransformContext};
pub use server::{AppState, HttpServer};
pub use upstream::UpstreamClient;
