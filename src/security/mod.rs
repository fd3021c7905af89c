//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → cors.rs (answer OPTIONS preflight from the allow-list)
//!     → headers.rs (drop origin-sensitive and hop-by-hop headers)
//!
//! Outgoing response:
//!     → headers.rs (strip hop-by-hop, add CORS + security headers)
//! ```
//!
//! # Design Decisions
//! - Signature validation stays with the object store
//! - Preflight never fails; a disallowed origin degrades, it is not rejected

pub mod cors;
pub mod headers;
