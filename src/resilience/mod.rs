//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Request to upstream:
//!     → timeouts.rs (enforce connect/response deadline)
//!     → On failure: synthesized 503 (no retry, single attempt)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every upstream call has a deadline
//! - No retries: request bodies are streamed and cannot be replayed

pub mod timeouts;

pub use timeouts::UpstreamTimeouts;
