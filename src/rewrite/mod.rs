//! Textual rewriting of upstream-absolute URLs.
//!
//! # Data Flow
//! ```text
//! Upstream response
//!     → redirect.rs (Location header on 3xx)
//!     → html.rs     (buffered text/html bodies)
//!     → client sees only the public origin
//! ```
//!
//! # Design Decisions
//! - Pure string functions; no I/O, easy to test
//! - Rewrites are idempotent: output already pointing at the public
//!   origin is left untouched by a second pass

pub mod html;
pub mod redirect;

pub use html::rewrite_html;
pub use redirect::rewrite_location;
