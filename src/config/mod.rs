//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → CLI / environment overrides (main)
//!     → validation.rs (semantic checks)
//!     → ProxyConfig (validated, immutable)
//!     → shared via Arc to every request handler
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; there is no reload path
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, load_or_default, ConfigError};
pub use schema::{
    CacheConfig, CorsConfig, LimitsConfig, ListenerConfig, LogFormat, ObservabilityConfig,
    PathsConfig, ProxyConfig, TimeoutConfig, TlsConfig, UpstreamConfig, UpstreamScheme,
};
pub use validation::{validate_config, ValidationError};
