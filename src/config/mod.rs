//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → ServiceConfig (immutable)
//!     → ShutdownOptions::from_config (signal names resolved)
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults to allow minimal configs
//! - No semantic validation: values are accepted as written

pub mod loader;
pub mod schema;

pub use loader::{load_config, ConfigError};
pub use schema::{
    CleanupPolicy, ListenerConfig, LogFormat, ObservabilityConfig, ServiceConfig, ShutdownConfig,
    TimeoutConfig,
};
