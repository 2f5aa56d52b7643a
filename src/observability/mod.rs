//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → tracing events (structured fields)
//!     → logging.rs (subscriber: env filter + pretty/JSON fmt layer)
//!
//! Shutdown coordinator:
//!     → ShutdownLogger (info/warn/error) → TracingLogger → tracing events
//! ```

pub mod logging;

pub use logging::{init_logging, ShutdownLogger, TracingLogger};
