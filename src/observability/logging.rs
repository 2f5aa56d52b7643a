//! Structured logging.
//!
//! # Responsibilities
//! - Initialize logging subsystem
//! - Provide the logger capability used by the shutdown coordinator
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - JSON format for production, pretty format for development
//! - Log level configurable via config, `RUST_LOG` wins when set

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{LogFormat, ObservabilityConfig};

const LIFECYCLE_TARGET: &str = "graceful_shutdown::lifecycle";

/// Install the global tracing subscriber.
pub fn init_logging(
    config: &ObservabilityConfig,
) -> Result<(), tracing_subscriber::util::TryInitError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "graceful_shutdown={level},tower_http={level}",
            level = config.log_level
        ))
    });

    let registry = tracing_subscriber::registry().with(filter);
    match config.log_format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).try_init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).try_init(),
    }
}

/// Sink for the shutdown coordinator's messages.
///
/// The coordinator only ever logs at three levels, so this is deliberately
/// narrower than a full subscriber.
pub trait ShutdownLogger: Send + Sync {
    fn info(&self, message: &str);
    fn warn(&self, message: &str);
    fn error(&self, message: &str);
}

/// Default logger: forwards to `tracing` events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl ShutdownLogger for TracingLogger {
    fn info(&self, message: &str) {
        tracing::info!(target: LIFECYCLE_TARGET, "{}", message);
    }

    fn warn(&self, message: &str) {
        tracing::warn!(target: LIFECYCLE_TARGET, "{}", message);
    }

    fn error(&self, message: &str) {
        tracing::error!(target: LIFECYCLE_TARGET, "{}", message);
    }
}
