//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGINT/SIGTERM (+ configured extras) → ShutdownCoordinator::trigger
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Stop accepting (503) → Cleanup hook → Close server → Exit(0)
//!                     └→ Force timeout elapsed ─────────────────────────────→ Exit(1)
//!
//! Exit (exit.rs):
//!     ProcessExit abstraction over std::process::exit
//! ```
//!
//! # Design Decisions
//! - Ordered shutdown: stop accept, cleanup, drain, close
//! - Shutdown has timeout: forced exit after deadline
//! - One coordinator per server, passed explicitly; no globals

pub mod exit;
pub mod shutdown;
pub mod signals;

pub use exit::{ProcessExit, StdProcessExit, EXIT_FORCED, EXIT_GRACEFUL};
pub use shutdown::{
    create_shutdown_layer, BoxError, CleanupHook, ServerHandle, ShutdownCoordinator,
    ShutdownError, ShutdownOptions, ShutdownState, DEFAULT_FORCE_TIMEOUT,
};
pub use signals::{OsSignals, Signal, SignalSource, SignalStream};
