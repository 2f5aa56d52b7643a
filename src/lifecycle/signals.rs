//! OS signal handling.
//!
//! # Responsibilities
//! - Name the termination signals the coordinator can subscribe to
//! - Register handlers with the OS and expose deliveries as a stream
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - `SignalSource` is a trait so the coordinator can be driven without the OS
//! - Non-unix platforms deliver SIGINT (Ctrl+C) only; SIGTERM never fires
//!   there and other signals are rejected

use std::fmt;
use std::str::FromStr;

use futures_util::stream::{BoxStream, StreamExt};

use crate::lifecycle::shutdown::ShutdownError;

/// A process-level termination request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    Interrupt,
    Terminate,
    Hangup,
    Quit,
    User1,
    User2,
}

impl Signal {
    /// Signals that are always subscribed, in subscription order.
    pub const STANDARD: [Signal; 2] = [Signal::Interrupt, Signal::Terminate];

    /// Conventional OS name, e.g. `SIGINT`.
    pub fn name(self) -> &'static str {
        match self {
            Signal::Interrupt => "SIGINT",
            Signal::Terminate => "SIGTERM",
            Signal::Hangup => "SIGHUP",
            Signal::Quit => "SIGQUIT",
            Signal::User1 => "SIGUSR1",
            Signal::User2 => "SIGUSR2",
        }
    }

    #[cfg(unix)]
    fn kind(self) -> tokio::signal::unix::SignalKind {
        use tokio::signal::unix::SignalKind;

        match self {
            Signal::Interrupt => SignalKind::interrupt(),
            Signal::Terminate => SignalKind::terminate(),
            Signal::Hangup => SignalKind::hangup(),
            Signal::Quit => SignalKind::quit(),
            Signal::User1 => SignalKind::user_defined1(),
            Signal::User2 => SignalKind::user_defined2(),
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Signal {
    type Err = ShutdownError;

    /// Accepts `SIGTERM`, `TERM` and `sigterm` alike.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        let bare = upper.strip_prefix("SIG").unwrap_or(&upper);
        match bare {
            "INT" => Ok(Signal::Interrupt),
            "TERM" => Ok(Signal::Terminate),
            "HUP" => Ok(Signal::Hangup),
            "QUIT" => Ok(Signal::Quit),
            "USR1" => Ok(Signal::User1),
            "USR2" => Ok(Signal::User2),
            _ => Err(ShutdownError::UnknownSignal(s.to_string())),
        }
    }
}

/// One item per delivery of the subscribed signal.
pub type SignalStream = BoxStream<'static, ()>;

/// Something that can deliver named termination signals.
pub trait SignalSource {
    /// Register a handler for `signal`.
    fn listen(&self, signal: Signal) -> Result<SignalStream, ShutdownError>;
}

/// Signal source backed by the operating system.
///
/// Must be used from within a Tokio runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsSignals;

impl SignalSource for OsSignals {
    #[cfg(unix)]
    fn listen(&self, signal: Signal) -> Result<SignalStream, ShutdownError> {
        let mut handler = tokio::signal::unix::signal(signal.kind())
            .map_err(|source| ShutdownError::Register { signal, source })?;

        tracing::debug!(signal = %signal, "Signal handler registered");
        Ok(futures_util::stream::poll_fn(move |cx| handler.poll_recv(cx)).boxed())
    }

    #[cfg(not(unix))]
    fn listen(&self, signal: Signal) -> Result<SignalStream, ShutdownError> {
        match signal {
            Signal::Interrupt => {
                tracing::debug!(signal = %signal, "Signal handler registered");
                Ok(futures_util::stream::unfold((), |_| async {
                    tokio::signal::ctrl_c().await.ok().map(|_| ((), ()))
                })
                .boxed())
            }
            // No SIGTERM here; the subscription simply never fires.
            Signal::Terminate => Ok(futures_util::stream::pending().boxed()),
            other => Err(ShutdownError::UnsupportedSignal(other)),
        }
    }
}

/// SIGINT and SIGTERM followed by `additional`, without duplicates.
pub fn subscription_set(additional: &[Signal]) -> Vec<Signal> {
    let mut signals = Signal::STANDARD.to_vec();
    for signal in additional {
        if !signals.contains(signal) {
            signals.push(*signal);
        }
    }
    signals
}
