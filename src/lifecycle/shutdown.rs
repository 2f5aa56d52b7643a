//! Shutdown coordination for the server.
//!
//! # Sequence
//! ```text
//! first subscribed signal
//!     → warn, flip drain gate (new requests get 503)
//!     → arm force-timeout watchdog ──────────────┐
//!     → await cleanup hook (optional)            │ fires first:
//!     → await server close (in-flight drain)     │ error, exit(1)
//!     → cancel watchdog, exit(0)                 │
//! ```
//!
//! Later signals are ignored. Exactly one exit call is made, whichever path
//! gets there first.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::{BoxFuture, FutureExt};
use futures_util::StreamExt;
use tokio::task::JoinHandle;

use crate::config::{CleanupPolicy, ShutdownConfig};
use crate::http::drain::{DrainGate, DrainLayer};
use crate::lifecycle::exit::{ProcessExit, StdProcessExit, EXIT_FORCED, EXIT_GRACEFUL};
use crate::lifecycle::signals::{subscription_set, OsSignals, Signal, SignalSource};
use crate::observability::{ShutdownLogger, TracingLogger};

/// Boxed error returned by cleanup hooks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Zero-argument async cleanup routine, run once before the server closes.
pub type CleanupHook = Arc<dyn Fn() -> BoxFuture<'static, Result<(), BoxError>> + Send + Sync>;

/// Default upper bound on the shutdown sequence.
pub const DEFAULT_FORCE_TIMEOUT: Duration = Duration::from_millis(30_000);

/// Error type for shutdown setup and the cleanup step.
#[derive(Debug, thiserror::Error)]
pub enum ShutdownError {
    #[error("unknown signal name '{0}'")]
    UnknownSignal(String),
    #[error("signal {0} is not supported on this platform")]
    UnsupportedSignal(Signal),
    #[error("failed to register handler for {signal}: {source}")]
    Register {
        signal: Signal,
        #[source]
        source: std::io::Error,
    },
    #[error("cleanup hook failed: {0}")]
    Cleanup(#[source] BoxError),
}

/// The server being shut down.
pub trait ServerHandle: Send + Sync {
    /// Stop accepting connections and resolve once in-flight requests have
    /// finished and the listener is closed.
    fn close(&self) -> BoxFuture<'static, ()>;
}

/// Coordinator state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownState {
    Running,
    ShuttingDown,
}

/// Options recognized by [`ShutdownCoordinator::new`].
#[derive(Clone)]
pub struct ShutdownOptions {
    /// Receives the coordinator's info/warn/error messages.
    pub logger: Arc<dyn ShutdownLogger>,
    /// Upper bound on total shutdown duration.
    pub force_timeout: Duration,
    /// Cleanup routine awaited before the server is closed.
    pub on_shutdown: Option<CleanupHook>,
    /// Signals treated like SIGINT and SIGTERM.
    pub additional_signals: Vec<Signal>,
    /// Behaviour when `on_shutdown` fails.
    pub cleanup_policy: CleanupPolicy,
}

impl Default for ShutdownOptions {
    fn default() -> Self {
        Self {
            logger: Arc::new(TracingLogger),
            force_timeout: DEFAULT_FORCE_TIMEOUT,
            on_shutdown: None,
            additional_signals: Vec::new(),
            cleanup_policy: CleanupPolicy::Proceed,
        }
    }
}

impl ShutdownOptions {
    /// Build options from the `[shutdown]` config section.
    pub fn from_config(config: &ShutdownConfig) -> Result<Self, ShutdownError> {
        let additional_signals = config
            .additional_signals
            .iter()
            .map(|name| name.parse())
            .collect::<Result<Vec<Signal>, _>>()?;

        Ok(Self {
            force_timeout: Duration::from_millis(config.force_timeout_ms),
            additional_signals,
            cleanup_policy: config.on_cleanup_error,
            ..Self::default()
        })
    }

    /// Set the cleanup hook from an async closure.
    pub fn with_cleanup<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        self.on_shutdown = Some(Arc::new(move || hook().boxed()));
        self
    }

    /// Replace the logger.
    pub fn with_logger(mut self, logger: Arc<dyn ShutdownLogger>) -> Self {
        self.logger = logger;
        self
    }
}

/// Coordinator for graceful shutdown.
///
/// One instance per server. It owns the drain gate shared with every
/// [`DrainLayer`] it hands out.
pub struct ShutdownCoordinator {
    gate: DrainGate,
    exited: AtomicBool,
    server: Arc<dyn ServerHandle>,
    exit: Arc<dyn ProcessExit>,
    logger: Arc<dyn ShutdownLogger>,
    force_timeout: Duration,
    on_shutdown: Option<CleanupHook>,
    additional_signals: Vec<Signal>,
    cleanup_policy: CleanupPolicy,
}

impl ShutdownCoordinator {
    /// Create a coordinator that ends the process with [`std::process::exit`].
    pub fn new(server: Arc<dyn ServerHandle>, options: ShutdownOptions) -> Arc<Self> {
        Self::with_exit(server, options, Arc::new(StdProcessExit))
    }

    /// Create a coordinator with a custom process-exit hook.
    pub fn with_exit(
        server: Arc<dyn ServerHandle>,
        options: ShutdownOptions,
        exit: Arc<dyn ProcessExit>,
    ) -> Arc<Self> {
        Arc::new(Self {
            gate: DrainGate::new(),
            exited: AtomicBool::new(false),
            server,
            exit,
            logger: options.logger,
            force_timeout: options.force_timeout,
            on_shutdown: options.on_shutdown,
            additional_signals: options.additional_signals,
            cleanup_policy: options.cleanup_policy,
        })
    }

    /// Current position in the Running → ShuttingDown state machine.
    pub fn state(&self) -> ShutdownState {
        if self.gate.is_draining() {
            ShutdownState::ShuttingDown
        } else {
            ShutdownState::Running
        }
    }

    /// Whether a shutdown sequence has started.
    pub fn is_shutting_down(&self) -> bool {
        self.state() == ShutdownState::ShuttingDown
    }

    /// Deadline the watchdog is armed with.
    pub fn force_timeout(&self) -> Duration {
        self.force_timeout
    }

    /// Signals this coordinator subscribes to, in subscription order.
    pub fn signals(&self) -> Vec<Signal> {
        subscription_set(&self.additional_signals)
    }

    /// Interception stage bound to this coordinator's drain gate.
    pub fn layer(&self) -> DrainLayer {
        DrainLayer::new(self.gate.clone())
    }

    /// Subscribe to every configured signal and return the interception stage.
    ///
    /// All handlers are registered before any listener task is spawned, so an
    /// error leaves nothing installed. Must be called within a Tokio runtime.
    pub fn install<S>(self: &Arc<Self>, source: &S) -> Result<DrainLayer, ShutdownError>
    where
        S: SignalSource + ?Sized,
    {
        let subscriptions = self
            .signals()
            .into_iter()
            .map(|signal| source.listen(signal).map(|deliveries| (signal, deliveries)))
            .collect::<Result<Vec<_>, _>>()?;

        for (signal, mut deliveries) in subscriptions {
            let coordinator = Arc::clone(self);
            tokio::spawn(async move {
                while deliveries.next().await.is_some() {
                    coordinator.trigger(signal);
                }
            });
        }

        tracing::info!(
            signals = ?self.signals(),
            force_timeout_ms = self.force_timeout.as_millis() as u64,
            "Shutdown handlers installed"
        );
        Ok(self.layer())
    }

    /// Start the shutdown sequence in response to `signal`.
    ///
    /// The drain gate is closed and the watchdog armed before this returns;
    /// cleanup and server close continue on a spawned task, whose handle is
    /// returned. Returns `None` if a shutdown is already in progress.
    pub fn trigger(self: &Arc<Self>, signal: Signal) -> Option<JoinHandle<()>> {
        if !self.gate.begin_drain() {
            tracing::debug!(signal = %signal, "Shutdown already in progress, ignoring signal");
            return None;
        }

        self.logger
            .warn(&format!("Received kill signal '{signal}'. Shutting down..."));

        let watchdog = self.arm_watchdog();
        let coordinator = Arc::clone(self);
        Some(tokio::spawn(async move {
            coordinator.drain(watchdog).await;
        }))
    }

    fn arm_watchdog(self: &Arc<Self>) -> JoinHandle<()> {
        let coordinator = Arc::clone(self);
        let deadline = self.force_timeout;
        tokio::spawn(async move {
            tokio::time::sleep(deadline).await;
            coordinator
                .logger
                .error("Could not close connections in time. Forcefully shutting down...");
            coordinator.terminate(EXIT_FORCED);
        })
    }

    async fn drain(&self, watchdog: JoinHandle<()>) {
        if let Err(e) = self.run_cleanup().await {
            self.logger.error(&e.to_string());
            if self.cleanup_policy == CleanupPolicy::Abort {
                // The watchdog stays armed and ends the process.
                return;
            }
        }

        self.logger.info("Closing server connections...");
        self.server.close().await;

        watchdog.abort();
        self.terminate(EXIT_GRACEFUL);
    }

    async fn run_cleanup(&self) -> Result<(), ShutdownError> {
        match &self.on_shutdown {
            Some(hook) => hook().await.map_err(ShutdownError::Cleanup),
            None => Ok(()),
        }
    }

    fn terminate(&self, code: i32) {
        if self.exited.swap(true, Ordering::AcqRel) {
            tracing::debug!(code, "Exit already requested");
            return;
        }
        self.exit.exit(code);
    }
}

/// Create a coordinator for `server`, subscribe it to the OS signals and
/// return the interception stage to put at the head of the router.
pub fn create_shutdown_layer(
    server: Arc<dyn ServerHandle>,
    options: ShutdownOptions,
) -> Result<DrainLayer, ShutdownError> {
    ShutdownCoordinator::new(server, options).install(&OsSignals)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct NeverCloses;

    impl ServerHandle for NeverCloses {
        fn close(&self) -> BoxFuture<'static, ()> {
            std::future::pending().boxed()
        }
    }

    #[derive(Default)]
    struct Codes(Mutex<Vec<i32>>);

    impl ProcessExit for Codes {
        fn exit(&self, code: i32) {
            self.0.lock().unwrap().push(code);
        }
    }

    #[test]
    fn test_options_from_config() {
        let config = ShutdownConfig {
            force_timeout_ms: 123_456,
            additional_signals: vec!["SIGUSR2".into(), "hup".into()],
            on_cleanup_error: CleanupPolicy::Abort,
        };
        let options = ShutdownOptions::from_config(&config).unwrap();

        assert_eq!(options.force_timeout, Duration::from_millis(123_456));
        assert_eq!(options.additional_signals, vec![Signal::User2, Signal::Hangup]);
        assert_eq!(options.cleanup_policy, CleanupPolicy::Abort);
        assert!(options.on_shutdown.is_none());
    }

    #[test]
    fn test_options_from_config_rejects_unknown_signal() {
        let config = ShutdownConfig {
            additional_signals: vec!["SIGNOPE".into()],
            ..ShutdownConfig::default()
        };
        assert!(matches!(
            ShutdownOptions::from_config(&config),
            Err(ShutdownError::UnknownSignal(_))
        ));
    }

    #[test]
    fn test_defaults() {
        let coordinator = ShutdownCoordinator::new(Arc::new(NeverCloses), ShutdownOptions::default());
        assert_eq!(coordinator.state(), ShutdownState::Running);
        assert_eq!(coordinator.force_timeout(), Duration::from_millis(30_000));
        assert_eq!(coordinator.signals(), vec![Signal::Interrupt, Signal::Terminate]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_trigger_is_synchronous_and_idempotent() {
        let codes = Arc::new(Codes::default());
        let coordinator = ShutdownCoordinator::with_exit(
            Arc::new(NeverCloses),
            ShutdownOptions::default(),
            codes.clone(),
        );

        assert!(coordinator.trigger(Signal::Interrupt).is_some());
        assert!(coordinator.is_shutting_down());
        assert!(coordinator.trigger(Signal::Terminate).is_none());
        assert!(coordinator.trigger(Signal::Interrupt).is_none());
        assert!(codes.0.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_exit_called_once() {
        let codes = Arc::new(Codes::default());
        let coordinator = ShutdownCoordinator::with_exit(
            Arc::new(NeverCloses),
            ShutdownOptions::default(),
            codes.clone(),
        );

        coordinator.terminate(EXIT_FORCED);
        coordinator.terminate(EXIT_GRACEFUL);
        assert_eq!(*codes.0.lock().unwrap(), vec![EXIT_FORCED]);
    }
}
