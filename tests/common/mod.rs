//! Shared fakes for driving the shutdown coordinator in tests.
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use futures_util::future::{BoxFuture, FutureExt};
use futures_util::stream::{self, StreamExt};
use tokio::sync::{mpsc, Notify};

use graceful_shutdown::lifecycle::{
    ProcessExit, ServerHandle, ShutdownCoordinator, ShutdownError, ShutdownOptions, Signal,
    SignalSource, SignalStream,
};
use graceful_shutdown::observability::ShutdownLogger;

/// Ordered record of everything the fakes observed.
pub type Events = Arc<Mutex<Vec<String>>>;

fn push(events: &Events, event: impl Into<String>) {
    events.lock().unwrap().push(event.into());
}

/// Logger that remembers every message.
pub struct RecordingLogger {
    events: Events,
    lines: Mutex<Vec<(&'static str, String)>>,
}

impl RecordingLogger {
    fn lines_at(&self, level: &str) -> Vec<String> {
        self.lines
            .lock()
            .unwrap()
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, message)| message.clone())
            .collect()
    }

    pub fn infos(&self) -> Vec<String> {
        self.lines_at("info")
    }

    pub fn warns(&self) -> Vec<String> {
        self.lines_at("warn")
    }

    pub fn errors(&self) -> Vec<String> {
        self.lines_at("error")
    }

    fn record(&self, level: &'static str, message: &str) {
        push(&self.events, format!("{level}: {message}"));
        self.lines.lock().unwrap().push((level, message.to_string()));
    }
}

impl ShutdownLogger for RecordingLogger {
    fn info(&self, message: &str) {
        self.record("info", message);
    }

    fn warn(&self, message: &str) {
        self.record("warn", message);
    }

    fn error(&self, message: &str) {
        self.record("error", message);
    }
}

/// Exit hook that records status codes instead of exiting.
#[derive(Default)]
pub struct RecordingExit {
    codes: Mutex<Vec<i32>>,
}

impl RecordingExit {
    pub fn codes(&self) -> Vec<i32> {
        self.codes.lock().unwrap().clone()
    }
}

impl ProcessExit for RecordingExit {
    fn exit(&self, code: i32) {
        self.codes.lock().unwrap().push(code);
    }
}

/// Server whose close completes only when the test releases it.
pub struct ControlledServer {
    events: Events,
    closes: AtomicUsize,
    release: Arc<Notify>,
}

impl ControlledServer {
    pub fn close_calls(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    /// Let the pending (or next) close complete.
    pub fn release(&self) {
        self.release.notify_one();
    }
}

impl ServerHandle for ControlledServer {
    fn close(&self) -> BoxFuture<'static, ()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        push(&self.events, "close");
        let release = self.release.clone();
        async move { release.notified().await }.boxed()
    }
}

/// Signal source driven by the test.
#[derive(Default)]
pub struct ManualSignals {
    senders: Mutex<Vec<(Signal, mpsc::UnboundedSender<()>)>>,
    reject: Option<Signal>,
}

impl ManualSignals {
    /// A source that refuses to register `signal`.
    pub fn rejecting(signal: Signal) -> Self {
        Self {
            reject: Some(signal),
            ..Self::default()
        }
    }

    pub fn subscribed(&self) -> Vec<Signal> {
        self.senders.lock().unwrap().iter().map(|(s, _)| *s).collect()
    }

    pub fn send(&self, signal: Signal) {
        for (subscribed, tx) in self.senders.lock().unwrap().iter() {
            if *subscribed == signal {
                let _ = tx.send(());
            }
        }
    }
}

impl SignalSource for ManualSignals {
    fn listen(&self, signal: Signal) -> Result<SignalStream, ShutdownError> {
        if self.reject == Some(signal) {
            return Err(ShutdownError::UnsupportedSignal(signal));
        }

        let (tx, rx) = mpsc::unbounded_channel();
        self.senders.lock().unwrap().push((signal, tx));
        Ok(stream::unfold(rx, |mut rx| async move { rx.recv().await.map(|()| ((), rx)) }).boxed())
    }
}

/// Fakes wired together around one coordinator.
pub struct Harness {
    pub events: Events,
    pub logger: Arc<RecordingLogger>,
    pub server: Arc<ControlledServer>,
    pub exits: Arc<RecordingExit>,
}

impl Harness {
    pub fn new() -> Self {
        let events: Events = Arc::default();
        Self {
            logger: Arc::new(RecordingLogger {
                events: events.clone(),
                lines: Mutex::default(),
            }),
            server: Arc::new(ControlledServer {
                events: events.clone(),
                closes: AtomicUsize::new(0),
                release: Arc::new(Notify::new()),
            }),
            exits: Arc::new(RecordingExit::default()),
            events,
        }
    }

    pub fn coordinator(&self, options: ShutdownOptions) -> Arc<ShutdownCoordinator> {
        ShutdownCoordinator::with_exit(
            self.server.clone(),
            options.with_logger(self.logger.clone()),
            self.exits.clone(),
        )
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    /// Record `event` into the shared log (for cleanup hooks).
    pub fn recorder(&self) -> impl Fn(&str) + Send + Sync + Clone + 'static {
        let events = self.events.clone();
        move |event: &str| push(&events, event)
    }
}

/// Let spawned tasks run without advancing the clock.
pub async fn settle() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}
