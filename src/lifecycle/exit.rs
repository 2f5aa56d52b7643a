//! Process termination.

/// Exit status after the server closed within the deadline.
pub const EXIT_GRACEFUL: i32 = 0;

/// Exit status after the force timeout elapsed.
pub const EXIT_FORCED: i32 = 1;

/// Ends the process.
///
/// Implementations other than [`StdProcessExit`] may return; the coordinator
/// never calls this more than once.
pub trait ProcessExit: Send + Sync {
    fn exit(&self, code: i32);
}

/// Calls [`std::process::exit`].
#[derive(Debug, Clone, Copy, Default)]
pub struct StdProcessExit;

impl ProcessExit for StdProcessExit {
    fn exit(&self, code: i32) {
        tracing::info!(code, "Exiting process");
        std::process::exit(code);
    }
}
