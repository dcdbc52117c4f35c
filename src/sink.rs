//! Notification sink
//!
//! The only channel through which the executor reports user-visible state.
//! Implementations must return quickly and must not panic.

/// Receives diagnostics, errors, notices and status updates
pub trait OutputSink: Send + Sync {
    /// Diagnostic detail (logs, raw tool output)
    fn diag_log(&self, message: &str);

    /// Something failed and the user should know
    fn error_to_user(&self, message: &str);

    /// Benign event (build finished, command echo)
    fn notify_user(&self, message: &str);

    /// Short status string, e.g. for a status bar
    fn update_state(&self, state: &str);
}

/// Sink that forwards everything to `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl OutputSink for TracingSink {
    fn diag_log(&self, message: &str) {
        tracing::debug!("{message}");
    }

    fn error_to_user(&self, message: &str) {
        tracing::error!("{message}");
    }

    fn notify_user(&self, message: &str) {
        tracing::info!("{message}");
    }

    fn update_state(&self, state: &str) {
        tracing::debug!(state, "State changed");
    }
}
