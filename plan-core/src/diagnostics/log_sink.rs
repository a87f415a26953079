//! Leveled logger sink.

use std::error::Error;

/// Accepts leveled messages from the storage engine.
pub trait LogSink: Send + Sync {
    fn info(&self, message: &str);
    fn debug(&self, message: &str);
    fn error(&self, message: &str, cause: &dyn Error);
}

/// Forwards every message to `tracing` under the `plan::database` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogSink;

impl LogSink for TracingLogSink {
    fn info(&self, message: &str) {
        tracing::info!(target: "plan::database", "{message}");
    }

    fn debug(&self, message: &str) {
        tracing::debug!(target: "plan::database", "{message}");
    }

    fn error(&self, message: &str, cause: &dyn Error) {
        tracing::error!(target: "plan::database", error = %cause, "{message}");
    }
}
