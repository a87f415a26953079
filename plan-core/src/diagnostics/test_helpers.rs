//! Recording fakes for [`LogSink`] and [`BenchmarkSink`].
//!
//! Used by engine tests to assert on what was logged and timed.

use std::error::Error;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use super::{BenchmarkSink, LogSink};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Debug,
    Error,
}

/// Stores every message in order.
#[derive(Debug, Default)]
pub struct RecordingLogSink {
    entries: Mutex<Vec<(LogLevel, String)>>,
}

impl RecordingLogSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<(LogLevel, String)> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn messages(&self, level: LogLevel) -> Vec<String> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, m)| m.clone())
            .collect()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .any(|(_, m)| m.contains(needle))
    }

    fn push(&self, level: LogLevel, message: String) {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).push((level, message));
    }
}

impl LogSink for RecordingLogSink {
    fn info(&self, message: &str) {
        self.push(LogLevel::Info, message.to_string());
    }

    fn debug(&self, message: &str) {
        self.push(LogLevel::Debug, message.to_string());
    }

    fn error(&self, message: &str, cause: &dyn Error) {
        self.push(LogLevel::Error, format!("{message}: {cause}"));
    }
}

/// Records start/stop calls; `stop` always reports a zero duration.
#[derive(Debug, Default)]
pub struct RecordingBenchmark {
    started: Mutex<Vec<String>>,
    stopped: Mutex<Vec<(String, String)>>,
}

impl RecordingBenchmark {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn started(&self) -> Vec<String> {
        self.started.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// `(source, name)` pairs in stop order.
    pub fn stopped(&self) -> Vec<(String, String)> {
        self.stopped.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl BenchmarkSink for RecordingBenchmark {
    fn start(&self, name: &str) {
        self.started.lock().unwrap_or_else(PoisonError::into_inner).push(name.to_string());
    }

    fn stop(&self, source: &str, name: &str) -> Option<Duration> {
        self.stopped
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((source.to_string(), name.to_string()));
        Some(Duration::ZERO)
    }
}
