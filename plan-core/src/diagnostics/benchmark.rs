//! Named start/stop timer sink.

use std::collections::HashMap;
use std::sync::Mutex;
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};

/// Brackets long operations with named start/stop calls. Purely observational.
pub trait BenchmarkSink: Send + Sync {
    fn start(&self, name: &str);

    /// Stops the timer started under `name`. `source` groups the measurement
    /// in output. Returns `None` if no timer with that name was running.
    fn stop(&self, source: &str, name: &str) -> Option<Duration>;
}

/// Keeps start instants per thread and name and logs elapsed time on stop.
/// Timers with the same name on different threads do not interfere.
#[derive(Debug, Default)]
pub struct TracingBenchmark {
    running: Mutex<HashMap<(ThreadId, String), Instant>>,
}

impl TracingBenchmark {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BenchmarkSink for TracingBenchmark {
    fn start(&self, name: &str) {
        if let Ok(mut running) = self.running.lock() {
            running.insert((thread::current().id(), name.to_string()), Instant::now());
        }
    }

    fn stop(&self, source: &str, name: &str) -> Option<Duration> {
        let key = (thread::current().id(), name.to_string());
        let started = self.running.lock().ok()?.remove(&key)?;
        let elapsed = started.elapsed();
        tracing::debug!(
            target: "plan::benchmark",
            source,
            elapsed_ms = elapsed.as_millis() as u64,
            "{name}"
        );
        Some(elapsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stop_without_start_returns_none() {
        let bench = TracingBenchmark::new();
        assert!(bench.stop("Database", "never started").is_none());
    }

    #[test]
    fn start_then_stop_measures_once() {
        let bench = TracingBenchmark::new();
        bench.start("Create tables");
        assert!(bench.stop("Database", "Create tables").is_some());
        assert!(bench.stop("Database", "Create tables").is_none());
    }

    #[test]
    fn same_name_on_two_threads_keeps_both_timers() {
        let bench = TracingBenchmark::new();
        bench.start("Remove Account");
        std::thread::scope(|s| {
            s.spawn(|| {
                bench.start("Remove Account");
                assert!(bench.stop("Database", "Remove Account").is_some());
            });
        });
        assert!(bench.stop("Database", "Remove Account").is_some());
    }
}
