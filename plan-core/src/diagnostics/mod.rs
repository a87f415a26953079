//! Diagnostics sinks injected into the storage engine.
//!
//! The engine never depends on these for correctness. Production code uses
//! the `tracing`-backed implementations; tests use the recording fakes in
//! [`test_helpers`].

pub mod benchmark;
pub mod log_sink;
pub mod test_helpers;

pub use benchmark::{BenchmarkSink, TracingBenchmark};
pub use log_sink::{LogSink, TracingLogSink};
