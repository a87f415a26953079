//! # plan-core
//!
//! Foundation crate for the Plan analytics store.
//! Defines errors, config, the diagnostics sinks injected into the storage
//! engine, and tracing setup. `plan-storage` depends on this.

pub mod config;
pub mod diagnostics;
pub mod errors;
pub mod logging;

pub use config::{DatabaseConfig, Dialect, PlanConfig, RetentionConfig};
pub use diagnostics::{BenchmarkSink, LogSink, TracingBenchmark, TracingLogSink};
pub use errors::{ConfigError, InitError, PlanErrorCode, StorageError};
