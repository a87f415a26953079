//! Configuration for the storage layer, loaded from TOML.

pub mod database_config;
pub mod plan_config;
pub mod retention_config;

pub use database_config::{DatabaseConfig, Dialect, MySqlConfig, SqliteConfig};
pub use plan_config::PlanConfig;
pub use retention_config::RetentionConfig;
