//! Error types for every subsystem.

pub mod config_error;
pub mod error_code;
pub mod init_error;
pub mod storage_error;

pub use config_error::ConfigError;
pub use error_code::PlanErrorCode;
pub use init_error::InitError;
pub use storage_error::StorageError;
