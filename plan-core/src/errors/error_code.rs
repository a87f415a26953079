//! Stable error codes shared by every error enum.

pub const STORAGE_ERROR: &str = "STORAGE_ERROR";
pub const CONNECTION_ERROR: &str = "CONNECTION_ERROR";
pub const MIGRATION_FAILED: &str = "MIGRATION_FAILED";
pub const NOT_INITIALIZED: &str = "NOT_INITIALIZED";
pub const INVALID_STATE: &str = "INVALID_STATE";
pub const INVALID_VALUE: &str = "INVALID_VALUE";
pub const NOT_SUPPORTED: &str = "NOT_SUPPORTED";
pub const INIT_DATA_SOURCE: &str = "INIT_DATA_SOURCE";
pub const INIT_SETUP: &str = "INIT_SETUP";
pub const INIT_CLEAN: &str = "INIT_CLEAN";
pub const ALREADY_INITIALIZED: &str = "ALREADY_INITIALIZED";
pub const CONFIG_ERROR: &str = "CONFIG_ERROR";

/// Maps an error to a stable code for hosts that surface errors by name.
pub trait PlanErrorCode {
    fn error_code(&self) -> &'static str;
}
