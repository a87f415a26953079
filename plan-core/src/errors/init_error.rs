//! Database initialization errors.
//!
//! Setup and clean failures are separate variants so a host can tell a
//! broken schema apart from a failed retention pass.

use super::error_code::{self, PlanErrorCode};
use super::StorageError;

#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("Failed to open data source: {0}")]
    DataSource(#[source] StorageError),

    #[error("Failed to set up database: {0}")]
    Setup(#[source] StorageError),

    #[error("Database clean failed: {0}")]
    Clean(#[source] StorageError),

    #[error("Database was already initialized")]
    AlreadyInitialized,
}

impl InitError {
    /// The storage failure underneath, if any.
    pub fn cause(&self) -> Option<&StorageError> {
        match self {
            Self::DataSource(e) | Self::Setup(e) | Self::Clean(e) => Some(e),
            Self::AlreadyInitialized => None,
        }
    }
}

impl PlanErrorCode for InitError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::DataSource(_) => error_code::INIT_DATA_SOURCE,
            Self::Setup(_) => error_code::INIT_SETUP,
            Self::Clean(_) => error_code::INIT_CLEAN,
            Self::AlreadyInitialized => error_code::ALREADY_INITIALIZED,
        }
    }
}
