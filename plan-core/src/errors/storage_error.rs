//! Storage-layer errors for SQL operations.

use super::error_code::{self, PlanErrorCode};

/// Errors that can occur in the storage layer.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("SQL error: {message}")]
    Sqlite { message: String },

    #[error("Could not obtain a connection: {message}")]
    Connection { message: String },

    #[error("Connection pool error: {message}")]
    Pool { message: String },

    #[error("Migration failed at version {version}: {message}")]
    MigrationFailed { version: u32, message: String },

    #[error("Database has not been initialized")]
    NotInitialized,

    #[error("Invalid engine state: expected {expected}, was {actual}")]
    InvalidState { expected: String, actual: String },

    #[error("Data source dialect {actual} does not match configured dialect {configured}")]
    DialectMismatch { configured: String, actual: String },

    #[error("Invalid value: {message}")]
    InvalidValue { message: String },

    #[error("Operation not supported: {operation}: {reason}")]
    NotSupported { operation: String, reason: String },
}

impl StorageError {
    pub fn sql(e: impl std::fmt::Display) -> Self {
        Self::Sqlite {
            message: e.to_string(),
        }
    }

    pub fn connection(e: impl std::fmt::Display) -> Self {
        Self::Connection {
            message: e.to_string(),
        }
    }

    pub fn invalid_value(message: impl Into<String>) -> Self {
        Self::InvalidValue {
            message: message.into(),
        }
    }
}

impl PlanErrorCode for StorageError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Connection { .. } | Self::Pool { .. } => error_code::CONNECTION_ERROR,
            Self::MigrationFailed { .. } => error_code::MIGRATION_FAILED,
            Self::NotInitialized => error_code::NOT_INITIALIZED,
            Self::InvalidState { .. } | Self::DialectMismatch { .. } => error_code::INVALID_STATE,
            Self::InvalidValue { .. } => error_code::INVALID_VALUE,
            Self::NotSupported { .. } => error_code::NOT_SUPPORTED,
            Self::Sqlite { .. } => error_code::STORAGE_ERROR,
        }
    }
}
