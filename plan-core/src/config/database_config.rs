//! Database connection configuration.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;

/// SQL backend variant.
///
/// SQLite connections run inside explicit transactions that must be
/// committed or rolled back. MySQL connections run in autocommit mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    #[default]
    Sqlite,
    MySql,
}

impl Dialect {
    /// Whether statements must be committed explicitly before the
    /// connection is released.
    pub fn uses_explicit_transactions(self) -> bool {
        matches!(self, Self::Sqlite)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Sqlite => "SQLite",
            Self::MySql => "MySQL",
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct DatabaseConfig {
    pub dialect: Dialect,
    pub sqlite: SqliteConfig,
    pub mysql: MySqlConfig,
}

impl DatabaseConfig {
    pub fn sqlite_in_memory() -> Self {
        Self::default()
    }

    pub fn sqlite_file(path: impl Into<PathBuf>) -> Self {
        Self {
            sqlite: SqliteConfig {
                path: Some(path.into()),
                ..SqliteConfig::default()
            },
            ..Self::default()
        }
    }

    /// Name used in log lines and benchmark labels.
    pub fn config_name(&self) -> &'static str {
        self.dialect.name()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.dialect {
            Dialect::Sqlite => self.sqlite.validate(),
            Dialect::MySql => self.mysql.validate(),
        }
    }
}

/// SQLite settings. `path = None` opens an in-memory database.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SqliteConfig {
    pub path: Option<PathBuf>,
    /// Pooled connections. Default: 4. In-memory databases always use 1.
    pub pool_size: Option<u32>,
    /// Busy timeout in milliseconds. Default: 5000.
    pub busy_timeout_ms: Option<u64>,
}

impl SqliteConfig {
    pub fn effective_pool_size(&self) -> u32 {
        if self.path.is_none() {
            return 1;
        }
        self.pool_size.unwrap_or(4).max(1)
    }

    pub fn effective_busy_timeout_ms(&self) -> u64 {
        self.busy_timeout_ms.unwrap_or(5000)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.pool_size == Some(0) {
            return Err(ConfigError::Invalid("sqlite.pool_size must be at least 1".into()));
        }
        Ok(())
    }
}

/// MySQL settings, consumed by a host-supplied data source factory.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct MySqlConfig {
    pub host: String,
    /// Default: 3306.
    pub port: Option<u16>,
    pub database: String,
    pub user: String,
    pub password: String,
    /// Default: 10.
    pub pool_size: Option<u32>,
}

impl MySqlConfig {
    pub fn effective_port(&self) -> u16 {
        self.port.unwrap_or(3306)
    }

    pub fn effective_pool_size(&self) -> u32 {
        self.pool_size.unwrap_or(10).max(1)
    }

    /// `mysql://user@host:port/database`, password omitted.
    pub fn display_url(&self) -> String {
        format!(
            "mysql://{}@{}:{}/{}",
            self.user,
            self.host,
            self.effective_port(),
            self.database
        )
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::Invalid("mysql.host must be set".into()));
        }
        if self.database.trim().is_empty() {
            return Err(ConfigError::Invalid("mysql.database must be set".into()));
        }
        Ok(())
    }
}
