//! Top-level configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{DatabaseConfig, RetentionConfig};
use crate::errors::ConfigError;

/// Root of the `plan.toml` file.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PlanConfig {
    pub database: DatabaseConfig,
    pub retention: RetentionConfig,
}

impl PlanConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: PlanConfig = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.database.validate()?;
        self.retention.validate()
    }
}
