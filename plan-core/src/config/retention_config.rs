//! Retention settings for time-series tables.

use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RetentionConfig {
    /// Days of TPS samples kept by the clean pass. Default: 30.
    pub tps_retention_days: Option<u32>,
}

impl RetentionConfig {
    pub fn effective_tps_retention_days(&self) -> u32 {
        self.tps_retention_days.unwrap_or(30)
    }

    /// Retention window in milliseconds.
    pub fn tps_retention_ms(&self) -> i64 {
        i64::from(self.effective_tps_retention_days()) * 24 * 60 * 60 * 1000
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.tps_retention_days == Some(0) {
            return Err(ConfigError::Invalid(
                "retention.tps_retention_days must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
