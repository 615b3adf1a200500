//! Fulfillment retry and webhook ledger configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Retry queue settings for license grants and generation unlocks
#[derive(Debug, Clone, Deserialize)]
pub struct FulfillmentConfig {
    /// How often the retry worker polls for due tasks
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Tasks claimed per poll
    #[serde(default = "default_batch_size")]
    pub batch_size: u32,

    /// Attempts before a task is marked dead
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// First retry delay; doubles per attempt up to one hour
    #[serde(default = "default_base_backoff_secs")]
    pub base_backoff_secs: i64,
}

impl FulfillmentConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.poll_interval_ms == 0 {
            return Err(ValidationError::InvalidFulfillment("poll_interval_ms"));
        }
        if self.batch_size == 0 {
            return Err(ValidationError::InvalidFulfillment("batch_size"));
        }
        if self.max_attempts == 0 {
            return Err(ValidationError::InvalidFulfillment("max_attempts"));
        }
        if self.base_backoff_secs <= 0 {
            return Err(ValidationError::InvalidFulfillment("base_backoff_secs"));
        }
        Ok(())
    }
}

impl Default for FulfillmentConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            batch_size: default_batch_size(),
            max_attempts: default_max_attempts(),
            base_backoff_secs: default_base_backoff_secs(),
        }
    }
}

/// Retention of processed webhook event ids
#[derive(Debug, Clone, Deserialize)]
pub struct LedgerConfig {
    #[serde(default = "default_retention_days")]
    pub retention_days: i64,

    #[serde(default = "default_prune_interval_secs")]
    pub prune_interval_secs: u64,
}

impl LedgerConfig {
    pub fn prune_interval(&self) -> Duration {
        Duration::from_secs(self.prune_interval_secs)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        // Providers retry for up to three days; keep ids at least that long
        if self.retention_days < 3 || self.prune_interval_secs == 0 {
            return Err(ValidationError::InvalidRetention);
        }
        Ok(())
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            retention_days: default_retention_days(),
            prune_interval_secs: default_prune_interval_secs(),
        }
    }
}

fn default_poll_interval_ms() -> u64 {
    5_000
}

fn default_batch_size() -> u32 {
    50
}

fn default_max_attempts() -> u32 {
    8
}

fn default_base_backoff_secs() -> i64 {
    30
}

fn default_retention_days() -> i64 {
    30
}

fn default_prune_interval_secs() -> u64 {
    3_600
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fulfillment_defaults() {
        let config = FulfillmentConfig::default();
        assert_eq!(config.poll_interval(), Duration::from_secs(5));
        assert_eq!(config.batch_size, 50);
        assert_eq!(config.max_attempts, 8);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_values_rejected() {
        let config = FulfillmentConfig {
            max_attempts: 0,
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ValidationError::InvalidFulfillment("max_attempts"))
        );

        let config = FulfillmentConfig {
            base_backoff_secs: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_ledger_retention_floor() {
        assert!(LedgerConfig::default().validate().is_ok());

        let config = LedgerConfig {
            retention_days: 1,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ValidationError::InvalidRetention));
    }
}
