//! Service configuration.

use std::time::Duration;

use lifeline_core::DAY_MILLIS;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// JSON could not be parsed.
    #[error("config parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// A value is out of range.
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Rate-limit policy applied per caller and operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Calls allowed per window.
    pub max_requests: u32,
    /// Window length in seconds.
    pub window_secs: u64,
}

impl RateLimitConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 10,
            window_secs: 60,
        }
    }
}

/// Configuration for [`EmergencyAccess`](crate::EmergencyAccess).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessConfig {
    /// Days an invitation token stays redeemable.
    pub invitation_ttl_days: u32,
    /// Smallest wait period an owner may choose.
    pub min_wait_days: u32,
    /// Largest wait period an owner may choose.
    pub max_wait_days: u32,
    /// Rate limiting for enrollment, requests and disclosure reads.
    pub rate_limit: RateLimitConfig,
    /// Capacity of the post-commit notification queue.
    pub notification_buffer: usize,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            invitation_ttl_days: 7,
            min_wait_days: 1,
            max_wait_days: 90,
            rate_limit: RateLimitConfig::default(),
            notification_buffer: 256,
        }
    }
}

impl AccessConfig {
    /// Parse and validate a JSON document. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check every value is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.invitation_ttl_days == 0 {
            return Err(ConfigError::Invalid("invitation_ttl_days must be at least 1".into()));
        }
        if self.min_wait_days < 1 {
            return Err(ConfigError::Invalid("min_wait_days must be at least 1".into()));
        }
        if self.min_wait_days > self.max_wait_days {
            return Err(ConfigError::Invalid(format!(
                "min_wait_days {} exceeds max_wait_days {}",
                self.min_wait_days, self.max_wait_days
            )));
        }
        if self.rate_limit.window_secs == 0 {
            return Err(ConfigError::Invalid("rate_limit.window_secs must be at least 1".into()));
        }
        if self.rate_limit.max_requests == 0 {
            return Err(ConfigError::Invalid("rate_limit.max_requests must be at least 1".into()));
        }
        if self.notification_buffer == 0 {
            return Err(ConfigError::Invalid("notification_buffer must be at least 1".into()));
        }
        Ok(())
    }

    /// Whether `wait_days` is an allowed wait period.
    pub fn wait_days_allowed(&self, wait_days: u32) -> bool {
        (self.min_wait_days..=self.max_wait_days).contains(&wait_days)
    }

    /// Invitation lifetime in milliseconds.
    pub fn invitation_ttl_millis(&self) -> i64 {
        i64::from(self.invitation_ttl_days).saturating_mul(DAY_MILLIS)
    }
}
