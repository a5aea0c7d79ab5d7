//! World tick configuration.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The document is not valid YAML for the expected shape.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_yaml::Error),
    /// A field is outside its accepted range.
    #[error("invalid configuration value for `{field}`: {reason}")]
    Invalid {
        field: &'static str,
        reason: &'static str,
    },
}

/// Simulation configuration parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Seed for deterministic RNG; combined with the date every tick.
    pub rng_seed: u64,
    /// Daily reputation step toward zero.
    pub reputation_decay_step: f32,
    /// Reputation at or below which AI companies declare war.
    pub war_threshold: f32,
    /// Companies contribute `money / divisor` to the assistance pool.
    pub mutual_assistance_divisor: i64,
    /// A sector without population leaks `money / divisor` per neighbor.
    pub empty_sector_leak_divisor: i64,
    /// Leak ratio per unit of wealth share above one half.
    pub migration_leak_factor: f64,
    /// Length of the trailing consumption history.
    pub consumption_history_days: usize,
    /// Upper bound of a single fast forward.
    pub fast_forward_max_days: i64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            rng_seed: 42,
            reputation_decay_step: 0.01,
            war_threshold: -100.0,
            mutual_assistance_divisor: 1000,
            empty_sector_leak_divisor: 1000,
            migration_leak_factor: 0.02,
            consumption_history_days: 365,
            fast_forward_max_days: 365,
        }
    }
}

impl SimConfig {
    /// Parse a YAML document; missing fields take their default value.
    pub fn from_yaml_str(s: &str) -> Result<Self, ConfigError> {
        let config: SimConfig = serde_yaml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.reputation_decay_step.is_finite() && self.reputation_decay_step >= 0.0) {
            return Err(ConfigError::Invalid {
                field: "reputation_decay_step",
                reason: "must be finite and >= 0",
            });
        }
        if !self.war_threshold.is_finite() {
            return Err(ConfigError::Invalid {
                field: "war_threshold",
                reason: "must be finite",
            });
        }
        if self.mutual_assistance_divisor <= 0 {
            return Err(ConfigError::Invalid {
                field: "mutual_assistance_divisor",
                reason: "must be > 0",
            });
        }
        if self.empty_sector_leak_divisor <= 0 {
            return Err(ConfigError::Invalid {
                field: "empty_sector_leak_divisor",
                reason: "must be > 0",
            });
        }
        // The leak cap is 1% at share 1.0, so the factor may not exceed 0.02.
        if !(0.0..=0.02).contains(&self.migration_leak_factor) {
            return Err(ConfigError::Invalid {
                field: "migration_leak_factor",
                reason: "must be within [0, 0.02]",
            });
        }
        if self.consumption_history_days == 0 {
            return Err(ConfigError::Invalid {
                field: "consumption_history_days",
                reason: "must be > 0",
            });
        }
        if self.fast_forward_max_days <= 0 {
            return Err(ConfigError::Invalid {
                field: "fast_forward_max_days",
                reason: "must be > 0",
            });
        }
        Ok(())
    }
}
