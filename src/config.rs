//! Engine configuration with environment-variable overrides.

use crate::constants::system;
use crate::error::{Result, WorkflowError};

/// Tunable engine settings, carried per workflow instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Lease length handed to `acquire_lock` when the caller supplies no
    /// explicit timeout.
    pub default_lock_timeout_ms: u64,
    /// Capacity of the broadcast channel behind the event publisher.
    pub event_channel_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_lock_timeout_ms: system::DEFAULT_LOCK_TIMEOUT_MS,
            event_channel_capacity: system::DEFAULT_EVENT_CHANNEL_CAPACITY,
        }
    }
}

impl EngineConfig {
    /// Build a configuration from defaults plus environment overrides.
    ///
    /// Recognized variables: `STATEGATE_LOCK_TIMEOUT_MS`,
    /// `STATEGATE_EVENT_CAPACITY`.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(timeout) = std::env::var("STATEGATE_LOCK_TIMEOUT_MS") {
            config.default_lock_timeout_ms = timeout.parse().map_err(|e| {
                WorkflowError::Configuration(format!("Invalid STATEGATE_LOCK_TIMEOUT_MS: {e}"))
            })?;
        }

        if let Ok(capacity) = std::env::var("STATEGATE_EVENT_CAPACITY") {
            config.event_channel_capacity = capacity.parse().map_err(|e| {
                WorkflowError::Configuration(format!("Invalid STATEGATE_EVENT_CAPACITY: {e}"))
            })?;
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.default_lock_timeout_ms, 30_000);
        assert_eq!(config.event_channel_capacity, 1_000);
    }

    // Single test for all env handling so parallel test threads never
    // observe each other's variable mutations.
    #[test]
    fn test_from_env_overrides_and_rejects_garbage() {
        std::env::set_var("STATEGATE_LOCK_TIMEOUT_MS", "5000");
        let config = EngineConfig::from_env().unwrap();
        assert_eq!(config.default_lock_timeout_ms, 5000);

        std::env::set_var("STATEGATE_EVENT_CAPACITY", "lots");
        let result = EngineConfig::from_env();
        assert!(matches!(result, Err(WorkflowError::Configuration(_))));

        std::env::remove_var("STATEGATE_LOCK_TIMEOUT_MS");
        std::env::remove_var("STATEGATE_EVENT_CAPACITY");
    }
}
