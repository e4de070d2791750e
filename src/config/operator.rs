//! # Operator Configuration
//!
//! Process-level settings loaded from environment variables.

use crate::constants::{
    DEFAULT_CONFLICT_REQUEUE_MS, DEFAULT_GENERATION_STORE_CAPACITY,
    DEFAULT_MAX_CONCURRENT_RECONCILIATIONS, DEFAULT_METRICS_PORT,
    DEFAULT_WATCH_RESTART_DELAY_AFTER_END_SECS, DEFAULT_WATCH_RESTART_DELAY_SECS,
};
use std::time::Duration;

/// Operator-level configuration
///
/// All settings have sensible defaults and can be overridden via environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperatorConfig {
    /// Port of the metrics and probe server
    pub metrics_port: u16,
    /// Maximum concurrent reconciliations across all resources of one controller
    pub max_concurrent_reconciliations: u16,
    /// Delay before redelivering a resource after a write conflict (milliseconds)
    pub conflict_requeue_ms: u64,
    /// Watch stream restart delay after unknown errors (seconds)
    pub watch_restart_delay_secs: u64,
    /// Watch stream restart delay after stream ends (seconds)
    pub watch_restart_delay_after_end_secs: u64,
    /// Upper bound on remembered generation marks per dispatcher
    pub generation_store_capacity: usize,
    /// Global log level (ERROR, WARN, INFO, DEBUG, TRACE)
    pub log_level: String,
}

impl Default for OperatorConfig {
    fn default() -> Self {
        Self {
            metrics_port: DEFAULT_METRICS_PORT,
            max_concurrent_reconciliations: DEFAULT_MAX_CONCURRENT_RECONCILIATIONS,
            conflict_requeue_ms: DEFAULT_CONFLICT_REQUEUE_MS,
            watch_restart_delay_secs: DEFAULT_WATCH_RESTART_DELAY_SECS,
            watch_restart_delay_after_end_secs: DEFAULT_WATCH_RESTART_DELAY_AFTER_END_SECS,
            generation_store_capacity: DEFAULT_GENERATION_STORE_CAPACITY,
            log_level: "INFO".to_string(),
        }
    }
}

impl OperatorConfig {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        Self {
            metrics_port: env_var_or_default("METRICS_PORT", DEFAULT_METRICS_PORT),
            max_concurrent_reconciliations: env_var_or_default(
                "MAX_CONCURRENT_RECONCILIATIONS",
                DEFAULT_MAX_CONCURRENT_RECONCILIATIONS,
            ),
            conflict_requeue_ms: env_var_or_default(
                "CONFLICT_REQUEUE_MS",
                DEFAULT_CONFLICT_REQUEUE_MS,
            ),
            watch_restart_delay_secs: env_var_or_default(
                "WATCH_RESTART_DELAY_SECS",
                DEFAULT_WATCH_RESTART_DELAY_SECS,
            ),
            watch_restart_delay_after_end_secs: env_var_or_default(
                "WATCH_RESTART_DELAY_AFTER_END_SECS",
                DEFAULT_WATCH_RESTART_DELAY_AFTER_END_SECS,
            ),
            generation_store_capacity: env_var_or_default(
                "GENERATION_STORE_CAPACITY",
                DEFAULT_GENERATION_STORE_CAPACITY,
            ),
            log_level: env_var_or_default_str("LOG_LEVEL", "INFO"),
        }
    }

    /// Get conflict requeue duration
    pub fn conflict_requeue_duration(&self) -> Duration {
        Duration::from_millis(self.conflict_requeue_ms)
    }

    /// Get watch restart delay duration
    pub fn watch_restart_delay_duration(&self) -> Duration {
        Duration::from_secs(self.watch_restart_delay_secs)
    }

    /// Get watch restart delay after end duration
    pub fn watch_restart_delay_after_end_duration(&self) -> Duration {
        Duration::from_secs(self.watch_restart_delay_after_end_secs)
    }
}

/// Read environment variable or return default value
fn env_var_or_default<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Read environment variable as string or return default
fn env_var_or_default_str(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = OperatorConfig::default();
        assert_eq!(config.metrics_port, 5000);
        assert_eq!(config.conflict_requeue_duration(), Duration::from_millis(500));
        assert_eq!(config.watch_restart_delay_duration(), Duration::from_secs(5));
        assert_eq!(
            config.watch_restart_delay_after_end_duration(),
            Duration::from_secs(1)
        );
        assert_eq!(config.generation_store_capacity, 10_000);
        assert_eq!(config.log_level, "INFO");
    }

    #[test]
    fn test_env_var_or_default_falls_back_on_unparsable_value() {
        assert_eq!(
            env_var_or_default("DISPATCH_CONTROLLER_TEST_UNSET_VARIABLE", 42_u16),
            42
        );
    }
}
