//! # Constants
//!
//! Shared constants used throughout the controller.
//!
//! These values represent reasonable defaults and can be overridden via
//! configuration or environment variables where applicable.

/// Suffix appended to the resource type name to derive a finalizer
pub const DEFAULT_FINALIZER_SUFFIX: &str = "finalizer";

/// Default HTTP server port for metrics and health probes
pub const DEFAULT_METRICS_PORT: u16 = 5000;

/// Default number of resources reconciled in parallel
pub const DEFAULT_MAX_CONCURRENT_RECONCILIATIONS: u16 = 10;

/// Delay before redelivering a resource whose write hit a stale resource version (milliseconds)
pub const DEFAULT_CONFLICT_REQUEUE_MS: u64 = 500;

/// Default delay before restarting watch stream after unknown errors (seconds)
pub const DEFAULT_WATCH_RESTART_DELAY_SECS: u64 = 5;

/// Default delay before restarting watch stream after it ends (seconds)
pub const DEFAULT_WATCH_RESTART_DELAY_AFTER_END_SECS: u64 = 1;

/// Upper bound on generation marks kept by one dispatcher
pub const DEFAULT_GENERATION_STORE_CAPACITY: usize = 10_000;

/// Default number of attempts made for one resource before giving up until the next change
pub const DEFAULT_RETRY_MAX_ATTEMPTS: u32 = 5;

/// Default first retry delay (seconds)
pub const DEFAULT_RETRY_MIN_SECS: u64 = 1;

/// Default retry delay cap (seconds)
pub const DEFAULT_RETRY_MAX_SECS: u64 = 60;

/// Maximum length of a controller name (RFC 1123 subdomain)
pub const MAX_CONTROLLER_NAME_LEN: usize = 253;

/// Maximum length of the name part of a finalizer
pub const MAX_FINALIZER_NAME_LEN: usize = 63;
