//! # Retry
//!
//! Retry policy consumed by the outer scheduling layer.
//!
//! The default policy uses a Fibonacci backoff, which grows more slowly than an
//! exponential one. Sequence with the defaults: 1s, 1s, 2s, 3s, 5s, 8s, ... capped
//! at 60s.
//!
//! ## Usage
//!
//! ```rust
//! use dispatch_controller::controller::retry::FibonacciBackoff;
//!
//! let mut backoff = FibonacciBackoff::new(1, 10); // 1 second min, 10 seconds max
//! assert_eq!(backoff.next_backoff_seconds(), 1);
//! assert_eq!(backoff.next_backoff_seconds(), 1);
//! assert_eq!(backoff.next_backoff_seconds(), 2);
//! assert_eq!(backoff.next_backoff_seconds(), 3);
//! assert_eq!(backoff.next_backoff_seconds(), 5);
//! ```

use crate::constants::{DEFAULT_RETRY_MAX_ATTEMPTS, DEFAULT_RETRY_MAX_SECS, DEFAULT_RETRY_MIN_SECS};
use crate::controller::reconciler::RetryInfo;
use std::fmt::Debug;
use std::time::Duration;

/// A retry policy: creates one [`RetryExecution`] per failing resource
pub trait Retry: Send + Sync + Debug {
    fn init_execution(&self) -> Box<dyn RetryExecution>;
}

/// Retry state of one resource
pub trait RetryExecution: Send + Sync + Debug {
    /// Record a failed attempt and return the delay before the next one
    ///
    /// `None` means the attempts are exhausted.
    fn next_delay(&mut self) -> Option<Duration>;

    /// 1-based number of the upcoming attempt
    fn attempt_count(&self) -> u32;

    fn is_last_attempt(&self) -> bool;

    fn retry_info(&self) -> RetryInfo {
        RetryInfo {
            attempt: self.attempt_count(),
            last_attempt: self.is_last_attempt(),
        }
    }
}

/// Fibonacci backoff calculator
///
/// Each backoff is the sum of the previous two, capped at the maximum.
#[derive(Debug, Clone)]
pub struct FibonacciBackoff {
    /// Minimum backoff value in seconds (for reset)
    min_secs: u64,
    prev_secs: u64,
    current_secs: u64,
    max_secs: u64,
}

impl FibonacciBackoff {
    #[must_use]
    pub fn new(min_secs: u64, max_secs: u64) -> Self {
        Self {
            min_secs,
            prev_secs: 0,
            current_secs: min_secs,
            max_secs,
        }
    }

    /// Get the next backoff duration in seconds and advance the sequence
    pub fn next_backoff_seconds(&mut self) -> u64 {
        let result = self.current_secs;
        let next = self.prev_secs.saturating_add(self.current_secs);
        self.prev_secs = self.current_secs;
        self.current_secs = std::cmp::min(next, self.max_secs);
        result
    }

    pub fn next_backoff(&mut self) -> Duration {
        Duration::from_secs(self.next_backoff_seconds())
    }

    pub fn reset(&mut self) {
        self.prev_secs = 0;
        self.current_secs = self.min_secs;
    }
}

/// Default retry policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FibonacciRetry {
    pub min_secs: u64,
    pub max_secs: u64,
    /// Total attempts, including the first one
    pub max_attempts: u32,
}

impl Default for FibonacciRetry {
    fn default() -> Self {
        Self {
            min_secs: DEFAULT_RETRY_MIN_SECS,
            max_secs: DEFAULT_RETRY_MAX_SECS,
            max_attempts: DEFAULT_RETRY_MAX_ATTEMPTS,
        }
    }
}

impl FibonacciRetry {
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }
}

impl Retry for FibonacciRetry {
    fn init_execution(&self) -> Box<dyn RetryExecution> {
        Box::new(FibonacciRetryExecution {
            backoff: FibonacciBackoff::new(self.min_secs, self.max_secs),
            failures: 0,
            max_attempts: self.max_attempts,
        })
    }
}

#[derive(Debug, Clone)]
pub struct FibonacciRetryExecution {
    backoff: FibonacciBackoff,
    failures: u32,
    max_attempts: u32,
}

impl RetryExecution for FibonacciRetryExecution {
    fn next_delay(&mut self) -> Option<Duration> {
        self.failures = self.failures.saturating_add(1);
        if self.failures >= self.max_attempts {
            return None;
        }
        Some(self.backoff.next_backoff())
    }

    fn attempt_count(&self) -> u32 {
        self.failures.saturating_add(1)
    }

    fn is_last_attempt(&self) -> bool {
        self.attempt_count() >= self.max_attempts
    }
}
