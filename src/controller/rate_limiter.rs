//! # Rate Limiter
//!
//! Bounds how often one resource is dispatched within a time window.
//!
//! [`LinearRateLimiter`] keeps one GCRA cell per resource in a keyed
//! `governor` limiter: `limit_for_period` dispatches may burst, then permits
//! come back one every `refresh_period / limit_for_period`.

use crate::constants::DEFAULT_GENERATION_STORE_CAPACITY;
use crate::crd::ResourceKey;
use governor::clock::{Clock, DefaultClock};
use governor::{DefaultKeyedRateLimiter, Quota};
use std::fmt::{self, Debug};
use std::num::NonZeroU32;
use std::time::Duration;
use tracing::debug;

pub trait RateLimiter: Send + Sync + Debug {
    /// Ask permission to dispatch `key` now
    ///
    /// `None` grants it; `Some(delay)` asks the caller to come back later.
    fn acquire(&self, key: &ResourceKey) -> Option<Duration>;

    /// Drop per-resource state that no longer limits anything
    fn prune(&self);
}

/// Allows `limit_for_period` dispatches per resource in each `refresh_period`
pub struct LinearRateLimiter {
    refresh_period: Duration,
    limit_for_period: u32,
    /// Tracked resources above which idle cells are pruned on acquire
    prune_threshold: usize,
    limiter: Option<DefaultKeyedRateLimiter<ResourceKey>>,
}

impl Debug for LinearRateLimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LinearRateLimiter")
            .field("refresh_period", &self.refresh_period)
            .field("limit_for_period", &self.limit_for_period)
            .field("prune_threshold", &self.prune_threshold)
            .field("tracked", &self.tracked())
            .finish()
    }
}

impl LinearRateLimiter {
    /// A zero period or limit gives a deactivated limiter
    #[must_use]
    pub fn new(refresh_period: Duration, limit_for_period: u32) -> Self {
        let limiter = NonZeroU32::new(limit_for_period)
            .and_then(|burst| {
                Quota::with_period(refresh_period / burst.get())
                    .map(|quota| quota.allow_burst(burst))
            })
            .map(DefaultKeyedRateLimiter::keyed);

        Self {
            refresh_period,
            limit_for_period,
            prune_threshold: DEFAULT_GENERATION_STORE_CAPACITY,
            limiter,
        }
    }

    /// A limiter that never limits
    #[must_use]
    pub fn deactivated() -> Self {
        Self::new(Duration::ZERO, 0)
    }

    #[must_use]
    pub fn with_prune_threshold(mut self, prune_threshold: usize) -> Self {
        self.prune_threshold = prune_threshold;
        self
    }

    #[must_use]
    pub fn is_activated(&self) -> bool {
        self.limiter.is_some()
    }

    /// Number of resources with a cell in the limiter
    #[must_use]
    pub fn tracked(&self) -> usize {
        self.limiter.as_ref().map_or(0, |limiter| limiter.len())
    }
}

impl Default for LinearRateLimiter {
    fn default() -> Self {
        Self::deactivated()
    }
}

impl RateLimiter for LinearRateLimiter {
    fn acquire(&self, key: &ResourceKey) -> Option<Duration> {
        let limiter = self.limiter.as_ref()?;

        let delay = match limiter.check_key(key) {
            Ok(()) => None,
            Err(not_until) => Some(not_until.wait_time_from(DefaultClock::default().now())),
        };

        if limiter.len() > self.prune_threshold {
            limiter.retain_recent();
            debug!(tracked = limiter.len(), "Pruned idle rate limiter cells");
        }
        delay
    }

    fn prune(&self) {
        if let Some(limiter) = &self.limiter {
            limiter.retain_recent();
        }
    }
}
