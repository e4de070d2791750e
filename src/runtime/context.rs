//! State shared by every reconcile call of one controller.

use crate::config::ControllerConfiguration;
use crate::constants::DEFAULT_GENERATION_STORE_CAPACITY;
use crate::controller::dispatcher::EventDispatcher;
use crate::controller::reconciler::RetryInfo;
use crate::controller::retry::RetryExecution;
use crate::crd::ResourceKey;
use kube::Resource;
use moka::sync::Cache;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// Context handed to the `kube_runtime` controller
///
/// Besides the dispatcher it keeps the retry state of failing resources and
/// the last dispatched snapshot of each resource, used to tell additions from
/// modifications and to feed update filters. Snapshots are bounded like the
/// generation store: a resource deleted without passing through the dispatcher
/// is eventually evicted.
pub struct ControllerRuntime<K> {
    dispatcher: EventDispatcher<K>,
    conflict_requeue: Duration,
    retries: Mutex<HashMap<ResourceKey, Box<dyn RetryExecution>>>,
    last_seen: Cache<ResourceKey, K>,
}

impl<K> fmt::Debug for ControllerRuntime<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControllerRuntime")
            .field("dispatcher", &self.dispatcher)
            .field("conflict_requeue", &self.conflict_requeue)
            .finish_non_exhaustive()
    }
}

impl<K> ControllerRuntime<K>
where
    K: Resource + Clone + Send + Sync + 'static,
{
    pub fn new(dispatcher: EventDispatcher<K>, conflict_requeue: Duration) -> Self {
        Self {
            dispatcher,
            conflict_requeue,
            retries: Mutex::new(HashMap::new()),
            last_seen: snapshot_cache(DEFAULT_GENERATION_STORE_CAPACITY),
        }
    }

    /// Keep at most `capacity` last dispatched snapshots
    #[must_use]
    pub fn with_snapshot_capacity(mut self, capacity: usize) -> Self {
        self.last_seen = snapshot_cache(capacity);
        self
    }

    pub fn dispatcher(&self) -> &EventDispatcher<K> {
        &self.dispatcher
    }

    pub fn configuration(&self) -> &Arc<ControllerConfiguration<K>> {
        self.dispatcher.configuration()
    }

    pub fn controller_name(&self) -> &str {
        self.configuration().name()
    }

    pub fn conflict_requeue(&self) -> Duration {
        self.conflict_requeue
    }

    /// Retry state of the upcoming attempt; `None` when the last one succeeded
    pub fn retry_info(&self, key: &ResourceKey) -> Option<RetryInfo> {
        let retries = self.retries.lock().unwrap_or_else(PoisonError::into_inner);
        retries.get(key).map(|execution| execution.retry_info())
    }

    /// Count a failed attempt and return the delay before the next one
    ///
    /// `None` once the retry policy is exhausted; the retry state is then
    /// dropped so the next change starts over.
    pub fn record_failure(&self, key: &ResourceKey) -> Option<Duration> {
        let mut retries = self.retries.lock().unwrap_or_else(PoisonError::into_inner);
        let execution = retries
            .entry(key.clone())
            .or_insert_with(|| self.configuration().retry().init_execution());
        let delay = execution.next_delay();
        if delay.is_none() {
            retries.remove(key);
        }
        delay
    }

    pub fn reset_retry(&self, key: &ResourceKey) {
        let mut retries = self.retries.lock().unwrap_or_else(PoisonError::into_inner);
        retries.remove(key);
    }

    pub fn previous(&self, key: &ResourceKey) -> Option<K> {
        self.last_seen.get(key)
    }

    pub fn remember(&self, key: ResourceKey, resource: K) {
        self.last_seen.insert(key, resource);
    }

    /// Number of snapshots held, after applying pending evictions
    pub fn snapshot_count(&self) -> usize {
        self.last_seen.run_pending_tasks();
        usize::try_from(self.last_seen.entry_count()).unwrap_or(usize::MAX)
    }

    /// Drop everything kept for a resource leaving the cluster
    pub fn forget(&self, key: &ResourceKey) {
        self.last_seen.invalidate(key);
        self.reset_retry(key);
        self.configuration().rate_limiter().prune();
        self.dispatcher.forget(key);
    }
}

fn snapshot_cache<K>(capacity: usize) -> Cache<ResourceKey, K>
where
    K: Clone + Send + Sync + 'static,
{
    let capacity = u64::try_from(capacity.max(1)).unwrap_or(u64::MAX);
    Cache::builder().max_capacity(capacity).build()
}
