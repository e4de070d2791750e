//! Last successfully processed generation per resource identity.

use crate::crd::ResourceKey;
use moka::ops::compute::Op;
use moka::sync::Cache;

/// Bounded map from resource identity to its last processed generation
///
/// Past `capacity` the cache evicts marks; an evicted resource is simply
/// reconciled once more on its next event.
#[derive(Debug, Clone)]
pub struct GenerationStore {
    marks: Cache<ResourceKey, i64>,
}

impl GenerationStore {
    /// A store holding at most `capacity` marks (at least one)
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = u64::try_from(capacity.max(1)).unwrap_or(u64::MAX);
        Self {
            marks: Cache::builder().max_capacity(capacity).build(),
        }
    }

    pub fn get(&self, key: &ResourceKey) -> Option<i64> {
        self.marks.get(key)
    }

    /// Whether `generation` was already processed for `key`
    pub fn is_processed(&self, key: &ResourceKey, generation: i64) -> bool {
        self.get(key).is_some_and(|mark| generation <= mark)
    }

    /// Record `generation` as processed; a mark never moves backwards
    pub fn mark(&self, key: &ResourceKey, generation: i64) {
        self.marks
            .entry(key.clone())
            .and_compute_with(|current| match current {
                Some(entry) if *entry.value() >= generation => Op::Nop,
                _ => Op::Put(generation),
            });
    }

    /// Drop the mark of a resource that is going away
    pub fn forget(&self, key: &ResourceKey) -> Option<i64> {
        self.marks.remove(key)
    }

    /// Number of marks held, after applying pending evictions
    pub fn len(&self) -> usize {
        self.marks.run_pending_tasks();
        usize::try_from(self.marks.entry_count()).unwrap_or(usize::MAX)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for GenerationStore {
    fn default() -> Self {
        Self::new(crate::constants::DEFAULT_GENERATION_STORE_CAPACITY)
    }
}
