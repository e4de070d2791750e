//! # Event Filters
//!
//! Optional predicates that suppress a dispatch before the state machine runs.
//!
//! A resource marked for deletion is never filtered, so a controller's
//! finalizer can always be released.

use crate::controller::scope::{ExecutionScope, WatchAction};
use crate::crd::is_marked_for_deletion;
use kube::Resource;
use std::fmt;
use std::sync::Arc;

pub type OnAddFilter<K> = Arc<dyn Fn(&K) -> bool + Send + Sync>;
pub type OnUpdateFilter<K> = Arc<dyn Fn(&K, &K) -> bool + Send + Sync>;
pub type GenericFilter<K> = Arc<dyn Fn(&K) -> bool + Send + Sync>;

pub struct EventFilters<K> {
    pub on_add: Option<OnAddFilter<K>>,
    pub on_update: Option<OnUpdateFilter<K>>,
    pub generic: Option<GenericFilter<K>>,
}

impl<K> Default for EventFilters<K> {
    fn default() -> Self {
        Self {
            on_add: None,
            on_update: None,
            generic: None,
        }
    }
}

impl<K> Clone for EventFilters<K> {
    fn clone(&self) -> Self {
        Self {
            on_add: self.on_add.clone(),
            on_update: self.on_update.clone(),
            generic: self.generic.clone(),
        }
    }
}

impl<K> fmt::Debug for EventFilters<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventFilters")
            .field("on_add", &self.on_add.is_some())
            .field("on_update", &self.on_update.is_some())
            .field("generic", &self.generic.is_some())
            .finish()
    }
}

impl<K: Resource> EventFilters<K> {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.on_add.is_none() && self.on_update.is_none() && self.generic.is_none()
    }

    /// Whether at least one event of the scope passes the filters
    pub fn accepts(&self, scope: &ExecutionScope<K>) -> bool {
        if self.is_empty() || is_marked_for_deletion(scope.resource()) {
            return true;
        }

        let mut previous = scope.previous();
        for event in scope.events() {
            if self.accepts_event(event.action, previous, &event.resource) {
                return true;
            }
            previous = Some(&event.resource);
        }
        false
    }

    fn accepts_event(&self, action: WatchAction, previous: Option<&K>, resource: &K) -> bool {
        if let Some(generic) = &self.generic {
            if !generic(resource) {
                return false;
            }
        }
        match action {
            WatchAction::Added => self.on_add.as_ref().is_none_or(|f| f(resource)),
            WatchAction::Modified => match (&self.on_update, previous) {
                (Some(f), Some(old)) => f(old, resource),
                _ => true,
            },
            WatchAction::Deleted | WatchAction::Error => true,
        }
    }
}
