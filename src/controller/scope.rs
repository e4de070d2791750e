//! # Execution Scope
//!
//! One batch of watch events for a single resource, plus the snapshot the
//! dispatcher decides on.

use crate::controller::reconciler::{Context, RetryInfo};
use std::fmt;
use thiserror::Error;

/// Watch action reported by the informer layer
///
/// The dispatcher never branches on the action: deletion is detected through
/// the resource's deletion timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WatchAction {
    Added,
    Modified,
    Deleted,
    Error,
}

impl WatchAction {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            WatchAction::Added => "added",
            WatchAction::Modified => "modified",
            WatchAction::Deleted => "deleted",
            WatchAction::Error => "error",
        }
    }
}

impl fmt::Display for WatchAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Event<K> {
    pub action: WatchAction,
    pub resource: K,
}

impl<K> Event<K> {
    pub fn new(action: WatchAction, resource: K) -> Self {
        Self { action, resource }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScopeError {
    #[error("execution scope needs at least one event")]
    Empty,
}

/// Ordered, non-empty events of one resource and its authoritative snapshot
#[derive(Debug, Clone)]
pub struct ExecutionScope<K> {
    events: Vec<Event<K>>,
    resource: K,
    previous: Option<K>,
    retry: Option<RetryInfo>,
}

impl<K: Clone> ExecutionScope<K> {
    /// Scope whose authoritative snapshot is the last event's resource
    ///
    /// # Errors
    ///
    /// Returns [`ScopeError::Empty`] when `events` is empty.
    pub fn new(events: Vec<Event<K>>) -> Result<Self, ScopeError> {
        let resource = events.last().ok_or(ScopeError::Empty)?.resource.clone();
        Ok(Self {
            events,
            resource,
            previous: None,
            retry: None,
        })
    }

    /// Scope with an explicit authoritative snapshot
    ///
    /// # Errors
    ///
    /// Returns [`ScopeError::Empty`] when `events` is empty.
    pub fn with_resource(events: Vec<Event<K>>, resource: K) -> Result<Self, ScopeError> {
        if events.is_empty() {
            return Err(ScopeError::Empty);
        }
        Ok(Self {
            events,
            resource,
            previous: None,
            retry: None,
        })
    }

    /// Scope of a single event
    pub fn single(action: WatchAction, resource: K) -> Self {
        Self {
            events: vec![Event::new(action, resource.clone())],
            resource,
            previous: None,
            retry: None,
        }
    }
}

impl<K> ExecutionScope<K> {
    /// Snapshot dispatched before this scope, used by update filters
    #[must_use]
    pub fn with_previous(mut self, previous: Option<K>) -> Self {
        self.previous = previous;
        self
    }

    #[must_use]
    pub fn with_retry_info(mut self, retry: Option<RetryInfo>) -> Self {
        self.retry = retry;
        self
    }

    pub fn events(&self) -> &[Event<K>] {
        &self.events
    }

    pub fn resource(&self) -> &K {
        &self.resource
    }

    pub fn previous(&self) -> Option<&K> {
        self.previous.as_ref()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Always `false`: a scope cannot be built without events
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn context(&self) -> Context {
        Context::new(self.retry, self.events.iter().map(|e| e.action).collect())
    }

    pub fn into_resource(self) -> K {
        self.resource
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_scope_is_rejected() {
        let result = ExecutionScope::<u32>::new(Vec::new());
        assert_eq!(result.err(), Some(ScopeError::Empty));
        let result = ExecutionScope::with_resource(Vec::new(), 1_u32);
        assert_eq!(result.err(), Some(ScopeError::Empty));
    }

    #[test]
    fn test_last_event_is_authoritative() {
        let scope = ExecutionScope::new(vec![
            Event::new(WatchAction::Added, 1_u32),
            Event::new(WatchAction::Modified, 2_u32),
        ])
        .unwrap();
        assert_eq!(*scope.resource(), 2);
        assert_eq!(scope.len(), 2);
        assert_eq!(
            scope.context().actions(),
            &[WatchAction::Added, WatchAction::Modified]
        );
    }

    #[test]
    fn test_retry_info_reaches_context() {
        let retry = RetryInfo {
            attempt: 2,
            last_attempt: false,
        };
        let scope = ExecutionScope::single(WatchAction::Modified, 7_u32).with_retry_info(Some(retry));
        assert_eq!(scope.context().retry_info(), Some(&retry));
    }
}
