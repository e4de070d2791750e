//! # Outcomes
//!
//! What a reconciler asks the dispatcher to persist.

/// Result of [`Reconciler::reconcile`](crate::controller::reconciler::Reconciler::reconcile)
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOutcome<K> {
    /// Nothing to persist
    NoUpdate,
    /// Replace the full resource, guarded by its resource version
    UpdateResource(K),
    /// Persist only the status sub-resource
    UpdateStatusOnly(K),
}

impl<K> UpdateOutcome<K> {
    #[must_use]
    pub fn no_update() -> Self {
        Self::NoUpdate
    }

    #[must_use]
    pub fn update_resource(resource: K) -> Self {
        Self::UpdateResource(resource)
    }

    #[must_use]
    pub fn update_status(resource: K) -> Self {
        Self::UpdateStatusOnly(resource)
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoUpdate => "no-update",
            Self::UpdateResource(_) => "update-resource",
            Self::UpdateStatusOnly(_) => "update-status",
        }
    }
}

/// Result of [`Reconciler::finalize`](crate::controller::reconciler::Reconciler::finalize)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeleteOutcome {
    /// Cleanup is complete: remove the controller's finalizer
    #[default]
    FinishDeletion,
    /// Keep the finalizer; a later event re-runs finalization
    FinishWithoutFinalizerRemoval,
}

impl DeleteOutcome {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FinishDeletion => "finish-deletion",
            Self::FinishWithoutFinalizerRemoval => "finish-without-finalizer-removal",
        }
    }
}
