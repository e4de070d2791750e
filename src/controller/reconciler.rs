//! # Reconciler
//!
//! The unit of user logic the dispatcher invokes.

use crate::controller::outcome::{DeleteOutcome, UpdateOutcome};
use crate::controller::scope::WatchAction;
use async_trait::async_trait;

/// Retry state of the current attempt, as tracked by the outer retry layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryInfo {
    /// 1-based number of the current attempt
    pub attempt: u32,
    /// No further attempt follows if this one fails
    pub last_attempt: bool,
}

/// Information handed to the reconciler alongside the resource
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Context {
    retry: Option<RetryInfo>,
    actions: Vec<WatchAction>,
}

impl Context {
    #[must_use]
    pub fn new(retry: Option<RetryInfo>, actions: Vec<WatchAction>) -> Self {
        Self { retry, actions }
    }

    /// `None` on a first attempt
    #[must_use]
    pub fn retry_info(&self) -> Option<&RetryInfo> {
        self.retry.as_ref()
    }

    /// Watch actions of the execution scope, in delivery order
    #[must_use]
    pub fn actions(&self) -> &[WatchAction] {
        &self.actions
    }
}

/// Reconciliation logic for one resource kind
///
/// The dispatcher hands the reconciler an owned copy of the latest resource
/// snapshot. When the controller owns a finalizer, that finalizer is already
/// present on the copy passed to [`reconcile`](Self::reconcile).
///
/// Errors are surfaced unchanged to the caller of the dispatcher; the
/// dispatcher never retries them itself.
#[async_trait]
pub trait Reconciler<K>: Send + Sync
where
    K: Send + Sync + 'static,
{
    /// Bring the cluster in line with `resource` and declare what to persist
    async fn reconcile(&self, resource: K, ctx: &Context) -> anyhow::Result<UpdateOutcome<K>>;

    /// Clean up before deletion
    ///
    /// Only invoked while the controller's finalizer is present on a resource
    /// marked for deletion.
    async fn finalize(&self, _resource: K, _ctx: &Context) -> anyhow::Result<DeleteOutcome> {
        Ok(DeleteOutcome::FinishDeletion)
    }
}

/// Controller name derived from a reconciler's type
///
/// Takes the last path segment of the type name without generic arguments,
/// lower-cased, with underscores turned into dashes.
#[must_use]
pub fn derive_reconciler_name<R: ?Sized>() -> String {
    let full = std::any::type_name::<R>();
    let without_generics = full.split('<').next().unwrap_or(full);
    without_generics
        .rsplit("::")
        .next()
        .unwrap_or(without_generics)
        .to_lowercase()
        .replace('_', "-")
}
