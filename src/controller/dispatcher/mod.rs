//! # Event Dispatcher
//!
//! Decides, for one execution scope, whether to skip, finalize or reconcile a
//! resource and commits the reconciler's declared outcome through the
//! [`ResourceFacade`].
//!
//! Evaluation order per call:
//!
//! 1. Event filters (never applied to resources marked for deletion)
//! 2. Deletion branch: finalize when the controller's finalizer is present
//! 3. Generation skip: already processed generations are not reconciled again
//! 4. Finalizer ensure: the finalizer is added to the snapshot handed to the reconciler
//! 5. Reconcile and persist, then record the processed generation
//!
//! The dispatcher makes a single attempt. Every failure is returned to the
//! caller, which owns retries. Callers must not run two dispatches for the same
//! resource concurrently.

mod generation;

pub use generation::GenerationStore;

use crate::config::ControllerConfiguration;
use crate::controller::facade::{FacadeError, ResourceFacade};
use crate::controller::outcome::{DeleteOutcome, UpdateOutcome};
use crate::controller::reconciler::{Context, Reconciler};
use crate::controller::scope::ExecutionScope;
use crate::crd::{
    add_finalizer, generation, has_finalizer, is_marked_for_deletion, remove_finalizer,
    ResourceKey,
};
use kube::Resource;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, info_span, Instrument};

/// Why a dispatch did nothing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The generation was already reconciled successfully
    GenerationUnchanged,
    /// Every event in the scope was rejected by a filter
    Filtered,
}

/// Facade calls made after a reconcile
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Persistence {
    None,
    /// Replace carrying only the newly added finalizer
    Finalizer,
    Resource,
    Status,
    /// Replace for the pending finalizer followed by a status update
    ResourceAndStatus,
}

impl Persistence {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Persistence::None => "none",
            Persistence::Finalizer => "finalizer",
            Persistence::Resource => "resource",
            Persistence::Status => "status",
            Persistence::ResourceAndStatus => "resource_and_status",
        }
    }
}

/// What one dispatch call did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Skipped(SkipReason),
    Reconciled(Persistence),
    Finalized { finalizer_removed: bool },
    /// Marked for deletion without this controller's finalizer
    DeletionNotOwned,
}

impl DispatchOutcome {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            DispatchOutcome::Skipped(SkipReason::GenerationUnchanged) => "skipped_generation",
            DispatchOutcome::Skipped(SkipReason::Filtered) => "skipped_filtered",
            DispatchOutcome::Reconciled(_) => "reconciled",
            DispatchOutcome::Finalized { .. } => "finalized",
            DispatchOutcome::DeletionNotOwned => "deletion_not_owned",
        }
    }
}

impl fmt::Display for DispatchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("reconcile of {resource} failed: {source}")]
    Reconcile {
        resource: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("finalize of {resource} failed: {source}")]
    Finalize {
        resource: String,
        #[source]
        source: anyhow::Error,
    },
    #[error(transparent)]
    Persistence(#[from] FacadeError),
}

impl DispatchError {
    /// A stale resource version; redeliver with fresh state, no backoff escalation
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, DispatchError::Persistence(e) if e.is_conflict())
    }

    /// Whether redelivering the resource can succeed
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        !matches!(self, DispatchError::Persistence(FacadeError::MissingName))
    }

    /// Label used for metrics: `conflict`, `logic` or `api`
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            DispatchError::Reconcile { .. } | DispatchError::Finalize { .. } => "logic",
            DispatchError::Persistence(e) if e.is_conflict() => "conflict",
            DispatchError::Persistence(_) => "api",
        }
    }
}

/// Finalizer, generation and persistence policy around one [`Reconciler`]
pub struct EventDispatcher<K> {
    reconciler: Arc<dyn Reconciler<K>>,
    facade: Arc<dyn ResourceFacade<K>>,
    config: Arc<ControllerConfiguration<K>>,
    generations: GenerationStore,
}

impl<K> fmt::Debug for EventDispatcher<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("controller", &self.config.name())
            .field("finalizer", &self.config.finalizer())
            .field("generation_aware", &self.config.is_generation_aware())
            .field("generations", &self.generations)
            .finish_non_exhaustive()
    }
}

impl<K> EventDispatcher<K>
where
    K: Resource + Clone + Send + Sync + 'static,
{
    pub fn new(
        reconciler: Arc<dyn Reconciler<K>>,
        facade: Arc<dyn ResourceFacade<K>>,
        config: Arc<ControllerConfiguration<K>>,
    ) -> Self {
        Self {
            reconciler,
            facade,
            config,
            generations: GenerationStore::default(),
        }
    }

    #[must_use]
    pub fn with_generation_store(mut self, generations: GenerationStore) -> Self {
        self.generations = generations;
        self
    }

    pub fn configuration(&self) -> &Arc<ControllerConfiguration<K>> {
        &self.config
    }

    pub fn generations(&self) -> &GenerationStore {
        &self.generations
    }

    /// Discard bookkeeping of a resource removed from the cluster
    pub fn forget(&self, key: &ResourceKey) {
        if self.generations.forget(key).is_some() {
            debug!(resource = %key, "Forgot generation mark");
        }
    }

    /// Run one dispatch cycle for `scope`
    ///
    /// At most one facade call is made, with one exception: when the finalizer
    /// still has to be added and the reconciler answers `UpdateStatusOnly`, the
    /// resource is replaced first and its status updated second
    /// ([`Persistence::ResourceAndStatus`]). If the status update then fails,
    /// the finalizer is already persisted and the generation stays unmarked.
    ///
    /// # Errors
    ///
    /// Returns a [`DispatchError`] when the reconciler, the finalizer logic or a
    /// persistence call fails. The generation mark is left untouched in that case.
    pub async fn handle_execution(
        &self,
        scope: ExecutionScope<K>,
    ) -> Result<DispatchOutcome, DispatchError> {
        let key = ResourceKey::from_resource(scope.resource());
        let span = info_span!(
            "dispatcher.handle_execution",
            controller = self.config.name(),
            resource = %key,
            generation = ?generation(scope.resource()),
            events = scope.len()
        );

        async move {
            if !self.config.filters().accepts(&scope) {
                debug!("All events rejected by filters, skipping");
                return Ok(DispatchOutcome::Skipped(SkipReason::Filtered));
            }

            let ctx = scope.context();
            let resource = scope.into_resource();

            if is_marked_for_deletion(&resource) {
                return self.handle_deletion(&key, resource, &ctx).await;
            }

            if self.config.is_generation_aware() {
                if let Some(current) = generation(&resource) {
                    if self.generations.is_processed(&key, current) {
                        debug!(generation = current, "Generation already processed, skipping");
                        return Ok(DispatchOutcome::Skipped(SkipReason::GenerationUnchanged));
                    }
                }
            }

            self.handle_reconcile(&key, resource, &ctx).await
        }
        .instrument(span)
        .await
    }

    async fn handle_deletion(
        &self,
        key: &ResourceKey,
        resource: K,
        ctx: &Context,
    ) -> Result<DispatchOutcome, DispatchError> {
        self.forget(key);

        let Some(finalizer) = self.config.finalizer() else {
            debug!("Finalizer management disabled, leaving deletion alone");
            return Ok(DispatchOutcome::DeletionNotOwned);
        };
        if !has_finalizer(&resource, finalizer) {
            debug!(finalizer, "Finalizer not present, leaving deletion alone");
            return Ok(DispatchOutcome::DeletionNotOwned);
        }

        let outcome = self
            .reconciler
            .finalize(resource.clone(), ctx)
            .await
            .map_err(|source| DispatchError::Finalize {
                resource: key.to_string(),
                source,
            })?;

        match outcome {
            DeleteOutcome::FinishDeletion => {
                let mut resource = resource;
                let removed = remove_finalizer(&mut resource, finalizer);
                if removed {
                    self.facade.replace_with_lock(resource).await?;
                    info!(finalizer, "Removed finalizer");
                }
                Ok(DispatchOutcome::Finalized {
                    finalizer_removed: removed,
                })
            }
            DeleteOutcome::FinishWithoutFinalizerRemoval => {
                info!(finalizer, "Finalize requested to keep the finalizer");
                Ok(DispatchOutcome::Finalized {
                    finalizer_removed: false,
                })
            }
        }
    }

    async fn handle_reconcile(
        &self,
        key: &ResourceKey,
        mut resource: K,
        ctx: &Context,
    ) -> Result<DispatchOutcome, DispatchError> {
        let finalizer = self.config.finalizer();
        let finalizer_pending = finalizer.is_some_and(|f| add_finalizer(&mut resource, f));
        if finalizer_pending {
            debug!(finalizer = ?finalizer, "Adding finalizer before reconcile");
        }

        let outcome = self
            .reconciler
            .reconcile(resource.clone(), ctx)
            .await
            .map_err(|source| DispatchError::Reconcile {
                resource: key.to_string(),
                source,
            })?;
        debug!(outcome = outcome.as_str(), "Reconciler returned");

        let persistence = match outcome {
            UpdateOutcome::NoUpdate if finalizer_pending => {
                self.facade.replace_with_lock(resource.clone()).await?;
                Persistence::Finalizer
            }
            UpdateOutcome::NoUpdate => Persistence::None,
            UpdateOutcome::UpdateResource(mut updated) => {
                if let Some(finalizer) = finalizer {
                    add_finalizer(&mut updated, finalizer);
                }
                self.facade.replace_with_lock(updated).await?;
                Persistence::Resource
            }
            UpdateOutcome::UpdateStatusOnly(mut updated) if finalizer_pending => {
                let replaced = self.facade.replace_with_lock(resource.clone()).await?;
                updated.meta_mut().resource_version = replaced.meta().resource_version.clone();
                self.facade.update_status(updated).await?;
                Persistence::ResourceAndStatus
            }
            UpdateOutcome::UpdateStatusOnly(updated) => {
                self.facade.update_status(updated).await?;
                Persistence::Status
            }
        };

        if self.config.is_generation_aware() {
            if let Some(current) = generation(&resource) {
                self.generations.mark(key, current);
            }
        }

        Ok(DispatchOutcome::Reconciled(persistence))
    }
}
