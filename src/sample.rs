//! # Sample Reconciler
//!
//! Reconciler for the [`Sample`] resource run by the `dispatch-controller`
//! binary. It records the processed generation in the status sub-resource.

use crate::controller::outcome::{DeleteOutcome, UpdateOutcome};
use crate::controller::reconciler::{Context, Reconciler};
use crate::crd::{has_finalizer, ResourceKey, Sample, SampleState, SampleStatus};
use async_trait::async_trait;
use kube::Resource;
use tracing::info;

#[derive(Debug, Clone)]
pub struct SampleReconciler {
    /// Finalizer the dispatcher is expected to have added, if any
    finalizer: Option<String>,
}

impl SampleReconciler {
    pub fn new(finalizer: Option<&str>) -> Self {
        Self {
            finalizer: finalizer.map(str::to_string),
        }
    }
}

#[async_trait]
impl Reconciler<Sample> for SampleReconciler {
    async fn reconcile(
        &self,
        mut resource: Sample,
        ctx: &Context,
    ) -> anyhow::Result<UpdateOutcome<Sample>> {
        let key = ResourceKey::from_resource(&resource);
        if let Some(finalizer) = &self.finalizer {
            if !has_finalizer(&resource, finalizer) {
                anyhow::bail!("finalizer {finalizer} missing on {key}");
            }
        }

        let generation = resource.meta().generation;
        info!(
            resource = %key,
            value = %resource.spec.value,
            attempt = ctx.retry_info().map_or(1, |r| r.attempt),
            "Reconciling sample"
        );

        resource.status = Some(SampleStatus {
            state: Some(SampleState::Success),
            observed_generation: generation,
            last_reconcile_time: Some(chrono::Utc::now().to_rfc3339()),
        });
        Ok(UpdateOutcome::update_status(resource))
    }

    async fn finalize(&self, resource: Sample, _ctx: &Context) -> anyhow::Result<DeleteOutcome> {
        info!(resource = %ResourceKey::from_resource(&resource), "Finalizing sample");
        Ok(DeleteOutcome::FinishDeletion)
    }
}
