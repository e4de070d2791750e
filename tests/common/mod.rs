//! Common test utilities for dispatcher tests
//!
//! Provides `Sample` fixtures, a recording [`ResourceFacade`] and a scripted
//! [`Reconciler`] so the dispatch state machine can be exercised without a
//! cluster.

#![allow(dead_code, reason = "Each test binary uses a different subset of the helpers")]

use async_trait::async_trait;
use dispatch_controller::config::{ControllerConfiguration, ControllerOverrides};
use dispatch_controller::controller::dispatcher::EventDispatcher;
use dispatch_controller::controller::facade::{FacadeError, ResourceFacade};
use dispatch_controller::controller::outcome::{DeleteOutcome, UpdateOutcome};
use dispatch_controller::controller::reconciler::{Context, Reconciler};
use dispatch_controller::crd::{Sample, SampleSpec, SampleState, SampleStatus};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

pub const FINALIZER: &str = "samples.dispatch.example.io/finalizer";
pub const FOREIGN_FINALIZER: &str = "other.example.io/cleanup";

/// A `Sample` in namespace `default` with a stable uid
pub fn sample(generation: i64, finalizers: &[&str]) -> Sample {
    let mut sample = Sample::new(
        "test",
        SampleSpec {
            value: "hello".to_string(),
        },
    );
    sample.metadata.namespace = Some("default".to_string());
    sample.metadata.uid = Some("uid-1".to_string());
    sample.metadata.resource_version = Some("1".to_string());
    sample.metadata.generation = Some(generation);
    if !finalizers.is_empty() {
        sample.metadata.finalizers = Some(finalizers.iter().map(ToString::to_string).collect());
    }
    sample
}

/// Like [`sample`], but marked for deletion
pub fn deleting(generation: i64, finalizers: &[&str]) -> Sample {
    let mut sample = sample(generation, &[]);
    sample.metadata = serde_json::from_value(serde_json::json!({
        "name": "test",
        "namespace": "default",
        "uid": "uid-1",
        "resourceVersion": "1",
        "generation": generation,
        "finalizers": finalizers,
        "deletionTimestamp": "2019-08-10T00:00:00Z"
    }))
    .unwrap();
    sample
}

pub fn finalizers(sample: &Sample) -> Vec<String> {
    sample.metadata.finalizers.clone().unwrap_or_default()
}

#[derive(Debug, Clone)]
pub enum FacadeCall {
    Replace(Sample),
    UpdateStatus(Sample),
}

/// Facade recording every call; bumps the resource version on success
#[derive(Debug, Default)]
pub struct RecordingFacade {
    calls: Mutex<Vec<FacadeCall>>,
    conflict_on_replace: AtomicBool,
    version: AtomicU64,
}

impl RecordingFacade {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            version: AtomicU64::new(1),
            ..Self::default()
        })
    }

    pub fn fail_replace_with_conflict(&self) {
        self.conflict_on_replace.store(true, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<FacadeCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn replaces(&self) -> Vec<Sample> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                FacadeCall::Replace(sample) => Some(sample),
                FacadeCall::UpdateStatus(_) => None,
            })
            .collect()
    }

    pub fn status_updates(&self) -> Vec<Sample> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                FacadeCall::UpdateStatus(sample) => Some(sample),
                FacadeCall::Replace(_) => None,
            })
            .collect()
    }

    fn bump(&self, mut resource: Sample) -> Sample {
        let version = self.version.fetch_add(1, Ordering::SeqCst) + 1;
        resource.metadata.resource_version = Some(version.to_string());
        resource
    }
}

#[async_trait]
impl ResourceFacade<Sample> for RecordingFacade {
    async fn replace_with_lock(&self, resource: Sample) -> Result<Sample, FacadeError> {
        self.calls
            .lock()
            .unwrap()
            .push(FacadeCall::Replace(resource.clone()));
        if self.conflict_on_replace.load(Ordering::SeqCst) {
            return Err(FacadeError::Conflict {
                resource: "default/test".to_string(),
                resource_version: resource.metadata.resource_version.clone(),
            });
        }
        Ok(self.bump(resource))
    }

    async fn update_status(&self, resource: Sample) -> Result<Sample, FacadeError> {
        self.calls
            .lock()
            .unwrap()
            .push(FacadeCall::UpdateStatus(resource.clone()));
        Ok(self.bump(resource))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behavior {
    NoUpdate,
    /// Return the resource with `spec.value` set to `updated`
    UpdateResource,
    /// Return the resource with a success status
    UpdateStatus,
    Fail,
}

/// Reconciler answering with a configurable outcome and recording its inputs
#[derive(Debug)]
pub struct ScriptedReconciler {
    behavior: Mutex<Behavior>,
    delete_outcome: Mutex<DeleteOutcome>,
    fail_finalize: AtomicBool,
    reconciled: Mutex<Vec<Sample>>,
    finalized: Mutex<Vec<Sample>>,
}

impl ScriptedReconciler {
    pub fn new(behavior: Behavior) -> Arc<Self> {
        Arc::new(Self {
            behavior: Mutex::new(behavior),
            delete_outcome: Mutex::new(DeleteOutcome::FinishDeletion),
            fail_finalize: AtomicBool::new(false),
            reconciled: Mutex::new(Vec::new()),
            finalized: Mutex::new(Vec::new()),
        })
    }

    pub fn set_behavior(&self, behavior: Behavior) {
        *self.behavior.lock().unwrap() = behavior;
    }

    pub fn set_delete_outcome(&self, outcome: DeleteOutcome) {
        *self.delete_outcome.lock().unwrap() = outcome;
    }

    pub fn set_finalize_failure(&self, fail: bool) {
        self.fail_finalize.store(fail, Ordering::SeqCst);
    }

    pub fn reconciled(&self) -> Vec<Sample> {
        self.reconciled.lock().unwrap().clone()
    }

    pub fn finalized(&self) -> Vec<Sample> {
        self.finalized.lock().unwrap().clone()
    }
}

#[async_trait]
impl Reconciler<Sample> for ScriptedReconciler {
    async fn reconcile(
        &self,
        mut resource: Sample,
        _ctx: &Context,
    ) -> anyhow::Result<UpdateOutcome<Sample>> {
        self.reconciled.lock().unwrap().push(resource.clone());
        let behavior = *self.behavior.lock().unwrap();
        match behavior {
            Behavior::NoUpdate => Ok(UpdateOutcome::no_update()),
            Behavior::UpdateResource => {
                resource.spec.value = "updated".to_string();
                Ok(UpdateOutcome::update_resource(resource))
            }
            Behavior::UpdateStatus => {
                resource.status = Some(SampleStatus {
                    state: Some(SampleState::Success),
                    observed_generation: resource.metadata.generation,
                    last_reconcile_time: None,
                });
                Ok(UpdateOutcome::update_status(resource))
            }
            Behavior::Fail => anyhow::bail!("reconcile failed"),
        }
    }

    async fn finalize(&self, resource: Sample, _ctx: &Context) -> anyhow::Result<DeleteOutcome> {
        self.finalized.lock().unwrap().push(resource);
        if self.fail_finalize.load(Ordering::SeqCst) {
            anyhow::bail!("finalize failed");
        }
        Ok(*self.delete_outcome.lock().unwrap())
    }
}

pub fn configuration(overrides: ControllerOverrides<Sample>) -> Arc<ControllerConfiguration<Sample>> {
    Arc::new(ControllerConfiguration::resolve(overrides, "scripted-reconciler").unwrap())
}

pub fn dispatcher(
    reconciler: &Arc<ScriptedReconciler>,
    facade: &Arc<RecordingFacade>,
    overrides: ControllerOverrides<Sample>,
) -> EventDispatcher<Sample> {
    let reconciler: Arc<dyn Reconciler<Sample>> = Arc::clone(reconciler) as _;
    let facade: Arc<dyn ResourceFacade<Sample>> = Arc::clone(facade) as _;
    EventDispatcher::new(reconciler, facade, configuration(overrides))
}
