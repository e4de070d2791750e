//! # Resource Facade
//!
//! Persistence boundary of the dispatcher.
//!
//! Both operations are guarded by the resource version carried in the payload:
//! a stale version yields [`FacadeError::Conflict`] instead of overwriting a
//! concurrent change. Repeating an identical payload is safe.

use crate::crd::ResourceKey;
use async_trait::async_trait;
use kube::api::{Patch, PatchParams, PostParams};
use kube::{Api, Client, Resource};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum FacadeError {
    /// The resource was modified concurrently; redeliver with fresh state
    #[error("conflict writing {resource}: resource version {resource_version:?} is stale")]
    Conflict {
        resource: String,
        resource_version: Option<String>,
    },
    #[error("resource has no name")]
    MissingName,
    #[error("Kubernetes API error: {0}")]
    Api(#[from] kube::Error),
}

impl FacadeError {
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

/// Conflict-aware writes of a custom resource
#[async_trait]
pub trait ResourceFacade<K>: Send + Sync
where
    K: Send + Sync + 'static,
{
    /// Replace the full resource, guarded by its resource version
    async fn replace_with_lock(&self, resource: K) -> Result<K, FacadeError>;

    /// Persist only the status sub-resource, guarded by the resource version
    async fn update_status(&self, resource: K) -> Result<K, FacadeError>;
}

/// [`ResourceFacade`] backed by the Kubernetes API
///
/// Works for namespaced resources; cluster-scoped kinds provide their own facade.
#[derive(Clone)]
pub struct KubeResourceFacade<K> {
    client: Client,
    field_manager: String,
    _kind: std::marker::PhantomData<fn() -> K>,
}

impl<K> Debug for KubeResourceFacade<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeResourceFacade")
            .field("field_manager", &self.field_manager)
            .finish_non_exhaustive()
    }
}

impl<K> KubeResourceFacade<K>
where
    K: Resource<Scope = k8s_openapi::NamespaceResourceScope, DynamicType = ()>,
{
    pub fn new(client: Client, field_manager: impl Into<String>) -> Self {
        Self {
            client,
            field_manager: field_manager.into(),
            _kind: std::marker::PhantomData,
        }
    }

    fn api_for(&self, resource: &K) -> Api<K> {
        match resource.meta().namespace.as_deref() {
            Some(namespace) => Api::namespaced(self.client.clone(), namespace),
            None => Api::default_namespaced(self.client.clone()),
        }
    }
}

fn name_of<K: Resource>(resource: &K) -> Result<String, FacadeError> {
    resource.meta().name.clone().ok_or(FacadeError::MissingName)
}

/// Map a 409 from the API server to [`FacadeError::Conflict`]
fn classify<K: Resource>(resource: &K, error: kube::Error) -> FacadeError {
    match error {
        kube::Error::Api(response) if response.code == 409 => {
            let key = ResourceKey::from_resource(resource);
            warn!(
                resource = %key,
                resource_version = ?resource.meta().resource_version,
                "Write rejected with conflict (409)"
            );
            FacadeError::Conflict {
                resource: key.to_string(),
                resource_version: resource.meta().resource_version.clone(),
            }
        }
        other => FacadeError::Api(other),
    }
}

#[async_trait]
impl<K> ResourceFacade<K> for KubeResourceFacade<K>
where
    K: Resource<Scope = k8s_openapi::NamespaceResourceScope, DynamicType = ()>
        + Clone
        + Debug
        + Serialize
        + DeserializeOwned
        + Send
        + Sync
        + 'static,
{
    async fn replace_with_lock(&self, resource: K) -> Result<K, FacadeError> {
        let name = name_of(&resource)?;
        let api = self.api_for(&resource);
        let params = PostParams {
            field_manager: Some(self.field_manager.clone()),
            ..PostParams::default()
        };
        debug!(
            resource = %ResourceKey::from_resource(&resource),
            resource_version = ?resource.meta().resource_version,
            "Replacing resource"
        );
        api.replace(&name, &params, &resource)
            .await
            .map_err(|e| classify(&resource, e))
    }

    async fn update_status(&self, resource: K) -> Result<K, FacadeError> {
        let name = name_of(&resource)?;
        let api = self.api_for(&resource);
        // The status endpoint ignores everything outside `.status`, while the
        // resourceVersion in the body still guards the write.
        let params = PatchParams {
            field_manager: Some(self.field_manager.clone()),
            ..PatchParams::default()
        };
        debug!(
            resource = %ResourceKey::from_resource(&resource),
            resource_version = ?resource.meta().resource_version,
            "Updating status sub-resource"
        );
        api.patch_status(&name, &params, &Patch::Merge(&resource))
            .await
            .map_err(|e| classify(&resource, e))
    }
}
